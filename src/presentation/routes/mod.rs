// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::Settings;
use crate::domain::services::scraper_service::ScraperService;
use crate::presentation::handlers::{
    extract_handler, health_handler, job_handler, scrape_handler,
};
use crate::presentation::middleware::rate_limit_middleware::{
    rate_limit_middleware, ApiRateLimiter,
};
use axum::{
    middleware,
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// API前缀
pub const API_PREFIX: &str = "/api/v1/scraping";

/// 创建应用路由
///
/// # 返回值
///
/// 返回未挂载状态的路由
pub fn routes() -> Router {
    let scraping_routes = Router::new()
        .route("/jobs", post(job_handler::create_job))
        .route(
            "/jobs/{id}",
            get(job_handler::get_job).delete(job_handler::cancel_job),
        )
        .route("/jobs/{id}/results", get(job_handler::get_job_results))
        .route("/scrape", post(scrape_handler::scrape))
        .route("/extract", post(extract_handler::extract))
        .route("/health", get(health_handler::health));

    Router::new()
        .nest(API_PREFIX, scraping_routes)
        .route("/healthz", get(health_handler::healthz))
}

/// 组装完整应用：路由、限流、共享状态与请求追踪
///
/// # 参数
///
/// * `service` - 抓取服务
/// * `settings` - 应用配置
/// * `limiter` - API速率限制器
pub fn app(service: Arc<ScraperService>, settings: Arc<Settings>, limiter: ApiRateLimiter) -> Router {
    routes()
        .layer(middleware::from_fn(rate_limit_middleware))
        .layer(Extension(service))
        .layer(Extension(settings))
        .layer(Extension(limiter))
        .layer(TraceLayer::new_for_http())
}
