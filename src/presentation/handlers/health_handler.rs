// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{response::IntoResponse, Extension, Json};
use serde_json::json;
use std::sync::Arc;

use crate::domain::services::scraper_service::ScraperService;

/// 抓取服务健康检查
pub async fn health(Extension(service): Extension<Arc<ScraperService>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "scraping",
        "platforms": service.platforms(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// 存活探针
pub async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
