// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::settings::Settings;
use crate::domain::services::rate_limiting_service::RateLimitConfig;
use crate::domain::services::scraper_service::ScraperService;
use crate::engines::browser_engine::BrowserEngine;
use crate::infrastructure::cache::redis_client::RedisClient;
use crate::infrastructure::cache::result_cache::ResultCache;
use crate::infrastructure::platforms::base::{ClientOptions, PageFetcher};
use crate::infrastructure::platforms::factory::PlatformRegistry;
use crate::infrastructure::repositories::job_repo_impl::JobRepositoryImpl;
use crate::infrastructure::services::rate_limiting_service_impl::SlidingWindowRateLimiter;
use crate::infrastructure::services::webhook_service_impl::WebhookServiceImpl;
use crate::queue::job_queue::{InMemoryJobQueue, DEFAULT_QUEUE_CAPACITY};
use crate::utils::retry_policy::RetryPolicy;
use crate::utils::robots::{RobotsChecker, ROBOTS_USER_AGENT};

/// 启动时创建的共享组件
pub struct Components {
    pub service: Arc<ScraperService>,
    pub queue: Arc<InMemoryJobQueue>,
    pub cache: Arc<ResultCache>,
    pub jobs: Arc<JobRepositoryImpl>,
    pub redis: Option<Arc<RedisClient>>,
}

/// 连接Redis，不可用时返回None，各组件退回进程内存储
pub async fn connect_redis(settings: &Settings) -> Option<Arc<RedisClient>> {
    let url = settings.redis.url.as_deref()?;
    let client = match RedisClient::new(url).await {
        Ok(client) => client,
        Err(e) => {
            warn!("Invalid Redis URL, using in-memory stores: {}", e);
            return None;
        }
    };

    match client.ping().await {
        Ok(()) => {
            info!("Redis client initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            warn!("Redis unreachable, using in-memory stores: {}", e);
            None
        }
    }
}

/// 按配置组装抓取服务及其依赖
///
/// # 参数
///
/// * `settings` - 应用配置
///
/// # 返回值
///
/// 服务、作业队列、缓存、作业仓库和可选的Redis客户端
pub async fn build_components(settings: &Settings) -> Components {
    let redis = connect_redis(settings).await;

    let renderer = Arc::new(BrowserEngine::new(
        settings.scraping.max_concurrent_browsers,
        settings.scraping.user_agent.clone(),
    ));
    let options = ClientOptions {
        timeout: Duration::from_secs(settings.scraping.timeout_seconds),
        max_scroll_attempts: settings.scraping.max_scroll_attempts,
        ..ClientOptions::default()
    };

    let rate_limiter = Arc::new(SlidingWindowRateLimiter::new(
        RateLimitConfig::per_minute(settings.rate_limiting.requests_per_minute),
        redis.clone(),
    ));
    let robots = Arc::new(RobotsChecker::new(ROBOTS_USER_AGENT, redis.clone()));
    let fetcher = PageFetcher::new(renderer, RetryPolicy::default(), options).with_robots(robots.clone());
    let platforms = PlatformRegistry::with_fetcher(fetcher);
    let cache = Arc::new(ResultCache::new(
        Duration::from_secs(settings.cache.ttl_seconds),
        redis.clone(),
    ));
    let jobs = Arc::new(JobRepositoryImpl::new(redis.clone()));
    let queue = Arc::new(InMemoryJobQueue::new(DEFAULT_QUEUE_CAPACITY));

    let webhooks = Arc::new(WebhookServiceImpl::new(settings.security.secret_key.clone()));

    let service = ScraperService::new(jobs.clone(), rate_limiter, robots, cache.clone(), platforms)
        .with_queue(queue.clone())
        .with_webhooks(webhooks);

    info!(
        "Scraper service ready for platforms: {:?}",
        service.platforms()
    );

    Components {
        service: Arc::new(service),
        queue,
        cache,
        jobs,
        redis,
    }
}
