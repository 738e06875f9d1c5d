// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use axum::{
    extract::{ConnectInfo, Request},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use governor::{
    clock::{Clock, DefaultClock},
    middleware::StateInformationMiddleware,
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter,
};
use serde_json::json;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::warn;

type KeyedLimiter =
    RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock, StateInformationMiddleware>;

/// 不受限流影响的路径
const EXEMPT_SUFFIXES: &[&str] = &["/health", "/healthz"];

/// API速率限制器
///
/// 按客户端地址分桶，每分钟配额加突发容量
#[derive(Clone)]
pub struct ApiRateLimiter {
    limiter: Arc<KeyedLimiter>,
    per_minute: u32,
}

impl ApiRateLimiter {
    /// 创建新的速率限制器实例
    ///
    /// # 参数
    ///
    /// * `per_minute` - 每分钟请求数
    /// * `burst` - 突发容量
    pub fn new(per_minute: u32, burst: u32) -> Self {
        let rate = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_minute(rate).allow_burst(burst);

        Self {
            limiter: Arc::new(RateLimiter::keyed(quota).with_middleware::<StateInformationMiddleware>()),
            per_minute: rate.get(),
        }
    }

    /// 清理已恢复满额的客户端状态
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

/// 速率限制中间件
///
/// 超出配额时返回429，并带上 `Retry-After` 与 `X-RateLimit-*` 头
pub async fn rate_limit_middleware(
    Extension(limiter): Extension<ApiRateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if EXEMPT_SUFFIXES.iter().any(|suffix| path.ends_with(suffix)) {
        return next.run(request).await;
    }

    let key = client_key(&request);
    match limiter.limiter.check_key(&key) {
        Ok(snapshot) => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert("X-RateLimit-Limit", HeaderValue::from(limiter.per_minute));
            headers.insert(
                "X-RateLimit-Remaining",
                HeaderValue::from(snapshot.remaining_burst_capacity()),
            );
            response
        }
        Err(not_until) => {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            let retry_after = wait.as_secs().max(1);
            warn!("API rate limit exceeded for {}, retry in {}s", key, retry_after);

            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "success": false,
                    "error": "Rate limit exceeded. Please try again later."
                })),
            )
                .into_response();
            let headers = response.headers_mut();
            headers.insert("Retry-After", HeaderValue::from(retry_after));
            headers.insert("X-RateLimit-Limit", HeaderValue::from(limiter.per_minute));
            headers.insert("X-RateLimit-Remaining", HeaderValue::from(0u32));
            response
        }
    }
}

/// 客户端标识：X-Forwarded-For 第一个地址、X-Real-IP、连接地址
fn client_key(request: &Request) -> String {
    forwarded_ip(request.headers())
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware::from_fn, routing::get, Router};
    use axum_test::TestServer;

    fn app(limiter: ApiRateLimiter) -> Router {
        Router::new()
            .route("/api/v1/scraping/scrape", get(|| async { "ok" }))
            .route("/healthz", get(|| async { "ok" }))
            .layer(from_fn(rate_limit_middleware))
            .layer(Extension(limiter))
    }

    #[test]
    fn test_forwarded_ip_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(forwarded_ip(&headers).as_deref(), Some("10.0.0.2"));

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(forwarded_ip(&headers).as_deref(), Some("203.0.113.7"));
    }

    #[tokio::test]
    async fn test_burst_then_reject() {
        let server = TestServer::new(app(ApiRateLimiter::new(60, 2))).unwrap();

        for _ in 0..2 {
            let response = server
                .get("/api/v1/scraping/scrape")
                .add_header("x-forwarded-for", "198.51.100.1")
                .await;
            response.assert_status_ok();
            assert_eq!(response.header("X-RateLimit-Limit"), "60");
        }

        let limited = server
            .get("/api/v1/scraping/scrape")
            .add_header("x-forwarded-for", "198.51.100.1")
            .await;
        limited.assert_status(StatusCode::TOO_MANY_REQUESTS);
        assert!(limited.headers().contains_key("Retry-After"));
        assert_eq!(limited.header("X-RateLimit-Remaining"), "0");

        // Other clients keep their own budget
        server
            .get("/api/v1/scraping/scrape")
            .add_header("x-forwarded-for", "198.51.100.2")
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_health_is_exempt() {
        let server = TestServer::new(app(ApiRateLimiter::new(1, 1))).unwrap();
        for _ in 0..5 {
            server.get("/healthz").await.assert_status_ok();
        }
    }
}
