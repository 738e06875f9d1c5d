// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::domain::services::rate_limiting_service::{RateLimitConfig, RateLimitingService};
use crate::infrastructure::cache::redis_client::RedisClient;

/// 滑动窗口限流实现
///
/// 每个域名保存窗口内的请求时间戳。配置了Redis时，计数同时写入
/// `rate:{domain}`，检查时取本地与共享计数中较大者，跨进程一致性是近似的。
pub struct SlidingWindowRateLimiter {
    config: RateLimitConfig,
    windows: DashMap<String, VecDeque<Instant>>,
    redis: Option<Arc<RedisClient>>,
}

impl SlidingWindowRateLimiter {
    pub fn new(config: RateLimitConfig, redis: Option<Arc<RedisClient>>) -> Self {
        Self {
            config,
            windows: DashMap::new(),
            redis,
        }
    }

    fn redis_key(domain: &str) -> String {
        format!("rate:{}", domain)
    }

    fn prune(window: &mut VecDeque<Instant>, now: Instant, span: std::time::Duration) {
        while let Some(&oldest) = window.front() {
            if now.duration_since(oldest) >= span {
                window.pop_front();
            } else {
                break;
            }
        }
    }

    /// 清理窗口外的时间戳并返回本地计数
    fn local_count(&self, domain: &str) -> u32 {
        match self.windows.get_mut(domain) {
            Some(mut window) => {
                Self::prune(&mut window, Instant::now(), self.config.window);
                window.len() as u32
            }
            None => 0,
        }
    }

    async fn shared_count(&self, domain: &str) -> u32 {
        let Some(ref redis) = self.redis else {
            return 0;
        };
        match redis.get(&Self::redis_key(domain)).await {
            Ok(Some(value)) => value.parse().unwrap_or(0),
            Ok(None) => 0,
            Err(e) => {
                warn!("Failed to read rate counter from Redis: {}", e);
                0
            }
        }
    }

    async fn current_count(&self, domain: &str) -> u32 {
        let local = self.local_count(domain);
        let shared = self.shared_count(domain).await;
        local.max(shared)
    }
}

#[async_trait]
impl RateLimitingService for SlidingWindowRateLimiter {
    async fn try_acquire(&self, domain: &str) -> bool {
        // Read before taking the entry guard; the guard must not be held across await
        let shared = self.shared_count(domain).await;

        let acquired = {
            let mut window = self.windows.entry(domain.to_string()).or_default();
            let now = Instant::now();
            Self::prune(&mut window, now, self.config.window);
            let count = (window.len() as u32).max(shared);
            if count < self.config.requests_per_window {
                window.push_back(now);
                true
            } else {
                debug!(
                    "Rate limit reached for {}: {}/{}",
                    domain, count, self.config.requests_per_window
                );
                false
            }
        };

        if acquired {
            if let Some(ref redis) = self.redis {
                let ttl = self.config.window.as_secs().max(1) as i64;
                if let Err(e) = redis.incr_with_expiry(&Self::redis_key(domain), ttl).await {
                    warn!("Failed to mirror rate counter to Redis: {}", e);
                }
            }
        }
        acquired
    }

    async fn release(&self, domain: &str) {
        if let Some(mut window) = self.windows.get_mut(domain) {
            window.pop_back();
        }

        if let Some(ref redis) = self.redis {
            if let Err(e) = redis.decr(&Self::redis_key(domain)).await {
                warn!("Failed to release rate counter in Redis: {}", e);
            }
        }
    }

    async fn remaining(&self, domain: &str) -> u32 {
        self.config
            .requests_per_window
            .saturating_sub(self.current_count(domain).await)
    }
}
