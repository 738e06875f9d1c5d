// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::time::Duration;

/// 限流配置
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// 每个窗口内允许的请求数
    pub requests_per_window: u32,
    /// 滑动窗口长度
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 10,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    /// 每分钟限额
    pub fn per_minute(requests: u32) -> Self {
        Self {
            requests_per_window: requests,
            window: Duration::from_secs(60),
        }
    }
}

/// 按目标域名的抓取限流服务
///
/// `try_acquire` 在同一次操作里检查窗口并占用一个名额，并发请求不会同时
/// 越过上限；之后被robots拒绝的请求通过 `release` 归还名额，不计入窗口
#[async_trait]
pub trait RateLimitingService: Send + Sync {
    /// 窗口未满时占用一个名额并返回true，否则返回false
    async fn try_acquire(&self, domain: &str) -> bool;

    /// 归还最近一次占用的名额
    async fn release(&self, domain: &str);

    /// 窗口内剩余额度
    async fn remaining(&self, domain: &str) -> u32;
}
