// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

pub const REQUESTS_TOTAL: &str = "scraper_requests_total";
pub const SUCCESS_TOTAL: &str = "scraper_success_total";
pub const FAILURES_TOTAL: &str = "scraper_failures_total";
pub const REVIEWS_TOTAL: &str = "scraper_reviews_total";
pub const CACHE_HITS_TOTAL: &str = "scraper_cache_hits_total";
pub const CACHE_MISSES_TOTAL: &str = "scraper_cache_misses_total";
pub const RATE_LIMIT_HITS_TOTAL: &str = "scraper_rate_limit_hits_total";
pub const ROBOTS_BLOCKS_TOTAL: &str = "scraper_robots_blocks_total";
pub const SECURITY_BLOCKS_TOTAL: &str = "scraper_security_blocks_total";
pub const DURATION_SECONDS: &str = "scraper_duration_seconds";

/// 初始化指标系统
///
/// 安装Prometheus记录器并在 `address` 上暴露 `/metrics`。
/// 未调用时所有指标宏为空操作。
pub fn init_metrics(address: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(address)
        .install()?;

    describe_metrics();
    info!("Prometheus exporter listening on {}", address);
    Ok(())
}

/// 注册指标说明
pub fn describe_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Total scrape requests by platform");
    describe_counter!(SUCCESS_TOTAL, "Successful scrapes by platform");
    describe_counter!(FAILURES_TOTAL, "Failed scrapes by platform");
    describe_counter!(REVIEWS_TOTAL, "Reviews collected by platform");
    describe_counter!(CACHE_HITS_TOTAL, "Result cache hits");
    describe_counter!(CACHE_MISSES_TOTAL, "Result cache misses");
    describe_counter!(RATE_LIMIT_HITS_TOTAL, "Requests rejected by the per-domain rate limiter");
    describe_counter!(ROBOTS_BLOCKS_TOTAL, "Requests refused by robots.txt");
    describe_counter!(SECURITY_BLOCKS_TOTAL, "Inputs rejected by security validation");
    describe_histogram!(DURATION_SECONDS, "Scrape duration in seconds by platform");
}

pub fn record_request(platform: &str) {
    counter!(REQUESTS_TOTAL, "platform" => platform.to_string()).increment(1);
}

/// 记录一次成功抓取及评论数和耗时
pub fn record_success(platform: &str, reviews: usize, elapsed: Duration) {
    let platform = platform.to_string();
    counter!(SUCCESS_TOTAL, "platform" => platform.clone()).increment(1);
    counter!(REVIEWS_TOTAL, "platform" => platform.clone()).increment(reviews as u64);
    histogram!(DURATION_SECONDS, "platform" => platform).record(elapsed.as_secs_f64());
}

pub fn record_failure(platform: &str, elapsed: Duration) {
    let platform = platform.to_string();
    counter!(FAILURES_TOTAL, "platform" => platform.clone()).increment(1);
    histogram!(DURATION_SECONDS, "platform" => platform).record(elapsed.as_secs_f64());
}

pub fn record_cache(hit: bool) {
    if hit {
        counter!(CACHE_HITS_TOTAL).increment(1);
    } else {
        counter!(CACHE_MISSES_TOTAL).increment(1);
    }
}

pub fn record_rate_limit_hit(domain: &str) {
    counter!(RATE_LIMIT_HITS_TOTAL, "domain" => domain.to_string()).increment(1);
}

pub fn record_robots_block(domain: &str) {
    counter!(ROBOTS_BLOCKS_TOTAL, "domain" => domain.to_string()).increment(1);
}

/// 记录被安全校验拒绝的输入，`reason` 为拒绝类别
pub fn record_security_block(reason: &'static str) {
    counter!(SECURITY_BLOCKS_TOTAL, "reason" => reason).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn test_recorded_metrics_render() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            describe_metrics();
            record_request("google");
            record_success("google", 12, Duration::from_millis(1500));
            record_cache(true);
            record_cache(false);
            record_security_block("invalid_url");
        });

        let rendered = handle.render();
        assert!(rendered.contains("scraper_requests_total{platform=\"google\"} 1"));
        assert!(rendered.contains("scraper_reviews_total{platform=\"google\"} 12"));
        assert!(rendered.contains("scraper_cache_hits_total 1"));
        assert!(rendered.contains("scraper_cache_misses_total 1"));
        assert!(rendered.contains("scraper_security_blocks_total{reason=\"invalid_url\"} 1"));
        assert!(rendered.contains("scraper_duration_seconds"));
    }
}
