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

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// 应用程序配置设置
///
/// 包含服务器、Redis、限流、缓存、浏览器抓取、作业和指标等配置项
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// Redis配置
    pub redis: RedisSettings,
    /// 速率限制配置
    pub rate_limiting: RateLimitingSettings,
    /// 结果缓存配置
    pub cache: CacheSettings,
    /// 浏览器抓取配置
    pub scraping: ScrapingSettings,
    /// 后台作业配置
    pub workers: WorkerSettings,
    /// MCP服务配置
    pub mcp: McpSettings,
    /// 安全配置
    pub security: SecuritySettings,
    /// 指标配置
    pub metrics: MetricsSettings,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
}

/// Redis配置设置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisSettings {
    /// Redis连接URL，未设置时只使用内存存储
    pub url: Option<String>,
}

/// 速率限制配置设置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitingSettings {
    /// 每个目标域名每分钟允许的抓取请求数
    pub requests_per_minute: u32,
    /// 每个API客户端每分钟允许的请求数
    pub api_requests_per_minute: u32,
    /// API客户端突发上限
    pub api_burst: u32,
}

/// 缓存配置设置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheSettings {
    /// 结果缓存时间（秒）
    pub ttl_seconds: u64,
}

/// 浏览器抓取配置设置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScrapingSettings {
    /// 单次页面操作超时（秒）
    pub timeout_seconds: u64,
    /// 同时打开的浏览器页面上限
    pub max_concurrent_browsers: usize,
    /// 懒加载滚动的最大次数
    pub max_scroll_attempts: u32,
    /// 浏览器及robots.txt请求使用的User-Agent
    pub user_agent: String,
}

/// 后台作业配置设置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerSettings {
    /// Worker数量
    pub count: usize,
}

/// MCP服务配置设置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct McpSettings {
    /// 保留的端口配置，stdio传输下只用于日志
    pub port: u16,
}

/// 安全配置设置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SecuritySettings {
    /// 作业令牌签名密钥
    pub secret_key: String,
}

/// 指标配置设置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsSettings {
    /// 是否启用Prometheus导出
    pub enabled: bool,
    /// Prometheus监听地址
    pub address: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次加载默认值、`config/default`、`config/{APP_ENVIRONMENT}`、
    /// `REVIEWRS__*` 环境变量，最后是 `REDIS_URL` 等独立环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(|key| std::env::var(key).ok())
    }

    fn load(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = lookup("APP_ENVIRONMENT").unwrap_or_else(|| "default".to_string());
        let secret_key =
            lookup("SCRAPER_SECRET_KEY").unwrap_or_else(|| hex::encode(rand::random::<[u8; 32]>()));

        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("rate_limiting.requests_per_minute", 10)?
            .set_default("rate_limiting.api_requests_per_minute", 60)?
            .set_default("rate_limiting.api_burst", 10)?
            .set_default("cache.ttl_seconds", 86400)?
            .set_default("scraping.timeout_seconds", 30)?
            .set_default("scraping.max_concurrent_browsers", 3)?
            .set_default("scraping.max_scroll_attempts", 10)?
            .set_default(
                "scraping.user_agent",
                "Mozilla/5.0 (compatible; RestaurantScraperBot/1.0; +https://example.com/bot)",
            )?
            .set_default("workers.count", 2)?
            .set_default("mcp.port", 8001)?
            .set_default("security.secret_key", secret_key.clone())?
            .set_default("metrics.enabled", false)?
            .set_default("metrics.address", "0.0.0.0:9000")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("REVIEWRS").separator("__"))
            .set_override_option("redis.url", lookup("REDIS_URL"))?
            .set_override_option(
                "scraping.timeout_seconds",
                lookup("SCRAPING_TIMEOUT_SECONDS"),
            )?
            .set_override_option("mcp.port", lookup("MCP_SERVER_PORT"))?
            .set_override_option("security.secret_key", lookup("SCRAPER_SECRET_KEY"))?;

        builder.build()?.try_deserialize()
    }

    /// 监听地址
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load_with(vars: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::load(|key| vars.get(key).cloned()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = load_with(&[]);
        assert_eq!(settings.bind_address(), "0.0.0.0:8000");
        assert_eq!(settings.rate_limiting.requests_per_minute, 10);
        assert_eq!(settings.cache.ttl_seconds, 86400);
        assert_eq!(settings.scraping.timeout_seconds, 30);
        assert_eq!(settings.scraping.max_concurrent_browsers, 3);
        assert_eq!(settings.mcp.port, 8001);
        assert!(settings.redis.url.is_none());
        assert_eq!(settings.security.secret_key.len(), 64);
    }

    #[test]
    fn test_plain_environment_overrides() {
        let settings = load_with(&[
            ("REDIS_URL", "redis://cache:6379"),
            ("SCRAPING_TIMEOUT_SECONDS", "45"),
            ("MCP_SERVER_PORT", "9100"),
            ("SCRAPER_SECRET_KEY", "s3cret"),
        ]);
        assert_eq!(settings.redis.url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(settings.scraping.timeout_seconds, 45);
        assert_eq!(settings.mcp.port, 9100);
        assert_eq!(settings.security.secret_key, "s3cret");
    }
}
