// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{Client, StatusCode};
use robotstxt::DefaultMatcher;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

use crate::infrastructure::cache::redis_client::RedisClient;
use crate::utils::retry_policy::RetryPolicy;

/// 抓取器对外声明的User-Agent
pub const ROBOTS_USER_AGENT: &str = "RestaurantScraperBot/1.0";

/// 成功获取后的规则缓存时间
const SUCCESS_TTL: Duration = Duration::from_secs(3600);

/// 获取失败（放行）后的缓存时间
const FAILURE_TTL: Duration = Duration::from_secs(300);

/// 401/403 时等价的规则
const DISALLOW_ALL: &str = "User-agent: *\nDisallow: /\n";

/// Robots.txt检查器接口
#[async_trait]
pub trait RobotsCheckerTrait: Send + Sync {
    /// 检查URL是否允许抓取，获取失败时放行
    async fn can_fetch(&self, url_str: &str) -> Result<bool>;
    /// 获取爬取延迟
    async fn crawl_delay(&self, url_str: &str) -> Result<Option<Duration>>;
}

/// 缓存的robots规则
#[derive(Clone)]
struct CachedRobots {
    content: String,
    expires_at: Instant,
}

/// 一次获取的结果
enum FetchOutcome {
    /// 获取到规则（含401/403折算出的全禁止规则）
    Rules(String),
    /// 获取失败，放行并短期缓存
    Failed,
}

/// Robots.txt检查器
///
/// 按主机缓存规则文本，命中缓存时只做本地匹配
#[derive(Clone)]
pub struct RobotsChecker {
    client: Client,
    user_agent: String,
    memory_cache: Arc<DashMap<String, CachedRobots>>,
    redis_client: Option<Arc<RedisClient>>,
    retry_policy: RetryPolicy,
}

#[async_trait]
impl RobotsCheckerTrait for RobotsChecker {
    async fn can_fetch(&self, url_str: &str) -> Result<bool> {
        let content = self.get_robots_content(url_str).await?;
        let allowed = DefaultMatcher::default().one_agent_allowed_by_robots(
            &content,
            self.product_token(),
            url_str,
        );
        debug!("robots.txt decision for {}: allowed={}", url_str, allowed);
        Ok(allowed)
    }

    async fn crawl_delay(&self, url_str: &str) -> Result<Option<Duration>> {
        let content = self.get_robots_content(url_str).await?;
        Ok(parse_crawl_delay(&content, self.product_token()))
    }
}

impl RobotsChecker {
    /// 创建新的Robots检查器实例
    ///
    /// # 参数
    ///
    /// * `user_agent` - 请求robots.txt时使用的完整User-Agent
    /// * `redis_client` - 可选的共享缓存
    pub fn new(user_agent: impl Into<String>, redis_client: Option<Arc<RedisClient>>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            user_agent: user_agent.into(),
            memory_cache: Arc::new(DashMap::new()),
            redis_client,
            retry_policy: RetryPolicy::fast(),
        }
    }

    /// 替换重试策略
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// robots匹配只使用产品名部分，例如 RestaurantScraperBot
    fn product_token(&self) -> &str {
        self.user_agent
            .split('/')
            .next()
            .unwrap_or(&self.user_agent)
            .trim()
    }

    /// 获取Robots.txt内容（带缓存）
    async fn get_robots_content(&self, url_str: &str) -> Result<String> {
        let url = Url::parse(url_str)?;
        let host = url
            .host_str()
            .ok_or_else(|| anyhow::anyhow!("URL has no host: {}", url_str))?;
        let origin = match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        };

        // 1. Memory cache
        if let Some(cached) = self.memory_cache.get(&origin) {
            if cached.expires_at > Instant::now() {
                return Ok(cached.content.clone());
            }
        }
        self.memory_cache
            .remove_if(&origin, |_, cached| cached.expires_at <= Instant::now());

        // 2. Redis mirror
        let redis_key = format!("robots:{}", origin);
        if let Some(ref redis) = self.redis_client {
            match redis.get(&redis_key).await {
                Ok(Some(content)) => {
                    // Redis owns the real expiry; recheck it periodically
                    self.store_memory(&origin, &content, FAILURE_TTL);
                    return Ok(content);
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to read robots cache from Redis: {}", e),
            }
        }

        // 3. Fetch
        let robots_url = format!("{}/robots.txt", origin);
        let (content, ttl) = match self.fetch(&robots_url).await {
            FetchOutcome::Rules(content) => (content, SUCCESS_TTL),
            FetchOutcome::Failed => (String::new(), FAILURE_TTL),
        };

        self.store_memory(&origin, &content, ttl);
        if let Some(ref redis) = self.redis_client {
            if let Err(e) = redis.set(&redis_key, &content, ttl.as_secs()).await {
                warn!("Failed to write robots cache to Redis: {}", e);
            }
        }

        Ok(content)
    }

    fn store_memory(&self, origin: &str, content: &str, ttl: Duration) {
        self.memory_cache.insert(
            origin.to_string(),
            CachedRobots {
                content: content.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    async fn fetch(&self, robots_url: &str) -> FetchOutcome {
        let result = self
            .retry_policy
            .run("robots.txt fetch", |_| true, || async {
                let resp = self
                    .client
                    .get(robots_url)
                    .header("User-Agent", &self.user_agent)
                    .send()
                    .await?;

                rules_from_response(resp.status(), resp.text()).await
            })
            .await;

        match result {
            Ok(content) => FetchOutcome::Rules(content),
            Err(e) => {
                warn!("Failed to fetch {}: {}, allowing by default", robots_url, e);
                FetchOutcome::Failed
            }
        }
    }
}

/// 解析适用于指定User-Agent的Crawl-delay指令
///
/// 精确匹配的分组优先于 `*` 分组
/// 按状态码把响应折算成规则文本，只有2xx才读取响应体
///
/// 读取响应体失败视为获取失败，而不是空规则
async fn rules_from_response<F, E>(status: StatusCode, body: F) -> Result<String>
where
    F: Future<Output = std::result::Result<String, E>>,
    E: Into<anyhow::Error>,
{
    if status.is_success() {
        body.await.map_err(Into::into)
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Ok(DISALLOW_ALL.to_string())
    } else if status.is_client_error() {
        // 404 and other 4xx mean there are no restrictions
        Ok(String::new())
    } else {
        Err(anyhow::anyhow!("robots.txt server error: {}", status))
    }
}

fn parse_crawl_delay(content: &str, product_token: &str) -> Option<Duration> {
    let token = product_token.to_lowercase();
    let mut in_group = false;
    let mut group_is_specific = false;
    let mut last_line_was_agent = false;
    let mut specific_delay: Option<f64> = None;
    let mut wildcard_delay: Option<f64> = None;

    for line in content.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                let agent = value.to_lowercase();
                let matches_specific = agent == token;
                let matches_wildcard = agent == "*";
                if last_line_was_agent {
                    in_group |= matches_specific || matches_wildcard;
                    group_is_specific |= matches_specific;
                } else {
                    in_group = matches_specific || matches_wildcard;
                    group_is_specific = matches_specific;
                }
                last_line_was_agent = true;
            }
            "crawl-delay" => {
                last_line_was_agent = false;
                if !in_group {
                    continue;
                }
                if let Ok(delay) = value.parse::<f64>() {
                    if group_is_specific {
                        specific_delay = Some(delay);
                    } else {
                        wildcard_delay = Some(delay);
                    }
                }
            }
            _ => last_line_was_agent = false,
        }
    }

    specific_delay
        .or(wildcard_delay)
        .filter(|d| d.is_finite() && *d >= 0.0)
        .map(Duration::from_secs_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn checker() -> RobotsChecker {
        RobotsChecker::new(ROBOTS_USER_AGENT, None).with_retry_policy(RetryPolicy::none())
    }

    #[tokio::test]
    async fn test_disallowed_path_is_blocked() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("User-agent: *\nDisallow: /private\n"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let checker = checker();
        let blocked = format!("{}/private/page", server.uri());
        let open = format!("{}/biz/social-house", server.uri());

        assert!(!checker.can_fetch(&blocked).await.unwrap());
        // second lookup is answered from the host cache
        assert!(checker.can_fetch(&open).await.unwrap());
    }

    #[tokio::test]
    async fn test_specific_agent_group() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "User-agent: RestaurantScraperBot\nDisallow: /\n\nUser-agent: *\nAllow: /\n",
            ))
            .mount(&server)
            .await;

        let url = format!("{}/biz/x", server.uri());
        assert!(!checker().can_fetch(&url).await.unwrap());
    }

    #[tokio::test]
    async fn test_not_found_allows_all() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/anything", server.uri());
        assert!(checker().can_fetch(&url).await.unwrap());
    }

    #[tokio::test]
    async fn test_forbidden_disallows_all() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let url = format!("{}/anything", server.uri());
        assert!(!checker().can_fetch(&url).await.unwrap());
    }

    #[tokio::test]
    async fn test_server_error_fails_open() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let checker = checker();
        let url = format!("{}/biz/x", server.uri());
        assert!(checker.can_fetch(&url).await.unwrap());
        // the fail-open decision is cached as well
        assert!(checker.can_fetch(&url).await.unwrap());
    }

    #[tokio::test]
    async fn test_unreadable_body_counts_as_failure() {
        let truncated = async { Err::<String, _>(anyhow::anyhow!("connection reset")) };
        assert!(rules_from_response(StatusCode::OK, truncated).await.is_err());

        // the body of a non-2xx response is never read
        let never = std::future::pending::<std::result::Result<String, anyhow::Error>>();
        assert_eq!(
            rules_from_response(StatusCode::FORBIDDEN, never).await.unwrap(),
            DISALLOW_ALL
        );
        let body = async { Ok::<_, anyhow::Error>("User-agent: *\nDisallow:\n".to_string()) };
        assert_eq!(
            rules_from_response(StatusCode::OK, body).await.unwrap(),
            "User-agent: *\nDisallow:\n"
        );
    }

    #[tokio::test]
    async fn test_crawl_delay_from_fetched_rules() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("User-agent: *\nCrawl-delay: 3\n"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let checker = checker();
        let url = format!("{}/biz/x", server.uri());
        assert_eq!(checker.crawl_delay(&url).await.unwrap(), Some(Duration::from_secs(3)));
        assert!(checker.can_fetch(&url).await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_url_is_error() {
        assert!(checker().can_fetch("not a url").await.is_err());
    }

    #[test]
    fn test_parse_crawl_delay() {
        let content = "User-agent: *\nCrawl-delay: 5\n\nUser-agent: RestaurantScraperBot\nCrawl-delay: 2.5\n";
        assert_eq!(
            parse_crawl_delay(content, "RestaurantScraperBot"),
            Some(Duration::from_millis(2500))
        );
        assert_eq!(
            parse_crawl_delay(content, "OtherBot"),
            Some(Duration::from_secs(5))
        );
        assert_eq!(parse_crawl_delay("User-agent: *\nDisallow:\n", "Bot"), None);
    }
}
