// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::platforms::client::PlatformError;
use crate::engines::traits::{PageRenderer, RenderRequest, RenderedPage};
use crate::utils::retry_policy::RetryPolicy;
use crate::utils::robots::RobotsCheckerTrait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::form_urlencoded;

/// Yelp 与 TripAdvisor 每页评论数
pub const REVIEWS_PER_PAGE: usize = 10;

/// 平台客户端的公共选项
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// 单次渲染超时
    pub timeout: Duration,
    /// 懒加载滚动次数上限
    pub max_scroll_attempts: u32,
    /// 每次滚动后的等待
    pub scroll_pause: Duration,
    /// 翻页之间的间隔
    pub page_delay: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_scroll_attempts: 10,
            scroll_pause: Duration::from_millis(1500),
            page_delay: Duration::from_secs(1),
        }
    }
}

/// 带重试的页面获取器，三个平台客户端共用
#[derive(Clone)]
pub struct PageFetcher {
    renderer: Arc<dyn PageRenderer>,
    retry_policy: RetryPolicy,
    robots: Option<Arc<dyn RobotsCheckerTrait>>,
    pub options: ClientOptions,
}

impl PageFetcher {
    pub fn new(renderer: Arc<dyn PageRenderer>, retry_policy: RetryPolicy, options: ClientOptions) -> Self {
        Self {
            renderer,
            retry_policy,
            robots: None,
            options,
        }
    }

    /// 翻页间隔取robots.txt的Crawl-delay与配置值中较大者
    pub fn with_robots(mut self, robots: Arc<dyn RobotsCheckerTrait>) -> Self {
        self.robots = Some(robots);
        self
    }

    /// 同一站点相邻两页之间的等待时间
    ///
    /// # 参数
    ///
    /// * `url` - 正在翻页的业务URL
    pub async fn page_delay(&self, url: &str) -> Duration {
        let configured = self.options.page_delay;
        let Some(ref robots) = self.robots else {
            return configured;
        };
        match robots.crawl_delay(url).await {
            Ok(Some(delay)) if delay > configured => {
                debug!("Honoring Crawl-delay of {:?} for {}", delay, url);
                delay
            }
            Ok(_) => configured,
            Err(e) => {
                debug!("No Crawl-delay for {}: {}", url, e);
                configured
            }
        }
    }

    /// 渲染页面，可重试的浏览器错误按重试策略重试
    ///
    /// # 参数
    ///
    /// * `request` - 渲染请求
    ///
    /// # 返回值
    ///
    /// * `Ok(RenderedPage)` - 渲染结果
    /// * `Err(PlatformError)` - 重试耗尽或不可重试的错误
    pub async fn fetch(&self, request: RenderRequest) -> Result<RenderedPage, PlatformError> {
        let operation = format!("render {}", request.url);
        self.retry_policy
            .run(&operation, PlatformError::is_retryable, || async {
                self.renderer.render(&request).await.map_err(PlatformError::from)
            })
            .await
    }

    /// 以配置的超时构造渲染请求
    pub fn request(&self, url: impl Into<String>) -> RenderRequest {
        RenderRequest::new(url, self.options.timeout)
    }
}

/// 对搜索词做URL编码
pub fn encode_query(text: &str) -> String {
    form_urlencoded::byte_serialize(text.as_bytes()).collect()
}

/// 需要抓取的页数
pub fn pages_needed(max_count: usize) -> usize {
    max_count.div_ceil(REVIEWS_PER_PAGE).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::traits::EngineError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyRenderer {
        calls: AtomicU32,
        fail_times: u32,
        error: EngineError,
    }

    #[async_trait]
    impl PageRenderer for FlakyRenderer {
        async fn render(&self, request: &RenderRequest) -> Result<RenderedPage, EngineError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                return Err(self.error.clone());
            }
            Ok(RenderedPage {
                url: request.url.clone(),
                html: "<html></html>".to_string(),
            })
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    fn fetcher(renderer: Arc<FlakyRenderer>) -> PageFetcher {
        PageFetcher::new(renderer, RetryPolicy::standard(), ClientOptions::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_retries_timeouts() {
        let renderer = Arc::new(FlakyRenderer {
            calls: AtomicU32::new(0),
            fail_times: 2,
            error: EngineError::Timeout(Duration::from_secs(30)),
        });
        let page = fetcher(renderer.clone())
            .fetch(RenderRequest::new("https://www.yelp.com/biz/x", Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(page.url, "https://www.yelp.com/biz/x");
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_does_not_retry_interaction_errors() {
        let renderer = Arc::new(FlakyRenderer {
            calls: AtomicU32::new(0),
            fail_times: 5,
            error: EngineError::Interaction("detached".into()),
        });
        let result = fetcher(renderer.clone())
            .fetch(RenderRequest::new("https://www.yelp.com/biz/x", Duration::from_secs(5)))
            .await;

        assert!(matches!(result, Err(PlatformError::Engine(EngineError::Interaction(_)))));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    }

    struct DelayRobots(Option<Duration>);

    #[async_trait]
    impl RobotsCheckerTrait for DelayRobots {
        async fn can_fetch(&self, _url: &str) -> anyhow::Result<bool> {
            Ok(true)
        }

        async fn crawl_delay(&self, _url: &str) -> anyhow::Result<Option<Duration>> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn test_page_delay_honors_longer_crawl_delay() {
        let renderer = Arc::new(FlakyRenderer {
            calls: AtomicU32::new(0),
            fail_times: 0,
            error: EngineError::Other("unused".into()),
        });
        let url = "https://www.yelp.com/biz/x";

        let plain = fetcher(renderer.clone());
        assert_eq!(plain.page_delay(url).await, Duration::from_secs(1));

        let slow = fetcher(renderer.clone()).with_robots(Arc::new(DelayRobots(Some(Duration::from_secs(4)))));
        assert_eq!(slow.page_delay(url).await, Duration::from_secs(4));

        // a shorter Crawl-delay never shortens the configured pause
        let fast = fetcher(renderer.clone()).with_robots(Arc::new(DelayRobots(Some(Duration::from_millis(200)))));
        assert_eq!(fast.page_delay(url).await, Duration::from_secs(1));

        let unset = fetcher(renderer).with_robots(Arc::new(DelayRobots(None)));
        assert_eq!(unset.page_delay(url).await, Duration::from_secs(1));
    }

    #[test]
    fn test_pages_needed() {
        assert_eq!(pages_needed(100), 10);
        assert_eq!(pages_needed(15), 2);
        assert_eq!(pages_needed(0), 1);
        assert_eq!(encode_query("Social House Orlando, FL"), "Social+House+Orlando%2C+FL");
    }
}
