// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use axum_test::TestServer;
use reviewrs::config::settings::Settings;
use reviewrs::domain::services::rate_limiting_service::RateLimitConfig;
use reviewrs::domain::services::scraper_service::ScraperService;
use reviewrs::engines::traits::{EngineError, PageRenderer, RenderRequest, RenderedPage};
use reviewrs::infrastructure::cache::result_cache::ResultCache;
use reviewrs::infrastructure::platforms::base::ClientOptions;
use reviewrs::infrastructure::platforms::factory::PlatformRegistry;
use reviewrs::infrastructure::repositories::job_repo_impl::JobRepositoryImpl;
use reviewrs::infrastructure::services::rate_limiting_service_impl::SlidingWindowRateLimiter;
use reviewrs::infrastructure::services::webhook_service_impl::WebhookServiceImpl;
use reviewrs::presentation::middleware::rate_limit_middleware::ApiRateLimiter;
use reviewrs::presentation::routes;
use reviewrs::queue::job_queue::InMemoryJobQueue;
use reviewrs::utils::retry_policy::RetryPolicy;
use reviewrs::utils::robots::RobotsCheckerTrait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const YELP_BIZ_URL: &str = "https://www.yelp.com/biz/social-house-orlando";
pub const YELP_SEARCH_URL: &str =
    "https://www.yelp.com/search?find_desc=Social+House&find_loc=Orlando%2C+FL";
pub const TRIPADVISOR_URL: &str =
    "https://www.tripadvisor.com/Restaurant_Review-g34515-d1234567-Reviews-Social_House-Orlando_Florida.html";

pub const YELP_SEARCH_HTML: &str = r#"
<main>
  <ul>
    <li><h3><a href="/adredir?ad_business_id=xyz">Sponsored Sushi</a></h3></li>
    <li><h3><a href="/biz/social-house-orlando?osq=Social+House">Social House</a></h3></li>
  </ul>
</main>"#;

pub const YELP_BIZ_HTML: &str = r##"
<main>
  <h1>Social House</h1>
  <address>7575 Dr Phillips Blvd Orlando, FL 32819</address>
  <p data-testid="phone">(407) 370-0700</p>
  <div data-testid="BizHeaderReviewCount">
    <div role="img" aria-label="4.3 star rating"></div>
    <a href="#reviews">1,842 reviews</a>
  </div>
  <span data-testid="BizHeaderCategory"><a href="/search?cflt=japanese">Japanese</a></span>
  <section id="reviews"><ul>
    <li>
      <a href="/user_details?userid=1">Alice K.</a>
      <div role="img" aria-label="5 star rating"></div>
      <span class="css-chan6m">Oct 3, 2024</span>
      <p class="comment__09f24__D0cxf"><span>Loved the ramen. Email me at alice@example.com</span></p>
      <div class="businessResponse__x"><p>Thank you Alice!</p></div>
    </li>
    <li>
      <a href="/user_details?userid=2">Bob</a>
      <div role="img" aria-label="2 star rating"></div>
      <span class="css-chan6m">Sep 1, 2024</span>
      <p class="comment__09f24__D0cxf"><span>Slow service.</span></p>
    </li>
  </ul></section>
</main>"##;

/// 按URL返回固定HTML的渲染器，未登记的URL返回空页面
#[derive(Default)]
pub struct FixtureRenderer {
    pages: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
}

impl FixtureRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageRenderer for FixtureRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<RenderedPage, EngineError> {
        self.requested.lock().unwrap().push(request.url.clone());
        let html = self
            .pages
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| "<html><body></body></html>".to_string());
        Ok(RenderedPage {
            url: request.url.clone(),
            html,
        })
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

pub struct StaticRobots(pub bool);

#[async_trait]
impl RobotsCheckerTrait for StaticRobots {
    async fn can_fetch(&self, _url: &str) -> anyhow::Result<bool> {
        Ok(self.0)
    }

    async fn crawl_delay(&self, _url: &str) -> anyhow::Result<Option<Duration>> {
        Ok(None)
    }
}

pub fn yelp_renderer() -> Arc<FixtureRenderer> {
    Arc::new(
        FixtureRenderer::new()
            .page(YELP_SEARCH_URL, YELP_SEARCH_HTML)
            .page(YELP_BIZ_URL, YELP_BIZ_HTML),
    )
}

pub fn fast_options() -> ClientOptions {
    ClientOptions {
        timeout: Duration::from_secs(5),
        max_scroll_attempts: 1,
        scroll_pause: Duration::ZERO,
        page_delay: Duration::ZERO,
    }
}

pub fn registry(renderer: Arc<FixtureRenderer>) -> PlatformRegistry {
    PlatformRegistry::with_renderer(renderer, RetryPolicy::none(), fast_options())
}

fn base_service(renderer: Arc<FixtureRenderer>, robots_allow: bool, per_minute: u32) -> ScraperService {
    ScraperService::new(
        Arc::new(JobRepositoryImpl::new(None)),
        Arc::new(SlidingWindowRateLimiter::new(
            RateLimitConfig::per_minute(per_minute),
            None,
        )),
        Arc::new(StaticRobots(robots_allow)),
        Arc::new(ResultCache::new(Duration::from_secs(3600), None)),
        registry(renderer),
    )
}

/// 以固定HTML渲染器构建服务
pub fn build_service(
    renderer: Arc<FixtureRenderer>,
    robots_allow: bool,
    per_minute: u32,
) -> (Arc<ScraperService>, Arc<InMemoryJobQueue>) {
    let queue = Arc::new(InMemoryJobQueue::new(64));
    let service = base_service(renderer, robots_allow, per_minute).with_queue(queue.clone());
    (Arc::new(service), queue)
}

/// 同 `build_service`，作业结束时发送签名回调
#[allow(dead_code)]
pub fn build_service_with_webhooks(
    renderer: Arc<FixtureRenderer>,
    secret: &str,
) -> (Arc<ScraperService>, Arc<InMemoryJobQueue>) {
    let queue = Arc::new(InMemoryJobQueue::new(64));
    let webhooks = WebhookServiceImpl::new(secret.to_string()).with_retry_policy(RetryPolicy::none());
    let service = base_service(renderer, true, 100)
        .with_queue(queue.clone())
        .with_webhooks(Arc::new(webhooks));
    (Arc::new(service), queue)
}

#[allow(dead_code)]
pub struct TestApp {
    pub server: TestServer,
    pub service: Arc<ScraperService>,
    pub queue: Arc<InMemoryJobQueue>,
    pub settings: Arc<Settings>,
}

pub fn create_test_app(renderer: Arc<FixtureRenderer>) -> TestApp {
    let (service, queue) = build_service(renderer, true, 100);
    let settings = Arc::new(Settings::new().expect("default settings"));
    let app = routes::app(
        service.clone(),
        settings.clone(),
        ApiRateLimiter::new(1000, 1000),
    );

    TestApp {
        server: TestServer::new(app).unwrap(),
        service,
        queue,
        settings,
    }
}
