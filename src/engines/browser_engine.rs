// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::{EngineError, PageAction, PageRenderer, RenderRequest, RenderedPage};
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OnceCell, Semaphore};
use tokio::time::Instant;
use tracing::{debug, info, warn};

// One Chrome process per program, pages are opened on demand.
static BROWSER_INSTANCE: OnceCell<Browser> = OnceCell::const_new();

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// 获取或初始化共享浏览器实例
///
/// 设置了 `CHROMIUM_REMOTE_DEBUGGING_URL` 时连接远程Chrome，否则本地启动
pub async fn get_browser(request_timeout: Duration) -> Result<&'static Browser, EngineError> {
    BROWSER_INSTANCE
        .get_or_try_init(|| async {
            let (browser, mut handler) =
                if let Ok(url) = std::env::var("CHROMIUM_REMOTE_DEBUGGING_URL") {
                    info!("Connecting to remote Chrome instance at: {}", url);
                    Browser::connect(url).await.map_err(|e| {
                        EngineError::BrowserUnavailable(format!(
                            "Failed to connect to remote Chrome: {}",
                            e
                        ))
                    })?
                } else {
                    let config = BrowserConfig::builder()
                        .no_sandbox()
                        .request_timeout(request_timeout)
                        .window_size(1920, 1080)
                        .arg("--disable-gpu")
                        .arg("--disable-dev-shm-usage")
                        .arg("--disable-blink-features=AutomationControlled")
                        .build()
                        .map_err(EngineError::BrowserUnavailable)?;
                    Browser::launch(config)
                        .await
                        .map_err(|e| EngineError::BrowserUnavailable(e.to_string()))?
                };

            tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            Ok(browser)
        })
        .await
}

/// 浏览器渲染引擎
///
/// 基于chromiumoxide，信号量限制同时打开的页面数
pub struct BrowserEngine {
    permits: Arc<Semaphore>,
    user_agent: String,
}

impl BrowserEngine {
    /// 创建浏览器引擎
    ///
    /// # 参数
    ///
    /// * `max_concurrent_pages` - 同时打开的页面上限
    /// * `user_agent` - 页面使用的User-Agent
    pub fn new(max_concurrent_pages: usize, user_agent: impl Into<String>) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent_pages.max(1))),
            user_agent: user_agent.into(),
        }
    }

    /// 当前空闲的页面配额
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    async fn drive(&self, page: &Page, request: &RenderRequest) -> Result<RenderedPage, EngineError> {
        page.set_user_agent(self.user_agent.as_str())
            .await
            .map_err(|e| EngineError::Interaction(e.to_string()))?;

        page.goto(request.url.as_str())
            .await
            .map_err(|e| EngineError::Navigation(e.to_string()))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| EngineError::Navigation(e.to_string()))?;

        if let Some(ref selector) = request.wait_for {
            if !wait_for_selector(page, selector, request.timeout / 2).await {
                // Markup may still be usable; parsers decide what is missing
                warn!("Selector {} did not appear on {}", selector, request.url);
            }
        }

        for action in &request.actions {
            match action {
                PageAction::Wait(duration) => tokio::time::sleep(*duration).await,
                PageAction::Click { selector } => match page.find_element(selector.as_str()).await {
                    Ok(element) => {
                        if let Err(e) = element.click().await {
                            debug!("Click on {} failed: {}", selector, e);
                        }
                    }
                    Err(_) => debug!("Click target {} not present, skipping", selector),
                },
                PageAction::Scroll {
                    container,
                    item_selector,
                    target_items,
                    max_attempts,
                    pause,
                } => {
                    scroll(
                        page,
                        container.as_deref(),
                        item_selector.as_deref(),
                        *target_items,
                        *max_attempts,
                        *pause,
                    )
                    .await?
                }
            }
        }

        let html = page
            .content()
            .await
            .map_err(|e| EngineError::Interaction(e.to_string()))?;
        let url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| request.url.clone());

        Ok(RenderedPage { url, html })
    }
}

#[async_trait]
impl PageRenderer for BrowserEngine {
    /// 打开新页面渲染目标URL
    ///
    /// # 参数
    ///
    /// * `request` - 渲染请求
    ///
    /// # 返回值
    ///
    /// * `Ok(RenderedPage)` - 渲染后的页面
    /// * `Err(EngineError)` - 启动、导航、交互失败或超时
    async fn render(&self, request: &RenderRequest) -> Result<RenderedPage, EngineError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| EngineError::Other(e.to_string()))?;

        let started = Instant::now();
        let browser = get_browser(request.timeout).await?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| EngineError::BrowserUnavailable(e.to_string()))?;

        let result = tokio::time::timeout(request.timeout, self.drive(&page, request))
            .await
            .map_err(|_| EngineError::Timeout(request.timeout))
            .and_then(|inner| inner);

        if let Err(e) = page.close().await {
            debug!("Failed to close page: {}", e);
        }

        debug!(
            "Rendered {} in {:?} (ok={})",
            request.url,
            started.elapsed(),
            result.is_ok()
        );
        result
    }

    fn name(&self) -> &'static str {
        "chromium"
    }
}

async fn wait_for_selector(page: &Page, selector: &str, max_wait: Duration) -> bool {
    let start = Instant::now();
    loop {
        if page.find_element(selector).await.is_ok() {
            debug!("{} appeared after {:?}", selector, start.elapsed());
            return true;
        }
        if start.elapsed() >= max_wait {
            return false;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

async fn eval_number(page: &Page, script: &str) -> Result<f64, EngineError> {
    page.evaluate(script)
        .await
        .map_err(|e| EngineError::Interaction(format!("Script failed: {}", e)))?
        .into_value::<f64>()
        .map_err(|e| EngineError::Interaction(format!("Unexpected script result: {}", e)))
}

async fn scroll(
    page: &Page,
    container: Option<&str>,
    item_selector: Option<&str>,
    target_items: usize,
    max_attempts: u32,
    pause: Duration,
) -> Result<(), EngineError> {
    let target = match container {
        Some(selector) => format!(
            "(document.querySelector({}) || document.scrollingElement || document.body)",
            js_string(selector)
        ),
        None => "(document.scrollingElement || document.body)".to_string(),
    };
    let scroll_script = format!(
        "(() => {{ const el = {}; el.scrollTo(0, el.scrollHeight); return el.scrollHeight; }})()",
        target
    );
    let count_script =
        item_selector.map(|s| format!("document.querySelectorAll({}).length", js_string(s)));

    let mut last_height = -1.0;
    let mut stalled = 0;
    for attempt in 1..=max_attempts {
        let height = eval_number(page, &scroll_script).await?;
        tokio::time::sleep(pause).await;

        if let Some(ref count_script) = count_script {
            let count = eval_number(page, count_script).await? as usize;
            if count >= target_items {
                debug!("Loaded {} items after {} scrolls", count, attempt);
                break;
            }
        }

        if (height - last_height).abs() < f64::EPSILON {
            stalled += 1;
            if stalled >= 2 {
                debug!("Page height stopped growing after {} scrolls", attempt);
                break;
            }
        } else {
            stalled = 0;
        }
        last_height = height;
    }
    Ok(())
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}
