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

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// 引擎错误类型
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// 浏览器无法启动或连接
    #[error("Browser unavailable: {0}")]
    BrowserUnavailable(String),
    /// 页面导航失败
    #[error("Navigation failed: {0}")]
    Navigation(String),
    /// 页面交互失败
    #[error("Page interaction failed: {0}")]
    Interaction(String),
    /// 超时
    #[error("Timeout after {0:?}")]
    Timeout(Duration),
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

impl EngineError {
    /// 判断错误是否可重试
    ///
    /// # 返回值
    ///
    /// 超时、导航失败和浏览器暂不可用返回true
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Timeout(_) | EngineError::Navigation(_) | EngineError::BrowserUnavailable(_)
        )
    }
}

/// 页面加载后的交互动作
#[derive(Debug, Clone, PartialEq)]
pub enum PageAction {
    /// 等待固定时间
    Wait(Duration),
    /// 点击第一个匹配的元素，元素不存在时跳过
    Click { selector: String },
    /// 反复滚动容器（为空时滚动整个窗口）以触发懒加载
    ///
    /// 达到 `max_attempts` 次，或页面高度连续不再增长，或匹配
    /// `item_selector` 的元素数达到 `target_items` 时停止
    Scroll {
        container: Option<String>,
        item_selector: Option<String>,
        target_items: usize,
        max_attempts: u32,
        pause: Duration,
    },
}

/// 渲染请求
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// 目标URL
    pub url: String,
    /// 加载后等待出现的选择器
    pub wait_for: Option<String>,
    /// 交互动作，按顺序执行
    pub actions: Vec<PageAction>,
    /// 整个渲染过程的超时
    pub timeout: Duration,
}

impl RenderRequest {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            wait_for: None,
            actions: Vec::new(),
            timeout,
        }
    }

    pub fn wait_for(mut self, selector: impl Into<String>) -> Self {
        self.wait_for = Some(selector.into());
        self
    }

    pub fn action(mut self, action: PageAction) -> Self {
        self.actions.push(action);
        self
    }
}

/// 渲染结果
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 最终URL（跟随跳转后）
    pub url: String,
    /// 渲染后的HTML
    pub html: String,
}

/// 页面渲染器特质
///
/// 平台客户端只依赖该接口，测试中以固定HTML替代真实浏览器
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// 打开页面、执行动作并返回渲染后的HTML
    async fn render(&self, request: &RenderRequest) -> Result<RenderedPage, EngineError>;

    /// 渲染器名称
    fn name(&self) -> &'static str;
}
