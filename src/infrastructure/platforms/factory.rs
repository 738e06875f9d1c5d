// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::review::Platform;
use crate::domain::platforms::client::PlatformClient;
use crate::engines::traits::PageRenderer;
use crate::infrastructure::platforms::base::{ClientOptions, PageFetcher};
use crate::infrastructure::platforms::google::GoogleMapsClient;
use crate::infrastructure::platforms::tripadvisor::TripAdvisorClient;
use crate::infrastructure::platforms::yelp::YelpClient;
use crate::utils::retry_policy::RetryPolicy;
use std::collections::HashMap;
use std::sync::Arc;

/// 平台客户端注册表
#[derive(Clone, Default)]
pub struct PlatformRegistry {
    clients: HashMap<Platform, Arc<dyn PlatformClient>>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用同一个渲染器创建三个平台的客户端
    ///
    /// # 参数
    ///
    /// * `renderer` - 页面渲染器
    /// * `retry_policy` - 渲染失败时的重试策略
    /// * `options` - 超时、滚动等选项
    pub fn with_renderer(
        renderer: Arc<dyn PageRenderer>,
        retry_policy: RetryPolicy,
        options: ClientOptions,
    ) -> Self {
        Self::with_fetcher(PageFetcher::new(renderer, retry_policy, options))
    }

    /// 用同一个页面获取器创建三个平台的客户端
    pub fn with_fetcher(fetcher: PageFetcher) -> Self {
        Self::new()
            .register(Arc::new(GoogleMapsClient::new(fetcher.clone())))
            .register(Arc::new(YelpClient::new(fetcher.clone())))
            .register(Arc::new(TripAdvisorClient::new(fetcher)))
    }

    /// 注册客户端，同平台的旧客户端被替换
    pub fn register(mut self, client: Arc<dyn PlatformClient>) -> Self {
        self.clients.insert(client.platform(), client);
        self
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn PlatformClient>> {
        self.clients.get(&platform).cloned()
    }

    pub fn platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .iter()
            .copied()
            .filter(|p| self.clients.contains_key(p))
            .collect()
    }
}
