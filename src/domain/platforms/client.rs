// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::review::{BusinessInfo, Platform, Review};
use crate::engines::traits::EngineError;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum PlatformError {
    #[error("Browser error: {0}")]
    Engine(#[from] EngineError),
    #[error("Invalid platform URL: {0}")]
    InvalidUrl(String),
}

impl PlatformError {
    pub fn is_retryable(&self) -> bool {
        match self {
            PlatformError::Engine(e) => e.is_retryable(),
            PlatformError::InvalidUrl(_) => false,
        }
    }
}

/// 单个评论平台的抓取客户端
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// 所属平台
    fn platform(&self) -> Platform;

    /// Search for a business and return its page URL
    async fn search_business(
        &self,
        business_name: &str,
        location: &str,
    ) -> Result<Option<String>, PlatformError>;

    /// Collect up to `max_count` reviews from a business page
    async fn scrape_reviews(&self, url: &str, max_count: usize)
        -> Result<Vec<Review>, PlatformError>;

    /// Extract business metadata, `None` when no name is found
    async fn extract_business_info(&self, url: &str)
        -> Result<Option<BusinessInfo>, PlatformError>;
}
