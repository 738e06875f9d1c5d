// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

use crate::domain::models::job::DomainError;
use crate::domain::repositories::job_repository::RepositoryError;

/// 抓取服务错误类型
///
/// 覆盖编排层所有对外可见的失败情况，表示层据此映射HTTP状态码或MCP错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScraperError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Rate limit exceeded for {0}")]
    RateLimitExceeded(String),

    #[error("Scraping not allowed by robots.txt for {0}")]
    RobotsDisallowed(String),

    #[error("Could not find business: {0}")]
    BusinessNotFound(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Invalid job state: {0}")]
    InvalidJobState(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Scraping failed: {0}")]
    Scraping(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScraperError {
    /// 是否属于调用方输入错误（400类）
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ScraperError::InvalidUrl(_)
                | ScraperError::UnsupportedPlatform(_)
                | ScraperError::InvalidRequest(_)
        )
    }
}

impl From<RepositoryError> for ScraperError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => ScraperError::JobNotFound(id),
            other => ScraperError::Internal(other.to_string()),
        }
    }
}

impl From<DomainError> for ScraperError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidStateTransition { .. } => {
                ScraperError::InvalidJobState(err.to_string())
            }
            DomainError::ValidationError(msg) => ScraperError::InvalidRequest(msg),
        }
    }
}

/// Worker错误类型
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("队列已关闭")]
    QueueClosed,

    #[error("服务错误: {0}")]
    ServiceError(#[from] ScraperError),
}
