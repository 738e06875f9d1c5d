// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::review::{Platform, Review};

/// 单个作业允许的最大页数
pub const MAX_PAGES_LIMIT: u32 = 20;

/// 默认页数
pub const DEFAULT_MAX_PAGES: u32 = 5;

/// 抓取作业实体
///
/// 一个作业要么直接指定目标URL，要么给出商家名称、地点和平台，
/// 由搜索步骤解析出URL后再抓取。作业进入终态后不再变化。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingJob {
    /// 作业唯一标识符
    pub id: Uuid,
    /// 当前状态
    pub status: JobStatus,
    /// 目标URL，搜索型作业在解析成功后填充
    pub url: Option<String>,
    /// 商家名称
    pub business_name: Option<String>,
    /// 商家所在地
    pub location: Option<String>,
    /// 平台
    pub platform: Option<Platform>,
    /// 最多抓取的页数
    pub max_pages: u32,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 完成时间（成功、失败或取消）
    pub completed_at: Option<DateTime<Utc>>,
    /// 抓取结果
    #[serde(default)]
    pub results: Vec<Review>,
    /// 失败原因
    pub error: Option<String>,
    /// 作业结束时通知的回调地址
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

/// 作业状态
///
/// 状态转换：Pending → Running → Completed/Failed，
/// Pending/Running 可转为 Cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            _ => Err(()),
        }
    }
}

/// 领域错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// 无效的状态转换
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: JobStatus, to: JobStatus },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// 作业目标
#[derive(Debug, Clone, PartialEq)]
pub enum JobTarget {
    /// 直接抓取URL
    Url(String),
    /// 先搜索商家再抓取
    Search {
        business_name: String,
        location: String,
        platform: Platform,
    },
}

impl ScrapingJob {
    /// 创建一个处于 Pending 状态的新作业
    ///
    /// # 参数
    ///
    /// * `target` - 作业目标
    /// * `max_pages` - 最大页数，必须在 1..=20 之间
    ///
    /// # 返回值
    ///
    /// * `Ok(ScrapingJob)` - 新作业
    /// * `Err(DomainError)` - 页数越界
    pub fn new(target: JobTarget, max_pages: u32) -> Result<Self, DomainError> {
        if !(1..=MAX_PAGES_LIMIT).contains(&max_pages) {
            return Err(DomainError::ValidationError(format!(
                "max_pages must be between 1 and {}, got {}",
                MAX_PAGES_LIMIT, max_pages
            )));
        }

        let (url, business_name, location, platform) = match target {
            JobTarget::Url(url) => (Some(url), None, None, None),
            JobTarget::Search {
                business_name,
                location,
                platform,
            } => (None, Some(business_name), Some(location), Some(platform)),
        };

        Ok(Self {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            url,
            business_name,
            location,
            platform,
            max_pages,
            created_at: Utc::now(),
            completed_at: None,
            results: Vec::new(),
            error: None,
            webhook_url: None,
        })
    }

    /// 设置作业结束时的回调地址
    pub fn with_webhook_url(mut self, webhook_url: Option<String>) -> Self {
        self.webhook_url = webhook_url;
        self
    }

    /// 还原作业目标
    ///
    /// 带有商家信息的作业始终走搜索流程，即便搜索后已填充URL
    pub fn target(&self) -> Option<JobTarget> {
        match (&self.business_name, &self.location, self.platform) {
            (Some(name), Some(location), Some(platform)) => Some(JobTarget::Search {
                business_name: name.clone(),
                location: location.clone(),
                platform,
            }),
            _ => self.url.clone().map(JobTarget::Url),
        }
    }

    /// 开始执行：Pending → Running
    pub fn start(mut self) -> Result<Self, DomainError> {
        match self.status {
            JobStatus::Pending => {
                self.status = JobStatus::Running;
                Ok(self)
            }
            from => Err(DomainError::InvalidStateTransition {
                from,
                to: JobStatus::Running,
            }),
        }
    }

    /// 成功完成：Running → Completed
    pub fn complete(mut self, results: Vec<Review>) -> Result<Self, DomainError> {
        match self.status {
            JobStatus::Running => {
                self.status = JobStatus::Completed;
                self.results = results;
                self.completed_at = Some(Utc::now());
                Ok(self)
            }
            from => Err(DomainError::InvalidStateTransition {
                from,
                to: JobStatus::Completed,
            }),
        }
    }

    /// 标记失败：Pending/Running → Failed
    pub fn fail(mut self, error: impl Into<String>) -> Result<Self, DomainError> {
        match self.status {
            JobStatus::Pending | JobStatus::Running => {
                self.status = JobStatus::Failed;
                self.error = Some(error.into());
                self.completed_at = Some(Utc::now());
                Ok(self)
            }
            from => Err(DomainError::InvalidStateTransition {
                from,
                to: JobStatus::Failed,
            }),
        }
    }

    /// 取消：Pending/Running → Cancelled
    pub fn cancel(mut self) -> Result<Self, DomainError> {
        if self.can_cancel() {
            self.status = JobStatus::Cancelled;
            self.completed_at = Some(Utc::now());
            Ok(self)
        } else {
            Err(DomainError::InvalidStateTransition {
                from: self.status,
                to: JobStatus::Cancelled,
            })
        }
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self.status, JobStatus::Pending | JobStatus::Running)
    }
}
