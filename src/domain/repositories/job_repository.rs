// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{JobStatus, ScrapingJob};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 存储后端错误
    #[error("Storage error: {0}")]
    Storage(String),
    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// 记录未找到
    #[error("Record not found: {0}")]
    NotFound(String),
}

/// 作业仓库特质
///
/// 作业存储的唯一入口，抓取服务通过它读写作业状态
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// 保存新作业
    async fn create(&self, job: &ScrapingJob) -> Result<ScrapingJob, RepositoryError>;
    /// 根据ID查找作业
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ScrapingJob>, RepositoryError>;
    /// 条件更新：仅当存储中的状态属于 `expected` 时写入
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(ScrapingJob))` - 已写入
    /// * `Ok(None)` - 状态已被其他调用方改变，未写入
    /// * `Err(RepositoryError::NotFound)` - 作业不存在
    async fn update_if(
        &self,
        job: &ScrapingJob,
        expected: &[JobStatus],
    ) -> Result<Option<ScrapingJob>, RepositoryError>;
    /// 删除不晚于 `cutoff` 结束的终态作业，返回删除数量
    async fn purge_finished_before(&self, cutoff: DateTime<Utc>) -> Result<usize, RepositoryError>;
    /// 所有处于 `status` 状态的作业ID
    async fn ids_with_status(&self, status: JobStatus) -> Result<Vec<Uuid>, RepositoryError>;
}
