// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{JobStatus, ScrapingJob};
use crate::domain::repositories::job_repository::{JobRepository, RepositoryError};
use crate::infrastructure::cache::redis_client::RedisClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Redis中作业记录的保留时间（秒）
pub const JOB_TTL_SECONDS: u64 = 86400;

/// 作业仓库实现
///
/// 以内存表为准，配置Redis时把每次写入镜像为 `job:{id}`。
/// 内存未命中时从Redis回填，便于重启后查询仍在有效期内的作业。
/// 状态转换通过 `update_if` 在条目锁内完成比较和写入。
#[derive(Clone)]
pub struct JobRepositoryImpl {
    jobs: Arc<DashMap<Uuid, ScrapingJob>>,
    redis: Option<Arc<RedisClient>>,
}

impl JobRepositoryImpl {
    /// 创建新的作业仓库实例
    ///
    /// # 参数
    ///
    /// * `redis` - 可选的Redis镜像
    pub fn new(redis: Option<Arc<RedisClient>>) -> Self {
        Self {
            jobs: Arc::new(DashMap::new()),
            redis,
        }
    }

    fn redis_key(id: Uuid) -> String {
        format!("job:{}", id)
    }

    async fn mirror(&self, job: &ScrapingJob) -> Result<(), RepositoryError> {
        let Some(ref redis) = self.redis else {
            return Ok(());
        };
        let raw = serde_json::to_string(job)?;
        if let Err(e) = redis
            .set(&Self::redis_key(job.id), &raw, JOB_TTL_SECONDS)
            .await
        {
            warn!("Failed to mirror job {} to Redis: {}", job.id, e);
        }
        Ok(())
    }

    /// 内存中的作业数
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[async_trait]
impl JobRepository for JobRepositoryImpl {
    async fn create(&self, job: &ScrapingJob) -> Result<ScrapingJob, RepositoryError> {
        self.jobs.insert(job.id, job.clone());
        self.mirror(job).await?;
        Ok(job.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ScrapingJob>, RepositoryError> {
        if let Some(job) = self.jobs.get(&id) {
            return Ok(Some(job.clone()));
        }

        let Some(ref redis) = self.redis else {
            return Ok(None);
        };
        match redis.get(&Self::redis_key(id)).await {
            Ok(Some(raw)) => {
                let job: ScrapingJob = serde_json::from_str(&raw)?;
                self.jobs.insert(id, job.clone());
                Ok(Some(job))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                warn!("Failed to load job {} from Redis: {}", id, e);
                Ok(None)
            }
        }
    }

    async fn update_if(
        &self,
        job: &ScrapingJob,
        expected: &[JobStatus],
    ) -> Result<Option<ScrapingJob>, RepositoryError> {
        // Backfill from Redis so the guard below sees the stored job
        if self.find_by_id(job.id).await?.is_none() {
            return Err(RepositoryError::NotFound(job.id.to_string()));
        }

        let applied = match self.jobs.get_mut(&job.id) {
            Some(mut current) if expected.contains(&current.status) => {
                *current = job.clone();
                true
            }
            Some(_) => false,
            None => return Err(RepositoryError::NotFound(job.id.to_string())),
        };

        if !applied {
            return Ok(None);
        }
        self.mirror(job).await?;
        Ok(Some(job.clone()))
    }

    async fn purge_finished_before(&self, cutoff: DateTime<Utc>) -> Result<usize, RepositoryError> {
        let before = self.jobs.len();
        self.jobs.retain(|_, job| {
            !(job.status.is_terminal() && job.completed_at.map_or(false, |at| at <= cutoff))
        });
        Ok(before.saturating_sub(self.jobs.len()))
    }

    async fn ids_with_status(&self, status: JobStatus) -> Result<Vec<Uuid>, RepositoryError> {
        Ok(self
            .jobs
            .iter()
            .filter(|entry| entry.status == status)
            .map(|entry| *entry.key())
            .collect())
    }
}
