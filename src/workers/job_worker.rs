// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::ScrapingJob;
use crate::domain::services::scraper_service::ScraperService;
use crate::queue::job_queue::JobQueue;
use crate::utils::errors::WorkerError;
use crate::workers::worker::Worker;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

/// 作业工作器
///
/// 从队列取出作业ID交给 `ScraperService::execute_job`，
/// 同一个作业只会被一个工作器取到
pub struct JobWorker {
    name: String,
    service: Arc<ScraperService>,
    queue: Arc<dyn JobQueue>,
}

impl JobWorker {
    pub fn new(name: impl Into<String>, service: Arc<ScraperService>, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            name: name.into(),
            service,
            queue,
        }
    }

    /// 处理下一个作业
    ///
    /// # 返回值
    ///
    /// * `Ok(ScrapingJob)` - 作业执行后的最终状态（可能为Failed）
    /// * `Err(WorkerError::QueueClosed)` - 队列已关闭且为空
    /// * `Err(WorkerError::ServiceError)` - 作业无法执行
    pub async fn process_next(&self) -> Result<ScrapingJob, WorkerError> {
        let job_id = self.queue.dequeue().await.ok_or(WorkerError::QueueClosed)?;
        let job = self.service.execute_job(job_id).await?;
        Ok(job)
    }
}

#[async_trait]
impl Worker for JobWorker {
    async fn run(&self) -> Result<(), WorkerError> {
        info!("{} started", self.name);
        loop {
            match self.process_next().await {
                Ok(job) => info!("{} finished job {} ({})", self.name, job.id, job.status),
                Err(WorkerError::QueueClosed) => {
                    info!("{} stopping, queue closed", self.name);
                    return Ok(());
                }
                Err(e) => error!("{} could not execute job: {}", self.name, e),
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
