// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::services::scraper_service::ScraperService;
use crate::queue::job_queue::JobQueue;
use crate::workers::job_worker::JobWorker;
use crate::workers::worker::Worker;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// 进程停止时写入被中断作业的失败原因
pub const SHUTDOWN_REASON: &str = "Interrupted by shutdown";

/// 工作管理器
pub struct WorkerManager {
    service: Arc<ScraperService>,
    queue: Arc<dyn JobQueue>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerManager {
    pub fn new(service: Arc<ScraperService>, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            service,
            queue,
            handles: Vec::new(),
        }
    }

    /// 启动工作进程
    ///
    /// # 参数
    ///
    /// * `count` - 要启动的工作进程数量，至少为1
    pub fn start_workers(&mut self, count: usize) {
        for index in 0..count.max(1) {
            let worker = JobWorker::new(
                format!("job-worker-{}", index),
                self.service.clone(),
                self.queue.clone(),
            );
            let handle = tokio::spawn(async move {
                if let Err(e) = worker.run().await {
                    error!("{} exited with error: {}", worker.name(), e);
                }
            });
            self.handles.push(handle);
        }
        info!("Started {} job workers", self.handles.len());
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// 关闭所有工作进程
    ///
    /// 正在执行的作业被中断，状态改为Failed并记录原因
    pub async fn shutdown(&mut self) {
        info!("Shutting down workers...");
        for handle in self.handles.drain(..) {
            handle.abort();
            // Cancelled tasks resolve with a JoinError
            let _ = handle.await;
        }

        match self.service.interrupt_running_jobs(SHUTDOWN_REASON).await {
            Ok(0) => {}
            Ok(count) => warn!("Marked {} in-flight jobs as failed", count),
            Err(e) => error!("Failed to mark in-flight jobs as failed: {}", e),
        }
        info!("Workers shut down successfully");
    }
}
