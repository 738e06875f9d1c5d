// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::job_repository::JobRepository;
use crate::infrastructure::cache::result_cache::ResultCache;
use crate::infrastructure::repositories::job_repo_impl::JOB_TTL_SECONDS;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// 默认清理间隔
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// 过期清理工作器
///
/// 定期淘汰过期的缓存条目，并从内存中移除结束超过保留时间的作业
pub struct ExpirationWorker {
    cache: Arc<ResultCache>,
    jobs: Arc<dyn JobRepository>,
    interval: Duration,
    job_ttl: Duration,
}

impl ExpirationWorker {
    pub fn new(cache: Arc<ResultCache>, jobs: Arc<dyn JobRepository>) -> Self {
        Self {
            cache,
            jobs,
            interval: DEFAULT_SWEEP_INTERVAL,
            job_ttl: Duration::from_secs(JOB_TTL_SECONDS),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_job_ttl(mut self, job_ttl: Duration) -> Self {
        self.job_ttl = job_ttl;
        self
    }

    /// 运行工作器
    pub async fn run(&self) {
        info!("Expiration worker started, sweeping every {:?}", self.interval);

        let mut interval = tokio::time::interval(self.interval);
        // The first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            self.sweep_once().await;
        }
    }

    /// 启动后台运行
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// 执行一次清理
    ///
    /// # 返回值
    ///
    /// (淘汰的缓存条目数, 移除的作业数)
    pub async fn sweep_once(&self) -> (usize, usize) {
        let entries = self.cache.sweep();

        let jobs = match chrono::Duration::from_std(self.job_ttl) {
            Ok(ttl) => match self.jobs.purge_finished_before(chrono::Utc::now() - ttl).await {
                Ok(count) => count,
                Err(e) => {
                    error!("Failed to purge finished jobs: {}", e);
                    0
                }
            },
            Err(e) => {
                error!("Invalid job TTL {:?}: {}", self.job_ttl, e);
                0
            }
        };

        if entries > 0 || jobs > 0 {
            info!("Expired {} cache entries and {} finished jobs", entries, jobs);
        }
        (entries, jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::job::{JobStatus, JobTarget, ScrapingJob};
    use crate::infrastructure::repositories::job_repo_impl::JobRepositoryImpl;
    use serde_json::json;

    fn job() -> ScrapingJob {
        ScrapingJob::new(
            JobTarget::Url("https://www.yelp.com/biz/social-house-orlando".to_string()),
            1,
        )
        .unwrap()
    }

    async fn finished_job(repo: &JobRepositoryImpl) -> ScrapingJob {
        let created = repo.create(&job()).await.unwrap();
        let failed = created.fail("boom").unwrap();
        repo.update_if(&failed, &[JobStatus::Pending]).await.unwrap().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeps_cache_on_interval() {
        let cache = Arc::new(ResultCache::new(Duration::from_secs(60), None));
        let repo = Arc::new(JobRepositoryImpl::new(None));
        cache.set("stale", json!(["review"])).await;

        let handle = ExpirationWorker::new(cache.clone(), repo.clone())
            .with_interval(Duration::from_secs(300))
            .start();
        // Let the worker start its interval at t=0
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_secs(61)).await;
        cache.set("fresh", json!(["review"])).await;
        assert_eq!(cache.len(), 2);

        // The tick at 300s evicts both entries
        tokio::time::sleep(Duration::from_secs(240)).await;
        assert_eq!(cache.len(), 0);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_once_keeps_live_entries_and_active_jobs() {
        let cache = Arc::new(ResultCache::new(Duration::from_secs(60), None));
        let repo = Arc::new(JobRepositoryImpl::new(None));
        cache.set("old", json!([])).await;
        tokio::time::advance(Duration::from_secs(45)).await;
        cache.set("new", json!([])).await;
        tokio::time::advance(Duration::from_secs(30)).await;

        let pending = repo.create(&job()).await.unwrap();
        let finished = finished_job(&repo).await;

        let worker = ExpirationWorker::new(cache.clone(), repo.clone()).with_job_ttl(Duration::ZERO);
        assert_eq!(worker.sweep_once().await, (1, 1));

        assert_eq!(cache.len(), 1);
        assert!(cache.get("new").await.is_some());
        assert!(repo.find_by_id(pending.id).await.unwrap().is_some());
        assert!(repo.find_by_id(finished.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recent_jobs_survive_default_ttl() {
        let cache = Arc::new(ResultCache::new(Duration::from_secs(60), None));
        let repo = Arc::new(JobRepositoryImpl::new(None));
        let finished = finished_job(&repo).await;

        let worker = ExpirationWorker::new(cache, repo.clone());
        assert_eq!(worker.sweep_once().await, (0, 0));
        assert!(repo.find_by_id(finished.id).await.unwrap().is_some());
    }
}
