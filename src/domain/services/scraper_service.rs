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

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::domain::models::job::{JobStatus, JobTarget, ScrapingJob, DEFAULT_MAX_PAGES, MAX_PAGES_LIMIT};
use crate::domain::models::review::{BusinessInfo, Platform, Review};
use crate::domain::models::webhook::WebhookEvent;
use crate::domain::platforms::client::PlatformClient;
use crate::domain::repositories::job_repository::JobRepository;
use crate::domain::services::deduplicator::deduplicate_reviews;
use crate::domain::services::rate_limiting_service::RateLimitingService;
use crate::domain::services::webhook_service::WebhookService;
use crate::infrastructure::cache::result_cache::ResultCache;
use crate::infrastructure::observability::metrics;
use crate::infrastructure::platforms::factory::PlatformRegistry;
use crate::queue::job_queue::JobQueue;
use crate::utils::errors::ScraperError;
use crate::utils::robots::RobotsCheckerTrait;
use crate::utils::security::validate_platform;

/// 每页对应的评论数上限
pub const REVIEWS_PER_PAGE_BUDGET: usize = 20;

/// 作业提交参数
///
/// 要么只给 `url`，要么同时给出 `business_name`、`location` 和 `platform`
#[derive(Debug, Clone, Default)]
pub struct JobRequest {
    pub url: Option<String>,
    pub business_name: Option<String>,
    pub location: Option<String>,
    pub platform: Option<String>,
    pub max_pages: Option<u32>,
    pub webhook_url: Option<String>,
}

/// 抓取编排服务
///
/// 作业生命周期和抓取流水线的唯一入口：缓存、限流、robots.txt、
/// 平台客户端、去重都在这里串起来。HTTP、MCP和worker共享同一个实例。
/// 作业状态只通过仓库的条件更新转换，并发的取消与完成不会互相覆盖。
pub struct ScraperService {
    jobs: Arc<dyn JobRepository>,
    rate_limiter: Arc<dyn RateLimitingService>,
    robots: Arc<dyn RobotsCheckerTrait>,
    cache: Arc<ResultCache>,
    platforms: PlatformRegistry,
    queue: Option<Arc<dyn JobQueue>>,
    webhooks: Option<Arc<dyn WebhookService>>,
}

impl ScraperService {
    /// 创建抓取服务
    ///
    /// # 参数
    ///
    /// * `jobs` - 作业仓库
    /// * `rate_limiter` - 按域名的限流器
    /// * `robots` - robots.txt检查器
    /// * `cache` - 结果缓存
    /// * `platforms` - 平台客户端注册表
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        rate_limiter: Arc<dyn RateLimitingService>,
        robots: Arc<dyn RobotsCheckerTrait>,
        cache: Arc<ResultCache>,
        platforms: PlatformRegistry,
    ) -> Self {
        Self {
            jobs,
            rate_limiter,
            robots,
            cache,
            platforms,
            queue: None,
            webhooks: None,
        }
    }

    /// 挂载后台作业队列
    pub fn with_queue(mut self, queue: Arc<dyn JobQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// 挂载作业结束回调
    pub fn with_webhooks(mut self, webhooks: Arc<dyn WebhookService>) -> Self {
        self.webhooks = Some(webhooks);
        self
    }

    /// 已注册的平台
    pub fn platforms(&self) -> Vec<Platform> {
        self.platforms.platforms()
    }

    /// 评论抓取结果的缓存键
    pub fn scrape_cache_key(url: &str, max_pages: u32) -> String {
        ResultCache::generate_key([("url", url.to_string()), ("max_pages", max_pages.to_string())])
    }

    /// 商家信息的缓存键，与评论抓取使用不同的命名空间
    pub fn business_info_cache_key(url: &str) -> String {
        ResultCache::generate_key([("url", url), ("action", "business_info")])
    }

    /// 创建作业
    ///
    /// # 参数
    ///
    /// * `request` - 作业参数
    ///
    /// # 返回值
    ///
    /// * `Ok(ScrapingJob)` - 已持久化的Pending作业
    /// * `Err(ScraperError)` - 参数组合无效、URL无效、平台不支持或页数越界
    pub async fn create_job(&self, request: JobRequest) -> Result<ScrapingJob, ScraperError> {
        let target = match (
            request.url,
            request.business_name,
            request.location,
            request.platform,
        ) {
            (Some(url), None, None, None) => {
                parse_target_url(&url)?;
                JobTarget::Url(url)
            }
            (None, Some(business_name), Some(location), Some(platform)) => JobTarget::Search {
                business_name,
                location,
                platform: validate_platform(&platform)?,
            },
            _ => {
                return Err(ScraperError::InvalidRequest(
                    "Provide either url, or business_name, location and platform".to_string(),
                ))
            }
        };

        if let Some(webhook_url) = &request.webhook_url {
            parse_webhook_url(webhook_url)?;
        }

        let job = ScrapingJob::new(target, request.max_pages.unwrap_or(DEFAULT_MAX_PAGES))?
            .with_webhook_url(request.webhook_url);
        let job = self.jobs.create(&job).await?;
        info!("Created scraping job {}", job.id);
        Ok(job)
    }

    /// 创建作业并放入后台队列
    ///
    /// 入队失败时作业标记为失败并返回内部错误
    pub async fn submit_job(&self, request: JobRequest) -> Result<ScrapingJob, ScraperError> {
        let job = self.create_job(request).await?;

        let Some(queue) = &self.queue else {
            let job = job.fail("No job queue configured")?;
            self.jobs.update_if(&job, &[JobStatus::Pending]).await?;
            return Err(ScraperError::Internal("No job queue configured".to_string()));
        };

        if let Err(e) = queue.enqueue(job.id).await {
            let job = job.fail(e.to_string())?;
            self.jobs.update_if(&job, &[JobStatus::Pending]).await?;
            return Err(ScraperError::Internal(e.to_string()));
        }

        debug!("Queued job {}", job.id);
        Ok(job)
    }

    /// 抓取单个URL的评论
    ///
    /// 缓存命中时直接返回；否则依次检查限流和robots.txt，记录一次请求，
    /// 交给平台客户端抓取，去重后写入缓存
    ///
    /// # 参数
    ///
    /// * `url` - 商家页URL
    /// * `max_pages` - 最大页数，每页最多20条评论
    ///
    /// # 返回值
    ///
    /// * `Ok(Vec<Review>)` - 去重后的评论
    /// * `Err(ScraperError)` - 校验、限流、robots或抓取失败
    #[instrument(skip(self))]
    pub async fn scrape_reviews(&self, url: &str, max_pages: u32) -> Result<Vec<Review>, ScraperError> {
        let parsed = parse_target_url(url)?;
        if !(1..=MAX_PAGES_LIMIT).contains(&max_pages) {
            return Err(ScraperError::InvalidRequest(format!(
                "max_pages must be between 1 and {}",
                MAX_PAGES_LIMIT
            )));
        }

        let cache_key = Self::scrape_cache_key(url, max_pages);
        if let Some(cached) = self.cache.get_as::<Vec<Review>>(&cache_key).await {
            metrics::record_cache(true);
            debug!("Cache hit for {} ({} reviews)", url, cached.len());
            return Ok(cached);
        }
        metrics::record_cache(false);

        self.preflight(url, &parsed).await?;
        let client = self.client_for(&parsed)?;
        let platform = client.platform();

        metrics::record_request(platform.as_str());
        let started = Instant::now();
        let max_count = max_pages as usize * REVIEWS_PER_PAGE_BUDGET;

        let reviews = match client.scrape_reviews(url, max_count).await {
            Ok(reviews) => reviews,
            Err(e) => {
                metrics::record_failure(platform.as_str(), started.elapsed());
                warn!("Scraping {} failed: {}", url, e);
                return Err(ScraperError::Scraping(e.to_string()));
            }
        };

        let reviews = deduplicate_reviews(reviews);
        metrics::record_success(platform.as_str(), reviews.len(), started.elapsed());
        self.cache.set_as(&cache_key, &reviews).await;

        info!(
            "Scraped {} reviews from {} in {:?}",
            reviews.len(),
            url,
            started.elapsed()
        );
        Ok(reviews)
    }

    /// 搜索商家并抓取评论
    ///
    /// 抓取失败记录在返回的作业上（状态为Failed），不作为错误返回
    ///
    /// # 参数
    ///
    /// * `business_name` - 商家名称
    /// * `location` - 所在地
    /// * `platform` - 平台名称，大小写不敏感
    /// * `webhook_url` - 作业结束时通知的地址
    pub async fn search_and_scrape(
        &self,
        business_name: &str,
        location: &str,
        platform: &str,
        webhook_url: Option<String>,
    ) -> Result<ScrapingJob, ScraperError> {
        let job = self
            .create_job(JobRequest {
                business_name: Some(business_name.to_string()),
                location: Some(location.to_string()),
                platform: Some(platform.to_string()),
                webhook_url,
                ..Default::default()
            })
            .await?;
        self.run_job(job).await
    }

    /// 提取商家信息
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(BusinessInfo))` - 提取成功
    /// * `Ok(None)` - 页面上找不到商家名称
    /// * `Err(ScraperError)` - 校验、限流、robots或抓取失败
    #[instrument(skip(self))]
    pub async fn extract_business_info(&self, url: &str) -> Result<Option<BusinessInfo>, ScraperError> {
        let parsed = parse_target_url(url)?;

        let cache_key = Self::business_info_cache_key(url);
        if let Some(cached) = self.cache.get_as::<BusinessInfo>(&cache_key).await {
            metrics::record_cache(true);
            return Ok(Some(cached));
        }
        metrics::record_cache(false);

        self.preflight(url, &parsed).await?;
        let client = self.client_for(&parsed)?;

        let info = client
            .extract_business_info(url)
            .await
            .map_err(|e| ScraperError::Scraping(e.to_string()))?;

        match &info {
            Some(info) => self.cache.set_as(&cache_key, info).await,
            None => info!("No business name found on {}", url),
        }
        Ok(info)
    }

    /// 查询作业
    pub async fn get_job_status(&self, job_id: Uuid) -> Result<ScrapingJob, ScraperError> {
        self.jobs
            .find_by_id(job_id)
            .await?
            .ok_or_else(|| ScraperError::JobNotFound(job_id.to_string()))
    }

    /// 取消作业
    ///
    /// # 返回值
    ///
    /// * `Ok(true)` - 作业已取消
    /// * `Ok(false)` - 作业已处于终态，无法取消
    /// * `Err(ScraperError::JobNotFound)` - 作业不存在
    pub async fn cancel_job(&self, job_id: Uuid) -> Result<bool, ScraperError> {
        let job = self.get_job_status(job_id).await?;
        if !job.can_cancel() {
            debug!("Job {} is {}, not cancellable", job_id, job.status);
            return Ok(false);
        }

        let job = job.cancel()?;
        match self
            .jobs
            .update_if(&job, &[JobStatus::Pending, JobStatus::Running])
            .await?
        {
            Some(_) => {
                info!("Cancelled job {}", job_id);
                Ok(true)
            }
            None => {
                debug!("Job {} finished before it could be cancelled", job_id);
                Ok(false)
            }
        }
    }

    /// 获取已完成作业的结果
    pub async fn get_job_results(&self, job_id: Uuid) -> Result<Vec<Review>, ScraperError> {
        let job = self.get_job_status(job_id).await?;
        if job.status != JobStatus::Completed {
            return Err(ScraperError::InvalidJobState(format!(
                "Job {} is {}, results are only available once completed",
                job_id, job.status
            )));
        }
        Ok(job.results)
    }

    /// 执行排队中的作业（由worker调用）
    ///
    /// 已取消的作业直接返回，不再执行
    pub async fn execute_job(&self, job_id: Uuid) -> Result<ScrapingJob, ScraperError> {
        let job = self.get_job_status(job_id).await?;
        match job.status {
            JobStatus::Pending => self.run_job(job).await,
            JobStatus::Cancelled => {
                info!("Job {} was cancelled before execution", job_id);
                Ok(job)
            }
            status => Err(ScraperError::InvalidJobState(format!(
                "Job {} is {}, expected pending",
                job_id, status
            ))),
        }
    }

    async fn run_job(&self, job: ScrapingJob) -> Result<ScrapingJob, ScraperError> {
        let mut job = job.start()?;
        if self.jobs.update_if(&job, &[JobStatus::Pending]).await?.is_none() {
            info!("Job {} changed state before it started", job.id);
            return self.get_job_status(job.id).await;
        }
        info!("Running job {}", job.id);

        let outcome = match job.target() {
            Some(JobTarget::Url(url)) => self.scrape_reviews(&url, job.max_pages).await,
            Some(JobTarget::Search {
                business_name,
                location,
                platform,
            }) => match self.resolve_business_url(&business_name, &location, platform).await {
                Ok(url) => {
                    job.url = Some(url.clone());
                    self.scrape_reviews(&url, job.max_pages).await
                }
                Err(e) => Err(e),
            },
            None => Err(ScraperError::InvalidRequest("Job has no target".to_string())),
        };

        let job = match outcome {
            Ok(reviews) => job.complete(reviews)?,
            Err(e) => job.fail(e.to_string())?,
        };

        // Cancellation only flips the stored status; the finished job is written only if still running
        let Some(job) = self.jobs.update_if(&job, &[JobStatus::Running]).await? else {
            info!("Job {} was cancelled while running, discarding results", job.id);
            return self.get_job_status(job.id).await;
        };

        match job.status {
            JobStatus::Completed => info!("Job {} completed with {} reviews", job.id, job.results.len()),
            _ => warn!("Job {} failed: {}", job.id, job.error.as_deref().unwrap_or_default()),
        }
        self.notify(&job).await;
        Ok(job)
    }

    /// 发送作业结束回调，失败只记录日志
    async fn notify(&self, job: &ScrapingJob) {
        let (Some(webhooks), Some(event)) = (&self.webhooks, WebhookEvent::for_finished_job(job)) else {
            return;
        };
        if let Err(e) = webhooks.send_webhook(&event).await {
            warn!("Webhook for job {} was not delivered: {}", job.id, e);
        }
    }

    /// 将仍处于Running的作业标记为失败（进程停止时调用）
    ///
    /// # 返回值
    ///
    /// 被标记的作业数
    pub async fn interrupt_running_jobs(&self, reason: &str) -> Result<usize, ScraperError> {
        let mut interrupted = 0;
        for id in self.jobs.ids_with_status(JobStatus::Running).await? {
            let Some(job) = self.jobs.find_by_id(id).await? else {
                continue;
            };
            let Ok(failed) = job.fail(reason) else {
                continue;
            };
            if self.jobs.update_if(&failed, &[JobStatus::Running]).await?.is_some() {
                warn!("Job {} interrupted: {}", id, reason);
                interrupted += 1;
            }
        }
        Ok(interrupted)
    }

    async fn resolve_business_url(
        &self,
        business_name: &str,
        location: &str,
        platform: Platform,
    ) -> Result<String, ScraperError> {
        let client = self
            .platforms
            .get(platform)
            .ok_or_else(|| ScraperError::UnsupportedPlatform(platform.to_string()))?;

        client
            .search_business(business_name, location)
            .await
            .map_err(|e| ScraperError::Scraping(e.to_string()))?
            .ok_or_else(|| {
                ScraperError::BusinessNotFound(format!(
                    "{} in {} on {}",
                    business_name, location, platform
                ))
            })
    }

    /// 占用一个限流名额并检查robots.txt
    ///
    /// robots.txt拒绝时归还名额，被拒绝的请求不计入窗口
    async fn preflight(&self, url: &str, parsed: &Url) -> Result<(), ScraperError> {
        let domain = parsed.host_str().unwrap_or_default();

        if !self.rate_limiter.try_acquire(domain).await {
            metrics::record_rate_limit_hit(domain);
            warn!("Rate limit exceeded for {}", domain);
            return Err(ScraperError::RateLimitExceeded(domain.to_string()));
        }

        match self.robots.can_fetch(url).await {
            Ok(true) => {}
            Ok(false) => {
                self.rate_limiter.release(domain).await;
                metrics::record_robots_block(domain);
                warn!("robots.txt disallows {}", url);
                return Err(ScraperError::RobotsDisallowed(url.to_string()));
            }
            Err(e) => warn!("robots.txt check failed for {}: {}, allowing", url, e),
        }

        Ok(())
    }

    fn client_for(&self, parsed: &Url) -> Result<Arc<dyn PlatformClient>, ScraperError> {
        Platform::from_url(parsed)
            .and_then(|platform| self.platforms.get(platform))
            .ok_or_else(|| ScraperError::UnsupportedPlatform(parsed.host_str().unwrap_or_default().to_string()))
    }
}

/// 回调地址只接受http(s)
fn parse_webhook_url(url: &str) -> Result<Url, ScraperError> {
    let parsed = parse_target_url(url)?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(ScraperError::InvalidUrl(format!(
            "{}: unsupported webhook scheme {}",
            url, scheme
        ))),
    }
}

/// 解析目标URL，要求带协议和主机名
fn parse_target_url(url: &str) -> Result<Url, ScraperError> {
    let parsed = Url::parse(url).map_err(|e| ScraperError::InvalidUrl(format!("{}: {}", url, e)))?;
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err(ScraperError::InvalidUrl(format!("{}: missing host", url))),
    }
}
