// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;

use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    schemars, tool, tool_handler, tool_router, ErrorData, ServerHandler,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::dto::job_request::CreateJobRequestDto;
use crate::application::dto::scrape_request::{
    checked_text, checked_webhook_url, ExtractQueryDto, ScrapeQueryDto,
};
use crate::domain::models::job::ScrapingJob;
use crate::domain::services::scraper_service::ScraperService;
use crate::utils::errors::ScraperError;
use crate::utils::security::validate_platform;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ScrapeReviewsRequest {
    #[schemars(description = "URL of the business page to scrape reviews from")]
    pub url: String,

    #[schemars(description = "Maximum number of pages to scrape (1-20, default 5)")]
    pub max_pages: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchAndScrapeRequest {
    #[schemars(description = "Name of the business to search for")]
    pub business_name: String,

    #[schemars(description = "Location or city to search in")]
    pub location: String,

    #[schemars(description = "Platform to search on (google, yelp, tripadvisor)")]
    pub platform: String,

    #[schemars(description = "Wait for the scrape to finish instead of queueing a job")]
    pub wait: Option<bool>,

    #[schemars(description = "Webhook URL notified when the job completes or fails")]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExtractBusinessInfoRequest {
    #[schemars(description = "URL of the business page")]
    pub url: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct JobIdRequest {
    #[schemars(description = "Job ID returned by search_and_scrape")]
    pub job_id: String,
}

/// 评论抓取MCP服务
///
/// 与HTTP接口共用同一个 `ScraperService`
#[derive(Clone)]
pub struct ReviewMcpServer {
    service: Arc<ScraperService>,
    tool_router: ToolRouter<ReviewMcpServer>,
}

impl ReviewMcpServer {
    pub fn new(service: Arc<ScraperService>) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl ReviewMcpServer {
    #[tool(
        description = "Scrape reviews from a Google Maps, Yelp or TripAdvisor business page. Returns a list of reviews with text, rating, date, author and owner response."
    )]
    async fn scrape_reviews(
        &self,
        Parameters(ScrapeReviewsRequest { url, max_pages }): Parameters<ScrapeReviewsRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let query = ScrapeQueryDto { url, max_pages };
        let (url, max_pages) = match query.checked() {
            Ok(checked) => checked,
            Err(e) => return Ok(tool_error(&e)),
        };

        match self.service.scrape_reviews(&url, max_pages).await {
            Ok(reviews) => Ok(tool_success(&json!(reviews))),
            Err(e) => Ok(tool_error(&e)),
        }
    }

    #[tool(
        description = "Search for a business by name and location on one platform and scrape its reviews. Queues a job and returns its ID unless 'wait' is true."
    )]
    async fn search_and_scrape(
        &self,
        Parameters(SearchAndScrapeRequest {
            business_name,
            location,
            platform,
            wait,
            webhook_url,
        }): Parameters<SearchAndScrapeRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        if wait.unwrap_or(false) {
            let checked = checked_text("business_name", &business_name).and_then(|name| {
                let location = checked_text("location", &location)?;
                let platform = validate_platform(&platform)?;
                let webhook_url = webhook_url.as_deref().map(checked_webhook_url).transpose()?;
                Ok((name, location, platform, webhook_url))
            });
            let (name, location, platform, webhook_url) = match checked {
                Ok(checked) => checked,
                Err(e) => return Ok(tool_error(&e)),
            };

            return match self
                .service
                .search_and_scrape(&name, &location, platform.as_str(), webhook_url)
                .await
            {
                Ok(job) => Ok(tool_success(&json!({
                    "job": job_summary(&job),
                    "reviews": job.results,
                }))),
                Err(e) => Ok(tool_error(&e)),
            };
        }

        let dto = CreateJobRequestDto {
            business_name: Some(business_name),
            location: Some(location),
            platform: Some(platform),
            webhook_url,
            ..Default::default()
        };
        let submitted = match dto.into_job_request() {
            Ok(request) => self.service.submit_job(request).await,
            Err(e) => Err(e),
        };

        match submitted {
            Ok(job) => {
                info!("MCP job {} queued", job.id);
                Ok(tool_success(&job_summary(&job)))
            }
            Err(e) => Ok(tool_error(&e)),
        }
    }

    #[tool(
        description = "Extract business information (name, address, phone, rating, review count, categories) from a business page URL."
    )]
    async fn extract_business_info(
        &self,
        Parameters(ExtractBusinessInfoRequest { url }): Parameters<ExtractBusinessInfoRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let url = match (ExtractQueryDto { url }).checked() {
            Ok(url) => url,
            Err(e) => return Ok(tool_error(&e)),
        };

        match self.service.extract_business_info(&url).await {
            Ok(Some(info)) => Ok(tool_success(&json!(info))),
            Ok(None) => Ok(tool_error(&ScraperError::BusinessNotFound(url))),
            Err(e) => Ok(tool_error(&e)),
        }
    }

    #[tool(description = "Get the status of a scraping job.")]
    async fn get_job_status(
        &self,
        Parameters(JobIdRequest { job_id }): Parameters<JobIdRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let result = match parse_job_id(&job_id) {
            Ok(id) => self.service.get_job_status(id).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(job) => Ok(tool_success(&job_summary(&job))),
            Err(e) => Ok(tool_error(&e)),
        }
    }

    #[tool(description = "Get the reviews collected by a completed scraping job.")]
    async fn get_job_results(
        &self,
        Parameters(JobIdRequest { job_id }): Parameters<JobIdRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let result = match parse_job_id(&job_id) {
            Ok(id) => self.service.get_job_results(id).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(reviews) => Ok(tool_success(&json!(reviews))),
            Err(e) => Ok(tool_error(&e)),
        }
    }
}

#[tool_handler]
impl ServerHandler for ReviewMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "restaurant-review-scraper".to_string(),
                title: None,
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some("Restaurant review scraper for Google Maps, Yelp and TripAdvisor. Tools: 'scrape_reviews' (reviews from a business URL), 'search_and_scrape' (find a business and scrape it, queued unless wait=true), 'extract_business_info' (business metadata), 'get_job_status' and 'get_job_results' (follow queued jobs).".to_string()),
        }
    }
}

fn parse_job_id(raw: &str) -> Result<Uuid, ScraperError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ScraperError::InvalidRequest(format!("Invalid job id: {}", raw)))
}

/// 作业摘要，不含评论列表
pub fn job_summary(job: &ScrapingJob) -> Value {
    json!({
        "id": job.id,
        "status": job.status.to_string(),
        "platform": job.platform,
        "business_name": job.business_name,
        "location": job.location,
        "url": job.url,
        "review_count": job.results.len(),
        "created_at": job.created_at,
        "completed_at": job.completed_at,
        "error": job.error,
        "webhook_url": job.webhook_url,
    })
}

fn tool_success(value: &Value) -> CallToolResult {
    CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
    )])
}

fn tool_error(error: &ScraperError) -> CallToolResult {
    warn!("MCP tool failed: {}", error);
    CallToolResult::error(vec![Content::text(
        json!({ "success": false, "error": error.to_string() }).to_string(),
    )])
}
