// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::dto::scrape_request::{
    checked_max_pages, checked_text, checked_url, checked_webhook_url,
};
use crate::domain::services::scraper_service::JobRequest;
use crate::utils::errors::ScraperError;
use crate::utils::security::validate_platform;

/// 创建作业请求DTO
///
/// 直接给出 `url`，或者给出 `business_name` + `location` + `platform`
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct CreateJobRequestDto {
    /// 直接抓取的URL
    #[validate(length(min = 1, max = 2048))]
    pub url: Option<String>,

    /// 商家名称
    #[validate(length(min = 1, max = 1000))]
    pub business_name: Option<String>,

    /// 商家所在地
    #[validate(length(min = 1, max = 1000))]
    pub location: Option<String>,

    /// 平台（yelp、google、tripadvisor）
    pub platform: Option<String>,

    /// 最大页数（1-20，默认5）
    #[validate(range(min = 1, max = 20))]
    pub max_pages: Option<u32>,

    /// 作业完成或失败时通知的地址
    #[validate(length(min = 1, max = 2048))]
    pub webhook_url: Option<String>,
}

impl CreateJobRequestDto {
    /// 校验并清洗请求，转换为服务层参数
    ///
    /// # 返回值
    ///
    /// * `Ok(JobRequest)` - 清洗后的参数
    /// * `Err(ScraperError)` - 字段越界、URL未通过安全校验或平台无效
    pub fn into_job_request(self) -> Result<JobRequest, ScraperError> {
        self.validate()
            .map_err(|e| ScraperError::InvalidRequest(e.to_string()))?;

        let url = self.url.as_deref().map(checked_url).transpose()?;
        let business_name = self
            .business_name
            .as_deref()
            .map(|v| checked_text("business_name", v))
            .transpose()?;
        let location = self
            .location
            .as_deref()
            .map(|v| checked_text("location", v))
            .transpose()?;
        let platform = self
            .platform
            .as_deref()
            .map(|p| validate_platform(p).map(|p| p.to_string()))
            .transpose()?;
        let webhook_url = self.webhook_url.as_deref().map(checked_webhook_url).transpose()?;

        Ok(JobRequest {
            url,
            business_name,
            location,
            platform,
            max_pages: Some(checked_max_pages(self.max_pages)?),
            webhook_url,
        })
    }
}
