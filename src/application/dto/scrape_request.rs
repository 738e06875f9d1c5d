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

use serde::{Deserialize, Serialize};
use tracing::warn;
use validator::Validate;

use crate::domain::models::job::{DEFAULT_MAX_PAGES, MAX_PAGES_LIMIT};
use crate::infrastructure::observability::metrics;
use crate::utils::errors::ScraperError;
use crate::utils::security::{sanitize_input, validate_url, validate_webhook_url, MAX_INPUT_LENGTH};

/// 直接抓取请求参数（查询字符串）
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct ScrapeQueryDto {
    /// 商家页URL
    #[validate(length(min = 1, max = 2048))]
    pub url: String,
    /// 最大页数，默认5
    #[validate(range(min = 1, max = 20))]
    pub max_pages: Option<u32>,
}

impl ScrapeQueryDto {
    /// 校验参数并返回 (url, max_pages)
    pub fn checked(self) -> Result<(String, u32), ScraperError> {
        self.validate()
            .map_err(|e| ScraperError::InvalidRequest(e.to_string()))?;
        let url = checked_url(&self.url)?;
        Ok((url, self.max_pages.unwrap_or(DEFAULT_MAX_PAGES)))
    }
}

/// 商家信息提取请求参数（查询字符串）
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct ExtractQueryDto {
    #[validate(length(min = 1, max = 2048))]
    pub url: String,
}

impl ExtractQueryDto {
    pub fn checked(self) -> Result<String, ScraperError> {
        self.validate()
            .map_err(|e| ScraperError::InvalidRequest(e.to_string()))?;
        checked_url(&self.url)
    }
}

/// 所有进入系统的URL都经过这里
///
/// 未通过安全校验时计入 `scraper_security_blocks_total`
pub fn checked_url(raw: &str) -> Result<String, ScraperError> {
    match validate_url(raw) {
        Ok(_) => Ok(raw.trim().to_string()),
        Err(e) => {
            metrics::record_security_block("invalid_url");
            warn!("Rejected URL ({} chars): {}", raw.len(), e);
            Err(e)
        }
    }
}

/// 作业回调地址的安全校验
pub fn checked_webhook_url(raw: &str) -> Result<String, ScraperError> {
    match validate_webhook_url(raw) {
        Ok(_) => Ok(raw.trim().to_string()),
        Err(e) => {
            metrics::record_security_block("invalid_webhook_url");
            warn!("Rejected webhook URL ({} chars): {}", raw.len(), e);
            Err(e)
        }
    }
}

/// 清洗商家名称、地点等自由文本，清洗后为空视为无效
pub fn checked_text(field: &str, raw: &str) -> Result<String, ScraperError> {
    let cleaned = sanitize_input(raw, MAX_INPUT_LENGTH);
    if cleaned.is_empty() {
        metrics::record_security_block("empty_input");
        return Err(ScraperError::InvalidRequest(format!("{} cannot be empty", field)));
    }
    Ok(cleaned)
}

/// 校验页数范围
pub fn checked_max_pages(max_pages: Option<u32>) -> Result<u32, ScraperError> {
    let max_pages = max_pages.unwrap_or(DEFAULT_MAX_PAGES);
    if !(1..=MAX_PAGES_LIMIT).contains(&max_pages) {
        return Err(ScraperError::InvalidRequest(format!(
            "max_pages must be between 1 and {}",
            MAX_PAGES_LIMIT
        )));
    }
    Ok(max_pages)
}
