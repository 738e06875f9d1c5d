// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::review::{BusinessInfo, Platform, Review};
use crate::domain::platforms::client::{PlatformClient, PlatformError};
use crate::engines::traits::PageAction;
use crate::infrastructure::platforms::base::{encode_query, PageFetcher};
use crate::infrastructure::platforms::selectors::{self, SelectorSet, SelectorSpec};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::time::Duration;
use tracing::{debug, info};

const GOOGLE_BASE: &str = "https://www.google.com";

pub const GOOGLE_SPEC: SelectorSpec = SelectorSpec {
    version: "google-2024.11",
    review_container: &["div[data-review-id].jftiEf", "div[data-review-id]"],
    review_text: &[".wiI7pd", ".MyEned"],
    review_author: &[".d4r55", "button.al6Kxe div"],
    review_rating: &["span.kvMYJc[aria-label]", "[aria-label*=\"star\"]", "[role=\"img\"][aria-label]"],
    review_date: &[".rsqaWe", ".xRkPPb"],
    review_response: &[".CDe7pd .wiI7pd", ".CDe7pd"],
    business_name: &["h1.DUwDvf", "h1"],
    business_address: &["button[data-item-id=\"address\"]", "[data-item-id=\"address\"]"],
    business_phone: &["button[data-item-id^=\"phone\"]", "[data-item-id^=\"phone\"]"],
    business_rating: &[".F7nice span[aria-hidden=\"true\"]", ".F7nice [aria-label*=\"star\"]"],
    business_review_count: &[".F7nice span[aria-label*=\"review\"]", "button[jsaction*=\"reviewChart\"]"],
    business_categories: &["button.DkEaL", "[jsaction*=\"category\"]"],
    search_result: &["a.hfpxzc[href*=\"/maps/place/\"]", "a[href*=\"/maps/place/\"]"],
};

pub static GOOGLE_SELECTORS: Lazy<SelectorSet> =
    Lazy::new(|| SelectorSet::compile(Platform::Google, &GOOGLE_SPEC));

const REVIEWS_TAB: &str = "button[role=\"tab\"][aria-label*=\"Reviews\"]";
const REVIEW_PANE: &str = "div.m6QErb.DxyBCb";

/// Google Maps 客户端
///
/// 评论面板为懒加载，通过滚动面板加载到目标数量
pub struct GoogleMapsClient {
    fetcher: PageFetcher,
}

impl GoogleMapsClient {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }

    /// 构造搜索URL
    pub fn search_url(business_name: &str, location: &str) -> String {
        format!(
            "{}/maps/search/{}",
            GOOGLE_BASE,
            encode_query(&format!("{} {}", business_name, location))
        )
    }
}

/// 解析评论面板
pub fn parse_reviews(html: &str, page_url: &str) -> Vec<Review> {
    selectors::parse_reviews(html, page_url, &GOOGLE_SELECTORS)
}

/// 解析商家详情
pub fn parse_business_info(html: &str, page_url: &str) -> Option<BusinessInfo> {
    selectors::parse_business_info(html, page_url, &GOOGLE_SELECTORS)
}

/// 解析搜索结果，返回第一个地点链接
pub fn parse_search_result(html: &str) -> Option<String> {
    selectors::parse_search_result(html, GOOGLE_BASE, &GOOGLE_SELECTORS)
}

#[async_trait]
impl PlatformClient for GoogleMapsClient {
    fn platform(&self) -> Platform {
        Platform::Google
    }

    async fn search_business(
        &self,
        business_name: &str,
        location: &str,
    ) -> Result<Option<String>, PlatformError> {
        let url = Self::search_url(business_name, location);
        let page = self
            .fetcher
            .fetch(self.fetcher.request(&url).wait_for("div[role=\"main\"]"))
            .await?;

        // A single strong match redirects straight to the place page
        if page.url.contains("/maps/place/") {
            return Ok(Some(page.url));
        }

        let found = parse_search_result(&page.html);
        debug!("Google search for {} {} -> {:?}", business_name, location, found);
        Ok(found)
    }

    async fn scrape_reviews(&self, url: &str, max_count: usize) -> Result<Vec<Review>, PlatformError> {
        let options = &self.fetcher.options;
        let item_selector = SelectorSet::primary_review_selector(&GOOGLE_SPEC);
        let request = self
            .fetcher
            .request(url)
            .wait_for("h1")
            .action(PageAction::Click {
                selector: REVIEWS_TAB.to_string(),
            })
            .action(PageAction::Wait(Duration::from_secs(2)))
            .action(PageAction::Scroll {
                container: Some(REVIEW_PANE.to_string()),
                item_selector: Some(item_selector.to_string()),
                target_items: max_count,
                max_attempts: options.max_scroll_attempts,
                pause: options.scroll_pause,
            });

        let page = self.fetcher.fetch(request).await?;
        let mut reviews = parse_reviews(&page.html, url);
        reviews.truncate(max_count);

        info!("Collected {} Google reviews from {}", reviews.len(), url);
        Ok(reviews)
    }

    async fn extract_business_info(&self, url: &str) -> Result<Option<BusinessInfo>, PlatformError> {
        let page = self
            .fetcher
            .fetch(self.fetcher.request(url).wait_for("h1"))
            .await?;
        Ok(parse_business_info(&page.html, url))
    }
}
