// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::review::{BusinessInfo, Platform, Review};
use crate::domain::platforms::client::{PlatformClient, PlatformError};
use crate::infrastructure::platforms::base::{encode_query, pages_needed, PageFetcher, REVIEWS_PER_PAGE};
use crate::infrastructure::platforms::selectors::{self, SelectorSet, SelectorSpec};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

const TRIPADVISOR_BASE: &str = "https://www.tripadvisor.com";

pub const TRIPADVISOR_SPEC: SelectorSpec = SelectorSpec {
    version: "tripadvisor-2024.09",
    review_container: &["div[data-test-target=\"HR_CC_CARD\"]", "div.review-container", "div[data-reviewid]"],
    review_text: &["span.JguWG", "q.QewHA span", "p.partial_entry"],
    review_author: &["a.ui_header_link", "span.biGQs a", ".info_text div"],
    review_rating: &["svg[aria-label*=\"bubble\"]", "span.ui_bubble_rating", "[class*=\"bubble_\"]"],
    review_date: &["span.ratingDate", "div.biGQs._P.pZUbB.ncFvv.osNWb"],
    review_response: &["div.mgrRspnInline p.partial_entry", "div.owner-response"],
    business_name: &["h1[data-test-target=\"top-info-header\"]", "h1"],
    business_address: &["a[href=\"#MAPVIEW\"]", "span.street-address"],
    business_phone: &["a[href^=\"tel:\"]", "span.phone"],
    business_rating: &["svg[aria-label*=\"bubble\"]", "span.ui_bubble_rating", "[class*=\"bubble_\"]"],
    business_review_count: &["a[href=\"#REVIEWS\"] span", "span.reviewCount", "a[href=\"#REVIEWS\"]"],
    business_categories: &["span.DsyBj a[href*=\"Restaurants\"]", "a.dlMOJ"],
    search_result: &["a[href*=\"/Restaurant_Review-\"]"],
};

pub static TRIPADVISOR_SELECTORS: Lazy<SelectorSet> =
    Lazy::new(|| SelectorSet::compile(Platform::TripAdvisor, &TRIPADVISOR_SPEC));

static OFFSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-Reviews(?:-or\d+)?-").expect("static offset pattern"));

/// TripAdvisor 客户端
///
/// 评论分页，在URL的 `-Reviews-` 之后插入 `-orN-`
pub struct TripAdvisorClient {
    fetcher: PageFetcher,
}

impl TripAdvisorClient {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }

    pub fn search_url(business_name: &str, location: &str) -> String {
        format!(
            "{}/Search?q={}",
            TRIPADVISOR_BASE,
            encode_query(&format!("{} {}", business_name, location))
        )
    }
}

/// 生成分页URL
///
/// `..._Review-g1-d2-Reviews-Name.html` 在offset为20时变为
/// `..._Review-g1-d2-Reviews-or20-Name.html`
pub fn page_url(url: &str, offset: usize) -> Result<String, PlatformError> {
    if !OFFSET_RE.is_match(url) {
        return Err(PlatformError::InvalidUrl(format!(
            "{}: not a TripAdvisor review page",
            url
        )));
    }
    let replacement = if offset == 0 {
        "-Reviews-".to_string()
    } else {
        format!("-Reviews-or{}-", offset)
    };
    Ok(OFFSET_RE.replace(url, replacement.as_str()).into_owned())
}

pub fn parse_reviews(html: &str, page_url: &str) -> Vec<Review> {
    selectors::parse_reviews(html, page_url, &TRIPADVISOR_SELECTORS)
}

pub fn parse_business_info(html: &str, page_url: &str) -> Option<BusinessInfo> {
    selectors::parse_business_info(html, page_url, &TRIPADVISOR_SELECTORS)
}

pub fn parse_search_result(html: &str) -> Option<String> {
    selectors::parse_search_result(html, TRIPADVISOR_BASE, &TRIPADVISOR_SELECTORS)
}

#[async_trait]
impl PlatformClient for TripAdvisorClient {
    fn platform(&self) -> Platform {
        Platform::TripAdvisor
    }

    async fn search_business(
        &self,
        business_name: &str,
        location: &str,
    ) -> Result<Option<String>, PlatformError> {
        let url = Self::search_url(business_name, location);
        let page = self.fetcher.fetch(self.fetcher.request(&url)).await?;
        let found = parse_search_result(&page.html);
        debug!("TripAdvisor search for {} {} -> {:?}", business_name, location, found);
        Ok(found)
    }

    async fn scrape_reviews(&self, url: &str, max_count: usize) -> Result<Vec<Review>, PlatformError> {
        let mut reviews = Vec::new();

        for page_index in 0..pages_needed(max_count) {
            if page_index > 0 {
                tokio::time::sleep(self.fetcher.page_delay(url).await).await;
            }

            let target = page_url(url, page_index * REVIEWS_PER_PAGE)?;
            let page = self.fetcher.fetch(self.fetcher.request(&target)).await?;
            let batch = parse_reviews(&page.html, url);
            debug!(
                "TripAdvisor page {} ({}) yielded {} reviews",
                page_index + 1,
                target,
                batch.len()
            );

            if batch.is_empty() {
                break;
            }
            reviews.extend(batch);
            if reviews.len() >= max_count {
                break;
            }
        }

        reviews.truncate(max_count);
        info!("Collected {} TripAdvisor reviews from {}", reviews.len(), url);
        Ok(reviews)
    }

    async fn extract_business_info(&self, url: &str) -> Result<Option<BusinessInfo>, PlatformError> {
        let page = self.fetcher.fetch(self.fetcher.request(url).wait_for("h1")).await?;
        Ok(parse_business_info(&page.html, url))
    }
}
