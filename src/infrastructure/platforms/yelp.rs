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
use tracing::{debug, info};
use url::Url;

const YELP_BASE: &str = "https://www.yelp.com";

pub const YELP_SPEC: SelectorSpec = SelectorSpec {
    version: "yelp-2024.10",
    review_container: &["#reviews ul > li", "li[class*=\"review__\"]", "div.review"],
    review_text: &["p[class*=\"comment__\"] span", "span.raw__09f24__T4Ezm", "p.comment"],
    review_author: &["a[href*=\"/user_details\"]", "span.fs-block a", ".user-name"],
    review_rating: &["div[role=\"img\"][aria-label*=\"star\"]", "[aria-label*=\"star rating\"]"],
    review_date: &["span.css-chan6m", "span[class*=\"date\"]"],
    review_response: &["div[class*=\"businessResponse\"] p", ".owner-response"],
    business_name: &["h1"],
    business_address: &["address", "p[class*=\"address\"]"],
    business_phone: &["p[data-testid=\"phone\"]", "a[href^=\"tel:\"]"],
    business_rating: &["div[data-testid=\"BizHeaderReviewCount\"] [aria-label*=\"star\"]", "div[role=\"img\"][aria-label*=\"star rating\"]"],
    business_review_count: &["a[href=\"#reviews\"]", "[data-testid=\"BizHeaderReviewCount\"]"],
    business_categories: &["span[data-testid=\"BizHeaderCategory\"] a", "a[href*=\"cflt=\"]"],
    search_result: &["h3 a[href^=\"/biz/\"]", "a[href^=\"/biz/\"]"],
};

pub static YELP_SELECTORS: Lazy<SelectorSet> =
    Lazy::new(|| SelectorSet::compile(Platform::Yelp, &YELP_SPEC));

/// Yelp 客户端
///
/// 评论分页，通过 `?start=N` 翻页，每页10条
pub struct YelpClient {
    fetcher: PageFetcher,
}

impl YelpClient {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }

    pub fn search_url(business_name: &str, location: &str) -> String {
        format!(
            "{}/search?find_desc={}&find_loc={}",
            YELP_BASE,
            encode_query(business_name),
            encode_query(location)
        )
    }
}

/// 生成第 `offset` 条评论起始的分页URL
///
/// offset为0时移除已有的 `start` 参数
pub fn page_url(url: &str, offset: usize) -> Result<String, PlatformError> {
    let mut parsed = Url::parse(url).map_err(|e| PlatformError::InvalidUrl(format!("{}: {}", url, e)))?;
    let retained: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != "start")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    parsed.set_query(None);
    if !retained.is_empty() || offset > 0 {
        let mut pairs = parsed.query_pairs_mut();
        for (k, v) in &retained {
            pairs.append_pair(k, v);
        }
        if offset > 0 {
            pairs.append_pair("start", &offset.to_string());
        }
    }
    Ok(parsed.to_string())
}

pub fn parse_reviews(html: &str, page_url: &str) -> Vec<Review> {
    selectors::parse_reviews(html, page_url, &YELP_SELECTORS)
}

pub fn parse_business_info(html: &str, page_url: &str) -> Option<BusinessInfo> {
    selectors::parse_business_info(html, page_url, &YELP_SELECTORS)
}

/// 解析搜索结果，返回第一个商家页（去掉跟踪参数）
pub fn parse_search_result(html: &str) -> Option<String> {
    selectors::parse_search_result(html, YELP_BASE, &YELP_SELECTORS).map(|found| {
        match Url::parse(&found) {
            Ok(mut url) => {
                url.set_query(None);
                url.set_fragment(None);
                url.to_string()
            }
            Err(_) => found,
        }
    })
}

#[async_trait]
impl PlatformClient for YelpClient {
    fn platform(&self) -> Platform {
        Platform::Yelp
    }

    async fn search_business(
        &self,
        business_name: &str,
        location: &str,
    ) -> Result<Option<String>, PlatformError> {
        let url = Self::search_url(business_name, location);
        let page = self.fetcher.fetch(self.fetcher.request(&url).wait_for("main")).await?;
        let found = parse_search_result(&page.html);
        debug!("Yelp search for {} {} -> {:?}", business_name, location, found);
        Ok(found)
    }

    async fn scrape_reviews(&self, url: &str, max_count: usize) -> Result<Vec<Review>, PlatformError> {
        let mut reviews = Vec::new();

        for page_index in 0..pages_needed(max_count) {
            if page_index > 0 {
                tokio::time::sleep(self.fetcher.page_delay(url).await).await;
            }

            let target = page_url(url, page_index * REVIEWS_PER_PAGE)?;
            let page = self
                .fetcher
                .fetch(self.fetcher.request(&target).wait_for("#reviews"))
                .await?;
            let batch = parse_reviews(&page.html, url);
            debug!("Yelp page {} ({}) yielded {} reviews", page_index + 1, target, batch.len());

            if batch.is_empty() {
                break;
            }
            reviews.extend(batch);
            if reviews.len() >= max_count {
                break;
            }
        }

        reviews.truncate(max_count);
        info!("Collected {} Yelp reviews from {}", reviews.len(), url);
        Ok(reviews)
    }

    async fn extract_business_info(&self, url: &str) -> Result<Option<BusinessInfo>, PlatformError> {
        let page = self.fetcher.fetch(self.fetcher.request(url).wait_for("h1")).await?;
        Ok(parse_business_info(&page.html, url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BIZ_URL: &str = "https://www.yelp.com/biz/social-house-orlando";

    #[test]
    fn test_page_url() {
        assert_eq!(page_url(BIZ_URL, 0).unwrap(), BIZ_URL);
        assert_eq!(page_url(BIZ_URL, 20).unwrap(), format!("{}?start=20", BIZ_URL));
        assert_eq!(
            page_url(&format!("{}?osq=sushi&start=10", BIZ_URL), 30).unwrap(),
            format!("{}?osq=sushi&start=30", BIZ_URL)
        );
        assert!(page_url("not a url", 10).is_err());
    }

    #[test]
    fn test_parse_reviews_fixture() {
        let html = r#"
            <section id="reviews"><ul>
              <li>
                <a href="/user_details?userid=1">Alice K.</a>
                <div role="img" aria-label="4 star rating"></div>
                <span class="css-chan6m">Oct 3, 2024</span>
                <p class="comment__09f24__D0cxf"><span>Loved the ramen.</span></p>
                <div class="businessResponse__x"><p>Thank you Alice!</p></div>
              </li>
              <li>
                <a href="/user_details?userid=2">Bob</a>
                <div role="img" aria-label="1 star rating"></div>
                <span class="css-chan6m">Sep 1, 2024</span>
                <p class="comment__09f24__D0cxf"><span>Slow service.</span></p>
              </li>
            </ul></section>"#;

        let reviews = parse_reviews(html, BIZ_URL);
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].author, "Alice K.");
        assert_eq!(reviews[0].rating, 4.0);
        assert_eq!(reviews[0].text, "Loved the ramen.");
        assert_eq!(reviews[0].response.as_deref(), Some("Thank you Alice!"));
        assert_eq!(reviews[1].rating, 1.0);
        assert!(reviews.iter().all(|r| r.platform == Platform::Yelp));
    }

    #[test]
    fn test_parse_search_result_strips_tracking() {
        let html = r#"
            <ul>
              <li><h3><a href="/adredir?ad_business_id=xyz">Sponsored</a></h3></li>
              <li><h3><a href="/biz/social-house-orlando?osq=Social+House">Social House</a></h3></li>
            </ul>"#;

        assert_eq!(parse_search_result(html).as_deref(), Some(BIZ_URL));
    }

    #[test]
    fn test_search_url() {
        assert_eq!(
            YelpClient::search_url("Social House", "Orlando, FL"),
            "https://www.yelp.com/search?find_desc=Social+House&find_loc=Orlando%2C+FL"
        );
    }
}
