// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{build_service, registry, FixtureRenderer, TRIPADVISOR_URL};
use reviewrs::domain::models::job::JobStatus;
use reviewrs::domain::models::review::Platform;
use std::sync::Arc;

const GOOGLE_SEARCH_URL: &str = "https://www.google.com/maps/search/Social+House+Orlando%2C+FL";
const GOOGLE_PLACE_URL: &str = "https://www.google.com/maps/place/Social+House/@28.5383,-81.3792,17z";

const GOOGLE_SEARCH_HTML: &str = r#"
<div role="main"><div role="feed">
  <a class="hfpxzc" href="/maps/place/Social+House/@28.5383,-81.3792,17z">Social House</a>
</div></div>"#;

const GOOGLE_PLACE_HTML: &str = r#"
<div role="main">
  <h1 class="DUwDvf">Social House</h1>
  <div class="m6QErb DxyBCb">
    <div class="jftiEf" data-review-id="r1">
      <div class="d4r55">Maria Lopez</div>
      <span class="kvMYJc" aria-label="5 stars"></span>
      <span class="rsqaWe">2 weeks ago</span>
      <span class="wiI7pd">Excellent sushi, call 407-555-0199 to book.</span>
      <div class="CDe7pd"><span class="wiI7pd">Thanks Maria!</span></div>
    </div>
    <div class="jftiEf" data-review-id="r2">
      <div class="d4r55">Dan</div>
      <span class="kvMYJc" aria-label="3 stars"></span>
      <span class="rsqaWe">a month ago</span>
      <span class="wiI7pd">Decent.</span>
    </div>
  </div>
</div>"#;

fn tripadvisor_page(offset: usize, count: usize) -> String {
    let cards: String = (0..count)
        .map(|i| {
            format!(
                r#"<div class="review-container">
                     <div class="info_text"><div>Traveller{}</div></div>
                     <span class="ui_bubble_rating bubble_40"></span>
                     <span class="ratingDate">Reviewed 1 week ago</span>
                     <p class="partial_entry">Visit number {}.</p>
                   </div>"#,
                offset + i,
                offset + i
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", cards)
}

#[tokio::test]
async fn test_google_search_and_scrape_end_to_end() {
    let renderer = Arc::new(
        FixtureRenderer::new()
            .page(GOOGLE_SEARCH_URL, GOOGLE_SEARCH_HTML)
            .page(GOOGLE_PLACE_URL, GOOGLE_PLACE_HTML),
    );
    let (service, _queue) = build_service(renderer.clone(), true, 100);

    let job = service
        .search_and_scrape("Social House", "Orlando, FL", "Google", None)
        .await
        .unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.url.as_deref(), Some(GOOGLE_PLACE_URL));
    assert_eq!(job.results.len(), 2);

    let first = &job.results[0];
    assert_eq!(first.author, "Maria Lopez");
    assert_eq!(first.rating, 5.0);
    assert_eq!(first.response.as_deref(), Some("Thanks Maria!"));
    assert!(!first.text.contains("407-555-0199"));
    assert_eq!(
        renderer.requested(),
        vec![GOOGLE_SEARCH_URL.to_string(), GOOGLE_PLACE_URL.to_string()]
    );
}

#[tokio::test]
async fn test_tripadvisor_paginates_until_empty_page() {
    let second_page = TRIPADVISOR_URL.replace("-Reviews-", "-Reviews-or10-");
    let third_page = TRIPADVISOR_URL.replace("-Reviews-", "-Reviews-or20-");
    let renderer = Arc::new(
        FixtureRenderer::new()
            .page(TRIPADVISOR_URL, &tripadvisor_page(0, 10))
            .page(&second_page, &tripadvisor_page(10, 3)),
    );
    let client = registry(renderer.clone())
        .get(Platform::TripAdvisor)
        .unwrap();

    let reviews = client.scrape_reviews(TRIPADVISOR_URL, 40).await.unwrap();

    assert_eq!(reviews.len(), 13);
    assert!(reviews.iter().all(|r| r.rating == 4.0));
    assert!(reviews.iter().all(|r| r.url == TRIPADVISOR_URL));
    assert_eq!(
        renderer.requested(),
        vec![TRIPADVISOR_URL.to_string(), second_page, third_page]
    );
}

#[tokio::test]
async fn test_tripadvisor_stops_at_requested_count() {
    let renderer = Arc::new(FixtureRenderer::new().page(TRIPADVISOR_URL, &tripadvisor_page(0, 10)));
    let client = registry(renderer.clone())
        .get(Platform::TripAdvisor)
        .unwrap();

    let reviews = client.scrape_reviews(TRIPADVISOR_URL, 5).await.unwrap();

    assert_eq!(reviews.len(), 5);
    assert_eq!(renderer.requested().len(), 1);
}
