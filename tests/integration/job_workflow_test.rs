// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{
    build_service, build_service_with_webhooks, create_test_app, yelp_renderer, YELP_BIZ_URL,
};
use axum::http::StatusCode;
use reviewrs::domain::models::job::{JobStatus, ScrapingJob};
use reviewrs::domain::services::scraper_service::{JobRequest, ScraperService};
use reviewrs::utils::errors::ScraperError;
use reviewrs::workers::manager::WorkerManager;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn wait_for_terminal(service: &Arc<ScraperService>, id: Uuid) -> ScrapingJob {
    for _ in 0..200 {
        let job = service.get_job_status(id).await.unwrap();
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not finish", id);
}

#[tokio::test]
async fn test_worker_completes_search_job() {
    let app = create_test_app(yelp_renderer());
    let mut workers = WorkerManager::new(app.service.clone(), app.queue.clone());
    workers.start_workers(2);
    assert_eq!(workers.worker_count(), 2);

    let created = app
        .server
        .post("/api/v1/scraping/jobs")
        .json(&json!({
            "business_name": "Social House",
            "location": "Orlando, FL",
            "platform": "yelp",
            "max_pages": 1
        }))
        .await;
    created.assert_status(StatusCode::ACCEPTED);
    let body = created.json::<Value>();
    let job_id: Uuid = body["job_id"].as_str().unwrap().parse().unwrap();
    let token = body["access_token"].as_str().unwrap().to_string();

    let job = wait_for_terminal(&app.service, job_id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.url.as_deref(), Some(YELP_BIZ_URL));
    assert!(job.completed_at.is_some());

    let results = app
        .server
        .get(&format!("/api/v1/scraping/jobs/{}/results", job_id))
        .add_query_param("token", &token)
        .await;
    results.assert_status_ok();
    assert_eq!(results.json::<Vec<Value>>().len(), 2);

    app.server
        .get(&format!("/api/v1/scraping/jobs/{}/results", job_id))
        .add_query_param("token", "forged")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    // Completed jobs cannot be cancelled
    assert!(!app.service.cancel_job(job_id).await.unwrap());

    app.queue.close().await;
    workers.shutdown().await;
}

#[tokio::test]
async fn test_worker_marks_unresolvable_search_failed() {
    let (service, queue) = build_service(yelp_renderer(), true, 100);
    let mut workers = WorkerManager::new(service.clone(), queue.clone());
    workers.start_workers(1);

    let job = service
        .submit_job(JobRequest {
            business_name: Some("Nowhere Diner".to_string()),
            location: Some("Atlantis".to_string()),
            platform: Some("yelp".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    let job = wait_for_terminal(&service, job.id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.is_some());
    assert!(matches!(
        service.get_job_results(job.id).await,
        Err(ScraperError::InvalidJobState(_))
    ));

    queue.close().await;
    workers.shutdown().await;
}

#[tokio::test]
async fn test_robots_disallow_fails_url_job() {
    let (service, _queue) = build_service(yelp_renderer(), false, 100);

    let job = service
        .create_job(JobRequest {
            url: Some(YELP_BIZ_URL.to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    let job = service.execute_job(job.id).await.unwrap();

    assert_eq!(job.status, JobStatus::Failed);
    assert!(matches!(
        service.scrape_reviews(YELP_BIZ_URL, 1).await,
        Err(ScraperError::RobotsDisallowed(_))
    ));
}

#[tokio::test]
async fn test_domain_rate_limit_applies_across_urls() {
    let (service, _queue) = build_service(yelp_renderer(), true, 1);

    service.scrape_reviews(YELP_BIZ_URL, 1).await.unwrap();
    // Cached results do not consume the budget
    service.scrape_reviews(YELP_BIZ_URL, 1).await.unwrap();

    let err = service
        .scrape_reviews("https://www.yelp.com/biz/another-place", 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ScraperError::RateLimitExceeded(_)));
}

#[tokio::test]
async fn test_worker_posts_webhook_when_job_finishes() {
    let hook = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/reviews"))
        .and(header_exists("X-Reviewrs-Signature"))
        .and(header_exists("X-Reviewrs-Event-ID"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&hook)
        .await;

    let (service, queue) = build_service_with_webhooks(yelp_renderer(), "s3cret");
    let mut workers = WorkerManager::new(service.clone(), queue.clone());
    workers.start_workers(1);

    let job = service
        .submit_job(JobRequest {
            url: Some(YELP_BIZ_URL.to_string()),
            max_pages: Some(1),
            webhook_url: Some(format!("{}/hooks/reviews", hook.uri())),
            ..Default::default()
        })
        .await
        .unwrap();
    let finished = wait_for_terminal(&service, job.id).await;
    assert_eq!(finished.status, JobStatus::Completed);

    // Delivery happens right after the final status is stored
    let mut requests = Vec::new();
    for _ in 0..200 {
        requests = hook.received_requests().await.unwrap();
        if !requests.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(requests.len(), 1);

    let payload: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(payload["event"], "job.completed");
    assert_eq!(payload["job_id"], json!(job.id));
    assert_eq!(payload["review_count"], 2);
    assert_eq!(payload["url"], YELP_BIZ_URL);

    queue.close().await;
    workers.shutdown().await;
}
