// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{create_test_app, yelp_renderer, YELP_BIZ_URL};
use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

#[tokio::test]
async fn test_health_endpoints() {
    let app = create_test_app(yelp_renderer());

    let response = app.server.get("/healthz").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({ "status": "ok" }));

    let response = app.server.get("/api/v1/scraping/health").await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "scraping");
    assert_eq!(body["platforms"], json!(["yelp", "google", "tripadvisor"]));
}

#[tokio::test]
async fn test_scrape_returns_reviews() {
    let app = create_test_app(yelp_renderer());

    let response = app
        .server
        .post("/api/v1/scraping/scrape")
        .add_query_param("url", YELP_BIZ_URL)
        .add_query_param("max_pages", 2)
        .await;
    response.assert_status_ok();

    let reviews = response.json::<Vec<Value>>();
    assert_eq!(reviews.len(), 2);
    assert_eq!(reviews[0]["author"], "Alice K.");
    assert_eq!(reviews[0]["platform"], "yelp");
    assert_eq!(reviews[0]["response"], "Thank you Alice!");
    assert!(!reviews[0]["text"]
        .as_str()
        .unwrap()
        .contains("alice@example.com"));
}

#[tokio::test]
async fn test_scrape_rejects_invalid_input() {
    let app = create_test_app(yelp_renderer());

    let foreign = app
        .server
        .post("/api/v1/scraping/scrape")
        .add_query_param("url", "https://evil.example.com/biz/x")
        .await;
    foreign.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(foreign.json::<Value>()["success"], false);

    let too_many_pages = app
        .server
        .post("/api/v1/scraping/scrape")
        .add_query_param("url", YELP_BIZ_URL)
        .add_query_param("max_pages", 50)
        .await;
    too_many_pages.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_extract_business_info() {
    let app = create_test_app(yelp_renderer());

    let response = app
        .server
        .post("/api/v1/scraping/extract")
        .add_query_param("url", YELP_BIZ_URL)
        .await;
    response.assert_status_ok();
    let info = response.json::<Value>();
    assert_eq!(info["name"], "Social House");
    assert_eq!(info["review_count"], 1842);
    assert_eq!(info["categories"], json!(["Japanese"]));

    let missing = app
        .server
        .post("/api/v1/scraping/extract")
        .add_query_param("url", "https://www.yelp.com/biz/closed-place")
        .await;
    missing.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_job_lifecycle_without_workers() {
    let app = create_test_app(yelp_renderer());

    let created = app
        .server
        .post("/api/v1/scraping/jobs")
        .json(&json!({
            "business_name": "Social House",
            "location": "Orlando, FL",
            "platform": "Yelp"
        }))
        .await;
    created.assert_status(StatusCode::ACCEPTED);
    let body = created.json::<Value>();
    assert_eq!(body["status"], "pending");
    assert!(!body["access_token"].as_str().unwrap().is_empty());
    let job_id = body["job_id"].as_str().unwrap().to_string();

    let job = app
        .server
        .get(&format!("/api/v1/scraping/jobs/{}", job_id))
        .await;
    job.assert_status_ok();
    assert_eq!(job.json::<Value>()["platform"], "yelp");

    app.server
        .get(&format!("/api/v1/scraping/jobs/{}/results", job_id))
        .await
        .assert_status(StatusCode::CONFLICT);

    let cancelled = app
        .server
        .delete(&format!("/api/v1/scraping/jobs/{}", job_id))
        .await;
    cancelled.assert_status_ok();
    assert_eq!(cancelled.json::<Value>()["status"], "cancelled");

    app.server
        .delete(&format!("/api/v1/scraping/jobs/{}", job_id))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_job_errors() {
    let app = create_test_app(yelp_renderer());

    app.server
        .get(&format!("/api/v1/scraping/jobs/{}", Uuid::new_v4()))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    app.server
        .delete(&format!("/api/v1/scraping/jobs/{}", Uuid::new_v4()))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    // Neither a URL nor a complete search
    app.server
        .post("/api/v1/scraping/jobs")
        .json(&json!({ "business_name": "Social House" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.server
        .post("/api/v1/scraping/jobs")
        .json(&json!({
            "business_name": "Social House",
            "location": "Orlando, FL",
            "platform": "foursquare"
        }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    // Webhooks may not point back at this host
    app.server
        .post("/api/v1/scraping/jobs")
        .json(&json!({
            "url": "https://www.yelp.com/biz/social-house-orlando",
            "webhook_url": "http://localhost:9000/hook"
        }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_job_keeps_webhook_url() {
    let app = create_test_app(yelp_renderer());

    let created = app
        .server
        .post("/api/v1/scraping/jobs")
        .json(&json!({
            "url": "https://www.yelp.com/biz/social-house-orlando",
            "webhook_url": "https://hooks.example.com/reviews"
        }))
        .await;
    created.assert_status(StatusCode::ACCEPTED);
    let job_id: Uuid = created.json::<serde_json::Value>()["job_id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();

    let job = app.service.get_job_status(job_id).await.unwrap();
    assert_eq!(job.webhook_url.as_deref(), Some("https://hooks.example.com/reviews"));
}
