// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::{Extension, Router};
use reviewrs::presentation::middleware::rate_limit_middleware::{
    rate_limit_middleware, ApiRateLimiter,
};
use reviewrs::presentation::routes;
use std::net::SocketAddr;
use tower::util::ServiceExt;

fn request_from(uri: &str, peer: &str) -> Request<Body> {
    let addr: SocketAddr = peer.parse().unwrap();
    Request::builder()
        .uri(uri)
        .extension(ConnectInfo(addr))
        .body(Body::empty())
        .unwrap()
}

/// 存活探针不依赖任何共享状态
#[tokio::test]
async fn healthz_works_without_state() {
    let response = routes::routes()
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

/// 没有转发头时按连接地址限流
#[tokio::test]
async fn rate_limit_keys_on_peer_address() {
    let app = Router::new()
        .route("/ping", get(|| async { "pong" }))
        .layer(axum::middleware::from_fn(rate_limit_middleware))
        .layer(Extension(ApiRateLimiter::new(60, 1)));

    let first = app
        .clone()
        .oneshot(request_from("/ping", "192.0.2.10:40000"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    // Same host, different source port
    let second = app
        .clone()
        .oneshot(request_from("/ping", "192.0.2.10:40001"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(second.headers().contains_key("retry-after"));

    let other = app
        .oneshot(request_from("/ping", "192.0.2.11:40000"))
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::OK);
}
