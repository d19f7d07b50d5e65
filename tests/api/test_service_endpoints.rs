// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! GET / and /health, plus router layers

use super::support::{get, test_app};
use crate::common::EchoTextService;
use agrivision_node::text::CannedTextService;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::test]
async fn test_root_lists_endpoints() {
    let (app, _root) = test_app(Arc::new(CannedTextService::new()));

    let (status, json) = get(app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Crop Disease Detection API");
    assert_eq!(json["status"], "running");
    assert_eq!(json["endpoints"]["upload"], "/upload-image/");
    assert_eq!(json["supported_languages"], serde_json::json!(["en", "bn"]));
}

#[tokio::test]
async fn test_health_with_live_text_service() {
    let (app, _root) = test_app(Arc::new(EchoTextService));

    let (status, json) = get(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["models"]["classifier_mode"], "trained");
    assert_eq!(json["models"]["caption_tier"], "full");
    assert_eq!(json["models"]["device"], "cpu");
    assert_eq!(json["text_service"]["provider"], "echo");
    assert_eq!(json["environment"], "development");
    assert!(json.get("issues").is_none());
}

#[tokio::test]
async fn test_health_reports_canned_text_service() {
    let (app, _root) = test_app(Arc::new(CannedTextService::new()));

    let (_, json) = get(app, "/health").await;

    assert_eq!(json["status"], "degraded");
    assert_eq!(json["text_service"]["provider"], "fallback");
    assert_eq!(json["text_service"]["live"], false);
    assert_eq!(json["issues"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cors_allows_dev_origin() {
    let (app, _root) = test_app(Arc::new(CannedTextService::new()));

    let request = Request::builder()
        .uri("/")
        .header(header::ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:5173"
    );
}

#[tokio::test]
async fn test_cors_ignores_unknown_origin() {
    let (app, _root) = test_app(Arc::new(CannedTextService::new()));

    let request = Request::builder()
        .uri("/")
        .header(header::ORIGIN, "http://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _root) = test_app(Arc::new(CannedTextService::new()));
    let (status, _) = get(app, "/v1/models").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
