// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /upload-image/ and /diagnose/

use super::support::{post_form, test_app, Part};
use crate::common::{png_bytes, EchoTextService};
use agrivision_node::text::CannedTextService;
use axum::http::StatusCode;
use std::sync::Arc;

#[tokio::test]
async fn test_upload_image_returns_analysis() {
    let (app, _root) = test_app(Arc::new(CannedTextService::new()));
    let png = png_bytes(40, 30);

    let (status, json) = post_form(
        app,
        "/upload-image/",
        &[Part::File {
            content_type: "image/png",
            bytes: &png,
        }],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["crop"], "Tomato");
    assert_eq!(json["disease"], "Late Blight");
    assert_eq!(json["caption"], "a primary caption of a diseased leaf");
}

#[tokio::test]
async fn test_diagnose_matches_upload() {
    let (app, _root) = test_app(Arc::new(CannedTextService::new()));
    let png = png_bytes(20, 20);
    let file = [Part::File {
        content_type: "image/png",
        bytes: &png,
    }];

    let (_, upload) = post_form(app.clone(), "/upload-image/", &file).await;
    let (status, diagnose) = post_form(app, "/diagnose/", &file).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(upload, diagnose);
}

#[tokio::test]
async fn test_bengali_upload_is_translated() {
    let (app, _root) = test_app(Arc::new(EchoTextService));
    let png = png_bytes(20, 20);

    let (status, json) = post_form(
        app,
        "/upload-image/",
        &[
            Part::Text("language", "bn"),
            Part::File {
                content_type: "image/png",
                bytes: &png,
            },
        ],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["crop"], "<bn>Tomato");
    assert_eq!(json["disease"], "<bn>Late Blight");
}

#[tokio::test]
async fn test_non_image_upload_rejected() {
    let (app, _root) = test_app(Arc::new(CannedTextService::new()));

    let (status, json) = post_form(
        app,
        "/upload-image/",
        &[Part::File {
            content_type: "text/plain",
            bytes: b"hello",
        }],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "File must be an image");
    assert!(json["request_id"].is_string());
}

#[tokio::test]
async fn test_undecodable_image_is_bad_request() {
    let (app, _root) = test_app(Arc::new(CannedTextService::new()));

    let (status, json) = post_form(
        app,
        "/diagnose/",
        &[Part::File {
            content_type: "image/jpeg",
            bytes: b"not really a jpeg",
        }],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_type"], "invalid_request");
}

#[tokio::test]
async fn test_missing_file_is_validation_error() {
    let (app, _root) = test_app(Arc::new(CannedTextService::new()));

    let (status, json) =
        post_form(app, "/upload-image/", &[Part::Text("language", "en")]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_type"], "validation_error");
    assert_eq!(json["details"]["field"], "file");
}

#[tokio::test]
async fn test_unsupported_upload_language() {
    let (app, _root) = test_app(Arc::new(CannedTextService::new()));
    let png = png_bytes(8, 8);

    let (status, json) = post_form(
        app,
        "/upload-image/",
        &[
            Part::Text("language", "fr"),
            Part::File {
                content_type: "image/png",
                bytes: &png,
            },
        ],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error_type"], "unsupported_language");
}
