// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /ask/, /translate/ and /translate-result/

use super::support::{post_form, test_app, Part};
use crate::common::EchoTextService;
use agrivision_node::text::CannedTextService;
use axum::http::StatusCode;
use std::sync::Arc;

#[tokio::test]
async fn test_ask_answers_in_english_then_translates() {
    let (app, _root) = test_app(Arc::new(EchoTextService));

    let (status, json) = post_form(
        app,
        "/ask/",
        &[
            Part::Text("question", "How do I treat this?"),
            Part::Text("context", "Tomato / Late Blight"),
            Part::Text("language", "bn"),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["answer"],
        "<bn>[en] How do I treat this? | Tomato / Late Blight"
    );
}

#[tokio::test]
async fn test_ask_with_canned_service() {
    let (app, _root) = test_app(Arc::new(CannedTextService::new()));

    let (status, json) = post_form(
        app,
        "/ask/",
        &[Part::Text("question", "How should I prevent spread?")],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["answer"]
        .as_str()
        .unwrap()
        .starts_with("Prevention methods"));
}

#[tokio::test]
async fn test_ask_empty_question_rejected() {
    let (app, _root) = test_app(Arc::new(EchoTextService));

    let (status, json) = post_form(app, "/ask/", &[Part::Text("question", "   ")]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "Question cannot be empty");
}

#[tokio::test]
async fn test_translate_text() {
    let (app, _root) = test_app(Arc::new(EchoTextService));

    let (status, json) = post_form(
        app,
        "/translate/",
        &[
            Part::Text("text", "Rice brown spot"),
            Part::Text("target_language", "bn"),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["translated_text"], "<bn>Rice brown spot");
}

#[tokio::test]
async fn test_translate_rejects_unsupported_language() {
    let (app, _root) = test_app(Arc::new(EchoTextService));

    let (status, json) = post_form(
        app,
        "/translate/",
        &[
            Part::Text("text", "Rice"),
            Part::Text("target_language", "de"),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "Supported languages: en, bn");
}

#[tokio::test]
async fn test_translate_rejects_empty_text() {
    let (app, _root) = test_app(Arc::new(EchoTextService));

    let (status, _) = post_form(
        app,
        "/translate/",
        &[Part::Text("text", ""), Part::Text("target_language", "bn")],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_translate_result_translates_each_field() {
    let (app, _root) = test_app(Arc::new(EchoTextService));

    let (status, json) = post_form(
        app,
        "/translate-result/",
        &[
            Part::Text("caption", "a leaf"),
            Part::Text("crop", "Tomato"),
            Part::Text("disease", ""),
            Part::Text("target_language", "bn"),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["caption"], "<bn>a leaf");
    assert_eq!(json["crop"], "<bn>Tomato");
    // empty fields are passed through untouched
    assert_eq!(json["disease"], "");
}

#[tokio::test]
async fn test_translate_result_requires_fields() {
    let (app, _root) = test_app(Arc::new(EchoTextService));

    let (status, json) = post_form(
        app,
        "/translate-result/",
        &[
            Part::Text("caption", "a leaf"),
            Part::Text("target_language", "en"),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["details"]["field"], "crop");
}
