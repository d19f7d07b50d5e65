// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{extract::State, Json};
use axum_extra::extract::Multipart;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::errors::ApiError;
use super::form::FormFields;
use crate::context::AppContext;
use crate::pipeline::AnalysisResult;
use crate::text::{answer_consistently, translate_analysis, Language};
use crate::vision::image_utils::is_image_content_type;
use crate::vision::BundleStatus;

pub const SERVICE_NAME: &str = "Crop Disease Detection API";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub status: String,
    pub version: String,
    pub endpoints: BTreeMap<String, String>,
    pub supported_languages: Vec<Language>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextServiceStatus {
    pub provider: &'static str,
    pub live: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub models: BundleStatus,
    pub text_service: TextServiceStatus,
    pub environment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub translated_text: String,
}

/// GET / - service description
pub async fn root_handler() -> Json<ServiceInfo> {
    let endpoints = [
        ("upload", "/upload-image/"),
        ("diagnose", "/diagnose/"),
        ("ask", "/ask/"),
        ("translate", "/translate/"),
        ("translate-result", "/translate-result/"),
        ("health", "/health"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    Json(ServiceInfo {
        message: SERVICE_NAME.to_string(),
        status: "running".to_string(),
        version: crate::version::VERSION.to_string(),
        endpoints,
        supported_languages: Language::SUPPORTED.to_vec(),
    })
}

/// GET /health - model and text service status
pub async fn health_handler(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    let models = ctx.pipeline.bundle().status();

    let mut issues = Vec::new();
    if !ctx.pipeline.bundle().trained() {
        issues.push("classifier is running without fine-tuned weights".to_string());
    }
    if !ctx.text.is_live() {
        issues.push("text service is using canned answers".to_string());
    }

    let status = if issues.is_empty() { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        models,
        text_service: TextServiceStatus {
            provider: ctx.text.name(),
            live: ctx.text.is_live(),
        },
        environment: ctx.config.server.environment.clone(),
        issues: (!issues.is_empty()).then_some(issues),
    })
}

/// POST /upload-image/ - classify and caption an uploaded photo
///
/// Fields: `file` (image/*), `language` (optional, `en` or `bn`).
pub async fn upload_image_handler(
    State(ctx): State<AppContext>,
    multipart: Multipart,
) -> Result<Json<AnalysisResult>, ApiError> {
    let mut form = FormFields::collect(multipart).await?;
    let language = form.language("language")?;

    let file = form.take_file().ok_or_else(|| ApiError::ValidationError {
        field: "file".to_string(),
        message: "file is required".to_string(),
    })?;

    if !is_image_content_type(file.content_type.as_deref()) {
        return Err(ApiError::InvalidRequest("File must be an image".to_string()));
    }

    debug!(
        "Analyzing upload {:?} ({} bytes, language={})",
        file.file_name,
        file.bytes.len(),
        language
    );

    let result = ctx.pipeline.analyze(file.bytes).await?;
    info!("Analysis: crop={}, disease={}", result.crop, result.disease);

    let result = match language {
        Language::En => result,
        target => translate_analysis(ctx.text.as_ref(), &result, target).await,
    };

    Ok(Json(result))
}

/// POST /diagnose/ - alias of upload-image
pub async fn diagnose_handler(
    state: State<AppContext>,
    multipart: Multipart,
) -> Result<Json<AnalysisResult>, ApiError> {
    upload_image_handler(state, multipart).await
}

/// POST /ask/ - answer a follow-up question about an analysis
pub async fn ask_handler(
    State(ctx): State<AppContext>,
    multipart: Multipart,
) -> Result<Json<AnswerResponse>, ApiError> {
    let form = FormFields::collect(multipart).await?;
    let question = form.require("question")?.trim();
    if question.is_empty() {
        return Err(ApiError::ValidationError {
            field: "question".to_string(),
            message: "Question cannot be empty".to_string(),
        });
    }
    let language = form.language("language")?;
    let context = form.text("context");

    let answer = answer_consistently(ctx.text.as_ref(), question, context, language).await;
    Ok(Json(AnswerResponse { answer }))
}

/// POST /translate/ - translate free text
pub async fn translate_handler(
    State(ctx): State<AppContext>,
    multipart: Multipart,
) -> Result<Json<TranslateResponse>, ApiError> {
    let form = FormFields::collect(multipart).await?;
    let text = form.require("text")?;
    if text.trim().is_empty() {
        return Err(ApiError::ValidationError {
            field: "text".to_string(),
            message: "Text cannot be empty".to_string(),
        });
    }
    let target = form.require_language("target_language")?;

    let translated_text = ctx.text.translate(text, target).await;
    Ok(Json(TranslateResponse { translated_text }))
}

/// POST /translate-result/ - translate a previous analysis
pub async fn translate_result_handler(
    State(ctx): State<AppContext>,
    multipart: Multipart,
) -> Result<Json<AnalysisResult>, ApiError> {
    let form = FormFields::collect(multipart).await?;
    let target = form.require_language("target_language")?;
    let result = AnalysisResult {
        caption: form.require("caption")?.to_string(),
        crop: form.require("crop")?.to_string(),
        disease: form.require("disease")?.to_string(),
    };

    Ok(Json(
        translate_analysis(ctx.text.as_ref(), &result, target).await,
    ))
}
