// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Question answering and translation for farmers
//!
//! The node talks to an OpenAI-compatible chat API when a key is configured
//! and otherwise answers from a small set of canned agricultural responses.
//! Every call returns a best-effort string; provider failures never reach
//! the HTTP layer.

pub mod canned;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::TextConfig;
use crate::pipeline::AnalysisResult;

pub use canned::CannedTextService;
pub use openai::OpenAiTextService;

/// Languages the node answers in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Bn,
}

impl Language {
    pub const SUPPORTED: [Language; 2] = [Language::En, Language::Bn];

    /// Parse an ISO 639-1 code
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "en" => Some(Language::En),
            "bn" => Some(Language::Bn),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Bn => "bn",
        }
    }

    /// Name used inside provider prompts
    pub fn prompt_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Bn => "Bengali (বাংলা)",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Question answering and translation backend
#[async_trait]
pub trait TextService: Send + Sync {
    /// Answer a farmer's question, optionally grounded in an analysis context
    async fn answer(&self, question: &str, context: Option<&str>, language: Language) -> String;

    /// Translate free text into `target`
    async fn translate(&self, text: &str, target: Language) -> String;

    /// Provider name for logs and health output
    fn name(&self) -> &'static str;

    /// Whether answers come from a live language model
    fn is_live(&self) -> bool {
        false
    }
}

/// Answer in English first, then translate
///
/// Keeps the substance of an answer identical across languages. Canned
/// answers already exist in every language and are returned directly.
pub async fn answer_consistently(
    service: &dyn TextService,
    question: &str,
    context: Option<&str>,
    language: Language,
) -> String {
    if !service.is_live() {
        return service.answer(question, context, language).await;
    }

    let english = service.answer(question, context, Language::En).await;
    match language {
        Language::En => english,
        other => service.translate(&english, other).await,
    }
}

/// Translate each non-empty field of an analysis result
pub async fn translate_analysis(
    service: &dyn TextService,
    result: &AnalysisResult,
    target: Language,
) -> AnalysisResult {
    async fn field(service: &dyn TextService, value: &str, target: Language) -> String {
        if value.trim().is_empty() {
            value.to_string()
        } else {
            service.translate(value, target).await
        }
    }

    AnalysisResult {
        caption: field(service, &result.caption, target).await,
        crop: field(service, &result.crop, target).await,
        disease: field(service, &result.disease, target).await,
    }
}

/// Pick the text backend for this process
///
/// A configured key is verified with a one-token request; a rejected key or
/// unreachable provider puts the node in canned mode for its lifetime.
pub async fn build_text_service(config: &TextConfig) -> Arc<dyn TextService> {
    let Some(api_key) = config.openai_api_key.clone() else {
        warn!("⚠️ No OpenAI API key provided, running text service in fallback mode");
        return Arc::new(CannedTextService::new());
    };

    let service = match OpenAiTextService::new(config, api_key) {
        Ok(service) => service,
        Err(e) => {
            warn!("⚠️ Failed to build OpenAI client: {}. Using fallback mode", e);
            return Arc::new(CannedTextService::new());
        }
    };

    if config.verify_on_startup {
        if let Err(e) = service.verify().await {
            warn!("⚠️ OpenAI API key validation failed: {}. Using fallback mode", e);
            return Arc::new(CannedTextService::new());
        }
    }

    info!("✅ OpenAI text service ready ({})", config.openai_model);
    Arc::new(service)
}
