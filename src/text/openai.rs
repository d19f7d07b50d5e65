// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OpenAI-compatible chat client for answers and translations

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::canned::CannedTextService;
use super::{Language, TextService};
use crate::config::TextConfig;

// --- OpenAI-compatible serde structs ---

#[derive(serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(serde::Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(serde::Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

const ANSWER_RULES: &str = "Keep answers CONCISE and TO THE POINT: \
- Maximum 2-3 short sentences \
- Start with direct answer \
- Include only essential treatment/prevention steps \
- Avoid lengthy explanations \
- Use simple, clear language \
IMPORTANT: Do NOT use any markdown formatting like **bold** or *italic*. Use plain text only.";

const ANSWER_MAX_TOKENS: u32 = 150;
const ANSWER_TEMPERATURE: f32 = 0.7;
const TRANSLATE_MAX_TOKENS: u32 = 200;
const TRANSLATE_TEMPERATURE: f32 = 0.3;

fn answer_system_prompt(language: Language) -> String {
    let base = "You are an agricultural assistant that helps farmers with crop disease questions.";
    match language {
        Language::En => format!("{} {}", base, ANSWER_RULES),
        other => format!(
            "{} ALWAYS respond in {}. If the question is in another language, understand it but respond in {}. {}",
            base,
            other.prompt_name(),
            other.prompt_name(),
            ANSWER_RULES
        ),
    }
}

fn translate_system_prompt(target: Language) -> String {
    format!(
        "You are a professional translator. Translate the given text to {}. \
Maintain the original meaning and context. If it's about agriculture, use appropriate {} agricultural terms.",
        target.prompt_name(),
        target.prompt_name()
    )
}

/// Build the user prompt, prefixing analysis context when present
fn user_prompt(question: &str, context: Option<&str>) -> String {
    match context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(context) => format!("Context: {}\n\nQuestion: {}", context, question),
        None => question.to_string(),
    }
}

/// Text service backed by a chat completions endpoint
///
/// Provider errors are logged and answered from [`CannedTextService`].
pub struct OpenAiTextService {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    fallback: CannedTextService,
}

impl std::fmt::Debug for OpenAiTextService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiTextService")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiTextService {
    pub fn new(config: &TextConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let endpoint = config.openai_base_url.trim_end_matches('/').to_string();
        info!(
            "OpenAI client configured: endpoint={}, model={}",
            endpoint, config.openai_model
        );

        Ok(Self {
            client,
            endpoint,
            api_key,
            model: config.openai_model.clone(),
            fallback: CannedTextService::new(),
        })
    }

    /// Cheap request proving the key and endpoint work
    pub async fn verify(&self) -> Result<()> {
        self.complete("You are a health check.", "Hi", 1, 0.0)
            .await
            .map(|_| ())
    }

    async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens,
            temperature,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let chat: ChatResponse = response.json().await?;
        let text = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        debug!("Chat completion returned {} chars", text.len());
        Ok(text)
    }
}

#[async_trait]
impl TextService for OpenAiTextService {
    async fn answer(&self, question: &str, context: Option<&str>, language: Language) -> String {
        let system = answer_system_prompt(language);
        let prompt = user_prompt(question, context);

        match self
            .complete(&system, &prompt, ANSWER_MAX_TOKENS, ANSWER_TEMPERATURE)
            .await
        {
            Ok(answer) if !answer.is_empty() => answer,
            Ok(_) => {
                warn!("⚠️ Empty answer from provider, using fallback response");
                self.fallback.answer(question, context, language).await
            }
            Err(e) => {
                warn!("⚠️ Failed to get answer from provider: {}", e);
                self.fallback.answer(question, context, language).await
            }
        }
    }

    async fn translate(&self, text: &str, target: Language) -> String {
        let system = translate_system_prompt(target);
        let prompt = format!("Translate this text: {}", text);

        match self
            .complete(&system, &prompt, TRANSLATE_MAX_TOKENS, TRANSLATE_TEMPERATURE)
            .await
        {
            Ok(translated) if !translated.is_empty() => translated,
            Ok(_) => text.to_string(),
            Err(e) => {
                warn!("⚠️ Translation to {} failed: {}", target, e);
                text.to_string()
            }
        }
    }

    fn name(&self) -> &'static str {
        "openai"
    }

    fn is_live(&self) -> bool {
        true
    }
}
