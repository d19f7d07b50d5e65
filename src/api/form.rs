// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multipart form collection

use axum_extra::extract::Multipart;
use std::collections::HashMap;

use super::errors::ApiError;
use crate::text::Language;

/// Uploaded file part
#[derive(Debug, Clone)]
pub struct FilePart {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// All parts of a multipart body, text fields and at most one file
#[derive(Debug, Default)]
pub struct FormFields {
    text: HashMap<String, String>,
    file: Option<FilePart>,
}

impl FormFields {
    /// Drain a multipart body
    ///
    /// The part named `file` is kept as bytes; every other part is read as
    /// UTF-8 text. Later duplicates replace earlier ones.
    pub async fn collect(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut fields = FormFields::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("Malformed form data: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == "file" {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::PayloadTooLarge(format!("Failed to read upload: {}", e))
                })?;
                fields.file = Some(FilePart {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            } else {
                let value = field.text().await.map_err(|e| {
                    ApiError::InvalidRequest(format!("Invalid value for {}: {}", name, e))
                })?;
                fields.text.insert(name, value);
            }
        }

        Ok(fields)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.text.get(name).map(String::as_str)
    }

    /// Required text field; missing is an error, empty is allowed
    pub fn require(&self, name: &str) -> Result<&str, ApiError> {
        self.text(name).ok_or_else(|| ApiError::ValidationError {
            field: name.to_string(),
            message: format!("{} is required", name),
        })
    }

    /// Language field, defaulting to English when absent
    pub fn language(&self, name: &str) -> Result<Language, ApiError> {
        match self.text(name) {
            None => Ok(Language::default()),
            Some(code) => {
                Language::parse(code).ok_or_else(|| ApiError::UnsupportedLanguage(code.to_string()))
            }
        }
    }

    /// Language field that must be present
    pub fn require_language(&self, name: &str) -> Result<Language, ApiError> {
        let code = self.require(name)?;
        Language::parse(code).ok_or_else(|| ApiError::UnsupportedLanguage(code.to_string()))
    }

    pub fn take_file(&mut self) -> Option<FilePart> {
        self.file.take()
    }
}
