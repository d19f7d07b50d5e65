// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-request analysis pipeline
//!
//! Decodes an uploaded photo, runs the classifier and the captioner from the
//! shared [`ModelBundle`], and normalizes the output into an
//! [`AnalysisResult`]. Model inference is CPU/GPU bound, so the async entry
//! point moves the work onto tokio's blocking pool.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

use crate::vision::classifier::top_prediction;
use crate::vision::image_utils::{decode_image_bytes, ImageError};
use crate::vision::normalizer::{mark_degraded, merge_captions, split_label};
use crate::vision::provisioner::ModelBundle;
use crate::vision::captioning::CaptionModel;

/// Caption used when no captioner could be provisioned
pub const PRIMARY_MOCK_CAPTION: &str = "Image shows agricultural crop for disease analysis";

/// Caption used when the loaded captioner fails on a request
pub const PRIMARY_FALLBACK_CAPTION: &str = "Agricultural crop image for disease detection";

/// Secondary caption used when no secondary captioner is loaded
pub const SECONDARY_MOCK_CAPTION: &str = "Crop plant with potential disease symptoms visible";

/// Secondary caption used when the secondary captioner fails on a request
pub const SECONDARY_FALLBACK_CAPTION: &str =
    "Plant leaf showing characteristics for agricultural analysis";

/// Per-request failures
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid image: {0}")]
    ImageDecode(#[from] ImageError),

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Normalized classifier output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    /// Manifest label the winning index mapped to
    pub raw_label: String,
    pub crop: String,
    pub disease: String,
    pub confidence: f32,
    /// Produced by a classifier without fine-tuned weights
    pub degraded: bool,
}

/// Where a caption came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionSource {
    /// Generated by a loaded model
    Primary,
    /// Static text after the loaded model failed
    Fallback,
    /// Static text because no model is loaded
    Mock,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptionResult {
    pub text: String,
    pub source: CaptionSource,
}

/// Final per-image result returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub caption: String,
    pub crop: String,
    pub disease: String,
}

/// Stateless analysis over a shared model bundle
#[derive(Debug, Clone)]
pub struct AnalysisPipeline {
    bundle: Arc<ModelBundle>,
    merge_captions: bool,
}

impl AnalysisPipeline {
    pub fn new(bundle: Arc<ModelBundle>) -> Self {
        Self {
            bundle,
            merge_captions: false,
        }
    }

    /// Fold the secondary captioner into every caption
    pub fn with_caption_merge(mut self, enabled: bool) -> Self {
        self.merge_captions = enabled;
        self
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    /// Predict crop and disease for a decoded image
    pub fn classify(&self, image: &DynamicImage) -> Result<ClassificationResult, PipelineError> {
        let handle = &self.bundle.classifier;
        let degraded = !self.bundle.trained();

        let pixels = handle.preprocessor.apply(image);
        let logits = handle
            .model
            .logits(&pixels)
            .map_err(|e| PipelineError::Inference(format!("{:#}", e)))?;

        // a substitute base model may emit more logits than there are labels
        let width = degraded.then(|| handle.labels.span());
        let prediction = top_prediction(&logits, width)
            .map_err(|e| PipelineError::Inference(e.to_string()))?;

        let raw_label = handle.labels.label_for(prediction.index).to_string();
        let (mut crop, mut disease) = split_label(&raw_label);

        if degraded {
            warn!(
                "⚠️ Prediction from UNTRAINED classifier: {} ({:.3})",
                raw_label, prediction.confidence
            );
            crop = mark_degraded(&crop);
            disease = mark_degraded(&disease);
        }

        debug!(
            "Classified as {} / {} (index {}, confidence {:.3})",
            crop, disease, prediction.index, prediction.confidence
        );

        Ok(ClassificationResult {
            raw_label,
            crop,
            disease,
            confidence: prediction.confidence,
            degraded,
        })
    }

    /// Caption from the primary captioner; never fails
    pub fn caption(&self, image: &DynamicImage) -> CaptionResult {
        run_captioner(
            self.bundle.captioners.primary.as_deref(),
            image,
            PRIMARY_MOCK_CAPTION,
            PRIMARY_FALLBACK_CAPTION,
        )
    }

    /// Caption from the secondary captioner; never fails
    pub fn secondary_caption(&self, image: &DynamicImage) -> CaptionResult {
        run_captioner(
            self.bundle.captioners.secondary.as_deref(),
            image,
            SECONDARY_MOCK_CAPTION,
            SECONDARY_FALLBACK_CAPTION,
        )
    }

    /// Classify and caption a decoded image
    pub fn analyze_image(&self, image: &DynamicImage) -> Result<AnalysisResult, PipelineError> {
        let start = Instant::now();
        let classification = self.classify(image)?;
        let primary = self.caption(image);

        // merging against a canned secondary caption only adds noise
        let secondary = if self.merge_captions && self.bundle.captioners.secondary.is_some() {
            self.secondary_caption(image).text
        } else {
            String::new()
        };
        let caption = merge_captions(&primary.text, &secondary);

        debug!(
            "Analysis finished in {}ms (caption source: {:?})",
            start.elapsed().as_millis(),
            primary.source
        );

        Ok(AnalysisResult {
            caption,
            crop: classification.crop,
            disease: classification.disease,
        })
    }

    /// Decode and analyze raw upload bytes on the current thread
    pub fn analyze_blocking(&self, bytes: &[u8]) -> Result<AnalysisResult, PipelineError> {
        let (image, info) = decode_image_bytes(bytes)?;
        debug!(
            "Decoded {:?} upload {}x{} ({} bytes)",
            info.format, info.width, info.height, info.size_bytes
        );
        self.analyze_image(&image)
    }

    /// Decode and analyze raw upload bytes on the blocking pool
    pub async fn analyze(&self, bytes: Vec<u8>) -> Result<AnalysisResult, PipelineError> {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || pipeline.analyze_blocking(&bytes))
            .await
            .map_err(|e| PipelineError::Inference(format!("Analysis task failed: {}", e)))?
    }
}

fn run_captioner(
    model: Option<&dyn CaptionModel>,
    image: &DynamicImage,
    mock: &str,
    fallback: &str,
) -> CaptionResult {
    let Some(model) = model else {
        return CaptionResult {
            text: mock.to_string(),
            source: CaptionSource::Mock,
        };
    };

    match model.caption(image) {
        Ok(text) if !text.trim().is_empty() => CaptionResult {
            text,
            source: CaptionSource::Primary,
        },
        Ok(_) => {
            warn!("⚠️ Captioner {} returned an empty caption", model.name());
            CaptionResult {
                text: fallback.to_string(),
                source: CaptionSource::Fallback,
            }
        }
        Err(e) => {
            warn!("⚠️ Captioner {} failed: {:#}", model.name(), e);
            CaptionResult {
                text: fallback.to_string(),
                source: CaptionSource::Fallback,
            }
        }
    }
}
