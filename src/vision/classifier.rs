// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crop/disease image classifier
//!
//! The classifier is an opaque ONNX graph mapping a normalized
//! `[1, 3, H, W]` tensor to one logit per label.

use anyhow::{Context, Result};
use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use super::device::DeviceTag;

/// Anything that maps a preprocessed image tensor to class logits
pub trait ImageClassifier: Send + Sync {
    /// Raw logits for a single image
    fn logits(&self, pixels: &Array4<f32>) -> Result<Vec<f32>>;

    /// Short name for logs and health output
    fn name(&self) -> &str {
        "classifier"
    }
}

/// Winning class of one forward pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub index: usize,
    pub confidence: f32,
}

/// Argmax with softmax confidence over the first `width` logits
///
/// `width` limits the classes considered; a substitute base model can emit
/// more logits than the manifest has labels.
pub fn top_prediction(logits: &[f32], width: Option<usize>) -> Result<Prediction> {
    let considered = match width {
        Some(w) if w > 0 && w < logits.len() => &logits[..w],
        _ => logits,
    };

    if considered.is_empty() {
        anyhow::bail!("Classifier returned no logits");
    }
    if considered.iter().any(|v| !v.is_finite()) {
        anyhow::bail!("Classifier returned non-finite logits");
    }

    let (index, max) = considered
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, v)| {
            if v > best.1 {
                (i, v)
            } else {
                best
            }
        });

    let denom: f32 = considered.iter().map(|v| (v - max).exp()).sum();
    let confidence = 1.0 / denom;

    Ok(Prediction { index, confidence })
}

/// Classifier backed by an ONNX Runtime session
pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_name: String,
    name: String,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("name", &self.name)
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl OnnxClassifier {
    /// Load classifier weights onto the given device
    pub fn load(model_path: &Path, device: DeviceTag, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        info!("Loading classifier {} from {}", name, model_path.display());

        let session = device.session(model_path)?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "pixel_values".to_string());

        debug!("Classifier {} input: {}", name, input_name);

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            name,
        })
    }
}

impl ImageClassifier for OnnxClassifier {
    fn logits(&self, pixels: &Array4<f32>) -> Result<Vec<f32>> {
        let input = Value::from_array(pixels.to_owned()).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Classifier session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .context("Classifier inference failed")?;

        let logits = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract logits tensor")?;

        Ok(logits.iter().copied().collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
