// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision encoder half of an encoder/decoder captioner
//!
//! Produces the `encoder_hidden_states` the text decoder cross-attends to.

use anyhow::{Context, Result};
use ndarray::{Array3, Array4, Ix3};
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::vision::device::DeviceTag;

/// File names vision encoders are exported under, in preference order
pub const ENCODER_FILES: &[&str] = &[
    "onnx/vision_model.onnx",
    "onnx/encoder_model.onnx",
    "vision_model.onnx",
    "encoder_model.onnx",
    "encoder.onnx",
];

pub struct VisionEncoder {
    session: Mutex<Session>,
    input_name: String,
}

impl std::fmt::Debug for VisionEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionEncoder")
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl VisionEncoder {
    pub fn load(model_path: &Path, device: DeviceTag) -> Result<Self> {
        info!("Loading caption encoder from {}", model_path.display());

        let session = device.session(model_path)?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "pixel_values".to_string());

        debug!("Caption encoder input: {}", input_name);

        Ok(Self {
            session: Mutex::new(session),
            input_name,
        })
    }

    /// Encode a `[1, 3, H, W]` tensor into `[1, seq_len, hidden]` states
    pub fn encode(&self, pixels: &Array4<f32>) -> Result<Array3<f32>> {
        let shape = pixels.shape();
        if shape.len() != 4 || shape[0] != 1 || shape[1] != 3 {
            anyhow::bail!("Invalid input shape: {:?}, expected [1, 3, H, W]", shape);
        }

        let input = Value::from_array(pixels.to_owned()).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Caption encoder session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .context("Encoder inference failed")?;

        let hidden = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract encoder output")?;

        debug!("Encoder output shape: {:?}", hidden.shape());

        to_hidden_states(hidden.to_owned())
    }
}

/// Normalize encoder output into `[1, seq_len, hidden]`
fn to_hidden_states(output: ndarray::ArrayD<f32>) -> Result<Array3<f32>> {
    let shape = output.shape().to_vec();
    match shape.len() {
        3 => output
            .into_dimensionality::<Ix3>()
            .context("Unexpected encoder output layout"),
        2 => output
            .into_shape_with_order((1, shape[0], shape[1]))
            .context("Unexpected encoder output layout"),
        _ => anyhow::bail!("Unexpected encoder output shape: {:?}", shape),
    }
}
