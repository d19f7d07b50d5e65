// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Encoder/decoder caption model

use anyhow::{Context, Result};
use image::DynamicImage;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use super::decoder::{CaptionDecoder, GenerationConfig, DECODER_FILES};
use super::encoder::{VisionEncoder, ENCODER_FILES};
use crate::vision::artifacts::{MANIFEST_FILE, PREPROCESSOR_FILE};
use crate::vision::device::DeviceTag;
use crate::vision::preprocessing::PreprocessConfig;
use crate::vision::source::ModelSource;

const TOKENIZER_FILE: &str = "tokenizer.json";
const GENERATION_CONFIG_FILE: &str = "generation_config.json";

/// Anything that can describe an image in one sentence
pub trait CaptionModel: Send + Sync {
    fn caption(&self, image: &DynamicImage) -> Result<String>;

    /// Short name for logs and health output
    fn name(&self) -> &str;
}

/// Caption model built from ONNX encoder and decoder graphs
#[derive(Debug)]
pub struct OnnxCaptioner {
    name: String,
    preprocess: PreprocessConfig,
    encoder: VisionEncoder,
    decoder: CaptionDecoder,
}

impl OnnxCaptioner {
    /// Load every file the captioner needs from `source`
    ///
    /// Expected files:
    /// - a vision encoder (`onnx/vision_model.onnx`, `onnx/encoder_model.onnx`, ...)
    /// - a text decoder without KV cache (`onnx/text_decoder_model.onnx`, ...)
    /// - `tokenizer.json` and `config.json`
    /// - optionally `preprocessor_config.json` and `generation_config.json`
    pub fn load(
        name: impl Into<String>,
        source: &ModelSource,
        device: DeviceTag,
        max_tokens: usize,
    ) -> Result<Self> {
        let name = name.into();
        info!("Loading caption model {} from {}", name, source);

        let encoder_path = source.fetch_first(ENCODER_FILES)?;
        let decoder_path = source.fetch_first(DECODER_FILES)?;
        let tokenizer_path = source.fetch(TOKENIZER_FILE)?;
        let config = read_json(&source.fetch(MANIFEST_FILE)?)?;
        let generation_file = source
            .fetch_optional(GENERATION_CONFIG_FILE)
            .map(|path| read_json(&path))
            .transpose()?;

        let preprocess = match source.fetch_optional(PREPROCESSOR_FILE) {
            Some(path) => PreprocessConfig::from_file(&path)?,
            None => PreprocessConfig::default(),
        };

        let generation = GenerationConfig::from_json(&config, generation_file.as_ref())?;

        let encoder = VisionEncoder::load(&encoder_path, device)?;
        let decoder = CaptionDecoder::load(&decoder_path, &tokenizer_path, generation, device)?
            .with_max_tokens(max_tokens);

        info!(
            "✅ Caption model {} loaded ({}x{}, max {} tokens)",
            name,
            preprocess.width,
            preprocess.height,
            decoder.max_tokens()
        );

        Ok(Self {
            name,
            preprocess,
            encoder,
            decoder,
        })
    }
}

impl CaptionModel for OnnxCaptioner {
    fn caption(&self, image: &DynamicImage) -> Result<String> {
        let start = Instant::now();
        let pixels = self.preprocess.apply(image);
        let hidden = self.encoder.encode(&pixels)?;
        let text = self.decoder.generate(&hidden)?;
        debug!(
            "{} captioned image in {}ms: '{}'",
            self.name,
            start.elapsed().as_millis(),
            text
        );
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}
