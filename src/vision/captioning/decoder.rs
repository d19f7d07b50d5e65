// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text decoder half of an encoder/decoder captioner
//!
//! Greedy autoregressive decoding over a decoder exported without a KV
//! cache. The full token prefix is re-fed on every step, which keeps the
//! graph interface uniform across the caption models in use.

use anyhow::{Context, Result};
use ndarray::{Array2, Array3, IxDyn};
use ort::session::Session;
use ort::value::{DynValue, Value};
use serde_json::Value as JsonValue;
use std::path::Path;
use std::sync::Mutex;
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::vision::device::DeviceTag;

/// Default bound on generated caption tokens
pub const DEFAULT_MAX_TOKENS: usize = 50;

/// Minimum tokens to generate
pub const MIN_TOKENS: usize = 5;

/// Maximum tokens to generate
pub const MAX_TOKENS: usize = 200;

/// File names text decoders are exported under, in preference order
pub const DECODER_FILES: &[&str] = &[
    "onnx/text_decoder_model.onnx",
    "onnx/decoder_model.onnx",
    "text_decoder_model.onnx",
    "decoder_model.onnx",
    "decoder.onnx",
];

const INPUT_IDS: &str = "input_ids";
const ATTENTION_MASK: &str = "attention_mask";
const ENCODER_HIDDEN_STATES: &str = "encoder_hidden_states";
const ENCODER_ATTENTION_MASK: &str = "encoder_attention_mask";

/// Special token ids steering generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationConfig {
    /// First token fed to the decoder
    pub start_token_id: u32,
    /// Token that ends the caption
    pub eos_token_id: u32,
}

impl GenerationConfig {
    /// Read token ids from `config.json` and, when present, `generation_config.json`
    ///
    /// Generation config values override the model config. BLIP keeps its
    /// ids under `text_config` and ends captions on `sep_token_id`.
    pub fn from_json(config: &JsonValue, generation: Option<&JsonValue>) -> Result<Self> {
        let text = config.get("text_config");
        let sources: Vec<&JsonValue> = generation
            .into_iter()
            .chain(std::iter::once(config))
            .chain(text)
            .collect();

        let start_token_id = first_id(&sources, &["decoder_start_token_id", "bos_token_id"])
            .context("No decoder start token in model config")?;

        let eos_token_id = text
            .and_then(|t| token_id(t, "sep_token_id"))
            .or_else(|| first_id(&sources, &["eos_token_id"]))
            .context("No end-of-sequence token in model config")?;

        Ok(Self {
            start_token_id,
            eos_token_id,
        })
    }
}

fn token_id(value: &JsonValue, key: &str) -> Option<u32> {
    match value.get(key)? {
        JsonValue::Number(n) => n.as_u64().map(|v| v as u32),
        // some exports list several eos ids
        JsonValue::Array(ids) => ids.first()?.as_u64().map(|v| v as u32),
        _ => None,
    }
}

fn first_id(sources: &[&JsonValue], keys: &[&str]) -> Option<u32> {
    keys.iter()
        .find_map(|key| sources.iter().find_map(|source| token_id(source, key)))
}

pub struct CaptionDecoder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    generation: GenerationConfig,
    input_names: Vec<String>,
    max_tokens: usize,
}

impl std::fmt::Debug for CaptionDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptionDecoder")
            .field("generation", &self.generation)
            .field("input_names", &self.input_names)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl CaptionDecoder {
    /// Load a decoder graph with its tokenizer
    ///
    /// # Errors
    /// Fails when a file is missing or the graph expects inputs other than
    /// ids, masks and encoder states (merged/KV-cache exports).
    pub fn load(
        model_path: &Path,
        tokenizer_path: &Path,
        generation: GenerationConfig,
        device: DeviceTag,
    ) -> Result<Self> {
        if !tokenizer_path.is_file() {
            anyhow::bail!("Caption tokenizer not found: {}", tokenizer_path.display());
        }

        info!("Loading caption decoder from {}", model_path.display());

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        let session = device.session(model_path)?;

        let input_names: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
        debug!("Decoder inputs: {:?}", input_names);

        if !input_names.iter().any(|n| n == INPUT_IDS) {
            anyhow::bail!("Decoder graph has no {} input", INPUT_IDS);
        }
        if let Some(unsupported) = input_names.iter().find(|n| {
            ![INPUT_IDS, ATTENTION_MASK, ENCODER_HIDDEN_STATES, ENCODER_ATTENTION_MASK]
                .contains(&n.as_str())
        }) {
            anyhow::bail!("Decoder graph input '{}' is not supported", unsupported);
        }

        info!(
            "✅ Caption decoder loaded (start={}, eos={}, vocab={})",
            generation.start_token_id,
            generation.eos_token_id,
            tokenizer.get_vocab_size(true)
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            generation,
            input_names,
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    /// Set the generation bound
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens.clamp(MIN_TOKENS, MAX_TOKENS);
        if self.max_tokens != max_tokens {
            warn!(
                "Caption token limit {} outside {}..={}, using {}",
                max_tokens, MIN_TOKENS, MAX_TOKENS, self.max_tokens
            );
        }
        self
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Greedy decode a caption from encoder hidden states
    pub fn generate(&self, hidden_states: &Array3<f32>) -> Result<String> {
        let mut tokens = vec![self.generation.start_token_id];

        for step in 0..self.max_tokens {
            let logits = self.forward(hidden_states, &tokens)?;
            let next = argmax(&logits)?;

            if next == self.generation.eos_token_id {
                debug!("Generation stopped at EOS after {} steps", step + 1);
                break;
            }
            tokens.push(next);
        }

        // start token is a decoder control token, never part of the caption
        let text = self
            .tokenizer
            .decode(&tokens[1..], true)
            .map_err(|e| anyhow::anyhow!("Decoding failed: {}", e))?;

        Ok(text.trim().to_string())
    }

    fn forward(&self, hidden_states: &Array3<f32>, tokens: &[u32]) -> Result<Vec<f32>> {
        let seq_len = tokens.len();
        let enc_len = hidden_states.shape()[1];

        let mut inputs: Vec<(String, DynValue)> = Vec::with_capacity(self.input_names.len());
        for name in &self.input_names {
            let value = match name.as_str() {
                INPUT_IDS => {
                    let ids = Array2::from_shape_vec(
                        (1, seq_len),
                        tokens.iter().map(|&t| t as i64).collect(),
                    )?;
                    Value::from_array(ids)?.into_dyn()
                }
                ATTENTION_MASK => Value::from_array(Array2::<i64>::ones((1, seq_len)))?.into_dyn(),
                ENCODER_HIDDEN_STATES => Value::from_array(hidden_states.to_owned())?.into_dyn(),
                ENCODER_ATTENTION_MASK => {
                    Value::from_array(Array2::<i64>::ones((1, enc_len)))?.into_dyn()
                }
                other => anyhow::bail!("Unsupported decoder input '{}'", other),
            };
            inputs.push((name.clone(), value));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Caption decoder session lock poisoned"))?;

        let outputs = session.run(inputs).context("Decoder inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract decoder logits")?;

        // logits for the last position: [1, seq, vocab] or [seq, vocab]
        let shape = output.shape();
        let (last_pos, vocab) = match shape.len() {
            3 => (shape[1] - 1, shape[2]),
            2 => (shape[0] - 1, shape[1]),
            _ => anyhow::bail!("Unexpected decoder output shape: {:?}", shape),
        };

        let logits = (0..vocab)
            .map(|v| match shape.len() {
                3 => output[IxDyn(&[0, last_pos, v])],
                _ => output[IxDyn(&[last_pos, v])],
            })
            .collect();

        Ok(logits)
    }
}

fn argmax(logits: &[f32]) -> Result<u32> {
    logits
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(idx, _)| idx as u32)
        .ok_or_else(|| anyhow::anyhow!("Empty logits vector"))
}
