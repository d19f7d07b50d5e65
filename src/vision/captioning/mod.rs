// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image captioning models
//!
//! Captioners are pretrained vision encoder + text decoder pairs exported to
//! ONNX (BLIP, ViT-GPT2). They provide the free-text description shown next
//! to the crop/disease prediction.

pub mod decoder;
pub mod encoder;
pub mod model;

pub use decoder::{CaptionDecoder, GenerationConfig, DEFAULT_MAX_TOKENS, MAX_TOKENS, MIN_TOKENS};
pub use encoder::VisionEncoder;
pub use model::{CaptionModel, OnnxCaptioner};
