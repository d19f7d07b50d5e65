// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision models for crop/disease analysis
//!
//! This module provides:
//! - Artifact resolution for the fine-tuned classifier
//! - Startup provisioning with ordered fallbacks (trained, substitute, lightweight)
//! - ONNX classifier and encoder/decoder captioners
//! - Label and caption normalization
//!
//! All models are loaded once and shared read-only between requests.

pub mod artifacts;
pub mod captioning;
pub mod classifier;
pub mod device;
pub mod errors;
pub mod image_utils;
pub mod normalizer;
pub mod preprocessing;
pub mod provisioner;
pub mod source;
pub mod strategy;

pub use artifacts::{ArtifactLocation, ArtifactResolver, LabelMap};
pub use captioning::{CaptionModel, OnnxCaptioner};
pub use classifier::{top_prediction, ImageClassifier, OnnxClassifier, Prediction};
pub use device::{DevicePreference, DeviceTag};
pub use errors::ModelError;
pub use image_utils::{decode_image_bytes, ImageError, MAX_IMAGE_SIZE};
pub use normalizer::{merge_captions, split_label, DEGRADED_MARKER};
pub use preprocessing::PreprocessConfig;
pub use provisioner::{
    BundleStatus, CaptionModels, CaptionTier, ClassifierHandle, ClassifierMode, ModelBundle,
    ModelFactory, ModelProvisioner, OnnxModelFactory,
};
pub use source::ModelSource;
pub use strategy::{run_chain, LoadOutcome, LoadStrategy};
