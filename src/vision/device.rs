// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Compute device selection for ONNX sessions
//!
//! The accelerator is probed once at startup. Every session in the bundle is
//! built for the resulting tag, so the classifier and the captioners never
//! disagree about where they run.

use anyhow::{Context, Result};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider, ExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Worker threads per ONNX session
const INTRA_THREADS: usize = 4;

/// Requested compute device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePreference {
    /// Use CUDA when available
    #[default]
    Auto,
    Cpu,
    Cuda,
}

impl DevicePreference {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "auto" | "" => Some(Self::Auto),
            "cpu" => Some(Self::Cpu),
            "cuda" | "gpu" => Some(Self::Cuda),
            _ => None,
        }
    }
}

/// Device the process committed to at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceTag {
    Cpu,
    Cuda,
}

impl fmt::Display for DeviceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceTag::Cpu => write!(f, "cpu"),
            DeviceTag::Cuda => write!(f, "cuda"),
        }
    }
}

impl DeviceTag {
    /// Probe the accelerator once and settle on a device
    pub fn probe(preference: DevicePreference) -> Self {
        if preference == DevicePreference::Cpu {
            info!("Compute device: cpu (requested)");
            return DeviceTag::Cpu;
        }

        let cuda_available = CUDAExecutionProvider::default()
            .is_available()
            .unwrap_or(false);

        match (cuda_available, preference) {
            (true, _) => {
                info!("✅ CUDA execution provider available, using cuda");
                DeviceTag::Cuda
            }
            (false, DevicePreference::Cuda) => {
                warn!("⚠️ CUDA requested but not available, using cpu");
                DeviceTag::Cpu
            }
            (false, _) => {
                info!("Compute device: cpu (no CUDA execution provider)");
                DeviceTag::Cpu
            }
        }
    }

    /// Build an ONNX session for a model file on this device
    ///
    /// CUDA session creation can still fail for a specific graph (unsupported
    /// operators, VRAM); such models fall back to the CPU provider.
    pub fn session(&self, model_path: &Path) -> Result<Session> {
        if !model_path.is_file() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }

        if *self == DeviceTag::Cuda {
            match build_session(model_path, true) {
                Ok(session) => return Ok(session),
                Err(e) => {
                    warn!(
                        "⚠️  CUDA session for {} failed: {}. Falling back to CPU",
                        model_path.display(),
                        e
                    );
                }
            }
        }

        build_session(model_path, false)
    }
}

fn build_session(model_path: &Path, cuda: bool) -> Result<Session> {
    let builder = Session::builder().context("Failed to create session builder")?;

    let builder = if cuda {
        builder
            .with_execution_providers([CUDAExecutionProvider::default().build()])
            .context("Failed to set CUDA execution provider")?
    } else {
        builder
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
    };

    builder
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(INTRA_THREADS)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))
}
