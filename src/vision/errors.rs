// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Startup errors raised while provisioning vision models

use std::path::PathBuf;
use thiserror::Error;

/// Fatal model provisioning failures
///
/// Either variant aborts startup; the node never serves requests without a
/// classifier.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model artifacts not found (checked: {})", format_paths(.checked))]
    ArtifactNotFound { checked: Vec<PathBuf> },

    #[error("Failed to load {component}: {}", join_attempts(.attempts))]
    ModelLoad {
        component: String,
        attempts: Vec<String>,
    },
}

fn join_attempts(attempts: &[String]) -> String {
    if attempts.is_empty() {
        return "no strategies attempted".to_string();
    }
    attempts.join("; ")
}

fn format_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "no candidate paths".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
