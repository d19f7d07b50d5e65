// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model artifact resolution
//!
//! The fine-tuned classifier may be deployed in several places depending on
//! how the node is launched (repository root, backend directory, container
//! image). Candidates are probed once at startup in declaration order and the
//! first directory holding every required file wins.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::errors::ModelError;
use super::normalizer::UNKNOWN_LABEL;

/// Manifest holding model metadata, including the index to label map
pub const MANIFEST_FILE: &str = "config.json";

/// Serialized classifier weights
pub const WEIGHTS_FILE: &str = "model.onnx";

/// Where public ONNX exports keep their weights, in lookup order
pub const BASE_WEIGHTS_FILES: &[&str] = &["onnx/model.onnx", WEIGHTS_FILE];

/// Optional image preprocessing parameters
pub const PREPROCESSOR_FILE: &str = "preprocessor_config.json";

/// Result of probing candidate directories for a set of required files
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactLocation {
    /// Ordered directories checked during probing
    pub candidates: Vec<PathBuf>,
    /// First candidate holding every required file
    pub resolved: Option<PathBuf>,
    /// File names that must all be present
    pub required_files: Vec<String>,
}

impl ArtifactLocation {
    /// Probe `candidates` in order for a directory holding all `required_files`
    pub fn probe(candidates: Vec<PathBuf>, required_files: Vec<String>) -> Self {
        let resolved = candidates
            .iter()
            .find(|dir| has_all_files(dir, &required_files))
            .cloned();

        match &resolved {
            Some(dir) => debug!("Resolved artifacts at {}", dir.display()),
            None => debug!(
                "No complete artifact set among {} candidate(s)",
                candidates.len()
            ),
        }

        Self {
            candidates,
            resolved,
            required_files,
        }
    }

    /// Path of a required file inside the resolved directory
    pub fn file(&self, name: &str) -> Option<PathBuf> {
        self.resolved.as_ref().map(|dir| dir.join(name))
    }

    /// Consume the location, yielding the resolved directory
    pub fn into_resolved(self) -> Result<PathBuf, ModelError> {
        self.resolved.ok_or(ModelError::ArtifactNotFound {
            checked: self.candidates,
        })
    }
}

fn has_all_files(dir: &Path, files: &[String]) -> bool {
    dir.is_dir() && files.iter().all(|f| dir.join(f).is_file())
}

/// Locates the classifier artifacts across the configured candidate paths
#[derive(Debug, Clone)]
pub struct ArtifactResolver {
    candidates: Vec<PathBuf>,
}

impl ArtifactResolver {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// Probe for a complete classifier artifact set (manifest + weights)
    pub fn locate(&self) -> ArtifactLocation {
        ArtifactLocation::probe(
            self.candidates.clone(),
            vec![MANIFEST_FILE.to_string(), WEIGHTS_FILE.to_string()],
        )
    }

    /// Resolve the directory holding a complete classifier artifact set
    ///
    /// # Errors
    /// `ModelError::ArtifactNotFound` listing every checked path when no
    /// candidate qualifies, including when there are no candidates at all.
    pub fn resolve(&self) -> Result<PathBuf, ModelError> {
        let resolved = self.locate().into_resolved()?;
        info!("Classifier artifacts resolved at {}", resolved.display());
        Ok(resolved)
    }

    /// First candidate that carries a manifest, regardless of weights
    pub fn find_manifest(&self) -> Result<PathBuf, ModelError> {
        ArtifactLocation::probe(self.candidates.clone(), vec![MANIFEST_FILE.to_string()])
            .file(MANIFEST_FILE)
            .ok_or_else(|| ModelError::ArtifactNotFound {
                checked: self.candidates.clone(),
            })
    }
}

#[derive(Debug, Deserialize)]
struct ManifestLabels {
    #[serde(default)]
    id2label: HashMap<String, String>,
}

/// Mapping from classifier output index to `"Crop/Disease"` label
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelMap {
    labels: BTreeMap<usize, String>,
}

impl LabelMap {
    /// Read `id2label` from a manifest file
    pub fn from_manifest(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Self::from_manifest_str(&content)
            .with_context(|| format!("Invalid manifest {}", path.display()))
    }

    /// Parse `id2label` from manifest JSON
    ///
    /// Keys are stringified indices as written by HuggingFace exporters.
    pub fn from_manifest_str(json: &str) -> Result<Self> {
        let manifest: ManifestLabels =
            serde_json::from_str(json).context("Manifest is not valid JSON")?;

        let mut labels = BTreeMap::new();
        for (key, label) in manifest.id2label {
            let index: usize = key
                .trim()
                .parse()
                .with_context(|| format!("Non-numeric id2label key '{}'", key))?;
            labels.insert(index, label);
        }

        if labels.is_empty() {
            anyhow::bail!("Manifest has no id2label entries");
        }

        Ok(Self { labels })
    }

    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels
                .into_iter()
                .map(Into::into)
                .enumerate()
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(&index).map(String::as_str)
    }

    /// Label for an index, or the unknown-label sentinel
    pub fn label_for(&self, index: usize) -> &str {
        self.get(index).unwrap_or(UNKNOWN_LABEL)
    }

    /// Number of output logits the labels cover (highest index + 1)
    pub fn span(&self) -> usize {
        self.labels
            .keys()
            .next_back()
            .map(|i| i.saturating_add(1))
            .unwrap_or(0)
    }
}
