// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Where public pretrained models come from
//!
//! Base classifier and captioning models are either exported into a local
//! directory ahead of time or fetched from the Hugging Face hub into the
//! local cache on first start.

use anyhow::{Context, Result};
use hf_hub::api::sync::ApiBuilder;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A local directory or hub repository holding one model's files
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    Local(PathBuf),
    Hub {
        repo: String,
        cache_dir: Option<PathBuf>,
    },
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Local(dir) => write!(f, "{}", dir.display()),
            ModelSource::Hub { repo, .. } => write!(f, "hf://{}", repo),
        }
    }
}

impl ModelSource {
    /// Prefer an existing local directory, otherwise the hub repository
    pub fn select(
        local_dir: &Path,
        hub_repo: Option<&str>,
        cache_dir: Option<&Path>,
    ) -> Option<Self> {
        if local_dir.is_dir() {
            return Some(ModelSource::Local(local_dir.to_path_buf()));
        }
        hub_repo
            .filter(|repo| !repo.trim().is_empty())
            .map(|repo| ModelSource::Hub {
                repo: repo.trim().to_string(),
                cache_dir: cache_dir.map(Path::to_path_buf),
            })
    }

    /// Path to `file` (relative to the model root), downloading if needed
    pub fn fetch(&self, file: &str) -> Result<PathBuf> {
        match self {
            ModelSource::Local(dir) => {
                let path = dir.join(file);
                if !path.is_file() {
                    anyhow::bail!("{} not found in {}", file, dir.display());
                }
                Ok(path)
            }
            ModelSource::Hub { repo, cache_dir } => {
                let mut builder = ApiBuilder::new().with_progress(false);
                if let Some(dir) = cache_dir {
                    builder = builder.with_cache_dir(dir.clone());
                }
                let api = builder.build().context("Failed to initialise hub client")?;
                debug!("Fetching {} from hf://{}", file, repo);
                let path = api
                    .model(repo.clone())
                    .get(file)
                    .with_context(|| format!("Failed to fetch {} from hf://{}", file, repo))?;
                info!("📥 {} ready at {}", file, path.display());
                Ok(path)
            }
        }
    }

    /// First of several alternative file names that the source provides
    pub fn fetch_first(&self, names: &[&str]) -> Result<PathBuf> {
        let mut errors = Vec::new();
        for name in names {
            match self.fetch(name) {
                Ok(path) => return Ok(path),
                Err(e) => errors.push(format!("{}: {}", name, e)),
            }
        }
        anyhow::bail!("None of [{}] available from {}: {}", names.join(", "), self, errors.join("; "))
    }

    /// Like `fetch`, but a missing file is not an error
    pub fn fetch_optional(&self, file: &str) -> Option<PathBuf> {
        self.fetch(file).ok()
    }
}
