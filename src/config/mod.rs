// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Node configuration loaded from the environment

use std::env;
use std::path::{Path, PathBuf};

use crate::vision::captioning::{MAX_TOKENS, MIN_TOKENS};
use crate::vision::device::DevicePreference;
use crate::vision::image_utils::MAX_IMAGE_SIZE;
use crate::vision::source::ModelSource;

/// Default fine-tuned classifier locations, probed in order
pub const DEFAULT_CLASSIFIER_CANDIDATES: &[&str] = &[
    "./models/swinv2_tiny_crop_disease",
    "./backend/models/swinv2_tiny_crop_disease",
    "./swinv2_tiny_crop_disease",
    "/var/task/models/swinv2_tiny_crop_disease",
];

/// Origins used by the web frontend during development
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:3000",
    "http://localhost:5174",
    "http://localhost:5175",
];

/// Complete node configuration
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    pub server: ServerConfig,
    pub vision: VisionConfig,
    pub text: TextConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Extra CORS origins on top of the development defaults
    pub allowed_origins: Vec<String>,
    /// Largest accepted image upload in bytes
    pub max_upload_bytes: usize,
    /// Deployment label reported by /health
    pub environment: String,
}

/// A model that lives in a local directory or, failing that, on the hub
#[derive(Debug, Clone, PartialEq)]
pub struct ModelLocation {
    pub dir: PathBuf,
    pub repo: Option<String>,
}

impl ModelLocation {
    pub fn new(dir: &str, repo: Option<&str>) -> Self {
        Self {
            dir: PathBuf::from(dir),
            repo: repo.map(str::to_string),
        }
    }

    /// Source to load from, if either location is usable
    pub fn source(&self, cache_dir: Option<&Path>) -> Option<ModelSource> {
        ModelSource::select(&self.dir, self.repo.as_deref(), cache_dir)
    }
}

/// Vision model provisioning configuration
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// Ordered directories probed for the fine-tuned classifier
    pub classifier_candidates: Vec<PathBuf>,
    /// Public base classifier used when fine-tuned weights are missing
    pub base_classifier: ModelLocation,
    /// High-quality captioner
    pub caption_primary: ModelLocation,
    /// Second captioner with a different architecture
    pub caption_secondary: ModelLocation,
    /// Lighter captioner used alone when the pair cannot load
    pub caption_lightweight: ModelLocation,
    pub captioning_enabled: bool,
    /// Merge secondary captions into the primary one
    pub caption_merge_enabled: bool,
    pub max_caption_tokens: usize,
    pub device: DevicePreference,
    /// Hugging Face cache directory override
    pub hf_cache_dir: Option<PathBuf>,
}

/// Text service configuration
#[derive(Debug, Clone)]
pub struct TextConfig {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub request_timeout_secs: u64,
    /// Probe the provider with a one-token request at startup
    pub verify_on_startup: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: Vec::new(),
            max_upload_bytes: MAX_IMAGE_SIZE,
            environment: "development".to_string(),
        }
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            classifier_candidates: DEFAULT_CLASSIFIER_CANDIDATES
                .iter()
                .map(PathBuf::from)
                .collect(),
            base_classifier: ModelLocation::new(
                "./models/swin-tiny-patch4-window7-224",
                Some("Xenova/swin-tiny-patch4-window7-224"),
            ),
            caption_primary: ModelLocation::new(
                "./models/blip-image-captioning-large",
                Some("Xenova/blip-image-captioning-large"),
            ),
            caption_secondary: ModelLocation::new(
                "./models/vit-gpt2-image-captioning",
                Some("Xenova/vit-gpt2-image-captioning"),
            ),
            caption_lightweight: ModelLocation::new(
                "./models/blip-image-captioning-base",
                Some("Xenova/blip-image-captioning-base"),
            ),
            captioning_enabled: true,
            caption_merge_enabled: false,
            max_caption_tokens: 50,
            device: DevicePreference::Auto,
            hf_cache_dir: None,
        }
    }
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: "https://api.openai.com".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            request_timeout_secs: 30,
            verify_on_startup: true,
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| match v.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        })
        .unwrap_or(default)
}

fn env_non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a comma separated list, dropping empty entries
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn location_from_env(dir_var: &str, repo_var: &str, default: ModelLocation) -> ModelLocation {
    ModelLocation {
        dir: env_non_empty(dir_var).map(PathBuf::from).unwrap_or(default.dir),
        repo: env_non_empty(repo_var).or(default.repo),
    }
}

impl NodeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(),
            vision: VisionConfig::from_env(),
            text: TextConfig::from_env(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        self.server.validate()?;
        self.vision.validate()?;
        self.text.validate()
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env_non_empty("API_HOST").unwrap_or(defaults.host),
            port: env::var("API_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_upload_bytes),
            environment: env_non_empty("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Development origins plus any configured extras, deduplicated
    pub fn cors_origins(&self) -> Vec<String> {
        let mut origins: Vec<String> = DEFAULT_ALLOWED_ORIGINS
            .iter()
            .map(|o| o.to_string())
            .collect();
        for origin in &self.allowed_origins {
            if !origins.contains(origin) {
                origins.push(origin.clone());
            }
        }
        origins
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("API_PORT must be greater than 0".to_string());
        }
        if self.max_upload_bytes == 0 || self.max_upload_bytes > MAX_IMAGE_SIZE {
            return Err(format!(
                "MAX_UPLOAD_BYTES must be between 1 and {}",
                MAX_IMAGE_SIZE
            ));
        }
        Ok(())
    }
}

impl VisionConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        // an explicit path is probed before the built-in locations
        let mut classifier_candidates: Vec<PathBuf> = env::var("CLASSIFIER_MODEL_PATHS")
            .map(|v| split_list(&v).into_iter().map(PathBuf::from).collect())
            .unwrap_or_default();
        if let Some(path) = env_non_empty("CLASSIFIER_MODEL_PATH") {
            classifier_candidates.insert(0, PathBuf::from(path));
        }
        classifier_candidates.extend(defaults.classifier_candidates);

        Self {
            classifier_candidates,
            base_classifier: location_from_env(
                "BASE_CLASSIFIER_DIR",
                "BASE_CLASSIFIER_REPO",
                defaults.base_classifier,
            ),
            caption_primary: location_from_env(
                "CAPTION_PRIMARY_DIR",
                "CAPTION_PRIMARY_REPO",
                defaults.caption_primary,
            ),
            caption_secondary: location_from_env(
                "CAPTION_SECONDARY_DIR",
                "CAPTION_SECONDARY_REPO",
                defaults.caption_secondary,
            ),
            caption_lightweight: location_from_env(
                "CAPTION_LIGHT_DIR",
                "CAPTION_LIGHT_REPO",
                defaults.caption_lightweight,
            ),
            captioning_enabled: env_flag("CAPTIONING_ENABLED", defaults.captioning_enabled),
            caption_merge_enabled: env_flag(
                "CAPTION_MERGE_ENABLED",
                defaults.caption_merge_enabled,
            ),
            max_caption_tokens: env::var("MAX_CAPTION_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_caption_tokens),
            device: env::var("DEVICE")
                .ok()
                .and_then(|v| DevicePreference::parse(&v))
                .unwrap_or(defaults.device),
            hf_cache_dir: env_non_empty("HF_CACHE_DIR").map(PathBuf::from),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.classifier_candidates.is_empty() {
            return Err("At least one classifier model path is required".to_string());
        }
        if !(MIN_TOKENS..=MAX_TOKENS).contains(&self.max_caption_tokens) {
            return Err(format!(
                "MAX_CAPTION_TOKENS must be between {} and {}",
                MIN_TOKENS, MAX_TOKENS
            ));
        }
        Ok(())
    }

    pub fn cache_dir(&self) -> Option<&Path> {
        self.hf_cache_dir.as_deref()
    }
}

impl TextConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            openai_api_key: env_non_empty("OPENAI_API_KEY"),
            openai_base_url: env_non_empty("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            openai_model: env_non_empty("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            request_timeout_secs: env::var("OPENAI_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
            verify_on_startup: env_flag("OPENAI_VERIFY_ON_STARTUP", defaults.verify_on_startup),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout_secs == 0 {
            return Err("OPENAI_TIMEOUT_SECS must be greater than 0".to_string());
        }
        if !self.openai_base_url.starts_with("http") {
            return Err("OPENAI_BASE_URL must be an http(s) URL".to_string());
        }
        Ok(())
    }
}
