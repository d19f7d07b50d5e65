// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared stubs for integration tests
//!
//! Stub models stand in for ONNX sessions so provisioning and request
//! handling can be exercised without downloading weights.
#![allow(dead_code)]

use agrivision_node::config::{ModelLocation, NodeConfig, VisionConfig};
use agrivision_node::text::{Language, TextService};
use agrivision_node::vision::{
    CaptionModel, DeviceTag, ImageClassifier, ModelBundle, ModelFactory, ModelProvisioner,
    ModelSource,
};
use anyhow::{bail, Result};
use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use ndarray::Array4;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const TEST_LABELS: &[&str] = &[
    "Tomato/Late Blight",
    "Tomato/Healthy",
    "Rice/Brown Spot",
    "Potato",
];

/// Classifier returning fixed logits
pub struct StubClassifier {
    pub logits: Vec<f32>,
}

impl ImageClassifier for StubClassifier {
    fn logits(&self, pixels: &Array4<f32>) -> Result<Vec<f32>> {
        assert_eq!(pixels.shape()[0], 1, "batch of one");
        assert_eq!(pixels.shape()[1], 3, "RGB channels");
        Ok(self.logits.clone())
    }

    fn name(&self) -> &str {
        "stub-classifier"
    }
}

/// Captioner returning a fixed caption, or failing when `text` is `None`
pub struct StubCaptioner {
    pub name: String,
    pub text: Option<String>,
}

impl CaptionModel for StubCaptioner {
    fn caption(&self, _image: &DynamicImage) -> Result<String> {
        match &self.text {
            Some(text) => Ok(text.clone()),
            None => bail!("caption decoder exploded"),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Factory handing out stubs
///
/// Captioner names in `failing` refuse to load, as do classifier weights
/// under any directory in `corrupt_dirs`.
pub struct StubFactory {
    pub logits: Vec<f32>,
    pub failing: Vec<String>,
    pub corrupt_dirs: Vec<PathBuf>,
}

impl StubFactory {
    pub fn new(logits: Vec<f32>) -> Self {
        Self {
            logits,
            failing: Vec::new(),
            corrupt_dirs: Vec::new(),
        }
    }

    pub fn failing(mut self, names: &[&str]) -> Self {
        self.failing = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn corrupt_weights_in(mut self, dir: &Path) -> Self {
        self.corrupt_dirs.push(dir.to_path_buf());
        self
    }
}

impl ModelFactory for StubFactory {
    fn classifier(&self, weights: &Path, _device: DeviceTag) -> Result<Arc<dyn ImageClassifier>> {
        if !weights.is_file() {
            bail!("weights missing at {}", weights.display());
        }
        if self.corrupt_dirs.iter().any(|d| weights.starts_with(d)) {
            bail!("invalid ONNX graph in {}", weights.display());
        }
        Ok(Arc::new(StubClassifier {
            logits: self.logits.clone(),
        }))
    }

    fn captioner(
        &self,
        name: &str,
        source: &ModelSource,
        _device: DeviceTag,
    ) -> Result<Arc<dyn CaptionModel>> {
        if self.failing.iter().any(|n| n == name) {
            bail!("{} captioner unavailable at {}", name, source);
        }
        Ok(Arc::new(StubCaptioner {
            name: name.to_string(),
            text: Some(format!("a {} caption of a diseased leaf", name)),
        }))
    }
}

/// Write a complete classifier artifact directory
pub fn write_classifier_dir(dir: &Path, labels: &[&str], with_weights: bool) {
    std::fs::create_dir_all(dir).unwrap();
    let id2label: serde_json::Map<String, serde_json::Value> = labels
        .iter()
        .enumerate()
        .map(|(i, l)| (i.to_string(), serde_json::Value::String(l.to_string())))
        .collect();
    let manifest = serde_json::json!({ "id2label": id2label });
    std::fs::write(dir.join("config.json"), manifest.to_string()).unwrap();
    if with_weights {
        std::fs::write(dir.join("model.onnx"), b"stub").unwrap();
    }
}

/// Directory that stands in for a local model checkout
pub fn write_model_dir(dir: &Path) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join("model.onnx"), b"stub").unwrap();
    dir.to_path_buf()
}

/// Vision config rooted in `root` with no hub repos configured
pub fn offline_vision_config(root: &Path) -> VisionConfig {
    VisionConfig {
        classifier_candidates: vec![root.join("missing"), root.join("classifier")],
        base_classifier: ModelLocation::new(&root.join("base").display().to_string(), None),
        caption_primary: ModelLocation::new(&root.join("primary").display().to_string(), None),
        caption_secondary: ModelLocation::new(&root.join("secondary").display().to_string(), None),
        caption_lightweight: ModelLocation::new(&root.join("light").display().to_string(), None),
        ..VisionConfig::default()
    }
}

/// Provision a bundle from `config` using stub models on the CPU
pub fn provision(config: VisionConfig, factory: StubFactory) -> ModelBundle {
    ModelProvisioner::with_factory(config, Arc::new(factory))
        .provision_on(DeviceTag::Cpu)
        .unwrap()
}

/// Trained bundle predicting "Tomato/Late Blight" with full captioning
pub fn trained_bundle(root: &Path) -> ModelBundle {
    write_classifier_dir(&root.join("classifier"), TEST_LABELS, true);
    write_model_dir(&root.join("primary"));
    write_model_dir(&root.join("secondary"));
    provision(
        offline_vision_config(root),
        StubFactory::new(vec![4.0, 0.5, 0.1, 0.2]),
    )
}

/// Node config pointing at `root` for router tests
pub fn node_config(root: &Path) -> NodeConfig {
    NodeConfig {
        vision: offline_vision_config(root),
        ..NodeConfig::default()
    }
}

/// Encode a solid-color PNG
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_fn(width, height, |x, y| Rgb([(x % 255) as u8, 120, (y % 255) as u8]));
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

/// Live text service that tags translations with the target language
pub struct EchoTextService;

#[async_trait]
impl TextService for EchoTextService {
    async fn answer(&self, question: &str, context: Option<&str>, language: Language) -> String {
        match context {
            Some(context) => format!("[{}] {} | {}", language, question, context),
            None => format!("[{}] {}", language, question),
        }
    }

    async fn translate(&self, text: &str, target: Language) -> String {
        format!("<{}>{}", target, text)
    }

    fn name(&self) -> &'static str {
        "echo"
    }

    fn is_live(&self) -> bool {
        true
    }
}
