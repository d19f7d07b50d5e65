// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model provisioning
//!
//! Runs once at startup and produces the immutable [`ModelBundle`] every
//! request shares. The classifier chain is mandatory: if no strategy yields
//! a classifier the node refuses to start. The caption chain degrades to
//! "no captioner" and the node still serves predictions.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::artifacts::{
    ArtifactResolver, LabelMap, BASE_WEIGHTS_FILES, MANIFEST_FILE, PREPROCESSOR_FILE, WEIGHTS_FILE,
};
use super::captioning::{CaptionModel, OnnxCaptioner};
use super::classifier::{ImageClassifier, OnnxClassifier};
use super::device::DeviceTag;
use super::errors::ModelError;
use super::preprocessing::PreprocessConfig;
use super::source::ModelSource;
use super::strategy::{run_chain, LoadOutcome, LoadStrategy};
use crate::config::VisionConfig;

/// Whether the classifier carries fine-tuned weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierMode {
    /// Fine-tuned crop/disease weights
    Trained,
    /// Public base weights with the fine-tuned label set; predictions are not meaningful
    Degraded,
}

/// Which caption models made it through provisioning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionTier {
    Full,
    Lightweight,
    Unavailable,
}

/// Loaded classifier with everything needed to interpret its output
#[derive(Clone)]
pub struct ClassifierHandle {
    pub model: Arc<dyn ImageClassifier>,
    pub preprocessor: PreprocessConfig,
    pub labels: LabelMap,
    pub mode: ClassifierMode,
    /// Where the weights were loaded from
    pub source: String,
    /// Name of the load strategy that produced this handle
    pub strategy: &'static str,
}

impl std::fmt::Debug for ClassifierHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierHandle")
            .field("model", &self.model.name())
            .field("labels", &self.labels.len())
            .field("mode", &self.mode)
            .field("source", &self.source)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

/// Caption models available to the pipeline
#[derive(Clone)]
pub struct CaptionModels {
    pub primary: Option<Arc<dyn CaptionModel>>,
    pub secondary: Option<Arc<dyn CaptionModel>>,
    pub tier: CaptionTier,
}

impl std::fmt::Debug for CaptionModels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptionModels")
            .field("primary", &self.primary.as_ref().map(|m| m.name().to_string()))
            .field("secondary", &self.secondary.as_ref().map(|m| m.name().to_string()))
            .field("tier", &self.tier)
            .finish()
    }
}

impl CaptionModels {
    pub fn full(primary: Arc<dyn CaptionModel>, secondary: Arc<dyn CaptionModel>) -> Self {
        Self {
            primary: Some(primary),
            secondary: Some(secondary),
            tier: CaptionTier::Full,
        }
    }

    /// One lighter model in the primary role; there is nothing to merge with
    pub fn lightweight(model: Arc<dyn CaptionModel>) -> Self {
        Self {
            primary: Some(model),
            secondary: None,
            tier: CaptionTier::Lightweight,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            primary: None,
            secondary: None,
            tier: CaptionTier::Unavailable,
        }
    }
}

/// Snapshot of provisioning results for health reporting
#[derive(Debug, Clone, Serialize)]
pub struct BundleStatus {
    pub classifier_mode: ClassifierMode,
    pub classifier_source: String,
    pub classifier_strategy: &'static str,
    pub labels: usize,
    pub caption_tier: CaptionTier,
    pub device: DeviceTag,
}

/// Everything provisioned at startup; immutable afterwards
#[derive(Debug, Clone)]
pub struct ModelBundle {
    pub classifier: ClassifierHandle,
    pub captioners: CaptionModels,
    pub device: DeviceTag,
}

impl ModelBundle {
    /// True only when fine-tuned classifier weights were loaded
    pub fn trained(&self) -> bool {
        self.classifier.mode == ClassifierMode::Trained
    }

    pub fn status(&self) -> BundleStatus {
        BundleStatus {
            classifier_mode: self.classifier.mode,
            classifier_source: self.classifier.source.clone(),
            classifier_strategy: self.classifier.strategy,
            labels: self.classifier.labels.len(),
            caption_tier: self.captioners.tier,
            device: self.device,
        }
    }
}

/// Turns model files into runnable models
///
/// Strategies decide *which* files to use; the factory decides how they
/// become models.
pub trait ModelFactory: Send + Sync {
    fn classifier(&self, weights: &Path, device: DeviceTag) -> Result<Arc<dyn ImageClassifier>>;

    fn captioner(
        &self,
        name: &str,
        source: &ModelSource,
        device: DeviceTag,
    ) -> Result<Arc<dyn CaptionModel>>;
}

/// Factory producing ONNX Runtime backed models
#[derive(Debug, Clone)]
pub struct OnnxModelFactory {
    pub max_caption_tokens: usize,
}

impl ModelFactory for OnnxModelFactory {
    fn classifier(&self, weights: &Path, device: DeviceTag) -> Result<Arc<dyn ImageClassifier>> {
        Ok(Arc::new(OnnxClassifier::load(weights, device, "crop-disease")?))
    }

    fn captioner(
        &self,
        name: &str,
        source: &ModelSource,
        device: DeviceTag,
    ) -> Result<Arc<dyn CaptionModel>> {
        Ok(Arc::new(OnnxCaptioner::load(
            name,
            source,
            device,
            self.max_caption_tokens,
        )?))
    }
}

/// Fine-tuned weights from the first complete candidate directory
pub struct TrainedClassifierStrategy {
    resolver: ArtifactResolver,
    factory: Arc<dyn ModelFactory>,
}

impl TrainedClassifierStrategy {
    pub fn new(resolver: ArtifactResolver, factory: Arc<dyn ModelFactory>) -> Self {
        Self { resolver, factory }
    }
}

impl LoadStrategy<ClassifierHandle> for TrainedClassifierStrategy {
    fn name(&self) -> &'static str {
        "trained"
    }

    fn attempt(&self, device: DeviceTag) -> LoadOutcome<ClassifierHandle> {
        let location = self.resolver.locate();
        let dir = match location.into_resolved() {
            Ok(dir) => dir,
            Err(e) => return LoadOutcome::Fallthrough(e.to_string()),
        };
        info!("Loading fine-tuned classifier from {}", dir.display());

        let loaded = (|| -> Result<ClassifierHandle> {
            let labels = LabelMap::from_manifest(&dir.join(MANIFEST_FILE))?;
            let preprocessor = PreprocessConfig::from_model_dir(&dir)?;
            let model = self.factory.classifier(&dir.join(WEIGHTS_FILE), device)?;
            Ok(ClassifierHandle {
                model,
                preprocessor,
                labels,
                mode: ClassifierMode::Trained,
                source: dir.display().to_string(),
                strategy: self.name(),
            })
        })();

        match loaded {
            Ok(handle) => {
                info!(
                    "✅ Fine-tuned classifier ready ({} labels)",
                    handle.labels.len()
                );
                LoadOutcome::Ready(handle)
            }
            Err(e) => LoadOutcome::Fallthrough(format!("{:#}", e)),
        }
    }
}

/// Public base weights paired with the fine-tuned label set
///
/// Keeps the service answering when weights were not deployed. Every result
/// produced this way is marked as untrained downstream.
pub struct SubstituteClassifierStrategy {
    resolver: ArtifactResolver,
    base: Option<ModelSource>,
    factory: Arc<dyn ModelFactory>,
}

impl SubstituteClassifierStrategy {
    pub fn new(
        resolver: ArtifactResolver,
        base: Option<ModelSource>,
        factory: Arc<dyn ModelFactory>,
    ) -> Self {
        Self {
            resolver,
            base,
            factory,
        }
    }
}

impl LoadStrategy<ClassifierHandle> for SubstituteClassifierStrategy {
    fn name(&self) -> &'static str {
        "substitute"
    }

    fn attempt(&self, device: DeviceTag) -> LoadOutcome<ClassifierHandle> {
        // without a manifest there is no label set to report against
        let manifest = match self.resolver.find_manifest() {
            Ok(path) => path,
            Err(e) => return LoadOutcome::Fatal(e),
        };

        let labels = match LabelMap::from_manifest(&manifest) {
            Ok(labels) => labels,
            Err(e) => return LoadOutcome::Fallthrough(format!("{:#}", e)),
        };

        let Some(base) = &self.base else {
            return LoadOutcome::Fallthrough("no base classifier configured".to_string());
        };

        let loaded = (|| -> Result<ClassifierHandle> {
            let weights = base.fetch_first(BASE_WEIGHTS_FILES)?;
            let preprocessor = match base.fetch_optional(PREPROCESSOR_FILE) {
                Some(path) => PreprocessConfig::from_file(&path)?,
                None => PreprocessConfig::default(),
            };
            let model = self.factory.classifier(&weights, device)?;
            Ok(ClassifierHandle {
                model,
                preprocessor,
                labels,
                mode: ClassifierMode::Degraded,
                source: base.to_string(),
                strategy: self.name(),
            })
        })();

        match loaded {
            Ok(handle) => {
                error!(
                    "❌ Fine-tuned classifier weights missing; serving UNTRAINED base model {} with labels from {}. Predictions are not meaningful",
                    handle.source,
                    manifest.display()
                );
                LoadOutcome::Ready(handle)
            }
            Err(e) => LoadOutcome::Fallthrough(format!("{:#}", e)),
        }
    }
}

/// Primary and secondary captioners, both required
pub struct PrimaryCaptionersStrategy {
    primary: Option<ModelSource>,
    secondary: Option<ModelSource>,
    factory: Arc<dyn ModelFactory>,
}

impl PrimaryCaptionersStrategy {
    pub fn new(
        primary: Option<ModelSource>,
        secondary: Option<ModelSource>,
        factory: Arc<dyn ModelFactory>,
    ) -> Self {
        Self {
            primary,
            secondary,
            factory,
        }
    }
}

impl LoadStrategy<CaptionModels> for PrimaryCaptionersStrategy {
    fn name(&self) -> &'static str {
        "primary-pair"
    }

    fn attempt(&self, device: DeviceTag) -> LoadOutcome<CaptionModels> {
        let (Some(primary), Some(secondary)) = (&self.primary, &self.secondary) else {
            return LoadOutcome::Fallthrough("primary or secondary captioner not configured".to_string());
        };

        let primary = match self.factory.captioner("primary", primary, device) {
            Ok(model) => model,
            Err(e) => return LoadOutcome::Fallthrough(format!("primary: {:#}", e)),
        };
        match self.factory.captioner("secondary", secondary, device) {
            Ok(secondary) => LoadOutcome::Ready(CaptionModels::full(primary, secondary)),
            Err(e) => LoadOutcome::Fallthrough(format!("secondary: {:#}", e)),
        }
    }
}

/// A single lighter captioner in place of the pair
pub struct LightweightCaptionerStrategy {
    source: Option<ModelSource>,
    factory: Arc<dyn ModelFactory>,
}

impl LightweightCaptionerStrategy {
    pub fn new(source: Option<ModelSource>, factory: Arc<dyn ModelFactory>) -> Self {
        Self { source, factory }
    }
}

impl LoadStrategy<CaptionModels> for LightweightCaptionerStrategy {
    fn name(&self) -> &'static str {
        "lightweight"
    }

    fn attempt(&self, device: DeviceTag) -> LoadOutcome<CaptionModels> {
        let Some(source) = &self.source else {
            return LoadOutcome::Fallthrough("lightweight captioner not configured".to_string());
        };
        match self.factory.captioner("lightweight", source, device) {
            Ok(model) => LoadOutcome::Ready(CaptionModels::lightweight(model)),
            Err(e) => LoadOutcome::Fallthrough(format!("{:#}", e)),
        }
    }
}

/// Builds the [`ModelBundle`] from configuration
pub struct ModelProvisioner {
    config: VisionConfig,
    factory: Arc<dyn ModelFactory>,
}

impl ModelProvisioner {
    pub fn new(config: VisionConfig) -> Self {
        let factory = Arc::new(OnnxModelFactory {
            max_caption_tokens: config.max_caption_tokens,
        });
        Self::with_factory(config, factory)
    }

    pub fn with_factory(config: VisionConfig, factory: Arc<dyn ModelFactory>) -> Self {
        Self { config, factory }
    }

    /// Classifier strategies in the order they are tried
    pub fn classifier_chain(&self) -> Vec<Box<dyn LoadStrategy<ClassifierHandle>>> {
        let resolver = ArtifactResolver::new(self.config.classifier_candidates.clone());
        let base = self.config.base_classifier.source(self.config.cache_dir());
        vec![
            Box::new(TrainedClassifierStrategy::new(
                resolver.clone(),
                self.factory.clone(),
            )),
            Box::new(SubstituteClassifierStrategy::new(
                resolver,
                base,
                self.factory.clone(),
            )),
        ]
    }

    /// Caption strategies in the order they are tried
    pub fn caption_chain(&self) -> Vec<Box<dyn LoadStrategy<CaptionModels>>> {
        let cache = self.config.cache_dir();
        vec![
            Box::new(PrimaryCaptionersStrategy::new(
                self.config.caption_primary.source(cache),
                self.config.caption_secondary.source(cache),
                self.factory.clone(),
            )),
            Box::new(LightweightCaptionerStrategy::new(
                self.config.caption_lightweight.source(cache),
                self.factory.clone(),
            )),
        ]
    }

    /// Provision every model
    ///
    /// # Errors
    /// `ModelError` when no classifier can be loaded. Caption failures are
    /// never fatal.
    pub fn provision(&self) -> Result<ModelBundle, ModelError> {
        let device = DeviceTag::probe(self.config.device);
        self.provision_on(device)
    }

    /// Provision on an already selected device
    pub fn provision_on(&self, device: DeviceTag) -> Result<ModelBundle, ModelError> {
        let (classifier, classifier_strategy) =
            run_chain("classifier", &self.classifier_chain(), device)?;

        let captioners = if !self.config.captioning_enabled {
            info!("Captioning disabled by configuration");
            CaptionModels::unavailable()
        } else {
            match run_chain("captioner", &self.caption_chain(), device) {
                Ok((models, strategy)) => {
                    info!("Captioning provided by {} strategy", strategy);
                    models
                }
                Err(e) => {
                    warn!("⚠️ No caption model available, using placeholder captions: {}", e);
                    CaptionModels::unavailable()
                }
            }
        };

        let bundle = ModelBundle {
            classifier,
            captioners,
            device,
        };

        let status = bundle.status();
        info!(
            "Model bundle ready: classifier={:?} via {} ({}), captions={:?}, device={}",
            status.classifier_mode,
            classifier_strategy,
            status.classifier_source,
            status.caption_tier,
            status.device
        );

        Ok(bundle)
    }
}
