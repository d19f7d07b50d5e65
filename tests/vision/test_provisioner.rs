// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Provisioning chain tests
//!
//! Covers the classifier fallback order (trained, then substitute), the
//! fatal paths, and caption tier selection.

use crate::common::{
    offline_vision_config, provision, write_classifier_dir, write_model_dir, StubFactory,
    TEST_LABELS,
};
use agrivision_node::vision::{
    CaptionTier, ClassifierMode, DeviceTag, ModelError, ModelProvisioner,
};
use std::sync::Arc;
use tempfile::TempDir;

fn logits() -> Vec<f32> {
    vec![0.1, 3.0, 0.2, 0.4]
}

#[test]
fn test_trained_classifier_from_second_candidate() {
    let root = TempDir::new().unwrap();
    write_classifier_dir(&root.path().join("classifier"), TEST_LABELS, true);

    let bundle = provision(offline_vision_config(root.path()), StubFactory::new(logits()));

    assert!(bundle.trained());
    assert_eq!(bundle.classifier.mode, ClassifierMode::Trained);
    assert_eq!(bundle.classifier.labels.len(), TEST_LABELS.len());
    assert!(bundle.classifier.source.ends_with("classifier"));
    assert_eq!(bundle.classifier.strategy, "trained");
    assert_eq!(bundle.status().classifier_strategy, "trained");
    assert_eq!(bundle.device, DeviceTag::Cpu);
}

#[test]
fn test_missing_weights_falls_back_to_substitute() {
    let root = TempDir::new().unwrap();
    write_classifier_dir(&root.path().join("classifier"), TEST_LABELS, false);
    write_model_dir(&root.path().join("base"));

    let bundle = provision(offline_vision_config(root.path()), StubFactory::new(logits()));

    assert!(!bundle.trained());
    assert_eq!(bundle.classifier.mode, ClassifierMode::Degraded);
    // label set still comes from the fine-tuned manifest
    assert_eq!(bundle.classifier.labels.get(0), Some("Tomato/Late Blight"));
    assert!(bundle.classifier.source.contains("base"));

    let status = bundle.status();
    assert_eq!(status.classifier_mode, ClassifierMode::Degraded);
    assert_eq!(status.classifier_strategy, "substitute");
    assert_eq!(status.labels, TEST_LABELS.len());
}

#[test]
fn test_substitute_loads_weights_from_onnx_subdirectory() {
    let root = TempDir::new().unwrap();
    write_classifier_dir(&root.path().join("classifier"), TEST_LABELS, false);
    // public exports keep their graph under onnx/
    let base = root.path().join("base");
    write_model_dir(&base.join("onnx"));
    assert!(!base.join("model.onnx").exists());

    let bundle = provision(offline_vision_config(root.path()), StubFactory::new(logits()));

    assert_eq!(bundle.classifier.mode, ClassifierMode::Degraded);
    assert_eq!(bundle.classifier.strategy, "substitute");
}

#[test]
fn test_unloadable_trained_weights_fall_back_to_substitute() {
    let root = TempDir::new().unwrap();
    let classifier = root.path().join("classifier");
    write_classifier_dir(&classifier, TEST_LABELS, true);
    write_model_dir(&root.path().join("base"));

    let bundle = provision(
        offline_vision_config(root.path()),
        StubFactory::new(logits()).corrupt_weights_in(&classifier),
    );

    assert_eq!(bundle.classifier.mode, ClassifierMode::Degraded);
    assert!(bundle.classifier.source.contains("base"));
    assert_eq!(bundle.classifier.labels.len(), TEST_LABELS.len());
}

#[test]
fn test_no_manifest_anywhere_is_artifact_not_found() {
    let root = TempDir::new().unwrap();
    write_model_dir(&root.path().join("base"));
    let config = offline_vision_config(root.path());
    let expected = config.classifier_candidates.clone();

    let err = ModelProvisioner::with_factory(config, Arc::new(StubFactory::new(logits())))
        .provision_on(DeviceTag::Cpu)
        .unwrap_err();

    match err {
        ModelError::ArtifactNotFound { checked } => assert_eq!(checked, expected),
        other => panic!("expected ArtifactNotFound, got {:?}", other),
    }
}

#[test]
fn test_empty_candidate_list_is_artifact_not_found() {
    let root = TempDir::new().unwrap();
    let mut config = offline_vision_config(root.path());
    config.classifier_candidates.clear();

    let err = ModelProvisioner::with_factory(config, Arc::new(StubFactory::new(logits())))
        .provision_on(DeviceTag::Cpu)
        .unwrap_err();

    assert!(matches!(err, ModelError::ArtifactNotFound { ref checked } if checked.is_empty()));
    assert!(err.to_string().contains("no candidate paths"));
}

#[test]
fn test_manifest_without_weights_or_base_is_model_load_error() {
    let root = TempDir::new().unwrap();
    write_classifier_dir(&root.path().join("classifier"), TEST_LABELS, false);

    let err = ModelProvisioner::with_factory(
        offline_vision_config(root.path()),
        Arc::new(StubFactory::new(logits())),
    )
    .provision_on(DeviceTag::Cpu)
    .unwrap_err();

    match err {
        ModelError::ModelLoad {
            component,
            attempts,
        } => {
            assert_eq!(component, "classifier");
            assert_eq!(attempts.len(), 2);
            assert!(attempts[0].starts_with("trained"));
            assert!(attempts[1].starts_with("substitute"));
        }
        other => panic!("expected ModelLoad, got {:?}", other),
    }
}

#[test]
fn test_full_caption_tier() {
    let root = TempDir::new().unwrap();
    write_classifier_dir(&root.path().join("classifier"), TEST_LABELS, true);
    write_model_dir(&root.path().join("primary"));
    write_model_dir(&root.path().join("secondary"));

    let bundle = provision(offline_vision_config(root.path()), StubFactory::new(logits()));

    assert_eq!(bundle.captioners.tier, CaptionTier::Full);
    assert_eq!(bundle.captioners.primary.as_ref().unwrap().name(), "primary");
    assert_eq!(
        bundle.captioners.secondary.as_ref().unwrap().name(),
        "secondary"
    );
}

#[test]
fn test_secondary_failure_drops_to_lightweight() {
    let root = TempDir::new().unwrap();
    write_classifier_dir(&root.path().join("classifier"), TEST_LABELS, true);
    write_model_dir(&root.path().join("primary"));
    write_model_dir(&root.path().join("secondary"));
    write_model_dir(&root.path().join("light"));

    let bundle = provision(
        offline_vision_config(root.path()),
        StubFactory::new(logits()).failing(&["secondary"]),
    );

    assert_eq!(bundle.captioners.tier, CaptionTier::Lightweight);
    assert_eq!(bundle.captioners.primary.as_ref().unwrap().name(), "lightweight");
    assert!(bundle.captioners.secondary.is_none());
}

#[test]
fn test_caption_failures_are_not_fatal() {
    let root = TempDir::new().unwrap();
    write_classifier_dir(&root.path().join("classifier"), TEST_LABELS, true);
    write_model_dir(&root.path().join("primary"));
    write_model_dir(&root.path().join("secondary"));
    write_model_dir(&root.path().join("light"));

    let bundle = provision(
        offline_vision_config(root.path()),
        StubFactory::new(logits()).failing(&["primary", "lightweight"]),
    );

    assert!(bundle.trained());
    assert_eq!(bundle.captioners.tier, CaptionTier::Unavailable);
    assert!(bundle.captioners.primary.is_none());
}

#[test]
fn test_captioning_disabled() {
    let root = TempDir::new().unwrap();
    write_classifier_dir(&root.path().join("classifier"), TEST_LABELS, true);
    write_model_dir(&root.path().join("primary"));
    write_model_dir(&root.path().join("secondary"));

    let mut config = offline_vision_config(root.path());
    config.captioning_enabled = false;
    let bundle = provision(config, StubFactory::new(logits()));

    assert_eq!(bundle.status().caption_tier, CaptionTier::Unavailable);
}
