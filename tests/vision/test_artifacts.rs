// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Artifact resolution against real directories

use crate::common::{write_classifier_dir, TEST_LABELS};
use agrivision_node::vision::artifacts::{ArtifactResolver, LabelMap, MANIFEST_FILE};
use agrivision_node::vision::normalizer::UNKNOWN_LABEL;
use agrivision_node::vision::ModelError;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_first_complete_candidate_wins() {
    let root = TempDir::new().unwrap();
    let partial = root.path().join("partial");
    let first = root.path().join("first");
    let second = root.path().join("second");
    write_classifier_dir(&partial, TEST_LABELS, false);
    write_classifier_dir(&first, TEST_LABELS, true);
    write_classifier_dir(&second, TEST_LABELS, true);

    let resolver = ArtifactResolver::new(vec![partial, first.clone(), second]);
    assert_eq!(resolver.resolve().unwrap(), first);
}

#[test]
fn test_resolution_failure_lists_every_candidate() {
    let candidates = vec![PathBuf::from("/nonexistent/a"), PathBuf::from("/nonexistent/b")];
    let err = ArtifactResolver::new(candidates.clone())
        .resolve()
        .unwrap_err();

    match &err {
        ModelError::ArtifactNotFound { checked } => assert_eq!(checked, &candidates),
        other => panic!("unexpected error {:?}", other),
    }
    assert!(err.to_string().contains("/nonexistent/a"));
}

#[test]
fn test_empty_candidate_list() {
    let err = ArtifactResolver::new(Vec::new()).resolve().unwrap_err();
    assert!(matches!(err, ModelError::ArtifactNotFound { ref checked } if checked.is_empty()));
}

#[test]
fn test_manifest_found_without_weights() {
    let root = TempDir::new().unwrap();
    let dir = root.path().join("labels-only");
    write_classifier_dir(&dir, TEST_LABELS, false);

    let resolver = ArtifactResolver::new(vec![root.path().join("nothing"), dir.clone()]);
    assert!(resolver.resolve().is_err());
    assert_eq!(resolver.find_manifest().unwrap(), dir.join(MANIFEST_FILE));
}

#[test]
fn test_label_map_from_written_manifest() {
    let root = TempDir::new().unwrap();
    write_classifier_dir(root.path(), TEST_LABELS, true);

    let labels = LabelMap::from_manifest(&root.path().join(MANIFEST_FILE)).unwrap();
    assert_eq!(labels.len(), 4);
    assert_eq!(labels.span(), 4);
    assert_eq!(labels.label_for(2), "Rice/Brown Spot");
    assert_eq!(labels.label_for(99), UNKNOWN_LABEL);
}
