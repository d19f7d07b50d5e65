// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Label and caption normalization through the public API

use agrivision_node::vision::normalizer::{
    is_marked_degraded, mark_degraded, merge_captions, split_label, DEFAULT_DISEASE,
    DEGRADED_MARKER,
};

#[test]
fn test_every_label_splits_into_two_non_empty_parts() {
    let labels = [
        "Corn/Common Rust",
        "Wheat",
        " Rice / Leaf Blast ",
        "Potato/.ipynb_checkpoints",
        "Apple/Scab/Severe",
    ];
    for raw in labels {
        let (crop, disease) = split_label(raw);
        assert!(!crop.is_empty(), "crop empty for {}", raw);
        assert!(!disease.is_empty(), "disease empty for {}", raw);
        assert_eq!(crop, crop.trim());
        assert_eq!(disease, disease.trim());
    }
}

#[test]
fn test_label_without_separator_is_healthy() {
    assert_eq!(
        split_label("Wheat"),
        ("Wheat".to_string(), DEFAULT_DISEASE.to_string())
    );
}

#[test]
fn test_split_on_first_separator_only() {
    assert_eq!(
        split_label("Apple/Scab/Severe"),
        ("Apple".to_string(), "Scab/Severe".to_string())
    );
}

#[test]
fn test_checkpoint_artifact_is_healthy() {
    let (crop, disease) = split_label("Potato/.ipynb_checkpoints");
    assert_eq!(crop, "Potato");
    assert_eq!(disease, "Healthy");
}

#[test]
fn test_degraded_marker_round_trip() {
    let marked = mark_degraded("Tomato");
    assert!(marked.starts_with(DEGRADED_MARKER));
    assert!(marked.ends_with("Tomato"));
    assert!(is_marked_degraded(&marked));
    assert!(!is_marked_degraded("Tomato"));
}

#[test]
fn test_merge_identical_captions() {
    assert_eq!(
        merge_captions("  A leaf with spots ", "a leaf with SPOTS"),
        "A leaf with spots"
    );
}

#[test]
fn test_merge_prefers_much_longer_caption() {
    let short = "short";
    let long = "a very much longer caption text here";
    assert_eq!(merge_captions(short, long), long);
    assert_eq!(merge_captions(long, short), long);
}

#[test]
fn test_merge_similar_lengths_joins_sentences() {
    assert_eq!(
        merge_captions("a green leaf.", "a brown leaf"),
        "a green leaf. a brown leaf"
    );
}

#[test]
fn test_merge_with_empty_secondary_keeps_primary() {
    assert_eq!(merge_captions("a tomato plant", ""), "a tomato plant");
}
