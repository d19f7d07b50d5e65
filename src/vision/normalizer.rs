// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Label and caption normalization
//!
//! Classifier labels arrive as `"Crop/Disease"` strings from the model
//! manifest. These helpers turn them into the user-facing crop and disease
//! fields, annotate results from a degraded classifier, and reconcile two
//! caption sources into one sentence.

/// Prefix applied to every label produced by a classifier without trained weights
pub const DEGRADED_MARKER: &str = "[UNTRAINED]";

/// Label used when the predicted index has no manifest entry
pub const UNKNOWN_LABEL: &str = "Unknown/Disease";

/// Disease reported when the label carries no disease half
pub const DEFAULT_DISEASE: &str = "Healthy";

/// Directory artefact that leaked into some training label sets
const SPURIOUS_MARKER: &str = ".ipynb_checkpoints";

/// One caption must be this many times longer than the other to win outright
const LENGTH_DOMINANCE_RATIO: f64 = 1.5;

/// Split a raw classifier label into `(crop, disease)`
///
/// The label is split on the first `/`. Labels without a separator describe a
/// healthy crop. A disease half contaminated with notebook checkpoint
/// directories is treated as healthy.
pub fn split_label(raw: &str) -> (String, String) {
    let (crop, disease) = match raw.split_once('/') {
        Some((crop, disease)) => (crop, disease),
        None => (raw, DEFAULT_DISEASE),
    };

    let disease = if disease.contains(SPURIOUS_MARKER) {
        DEFAULT_DISEASE
    } else {
        disease
    };

    (crop.trim().to_string(), disease.trim().to_string())
}

/// Prefix a label with the degraded-mode marker
pub fn mark_degraded(label: &str) -> String {
    format!("{} {}", DEGRADED_MARKER, label)
}

/// Whether a label carries the degraded-mode marker
pub fn is_marked_degraded(label: &str) -> bool {
    label.starts_with(DEGRADED_MARKER)
}

/// Merge two captions into one
///
/// Both inputs are trimmed. A caption at least 1.5x the character length of
/// the other wins; captions equal ignoring case collapse to the first;
/// otherwise both are joined as two sentences.
pub fn merge_captions(first: &str, second: &str) -> String {
    let a = first.trim();
    let b = second.trim();

    let len_a = a.chars().count() as f64;
    let len_b = b.chars().count() as f64;

    if len_a >= len_b * LENGTH_DOMINANCE_RATIO && len_a > len_b {
        return a.to_string();
    }
    if len_b >= len_a * LENGTH_DOMINANCE_RATIO && len_b > len_a {
        return b.to_string();
    }
    if a.to_lowercase() == b.to_lowercase() {
        return a.to_string();
    }

    format!("{}. {}", a.trim_end_matches('.'), b)
}
