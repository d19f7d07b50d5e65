// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the AgriVision node

/// Crate version reported by `/` and at startup
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Capabilities compiled into this build
pub const FEATURES: &[&str] = &[
    "crop-disease-classification",
    "image-captioning",
    "untrained-fallback",
    "bengali-translation",
];

/// Human-readable version line for logs
pub fn get_version_string() -> String {
    format!("agrivision-node {} [{}]", VERSION, FEATURES.join(", "))
}
