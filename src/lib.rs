// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod context;
pub mod pipeline;
pub mod text;
pub mod version;
pub mod vision;

pub use config::NodeConfig;
pub use context::AppContext;
pub use pipeline::{AnalysisPipeline, AnalysisResult, PipelineError};
pub use text::{Language, TextService};
pub use vision::{ModelBundle, ModelError, ModelProvisioner};
