// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process-wide state shared by every request handler

use std::sync::Arc;

use crate::config::NodeConfig;
use crate::pipeline::AnalysisPipeline;
use crate::text::TextService;
use crate::vision::ModelBundle;

/// Built once in `main` and cloned into axum state
#[derive(Clone)]
pub struct AppContext {
    pub pipeline: AnalysisPipeline,
    pub text: Arc<dyn TextService>,
    pub config: Arc<NodeConfig>,
}

impl AppContext {
    pub fn new(bundle: ModelBundle, text: Arc<dyn TextService>, config: NodeConfig) -> Self {
        let pipeline = AnalysisPipeline::new(Arc::new(bundle))
            .with_caption_merge(config.vision.caption_merge_enabled);
        Self {
            pipeline,
            text,
            config: Arc::new(config),
        }
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("pipeline", &self.pipeline)
            .field("text", &self.text.name())
            .finish_non_exhaustive()
    }
}
