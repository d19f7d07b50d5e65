// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use agrivision_node::{
    api,
    config::NodeConfig,
    context::AppContext,
    text::build_text_service,
    version,
    vision::{ClassifierMode, ModelProvisioner},
};
use anyhow::{anyhow, Context, Result};
use std::env;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    info!("🚀 Starting {}", version::get_version_string());

    let config = NodeConfig::from_env();
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;

    info!(
        "Classifier candidates: {:?}",
        config.vision.classifier_candidates
    );

    // Model loading is blocking I/O plus ONNX session setup
    let provisioner = ModelProvisioner::new(config.vision.clone());
    let bundle = tokio::task::spawn_blocking(move || provisioner.provision())
        .await
        .context("Model provisioning task panicked")?
        .map_err(|e| {
            error!("❌ Model provisioning failed: {}", e);
            anyhow!(e)
        })?;

    let status = bundle.status();
    if status.classifier_mode == ClassifierMode::Degraded {
        warn!("⚠️ Serving predictions from an UNTRAINED classifier; results are not meaningful");
    }

    let text = build_text_service(&config.text).await;
    info!("Text service: {} (live: {})", text.name(), text.is_live());

    let ctx = AppContext::new(bundle, text, config);
    api::serve(ctx).await
}
