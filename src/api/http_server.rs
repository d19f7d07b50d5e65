// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::handlers::{
    ask_handler, diagnose_handler, health_handler, root_handler, translate_handler,
    translate_result_handler, upload_image_handler,
};
use crate::config::ServerConfig;
use crate::context::AppContext;

/// Room for multipart boundaries and text fields on top of the image itself
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Build the router with CORS, tracing and the upload body limit
pub fn create_app(ctx: AppContext) -> Router {
    let cors = cors_layer(&ctx.config.server);
    let body_limit = ctx.config.server.max_upload_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/upload-image/", post(upload_image_handler))
        .route("/diagnose/", post(diagnose_handler))
        .route("/ask/", post(ask_handler))
        .route("/translate/", post(translate_handler))
        .route("/translate-result/", post(translate_result_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(ctx)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("⚠️ Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Bind and serve until ctrl-c
pub async fn serve(ctx: AppContext) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", ctx.config.server.host, ctx.config.server.port)
        .parse()
        .context("Invalid API_HOST/API_PORT")?;

    let app = create_app(ctx);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("🚀 API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("⚠️ Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
