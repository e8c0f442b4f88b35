//! FaceAuth Core - Face Verification Service
//!
//! This service accepts a probe and a reference image over HTTP, runs face
//! detection and embedding comparison, and reports whether the two images
//! depict the same person.

use std::sync::Arc;

use tokio::net::TcpListener;

mod api;
mod config;
mod engine;
mod error;
mod logging;

use crate::api::build_router;
use crate::config::Config;
use crate::engine::{ArcFaceVerifier, VerificationService};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The verification orchestrator.
    pub service: Arc<VerificationService>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    // This is optional and won't fail if .env doesn't exist
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Note: No .env file loaded ({e})");
    }

    // Initialize logging
    logging::init();

    tracing::info!("Starting FaceAuth Core v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        detector_model = %config.engine.detector_model,
        embedding_model = %config.engine.embedding_model,
        metric = ?config.engine.distance_metric,
        verify_threshold = %config.engine.verify_threshold,
        "Configuration loaded"
    );

    // Load the verification models once, up front
    let verifier = ArcFaceVerifier::load(
        &config.engine.detector_model,
        &config.engine.embedding_model,
        config.engine.distance_metric,
        config.engine.verify_threshold,
    )
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to load verification models");
        anyhow::anyhow!("Model load error: {}", e)
    })?;

    // Build application state
    let service = Arc::new(VerificationService::new(
        Box::new(verifier),
        config.engine.temp_dir.clone(),
    ));
    let state = AppState { service };

    // Build router
    let app = build_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(address = %addr, "Server listening");
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
