//! HTTP request handlers.

use axum::{extract::State, Json};

use crate::api::types::*;
use crate::error::{FaceAuthError, FaceAuthResult};
use crate::AppState;

/// Verify a probe image against a reference image.
///
/// POST /api/verify
#[utoipa::path(
    post,
    path = "/api/verify",
    request_body = VerifyRequest,
    responses(
        (status = 200, description = "Comparison complete", body = VerifyResponse),
        (status = 400, description = "Missing field, undecodable image, or no detectable face"),
        (status = 500, description = "Internal error")
    ),
    tag = "verify"
)]
pub async fn verify_face(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> FaceAuthResult<Json<VerifyResponse>> {
    let (image, reference_image) = match (request.image, request.reference_image) {
        (Some(image), Some(reference_image)) => (image, reference_image),
        _ => return Err(FaceAuthError::MissingImages),
    };

    tracing::info!("verifying face pair");

    // Decode and inference are blocking; keep them off the async runtime.
    let service = state.service.clone();
    let outcome =
        tokio::task::spawn_blocking(move || service.verify_pair(&image, &reference_image))
            .await
            .map_err(|e| FaceAuthError::Internal(format!("verification task failed: {e}")))??;

    tracing::info!(
        verified = outcome.verified,
        distance = outcome.distance,
        "verification complete"
    );

    Ok(Json(VerifyResponse {
        verified: outcome.verified,
        distance: outcome.distance,
        threshold: outcome.threshold,
    }))
}

/// Service health and model identity.
///
/// GET /api/health
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.service.model_name().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
