//! Route definitions for the API.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::handlers;
use crate::AppState;

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::verify_face, handlers::health_check),
    components(schemas(
        crate::api::types::VerifyRequest,
        crate::api::types::VerifyResponse,
        crate::api::types::HealthResponse,
    )),
    tags(
        (name = "verify", description = "Face verification"),
        (name = "health", description = "Health and status endpoints")
    ),
    info(
        title = "FaceAuth Core API",
        version = "0.1.0",
        description = "Face verification service - compares a probe image against a reference image",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Build the API router.
///
/// CORS is wide open on purpose: browser clients capture webcam frames and
/// post them from arbitrary origins.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Verification
        .route("/api/verify", post(handlers::verify_face))
        // Health
        .route("/api/health", get(handlers::health_check))
        .with_state(state)
        // OpenAPI docs
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
