//! API request and response types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ==================== Verify ====================

/// Request to verify a probe image against a reference image.
///
/// Fields are optional at the serde level so that presence can be validated
/// in the handler with the service's own error body, rather than a generic
/// deserialization rejection.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// Probe image: raw base64 or a data-URI.
    pub image: Option<String>,
    /// Reference image: raw base64 or a data-URI.
    pub reference_image: Option<String>,
}

/// Successful verification response.
#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyResponse {
    /// Whether the two images depict the same person, as decided by the
    /// verification capability.
    pub verified: bool,
    /// Embedding distance between the two faces.
    pub distance: f64,
    /// Informational display threshold; not the capability's decision
    /// threshold.
    pub threshold: f64,
}

// ==================== Health ====================

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Embedding model in use.
    pub model: String,
    /// Timestamp.
    pub timestamp: String,
}
