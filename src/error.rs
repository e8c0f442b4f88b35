//! Error types for FaceAuth Core.
//!
//! Defines a unified error type that maps each failure class to a fixed
//! HTTP status and response body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::engine::DecodeError;

/// Unified error type for FaceAuth Core operations.
#[derive(Debug, Error)]
pub enum FaceAuthError {
    #[error("Image and reference image are required")]
    MissingImages,

    #[error("Invalid image payload: {0}")]
    Decode(#[from] DecodeError),

    #[error("Face detection error: {0}")]
    Detection(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body for API clients.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Present (and false) only for detection failures, where clients expect
    /// an explicit negative verdict alongside the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for FaceAuthError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            FaceAuthError::MissingImages => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    verified: None,
                    error: "Image and reference image are required".to_string(),
                    details: None,
                },
            ),
            FaceAuthError::Decode(e) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    verified: None,
                    error: "Invalid image payload".to_string(),
                    details: Some(e.to_string()),
                },
            ),
            FaceAuthError::Detection(details) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    verified: Some(false),
                    error: "Face detection error".to_string(),
                    details: Some(details.clone()),
                },
            ),
            FaceAuthError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        verified: None,
                        error: msg.clone(),
                        details: None,
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for FaceAuth operations.
pub type FaceAuthResult<T> = Result<T, FaceAuthError>;
