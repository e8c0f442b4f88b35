//! HTTP API layer for FaceAuth Core.
//!
//! Provides the verification endpoint and health reporting.

pub mod handlers;
mod routes;
mod types;

pub use routes::build_router;
