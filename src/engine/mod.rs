//! Verification engine for FaceAuth Core.
//!
//! This module contains the verification pipeline:
//! - Image Decoder: base64/data-URI payloads to RGB buffers
//! - Verification Orchestrator: temp-file lifecycle around the capability
//! - Face Verifier: the comparison capability (rustface + ArcFace ONNX)

mod arcface;
mod decode;
mod orchestrator;
mod verifier;

pub use arcface::*;
pub use decode::*;
pub use orchestrator::*;
pub use verifier::*;
