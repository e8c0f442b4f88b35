//! The face-verification capability seam.
//!
//! The orchestrator only ever talks to a [`FaceVerifier`], so the concrete
//! backend (ONNX models, a remote service, a test stub) stays swappable.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors raised by a verification backend.
#[derive(Error, Debug)]
pub enum VerifierError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("failed to load model: {0}")]
    ModelLoad(String),
    #[error("no face detected in the {0} image")]
    NoFaceDetected(&'static str),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("failed to read image {path}: {source}")]
    ImageRead {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Outcome reported by the capability.
///
/// `verified` is decided by the backend against its own model/metric
/// threshold; callers must not re-derive it from `distance`.
#[derive(Debug, Clone, Copy)]
pub struct Verification {
    pub verified: bool,
    pub distance: f64,
}

/// Distance metric for comparing face embeddings. Lower = more similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// 1 - cosine similarity, in [0, 2] for arbitrary vectors.
    #[default]
    Cosine,
    /// Euclidean (L2) distance.
    Euclidean,
}

impl DistanceMetric {
    /// Compute the distance between two embedding vectors.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f64 {
        match self {
            DistanceMetric::Cosine => {
                let mut dot = 0.0f64;
                let mut norm_a = 0.0f64;
                let mut norm_b = 0.0f64;

                for (x, y) in a.iter().zip(b.iter()) {
                    dot += f64::from(*x) * f64::from(*y);
                    norm_a += f64::from(*x) * f64::from(*x);
                    norm_b += f64::from(*y) * f64::from(*y);
                }

                let denom = norm_a.sqrt() * norm_b.sqrt();
                if denom > 0.0 {
                    1.0 - dot / denom
                } else {
                    // A zero vector carries no direction; treat as maximally
                    // dissimilar rather than dividing by zero.
                    1.0
                }
            }
            DistanceMetric::Euclidean => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| f64::from(x - y).powi(2))
                .sum::<f64>()
                .sqrt(),
        }
    }
}

/// Trait for face-verification backends.
///
/// Takes two image file paths and reports whether they depict the same
/// person, together with the computed embedding distance.
pub trait FaceVerifier: Send + Sync {
    /// Compare the faces found in two image files.
    fn verify(&self, probe: &Path, reference: &Path) -> Result<Verification, VerifierError>;

    /// Name of the embedding model backing this verifier.
    fn model_name(&self) -> &str;
}
