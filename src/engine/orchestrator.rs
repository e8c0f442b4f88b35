//! Verification orchestrator.
//!
//! Owns the temp-file lifecycle around the capability: decoded images are
//! written to uniquely-named temporary files, the verifier is invoked with
//! both paths, and the files are removed on every exit path.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use uuid::Uuid;

use crate::engine::decode::decode_image;
use crate::engine::verifier::{FaceVerifier, VerifierError};
use crate::error::{FaceAuthError, FaceAuthResult};

/// Informational threshold attached to successful responses for client
/// display. The capability's own decision threshold is authoritative for
/// `verified`; this value never feeds back into the verdict.
pub const DISPLAY_THRESHOLD: f64 = 0.65;

/// Outcome returned to the HTTP layer.
#[derive(Debug, Clone, Copy)]
pub struct VerifyOutcome {
    pub verified: bool,
    pub distance: f64,
    pub threshold: f64,
}

/// A temporary image file removed on drop.
///
/// The guard is created before the write, so a partially-failed write is
/// still cleaned up. Removal is gated on an existence check so a missing
/// file never turns cleanup into a second error.
struct TempImage {
    path: PathBuf,
}

impl TempImage {
    fn write(dir: &Path, prefix: &str, img: &RgbImage) -> FaceAuthResult<Self> {
        let path = dir.join(format!("{prefix}-{}.jpg", Uuid::new_v4()));
        let guard = Self { path };

        img.save_with_format(&guard.path, image::ImageFormat::Jpeg)
            .map_err(|e| {
                FaceAuthError::Internal(format!(
                    "failed to write temporary image {}: {e}",
                    guard.path.display()
                ))
            })?;

        Ok(guard)
    }
}

impl Drop for TempImage {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to remove temporary image"
                );
            }
        }
    }
}

/// Orchestrates a single verification request: decode, persist, compare,
/// clean up.
pub struct VerificationService {
    verifier: Box<dyn FaceVerifier>,
    temp_dir: PathBuf,
}

impl VerificationService {
    /// Create a new service around a verification backend.
    ///
    /// Temporary images go to `temp_dir`, or the OS temporary directory
    /// when not set.
    pub fn new(verifier: Box<dyn FaceVerifier>, temp_dir: Option<PathBuf>) -> Self {
        Self {
            verifier,
            temp_dir: temp_dir.unwrap_or_else(std::env::temp_dir),
        }
    }

    /// Decode both payloads and compare the faces they contain.
    ///
    /// Decode failures surface before any file is written.
    pub fn verify_pair(&self, image: &str, reference_image: &str) -> FaceAuthResult<VerifyOutcome> {
        let probe = decode_image(image)?;
        let reference = decode_image(reference_image)?;

        self.compare(&probe, &reference)
    }

    /// Name of the embedding model backing the verifier.
    pub fn model_name(&self) -> &str {
        self.verifier.model_name()
    }

    fn compare(&self, probe: &RgbImage, reference: &RgbImage) -> FaceAuthResult<VerifyOutcome> {
        let probe_file = TempImage::write(&self.temp_dir, "probe", probe)?;
        let reference_file = TempImage::write(&self.temp_dir, "reference", reference)?;

        let verification = self
            .verifier
            .verify(&probe_file.path, &reference_file.path)
            .map_err(map_verifier_error)?;

        tracing::debug!(
            verified = verification.verified,
            distance = verification.distance,
            model = self.verifier.model_name(),
            "comparison complete"
        );

        Ok(VerifyOutcome {
            verified: verification.verified,
            distance: verification.distance,
            threshold: DISPLAY_THRESHOLD,
        })
    }
}

/// Map capability failures into the HTTP error taxonomy.
///
/// Everything the backend can raise during a comparison counts as a
/// detection failure; model-load problems can only happen at startup and
/// would be an internal fault if they ever surfaced here.
fn map_verifier_error(err: VerifierError) -> FaceAuthError {
    match err {
        VerifierError::ModelNotFound(_) | VerifierError::ModelLoad(_) => {
            FaceAuthError::Internal(err.to_string())
        }
        VerifierError::NoFaceDetected(_)
        | VerifierError::InferenceFailed(_)
        | VerifierError::ImageRead { .. }
        | VerifierError::Ort(_) => FaceAuthError::Detection(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::verifier::Verification;
    use image::Rgb;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    /// Backend stub with a fixed outcome, recording the paths it was given.
    struct StubVerifier {
        outcome: StubOutcome,
        seen_paths: Arc<Mutex<Vec<PathBuf>>>,
    }

    enum StubOutcome {
        Match,
        NoFace,
    }

    impl StubVerifier {
        fn new(outcome: StubOutcome) -> Self {
            Self {
                outcome,
                seen_paths: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl FaceVerifier for StubVerifier {
        fn verify(&self, probe: &Path, reference: &Path) -> Result<Verification, VerifierError> {
            // Both files must exist while the capability runs.
            assert!(probe.exists());
            assert!(reference.exists());

            let mut seen = self.seen_paths.lock().unwrap();
            seen.push(probe.to_path_buf());
            seen.push(reference.to_path_buf());

            match self.outcome {
                StubOutcome::Match => Ok(Verification {
                    verified: true,
                    distance: 0.42,
                }),
                StubOutcome::NoFace => Err(VerifierError::NoFaceDetected("probe")),
            }
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    fn tiny_image() -> RgbImage {
        RgbImage::from_pixel(16, 16, Rgb([100, 150, 200]))
    }

    fn temp_file_count(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_success_passes_through_verdict_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let service = VerificationService::new(
            Box::new(StubVerifier::new(StubOutcome::Match)),
            Some(dir.path().to_path_buf()),
        );

        let outcome = service.compare(&tiny_image(), &tiny_image()).unwrap();

        assert!(outcome.verified);
        assert_eq!(outcome.distance, 0.42);
        assert_eq!(outcome.threshold, DISPLAY_THRESHOLD);
        assert_eq!(temp_file_count(dir.path()), 0);
    }

    #[test]
    fn test_detection_failure_maps_to_detection_error_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let service = VerificationService::new(
            Box::new(StubVerifier::new(StubOutcome::NoFace)),
            Some(dir.path().to_path_buf()),
        );

        let err = service.compare(&tiny_image(), &tiny_image()).unwrap_err();

        assert!(matches!(err, FaceAuthError::Detection(_)));
        assert_eq!(temp_file_count(dir.path()), 0);
    }

    #[test]
    fn test_temp_paths_are_unique_per_request() {
        let dir = tempfile::tempdir().unwrap();
        let verifier = StubVerifier::new(StubOutcome::Match);
        let seen_paths = verifier.seen_paths.clone();
        let service =
            VerificationService::new(Box::new(verifier), Some(dir.path().to_path_buf()));

        service.compare(&tiny_image(), &tiny_image()).unwrap();
        service.compare(&tiny_image(), &tiny_image()).unwrap();

        let seen = seen_paths.lock().unwrap();
        assert_eq!(seen.len(), 4);
        let unique: HashSet<_> = seen.iter().collect();
        assert_eq!(unique.len(), 4, "temp file names must never collide");
    }

    #[test]
    fn test_decode_failure_creates_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let service = VerificationService::new(
            Box::new(StubVerifier::new(StubOutcome::Match)),
            Some(dir.path().to_path_buf()),
        );

        let err = service.verify_pair("not base64 at all!", "also not base64!").unwrap_err();

        assert!(matches!(err, FaceAuthError::Decode(_)));
        assert_eq!(temp_file_count(dir.path()), 0);
    }

    #[test]
    fn test_temp_image_guard_removes_file_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let guard = TempImage::write(dir.path(), "probe", &tiny_image()).unwrap();
            assert!(guard.path.exists());
            guard.path.clone()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_temp_image_guard_tolerates_already_removed_file() {
        let dir = tempfile::tempdir().unwrap();
        let guard = TempImage::write(dir.path(), "reference", &tiny_image()).unwrap();
        fs::remove_file(&guard.path).unwrap();
        // Drop must not panic even though the file is gone.
        drop(guard);
    }
}
