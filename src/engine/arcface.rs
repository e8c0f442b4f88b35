//! ArcFace-backed face verification.
//!
//! Detection uses the rustface (SeetaFace) frontal detector; embeddings come
//! from an ArcFace ONNX model run through ONNX Runtime. The highest-scoring
//! face in each image is cropped, resized to 112x112 and embedded, and the
//! two embeddings are compared under the configured distance metric.

use std::cmp::Ordering;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::Mutex;

use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;

use crate::engine::verifier::{DistanceMetric, FaceVerifier, Verification, VerifierError};

// --- Named constants (no magic numbers) ---
const ARCFACE_INPUT_SIZE: u32 = 112;
const ARCFACE_MEAN: f32 = 127.5;
const ARCFACE_STD: f32 = 127.5; // symmetric normalization, not 128.0
const ARCFACE_EMBEDDING_DIM: usize = 512;
const ARCFACE_MODEL_VERSION: &str = "w600k_r50";

/// Margin added around the detected box before cropping, as a fraction of
/// the box size. SeetaFace boxes sit tight on the face; ArcFace expects a
/// little context around it.
const CROP_MARGIN: f32 = 0.15;

const DETECT_MIN_FACE_SIZE: u32 = 20;
const DETECT_SCORE_THRESHOLD: f64 = 2.0;
const DETECT_PYRAMID_SCALE: f32 = 0.8;
const DETECT_WINDOW_STEP: u32 = 4;

/// A detected face region in image coordinates.
#[derive(Debug, Clone, Copy)]
struct FaceBox {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
}

/// ArcFace-based face verifier.
pub struct ArcFaceVerifier {
    detector_model: rustface::Model,
    /// ONNX Runtime session; `run` needs `&mut`, so access is serialized.
    session: Mutex<Session>,
    metric: DistanceMetric,
    threshold: f64,
}

impl std::fmt::Debug for ArcFaceVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArcFaceVerifier")
            .field("metric", &self.metric)
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl ArcFaceVerifier {
    /// Load the detector and embedding models from the given paths.
    pub fn load(
        detector_path: &str,
        embedding_path: &str,
        metric: DistanceMetric,
        threshold: f64,
    ) -> Result<Self, VerifierError> {
        if !Path::new(detector_path).exists() {
            return Err(VerifierError::ModelNotFound(detector_path.to_string()));
        }
        if !Path::new(embedding_path).exists() {
            return Err(VerifierError::ModelNotFound(embedding_path.to_string()));
        }

        let detector_bytes = fs::read(detector_path)
            .map_err(|e| VerifierError::ModelLoad(format!("{detector_path}: {e}")))?;
        let detector_model = rustface::read_model(Cursor::new(detector_bytes))
            .map_err(|e| VerifierError::ModelLoad(format!("{detector_path}: {e}")))?;

        let session = Session::builder()?
            .with_intra_threads(2)
            .map_err(ort::Error::from)?
            .commit_from_file(embedding_path)?;

        tracing::info!(
            detector = detector_path,
            embedding = embedding_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded verification models"
        );

        Ok(Self {
            detector_model,
            session: Mutex::new(session),
            metric,
            threshold,
        })
    }

    /// Find the highest-scoring face in an image.
    ///
    /// `role` names the image ("probe" or "reference") in the no-face error.
    fn detect_best_face(&self, img: &RgbImage, role: &'static str) -> Result<FaceBox, VerifierError> {
        let gray = image::imageops::grayscale(img);

        let mut detector = rustface::create_detector_with_model(self.detector_model.clone());
        detector.set_min_face_size(DETECT_MIN_FACE_SIZE);
        detector.set_score_thresh(DETECT_SCORE_THRESHOLD);
        detector.set_pyramid_scale_factor(DETECT_PYRAMID_SCALE);
        detector.set_slide_window_step(DETECT_WINDOW_STEP, DETECT_WINDOW_STEP);

        let faces = detector.detect(&rustface::ImageData::new(
            gray.as_raw(),
            img.width(),
            img.height(),
        ));

        tracing::debug!(role, faces = faces.len(), "face detection complete");

        faces
            .iter()
            .max_by(|a, b| a.score().partial_cmp(&b.score()).unwrap_or(Ordering::Equal))
            .map(|face| {
                let bbox = face.bbox();
                FaceBox {
                    x: bbox.x(),
                    y: bbox.y(),
                    width: bbox.width(),
                    height: bbox.height(),
                }
            })
            .ok_or(VerifierError::NoFaceDetected(role))
    }

    /// Crop the face region (with margin, clamped to image bounds) and
    /// resize it to the ArcFace input size.
    fn crop_face(img: &RgbImage, face: &FaceBox) -> RgbImage {
        let margin_x = face.width as f32 * CROP_MARGIN;
        let margin_y = face.height as f32 * CROP_MARGIN;

        let x0 = (face.x as f32 - margin_x).max(0.0) as u32;
        let y0 = (face.y as f32 - margin_y).max(0.0) as u32;
        let x1 = ((face.x as f32 + face.width as f32 + margin_x).min(img.width() as f32)) as u32;
        let y1 = ((face.y as f32 + face.height as f32 + margin_y).min(img.height() as f32)) as u32;

        let crop = image::imageops::crop_imm(img, x0, y0, x1.saturating_sub(x0).max(1), y1.saturating_sub(y0).max(1))
            .to_image();

        image::imageops::resize(
            &crop,
            ARCFACE_INPUT_SIZE,
            ARCFACE_INPUT_SIZE,
            FilterType::Triangle,
        )
    }

    /// Preprocess a 112x112 RGB face crop into a NCHW float tensor.
    fn preprocess(face: &RgbImage) -> Array4<f32> {
        let size = ARCFACE_INPUT_SIZE as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

        for (x, y, pixel) in face.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] =
                    (pixel[c] as f32 - ARCFACE_MEAN) / ARCFACE_STD;
            }
        }

        tensor
    }

    /// Extract an L2-normalized embedding from a 112x112 face crop.
    fn embed(&self, face: &RgbImage) -> Result<Vec<f32>, VerifierError> {
        let input = Self::preprocess(face);

        let mut session = self
            .session
            .lock()
            .map_err(|_| VerifierError::InferenceFailed("embedding session lock poisoned".to_string()))?;

        let outputs = session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| VerifierError::InferenceFailed(format!("embedding extraction: {e}")))?;

        let raw: Vec<f32> = raw_data.to_vec();

        if raw.len() != ARCFACE_EMBEDDING_DIM {
            return Err(VerifierError::InferenceFailed(format!(
                "expected {ARCFACE_EMBEDDING_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        Ok(l2_normalize(raw))
    }

    fn load_image(path: &Path) -> Result<RgbImage, VerifierError> {
        image::open(path)
            .map(|img| img.to_rgb8())
            .map_err(|source| VerifierError::ImageRead {
                path: path.display().to_string(),
                source,
            })
    }
}

impl FaceVerifier for ArcFaceVerifier {
    fn verify(&self, probe: &Path, reference: &Path) -> Result<Verification, VerifierError> {
        let probe_img = Self::load_image(probe)?;
        let reference_img = Self::load_image(reference)?;

        let probe_face = self.detect_best_face(&probe_img, "probe")?;
        let reference_face = self.detect_best_face(&reference_img, "reference")?;

        let probe_embedding = self.embed(&Self::crop_face(&probe_img, &probe_face))?;
        let reference_embedding = self.embed(&Self::crop_face(&reference_img, &reference_face))?;

        let distance = self.metric.distance(&probe_embedding, &reference_embedding);

        Ok(Verification {
            verified: distance <= self.threshold,
            distance,
        })
    }

    fn model_name(&self) -> &str {
        ARCFACE_MODEL_VERSION
    }
}

/// L2-normalize an embedding vector. A zero vector is returned unchanged.
fn l2_normalize(values: Vec<f32>) -> Vec<f32> {
    let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        values.iter().map(|x| x / norm).collect()
    } else {
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_preprocess_shape_and_normalization() {
        let face = RgbImage::from_pixel(ARCFACE_INPUT_SIZE, ARCFACE_INPUT_SIZE, Rgb([255, 0, 127]));
        let tensor = ArcFaceVerifier::preprocess(&face);

        assert_eq!(tensor.shape(), &[1, 3, 112, 112]);
        // 255 -> 1.0, 0 -> -1.0, 127 -> just below 0
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
        assert!((tensor[[0, 1, 0, 0]] + 1.0).abs() < 1e-6);
        assert!(tensor[[0, 2, 0, 0]].abs() < 0.01);
    }

    #[test]
    fn test_crop_face_resizes_to_input_size() {
        let img = RgbImage::from_pixel(200, 200, Rgb([10, 20, 30]));
        let face = FaceBox { x: 50, y: 50, width: 80, height: 80 };

        let crop = ArcFaceVerifier::crop_face(&img, &face);
        assert_eq!(crop.dimensions(), (ARCFACE_INPUT_SIZE, ARCFACE_INPUT_SIZE));
    }

    #[test]
    fn test_crop_face_clamps_to_image_bounds() {
        // Face box hanging over the top-left corner; margin would go negative.
        let img = RgbImage::from_pixel(60, 60, Rgb([0, 0, 0]));
        let face = FaceBox { x: 0, y: 0, width: 59, height: 59 };

        let crop = ArcFaceVerifier::crop_face(&img, &face);
        assert_eq!(crop.dimensions(), (ARCFACE_INPUT_SIZE, ARCFACE_INPUT_SIZE));
    }

    #[test]
    fn test_l2_normalize_unit_norm() {
        let normalized = l2_normalize(vec![3.0, 4.0]);
        let norm: f32 = normalized.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        assert!((normalized[0] - 0.6).abs() < 1e-6);
        assert!((normalized[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector_unchanged() {
        assert_eq!(l2_normalize(vec![0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_load_with_missing_models_fails() {
        let err = ArcFaceVerifier::load(
            "/nonexistent/detector.bin",
            "/nonexistent/model.onnx",
            DistanceMetric::Cosine,
            0.68,
        )
        .unwrap_err();
        assert!(matches!(err, VerifierError::ModelNotFound(_)));
    }
}
