// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Neural face encoder: an UltraFace-style detector followed by an
// ArcFace-style embedding network, both executed by `rten`.
//
// Expected model files in the configured directory:
//
// - `face-detection.rten`: input `[1, 3, 240, 320]` normalised as
//   `(p - 127) / 128`; outputs `scores [1, N, 2]` (background, face) and
//   `boxes [1, N, 4]` as relative `(x1, y1, x2, y2)`.
// - `face-embedding.rten`: input `[1, 3, 112, 112]` normalised as
//   `(p - 127.5) / 128`; output `[1, D]`.
//
// ONNX exports convert with `rten-convert model.onnx model.rten`.

use std::path::{Path, PathBuf};

use idcheck_core::error::IdCheckError;
use idcheck_core::types::FaceEncoding;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use rten::Model;
use rten_tensor::NdTensor;
use rten_tensor::prelude::*;
use tracing::{debug, info, instrument};

use crate::encoder::FaceEncoder;

const DETECTION_MODEL_FILENAME: &str = "face-detection.rten";
const EMBEDDING_MODEL_FILENAME: &str = "face-embedding.rten";

const DETECTOR_WIDTH: u32 = 320;
const DETECTOR_HEIGHT: u32 = 240;
const EMBEDDING_SIDE: u32 = 112;

/// Match tolerance for unit-length embeddings. Euclidean distance `d` and
/// cosine similarity `c` relate as `d = sqrt(2 - 2c)`, so 1.1 accepts pairs
/// with cosine similarity of about 0.4 or more.
pub const EMBEDDING_TOLERANCE: f32 = 1.1;

/// Paths and thresholds for [`OnnxFaceEncoder`].
#[derive(Debug, Clone, PartialEq)]
pub struct FaceModelConfig {
    pub detection_model_path: PathBuf,
    pub embedding_model_path: PathBuf,
    /// Minimum face probability for a detection to count.
    pub score_threshold: f32,
    /// Overlap above which the weaker of two detections is suppressed.
    pub iou_threshold: f32,
    /// Largest embedding distance accepted as the same person.
    pub match_tolerance: f32,
}

impl FaceModelConfig {
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            embedding_model_path: dir.join(EMBEDDING_MODEL_FILENAME),
            score_threshold: 0.7,
            iou_threshold: 0.3,
            match_tolerance: EMBEDDING_TOLERANCE,
        }
    }
}

/// A detected face in relative image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Detection {
    score: f32,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

impl Detection {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    fn iou(&self, other: &Detection) -> f32 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let inter = w * h;
        let union = self.area() + other.area() - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }
}

/// Greedy non-maximum suppression; survivors sorted by score, best first.
fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<Detection> = Vec::new();
    for candidate in detections {
        if kept.iter().all(|k| k.iou(&candidate) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}

/// Scale to unit length so that distances compare directions only.
fn l2_normalise(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

/// Pack an RGB image into a `[1, 3, H, W]` tensor as `(p - mean) / scale`.
fn to_nchw(image: &RgbImage, mean: f32, scale: f32) -> NdTensor<f32, 4> {
    let (w, h) = image.dimensions();
    NdTensor::from_fn([1, 3, h as usize, w as usize], |[_, c, y, x]| {
        (f32::from(image.get_pixel(x as u32, y as u32).0[c]) - mean) / scale
    })
}

fn model_err(context: &str) -> impl Fn(rten::RunError) -> IdCheckError + '_ {
    move |err| IdCheckError::FaceError(format!("{context}: {err}"))
}

fn load_model(role: &str, path: &Path) -> Result<Model, IdCheckError> {
    if !path.exists() {
        return Err(IdCheckError::FaceError(format!(
            "{role} model not found at {}",
            path.display()
        )));
    }
    info!(role, path = %path.display(), "Loading face model");
    Model::load_file(path).map_err(|err| {
        IdCheckError::FaceError(format!(
            "failed to load {role} model from {}: {err}",
            path.display()
        ))
    })
}

/// [`FaceEncoder`] running both networks on the CPU.
pub struct OnnxFaceEncoder {
    detector: Model,
    embedder: Model,
    config: FaceModelConfig,
}

impl std::fmt::Debug for OnnxFaceEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxFaceEncoder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl OnnxFaceEncoder {
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        embedding = %config.embedding_model_path.display(),
    ))]
    pub fn new(config: FaceModelConfig) -> Result<Self, IdCheckError> {
        let detector = load_model("detection", &config.detection_model_path)?;
        let embedder = load_model("embedding", &config.embedding_model_path)?;
        info!("Face models ready");
        Ok(Self {
            detector,
            embedder,
            config,
        })
    }

    pub fn from_model_dir(dir: impl AsRef<Path>) -> Result<Self, IdCheckError> {
        Self::new(FaceModelConfig::from_dir(dir))
    }

    fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, IdCheckError> {
        let resized = image::imageops::resize(
            image,
            DETECTOR_WIDTH,
            DETECTOR_HEIGHT,
            FilterType::Triangle,
        );
        let input = to_nchw(&resized, 127.0, 128.0);

        let input_id = *self
            .detector
            .input_ids()
            .first()
            .ok_or_else(|| IdCheckError::FaceError("detector has no inputs".into()))?;
        let output_ids = self.detector.output_ids();
        if output_ids.len() < 2 {
            return Err(IdCheckError::FaceError(
                "detector must produce scores and boxes".into(),
            ));
        }

        let mut outputs = self
            .detector
            .run(
                vec![(input_id, input.view().into())],
                &output_ids[..2],
                None,
            )
            .map_err(model_err("face detection failed"))?;
        let boxes: NdTensor<f32, 3> = outputs
            .pop()
            .ok_or_else(|| IdCheckError::FaceError("detector returned no boxes".into()))?
            .try_into()
            .map_err(|err| IdCheckError::FaceError(format!("unexpected box tensor: {err}")))?;
        let scores: NdTensor<f32, 3> = outputs
            .pop()
            .ok_or_else(|| IdCheckError::FaceError("detector returned no scores".into()))?
            .try_into()
            .map_err(|err| IdCheckError::FaceError(format!("unexpected score tensor: {err}")))?;

        let anchors = scores.size(1).min(boxes.size(1));
        let detections = (0..anchors)
            .filter_map(|i| {
                let score = scores[[0, i, 1]];
                (score >= self.config.score_threshold).then(|| Detection {
                    score,
                    x1: boxes[[0, i, 0]].clamp(0.0, 1.0),
                    y1: boxes[[0, i, 1]].clamp(0.0, 1.0),
                    x2: boxes[[0, i, 2]].clamp(0.0, 1.0),
                    y2: boxes[[0, i, 3]].clamp(0.0, 1.0),
                })
            })
            .collect();

        Ok(non_max_suppression(detections, self.config.iou_threshold))
    }

    fn embed(&self, image: &RgbImage, face: &Detection) -> Result<FaceEncoding, IdCheckError> {
        let (w, h) = image.dimensions();
        let x = (face.x1 * w as f32) as u32;
        let y = (face.y1 * h as f32) as u32;
        let cw = (((face.x2 - face.x1) * w as f32) as u32).clamp(1, w.saturating_sub(x).max(1));
        let ch = (((face.y2 - face.y1) * h as f32) as u32).clamp(1, h.saturating_sub(y).max(1));

        let crop = image::imageops::crop_imm(image, x, y, cw, ch).to_image();
        let aligned = image::imageops::resize(
            &crop,
            EMBEDDING_SIDE,
            EMBEDDING_SIDE,
            FilterType::Triangle,
        );
        let input = to_nchw(&aligned, 127.5, 128.0);

        let output: NdTensor<f32, 2> = self
            .embedder
            .run_one(input.view().into(), None)
            .map_err(model_err("face embedding failed"))?
            .try_into()
            .map_err(|err| IdCheckError::FaceError(format!("unexpected embedding: {err}")))?;

        Ok(FaceEncoding(l2_normalise(output.to_vec())))
    }
}

impl FaceEncoder for OnnxFaceEncoder {
    fn encode(&self, image: &DynamicImage) -> Result<Vec<FaceEncoding>, IdCheckError> {
        let rgb = image.to_rgb8();
        if rgb.width() == 0 || rgb.height() == 0 {
            return Ok(Vec::new());
        }

        let faces = self.detect(&rgb)?;
        debug!(faces = faces.len(), "Faces detected");
        faces.iter().map(|face| self.embed(&rgb, face)).collect()
    }

    fn match_tolerance(&self) -> f32 {
        self.config.match_tolerance
    }
}
