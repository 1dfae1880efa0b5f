// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Face matcher — first face in the document photo against first face in the
// live capture, by Euclidean distance between encodings.
//
// Only the first (most confident) face per image takes part. A document photo
// with two faces in it matches on whichever the encoder ranks first.

use std::sync::Arc;

use idcheck_core::error::IdCheckError;
use idcheck_core::types::{FaceEncoding, MatchResult};
use tracing::{debug, info, instrument};

use crate::encoder::{FaceEncoder, decode_image};

/// Largest distance still accepted as the same person, for 128-d encodings
/// on the dlib scale. Encoders with another scale override
/// [`FaceEncoder::match_tolerance`].
pub const DEFAULT_TOLERANCE: f32 = 0.6;

/// Compare already-computed encodings.
///
/// Either side empty → [`MatchResult::NoFaceDetected`]. Encodings of
/// different lengths come from different models and are a
/// [`IdCheckError::FaceError`].
pub fn compare_encodings(
    stored: &[FaceEncoding],
    captured: &[FaceEncoding],
    tolerance: f32,
) -> Result<MatchResult, IdCheckError> {
    let (Some(stored), Some(captured)) = (stored.first(), captured.first()) else {
        return Ok(MatchResult::NoFaceDetected);
    };

    let distance = stored.distance(captured).ok_or_else(|| {
        IdCheckError::FaceError(format!(
            "encoding length mismatch: {} vs {}",
            stored.dimensions(),
            captured.dimensions()
        ))
    })?;

    Ok(if distance <= tolerance {
        MatchResult::Match { distance }
    } else {
        MatchResult::NoMatch { distance }
    })
}

/// Decodes both photos, encodes them and compares the first faces.
#[derive(Clone)]
pub struct FaceMatcher {
    encoder: Arc<dyn FaceEncoder>,
    tolerance: f32,
}

impl std::fmt::Debug for FaceMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaceMatcher")
            .field("tolerance", &self.tolerance)
            .finish_non_exhaustive()
    }
}

impl FaceMatcher {
    /// Uses the encoder's own calibrated tolerance.
    pub fn new(encoder: Arc<dyn FaceEncoder>) -> Self {
        let tolerance = encoder.match_tolerance();
        Self { encoder, tolerance }
    }

    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Match the face in `stored` (the registered document photo) against
    /// the face in `captured`.
    ///
    /// Blocking: decoding and inference run on the calling thread.
    #[instrument(skip_all, fields(stored_len = stored.len(), captured_len = captured.len()))]
    pub fn match_faces(&self, stored: &[u8], captured: &[u8]) -> Result<MatchResult, IdCheckError> {
        let stored_faces = self.encoder.encode(&decode_image(stored)?)?;
        let captured_faces = self.encoder.encode(&decode_image(captured)?)?;
        debug!(
            stored_faces = stored_faces.len(),
            captured_faces = captured_faces.len(),
            "Faces encoded"
        );

        let result = compare_encodings(&stored_faces, &captured_faces, self.tolerance)?;
        info!(?result, tolerance = self.tolerance, "Face comparison complete");
        Ok(result)
    }
}
