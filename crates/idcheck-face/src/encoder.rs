// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use idcheck_core::error::IdCheckError;
use idcheck_core::types::FaceEncoding;
use image::DynamicImage;
use tracing::debug;

use crate::matcher::DEFAULT_TOLERANCE;

/// Finds faces in an image and produces one encoding per face.
///
/// Encodings are ordered by detection confidence, highest first. An image
/// without faces yields an empty vector, not an error.
pub trait FaceEncoder: Send + Sync {
    fn encode(&self, image: &DynamicImage) -> Result<Vec<FaceEncoding>, IdCheckError>;

    /// Largest distance between two of this encoder's encodings that still
    /// counts as the same person. The scale depends on the model.
    fn match_tolerance(&self) -> f32 {
        DEFAULT_TOLERANCE
    }
}

/// Encoder used when no face models are configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableEncoder;

impl FaceEncoder for UnavailableEncoder {
    fn encode(&self, _image: &DynamicImage) -> Result<Vec<FaceEncoding>, IdCheckError> {
        Err(IdCheckError::FaceError("no face models configured".into()))
    }
}

/// Decode an uploaded photo. Undecodable bytes are an
/// [`IdCheckError::ImageError`].
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, IdCheckError> {
    let image = image::load_from_memory(bytes)
        .map_err(|err| IdCheckError::ImageError(format!("failed to decode photo: {err}")))?;
    debug!(width = image.width(), height = image.height(), "Photo decoded");
    Ok(image)
}
