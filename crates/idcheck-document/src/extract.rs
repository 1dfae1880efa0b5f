// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text extraction — the single entry point that turns an uploaded document
// (photo or PDF) into plain text.

use std::sync::Arc;

use idcheck_core::error::IdCheckError;
use idcheck_core::types::ContentType;
use image::DynamicImage;
use tracing::{debug, instrument};

use crate::image::processor::{DEFAULT_MAX_SIDE, ImageProcessor};
use crate::pdf::reader::PdfReader;

/// Anything that can read printed text off a decoded image.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &DynamicImage) -> Result<String, IdCheckError>;
}

/// Recognizer used when no OCR engine is configured. Every image is
/// unreadable.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableRecognizer;

impl TextRecognizer for UnavailableRecognizer {
    fn recognize(&self, _image: &DynamicImage) -> Result<String, IdCheckError> {
        Err(IdCheckError::OcrError(
            "no OCR engine configured for image documents".into(),
        ))
    }
}

/// Dispatches on content type: PDFs go through lopdf, images through the
/// configured [`TextRecognizer`].
#[derive(Clone)]
pub struct TextExtractor {
    recognizer: Arc<dyn TextRecognizer>,
}

impl std::fmt::Debug for TextExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextExtractor").finish_non_exhaustive()
    }
}

impl TextExtractor {
    pub fn new(recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self { recognizer }
    }

    /// Extract all text from `bytes`.
    ///
    /// Empty text is a valid result. Any failure to decode or recognise the
    /// document becomes [`IdCheckError::ExtractionFailed`] carrying a
    /// sanitised cause.
    #[instrument(skip_all, fields(bytes_len = bytes.len(), %content_type))]
    pub fn extract_text(
        &self,
        bytes: &[u8],
        content_type: ContentType,
    ) -> Result<String, IdCheckError> {
        let text = match content_type {
            ContentType::Pdf => PdfReader::from_bytes(bytes)
                .map_err(IdCheckError::extraction)?
                .extract_text(),
            ContentType::Jpeg | ContentType::Png => {
                let prepared = ImageProcessor::from_bytes(bytes)
                    .map_err(IdCheckError::extraction)?
                    .prepare_for_recognition(DEFAULT_MAX_SIDE)
                    .into_dynamic();
                self.recognizer
                    .recognize(&prepared)
                    .map_err(IdCheckError::extraction)?
            }
        };

        debug!(chars = text.len(), "Text extracted");
        Ok(text)
    }

    /// Like [`extract_text`](Self::extract_text) but takes the declared MIME
    /// type; anything other than JPEG, PNG or PDF is
    /// [`IdCheckError::UnsupportedFormat`].
    pub fn extract_text_for_mime(&self, bytes: &[u8], mime: &str) -> Result<String, IdCheckError> {
        let content_type = ContentType::from_mime(mime)?;
        self.extract_text(bytes, content_type)
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new(Arc::new(UnavailableRecognizer))
    }
}
