// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Acceptance decision — the ordered accept/reject policy for one document.
//
// Stages, first failure wins:
//   1. tamper heuristics (images only)
//   2. text extraction
//   3. identifier + authority-marker scan
//   4. Verhoeff checksum on every candidate identifier

use std::sync::Arc;

use idcheck_core::config::AppConfig;
use idcheck_core::error::{IdCheckError, sanitize_message};
use idcheck_core::types::{AcceptanceResult, ContentType, RejectionReason};
use idcheck_core::TamperConfig;
use idcheck_document::{FieldScanner, TextExtractor, TextRecognizer};
use idcheck_security::{checksum, detect_tampering};
use tracing::{debug, info, instrument};

/// Stateless apart from its immutable configuration; share one behind an
/// `Arc`.
#[derive(Debug, Clone)]
pub struct AcceptanceEngine {
    tamper: TamperConfig,
    extractor: TextExtractor,
    scanner: FieldScanner,
}

impl AcceptanceEngine {
    pub fn new(tamper: TamperConfig, extractor: TextExtractor, scanner: FieldScanner) -> Self {
        Self {
            tamper,
            extractor,
            scanner,
        }
    }

    /// Build from application settings with the given image recognizer.
    pub fn from_config(
        config: &AppConfig,
        recognizer: Arc<dyn TextRecognizer>,
    ) -> Result<Self, IdCheckError> {
        Ok(Self::new(
            config.tamper,
            TextExtractor::new(recognizer),
            FieldScanner::new(&config.authority_keywords)?,
        ))
    }

    /// Decide whether `bytes` is an acceptable identity document.
    ///
    /// Blocking: decoding, OCR and PDF parsing run on the calling thread.
    #[instrument(skip_all, fields(bytes_len = bytes.len(), %content_type))]
    pub fn decide(&self, bytes: &[u8], content_type: ContentType) -> AcceptanceResult {
        if content_type.is_image() && detect_tampering(bytes, &self.tamper) {
            info!("rejected: tamper heuristics fired");
            return AcceptanceResult::Rejected(RejectionReason::TamperedImage);
        }

        let text = match self.extractor.extract_text(bytes, content_type) {
            Ok(text) => text,
            Err(err) => {
                let detail = match err {
                    IdCheckError::ExtractionFailed(detail) => detail,
                    other => sanitize_message(&other.to_string()),
                };
                info!(%detail, "rejected: unreadable file");
                return AcceptanceResult::Rejected(RejectionReason::UnreadableFile(detail));
            }
        };

        let fields = self.scanner.scan(&text);
        if fields.identifiers.is_empty() {
            info!("rejected: no identifier in document text");
            return AcceptanceResult::Rejected(RejectionReason::NoIdentifierFound);
        }
        if !fields.has_authority_marker {
            info!("rejected: no issuing-authority marking");
            return AcceptanceResult::Rejected(RejectionReason::MissingAuthorityMarkers);
        }

        let valid = fields.identifiers.iter().find(|id| checksum::validate(id.as_str()));
        match valid {
            Some(id) => {
                info!(identifier = %id, "accepted");
                AcceptanceResult::Accepted
            }
            None => {
                for id in &fields.identifiers {
                    let (payload, _) = id.as_str().split_at(checksum::IDENTIFIER_LEN - 1);
                    debug!(
                        identifier = %id,
                        expected_check_digit = ?checksum::check_digit(payload),
                        "checksum mismatch"
                    );
                }
                info!(candidates = fields.identifiers.len(), "rejected: checksum failed");
                AcceptanceResult::Rejected(RejectionReason::ChecksumFailed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idcheck_document::testing::{ScriptedRecognizer, card_photo, flat_photo, text_pdf};
    use image::ImageFormat;

    fn engine(recognizer: ScriptedRecognizer) -> AcceptanceEngine {
        AcceptanceEngine::from_config(&AppConfig::default(), Arc::new(recognizer)).unwrap()
    }

    fn rejected(reason: RejectionReason) -> AcceptanceResult {
        AcceptanceResult::Rejected(reason)
    }

    #[test]
    fn clean_image_with_valid_number_is_accepted() {
        let engine = engine(ScriptedRecognizer::returning(
            "GOVERNMENT OF INDIA\nAsha Devi\n2345 6789 0124",
        ));
        let result = engine.decide(&card_photo(ImageFormat::Png), ContentType::Png);
        assert_eq!(result, AcceptanceResult::Accepted);
    }

    #[test]
    fn valid_pdf_is_accepted_without_ocr() {
        let engine = engine(ScriptedRecognizer::failing());
        let pdf = text_pdf(&["Unique Identification Authority of India", "4991 1232 4379"]);
        assert_eq!(engine.decide(&pdf, ContentType::Pdf), AcceptanceResult::Accepted);
    }

    #[test]
    fn tampered_image_short_circuits_before_ocr() {
        let recognizer = Arc::new(ScriptedRecognizer::returning("Government of India 2345 6789 0124"));
        let engine =
            AcceptanceEngine::from_config(&AppConfig::default(), recognizer.clone()).unwrap();

        let result = engine.decide(&flat_photo(), ContentType::Png);
        assert_eq!(result, rejected(RejectionReason::TamperedImage));
        assert_eq!(recognizer.calls(), 0);
    }

    #[test]
    fn pdfs_skip_tamper_checks() {
        // A flat image would be flagged; a PDF is never put through the detector.
        let engine = engine(ScriptedRecognizer::failing());
        let pdf = text_pdf(&["Government of India 2345 6789 0124"]);
        assert!(engine.decide(&pdf, ContentType::Pdf).is_accepted());
    }

    #[test]
    fn ocr_failure_is_unreadable_file() {
        let engine = engine(ScriptedRecognizer::failing());
        let result = engine.decide(&card_photo(ImageFormat::Jpeg), ContentType::Jpeg);
        assert!(matches!(
            result,
            AcceptanceResult::Rejected(RejectionReason::UnreadableFile(ref detail)) if !detail.is_empty()
        ));
    }

    #[test]
    fn corrupt_pdf_is_unreadable_file() {
        let engine = engine(ScriptedRecognizer::failing());
        let result = engine.decide(b"%PDF-1.7 broken", ContentType::Pdf);
        assert!(matches!(
            result,
            AcceptanceResult::Rejected(RejectionReason::UnreadableFile(_))
        ));
    }

    #[test]
    fn text_without_identifier_or_keywords_is_rejected() {
        let engine = engine(ScriptedRecognizer::returning("Lorem ipsum dolor sit amet"));
        let result = engine.decide(&card_photo(ImageFormat::Png), ContentType::Png);
        let reason = result.rejection().unwrap();
        assert_eq!(*reason, RejectionReason::NoIdentifierFound);
        assert!(reason.is_missing_identity_content());
    }

    #[test]
    fn identifier_without_keywords_is_rejected() {
        let engine = engine(ScriptedRecognizer::returning("Library card 2345 6789 0124"));
        let result = engine.decide(&card_photo(ImageFormat::Png), ContentType::Png);
        assert_eq!(result, rejected(RejectionReason::MissingAuthorityMarkers));
        assert!(result.rejection().unwrap().is_missing_identity_content());
    }

    #[test]
    fn bad_checksum_is_rejected() {
        let engine = engine(ScriptedRecognizer::returning("Aadhaar 2345 6789 0123"));
        let result = engine.decide(&card_photo(ImageFormat::Png), ContentType::Png);
        assert_eq!(result, rejected(RejectionReason::ChecksumFailed));
    }

    #[test]
    fn any_valid_candidate_is_enough() {
        let engine = engine(ScriptedRecognizer::returning(
            "Aadhaar\nVID 1234 5678 9012\nNo. 8765 4321 0988",
        ));
        let result = engine.decide(&card_photo(ImageFormat::Png), ContentType::Png);
        assert_eq!(result, AcceptanceResult::Accepted);
    }

    #[test]
    fn custom_keywords_are_honoured() {
        let config = AppConfig {
            authority_keywords: vec!["election commission".into()],
            ..AppConfig::default()
        };
        let engine = AcceptanceEngine::from_config(
            &config,
            Arc::new(ScriptedRecognizer::returning("Government of India 2345 6789 0124")),
        )
        .unwrap();
        let result = engine.decide(&card_photo(ImageFormat::Png), ContentType::Png);
        assert_eq!(result, rejected(RejectionReason::MissingAuthorityMarkers));
    }
}
