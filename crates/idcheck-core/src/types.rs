// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the idcheck verification pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IdCheckError;

/// Accepted input document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Jpeg,
    Png,
    Pdf,
}

impl ContentType {
    /// MIME type string as declared by the uploader.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Pdf => "application/pdf",
        }
    }

    /// Parse a declared MIME type. Parameters (`; charset=...`) are ignored;
    /// anything outside the three supported types is rejected.
    pub fn from_mime(mime: &str) -> Result<Self, IdCheckError> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" => Ok(Self::Jpeg),
            "image/png" => Ok(Self::Png),
            "application/pdf" => Ok(Self::Pdf),
            _ => Err(IdCheckError::UnsupportedFormat(mime.to_owned())),
        }
    }

    /// Whether this is a raster image (and therefore subject to tamper checks).
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Jpeg | Self::Png)
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// A 12-digit identifier found in extracted text, digits only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateIdentifier(String);

impl CandidateIdentifier {
    /// Keep only the ASCII digits of a raw pattern match.
    pub fn from_match(raw: &str) -> Self {
        Self(raw.chars().filter(char::is_ascii_digit).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last four digits, for logging without exposing the full number.
    pub fn masked(&self) -> String {
        let tail = self.0.len().saturating_sub(4);
        format!("XXXX-XXXX-{}", &self.0[tail..])
    }
}

impl std::fmt::Display for CandidateIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Outcome of the tamper heuristics, with the scores that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TamperVerdict {
    pub ela_score: f64,
    pub noise_std_dev: f64,
    pub ela_suspicious: bool,
    pub uniform_noise: bool,
}

impl TamperVerdict {
    pub fn is_tampered(&self) -> bool {
        self.ela_suspicious || self.uniform_noise
    }
}

/// Why a document was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "kebab-case")]
pub enum RejectionReason {
    TamperedImage,
    UnreadableFile(String),
    NoIdentifierFound,
    MissingAuthorityMarkers,
    ChecksumFailed,
}

impl RejectionReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TamperedImage => "tampered-image",
            Self::UnreadableFile(_) => "unreadable-file",
            Self::NoIdentifierFound => "no-identifier-found",
            Self::MissingAuthorityMarkers => "missing-authority-markers",
            Self::ChecksumFailed => "checksum-failed",
        }
    }

    /// The identifier/keyword checks share one branch: either failing means
    /// the upload does not look like an identity document at all.
    pub fn is_missing_identity_content(&self) -> bool {
        matches!(self, Self::NoIdentifierFound | Self::MissingAuthorityMarkers)
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnreadableFile(detail) => write!(f, "{}: {}", self.code(), detail),
            other => f.write_str(other.code()),
        }
    }
}

/// Final decision for a submitted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcceptanceResult {
    Accepted,
    Rejected(RejectionReason),
}

impl AcceptanceResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    pub fn rejection(&self) -> Option<&RejectionReason> {
        match self {
            Self::Accepted => None,
            Self::Rejected(reason) => Some(reason),
        }
    }
}

/// Fixed-length feature vector for one detected face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceEncoding(pub Vec<f32>);

impl FaceEncoding {
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    /// Euclidean distance to another encoding, or `None` when the vectors
    /// have different lengths.
    pub fn distance(&self, other: &FaceEncoding) -> Option<f32> {
        if self.0.len() != other.0.len() {
            return None;
        }
        let sum: f32 = self
            .0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        Some(sum.sqrt())
    }
}

/// Result of comparing a stored document photo with a live capture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MatchResult {
    Match { distance: f32 },
    NoMatch { distance: f32 },
    NoFaceDetected,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match { .. })
    }
}

/// A persisted registration: the accepted document keyed by email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub email: String,
    /// Document bytes as uploaded (possibly encrypted at rest by the store).
    #[serde(skip)]
    pub photo_bytes: Vec<u8>,
    pub content_type: ContentType,
    /// SHA-256 of the original document bytes.
    pub document_hash: String,
    pub registered_at: DateTime<Utc>,
}

impl RegistrationRecord {
    pub fn new(
        email: impl Into<String>,
        photo_bytes: Vec<u8>,
        content_type: ContentType,
        document_hash: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            photo_bytes,
            content_type,
            document_hash: document_hash.into(),
            registered_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_parses_known_mimes() {
        assert_eq!(ContentType::from_mime("image/jpeg").unwrap(), ContentType::Jpeg);
        assert_eq!(ContentType::from_mime("IMAGE/PNG").unwrap(), ContentType::Png);
        assert_eq!(
            ContentType::from_mime("application/pdf; charset=binary").unwrap(),
            ContentType::Pdf
        );
    }

    #[test]
    fn content_type_rejects_others() {
        let err = ContentType::from_mime("image/gif").unwrap_err();
        assert!(matches!(err, IdCheckError::UnsupportedFormat(m) if m == "image/gif"));
        assert!(ContentType::from_mime("").is_err());
    }

    #[test]
    fn only_raster_types_are_images() {
        assert!(ContentType::Jpeg.is_image());
        assert!(ContentType::Png.is_image());
        assert!(!ContentType::Pdf.is_image());
    }

    #[test]
    fn candidate_keeps_digits_only() {
        let id = CandidateIdentifier::from_match("2345 6789\t0124");
        assert_eq!(id.as_str(), "234567890124");
        assert_eq!(id.masked(), "XXXX-XXXX-0124");
    }

    #[test]
    fn rejection_codes_are_stable() {
        assert_eq!(RejectionReason::TamperedImage.code(), "tampered-image");
        assert_eq!(
            RejectionReason::UnreadableFile("x".into()).to_string(),
            "unreadable-file: x"
        );
        assert!(RejectionReason::NoIdentifierFound.is_missing_identity_content());
        assert!(RejectionReason::MissingAuthorityMarkers.is_missing_identity_content());
        assert!(!RejectionReason::ChecksumFailed.is_missing_identity_content());
    }

    #[test]
    fn encoding_distance() {
        let a = FaceEncoding(vec![0.0, 3.0]);
        let b = FaceEncoding(vec![4.0, 0.0]);
        assert_eq!(a.distance(&b), Some(5.0));
        assert_eq!(a.distance(&a), Some(0.0));
        assert_eq!(a.distance(&FaceEncoding(vec![1.0])), None);
    }
}
