// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable messages for rejections and errors returned to the uploader.
//
// Every rejection reason and every user-visible error maps to exactly one
// plain-English message. The severity drives the HTTP status at the boundary.

use crate::error::IdCheckError;
use crate::types::{MatchResult, RejectionReason};

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The upload itself is unacceptable; the user must submit something else.
    Rejected,
    /// The user refers to something that does not exist (unknown email).
    NotFound,
    /// Our fault, possibly temporary; the user may retry later.
    Internal,
}

/// A human-readable error with plain English message.
#[derive(Debug, Clone)]
pub struct HumanError {
    pub message: String,
    pub severity: Severity,
}

impl HumanError {
    fn rejected(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Rejected,
        }
    }
}

/// Message shown for a rejected document.
///
/// `NoIdentifierFound` and `MissingAuthorityMarkers` deliberately share one
/// message: both mean "this is not an identity card".
pub fn humanize_rejection(reason: &RejectionReason) -> String {
    match reason {
        RejectionReason::TamperedImage => {
            "The Aadhaar photo appears to be tampered or digitally altered.".into()
        }
        RejectionReason::UnreadableFile(detail) => format!("Could not read file: {detail}"),
        RejectionReason::NoIdentifierFound | RejectionReason::MissingAuthorityMarkers => {
            "Please upload a valid Aadhaar card file.".into()
        }
        RejectionReason::ChecksumFailed => {
            "The uploaded Aadhaar appears to be fake or tampered.".into()
        }
    }
}

/// Message shown after a face comparison.
pub fn humanize_match(result: &MatchResult) -> &'static str {
    match result {
        MatchResult::Match { .. } => "Face match successful. User verified.",
        MatchResult::NoMatch { .. } => "Face does not match. Verification failed.",
        MatchResult::NoFaceDetected => "No face detected in one or both photos",
    }
}

/// Convert an `IdCheckError` into a `HumanError` suitable for an API client.
pub fn humanize_error(err: &IdCheckError) -> HumanError {
    match err {
        IdCheckError::UnsupportedFormat(_) => {
            HumanError::rejected("Only PDF, JPG, or PNG files are allowed.")
        }
        IdCheckError::ExtractionFailed(detail) => {
            HumanError::rejected(format!("Could not read file: {detail}"))
        }
        IdCheckError::InvalidInput(detail) => HumanError::rejected(detail.clone()),
        IdCheckError::ImageError(_) => HumanError::rejected(
            "The photo could not be read. Please capture it again as a JPEG or PNG.",
        ),
        IdCheckError::DuplicateRegistration(_) => HumanError::rejected("Email already registered"),
        IdCheckError::NotRegistered(_) => HumanError {
            message: "User not found".into(),
            severity: Severity::NotFound,
        },
        IdCheckError::PdfError(_)
        | IdCheckError::OcrError(_)
        | IdCheckError::FaceError(_)
        | IdCheckError::Encryption(_)
        | IdCheckError::Decryption(_)
        | IdCheckError::IntegrityMismatch { .. }
        | IdCheckError::Database(_)
        | IdCheckError::Io(_)
        | IdCheckError::Serialization(_)
        | IdCheckError::Mail(_)
        | IdCheckError::Task(_) => HumanError {
            message: "Something went wrong on our side. Please try again later.".into(),
            severity: Severity::Internal,
        },
    }
}
