// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for idcheck.

use thiserror::Error;

/// Top-level error type for all idcheck operations.
///
/// Validation rejections are *not* errors: they are carried by
/// [`AcceptanceResult`](crate::types::AcceptanceResult). This enum covers the
/// conditions that stop a request from reaching a decision at all.
#[derive(Debug, Error)]
pub enum IdCheckError {
    // -- Input errors --
    #[error("unsupported document type: {0}")]
    UnsupportedFormat(String),

    #[error("could not read file: {0}")]
    ExtractionFailed(String),

    #[error("invalid request: {0}")]
    InvalidInput(String),

    // -- Document processing --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("OCR failed: {0}")]
    OcrError(String),

    #[error("face analysis failed: {0}")]
    FaceError(String),

    // -- Registration --
    #[error("email already registered: {0}")]
    DuplicateRegistration(String),

    #[error("no registration found for {0}")]
    NotRegistered(String),

    // -- Security --
    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Delivery --
    #[error("mail delivery failed: {0}")]
    Mail(String),

    #[error("background task failed: {0}")]
    Task(String),
}

impl IdCheckError {
    /// Build an [`IdCheckError::ExtractionFailed`] from any displayable cause,
    /// dropping anything that is not valid UTF-8 from the message.
    pub fn extraction(cause: impl std::fmt::Display) -> Self {
        Self::ExtractionFailed(sanitize_message(&cause.to_string()))
    }
}

/// Strip control characters and replacement glyphs so that a third-party
/// error message can be echoed back to a client verbatim.
pub fn sanitize_message(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != char::REPLACEMENT_CHARACTER)
        .filter(|c| !c.is_control() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_owned()
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, IdCheckError>;
