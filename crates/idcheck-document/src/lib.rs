// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// idcheck-document — Text recovery from identity documents.
//
// Provides PDF text extraction (lopdf), image decoding and OCR preparation,
// the pluggable text recognizer seam (ocrs-backed behind the `ocr` feature),
// and the identifier / issuing-authority field scanner.

pub mod extract;
pub mod fields;
pub mod image;
pub mod pdf;
pub mod scan;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

// Re-export the primary structs so callers can use `idcheck_document::TextExtractor` etc.
pub use extract::{TextExtractor, TextRecognizer, UnavailableRecognizer};
pub use fields::FieldScanner;
pub use self::image::processor::ImageProcessor;
pub use pdf::reader::PdfReader;

#[cfg(feature = "ocr")]
pub use scan::ocr::{OcrConfig, OcrEngine};
