// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// idcheck-face — Compares the face on a registered document with a live capture.
//
// Encoding is behind the `FaceEncoder` trait; the rten-backed detector and
// embedder are compiled in with the `models` feature.

pub mod encoder;
pub mod matcher;

#[cfg(feature = "models")]
pub mod onnx;

pub use encoder::{FaceEncoder, UnavailableEncoder, decode_image};
pub use matcher::{DEFAULT_TOLERANCE, FaceMatcher, compare_encodings};

#[cfg(feature = "models")]
pub use onnx::{FaceModelConfig, OnnxFaceEncoder};
