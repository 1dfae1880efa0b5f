// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Issuing-authority phrases; at least one must appear in a genuine document.
pub const DEFAULT_AUTHORITY_KEYWORDS: &[&str] = &[
    "unique identification authority of india",
    "government of india",
    "aadhaar",
];

/// Thresholds for the error-level and noise heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TamperConfig {
    /// JPEG quality used for the error-level re-encode.
    pub jpeg_quality: u8,
    /// Brightness multiplier applied to the difference image.
    pub amplification: f64,
    /// ELA score above which an image is flagged.
    pub ela_threshold: f64,
    /// Grayscale std-dev below which an image is considered over-smoothed.
    pub min_noise_std_dev: f64,
    /// Grayscale std-dev above which an image is considered over-noisy.
    pub max_noise_std_dev: f64,
}

impl Default for TamperConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 90,
            amplification: 10.0,
            ela_threshold: 3000.0,
            min_noise_std_dev: 5.0,
            max_noise_std_dev: 80.0,
        }
    }
}

/// Outbound SMTP relay for one-time passcodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub relay: String,
    pub port: u16,
    /// `From:` header for passcode mails.
    pub sender: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            relay: "smtp.gmail.com".into(),
            port: 465,
            sender: "OTP Verification <no-reply@localhost>".into(),
        }
    }
}

/// Persistent application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Socket address the HTTP server binds to.
    pub bind_addr: String,
    /// Directory holding the registration and audit databases.
    pub data_dir: PathBuf,
    /// Origins allowed by CORS (the verification frontend).
    pub cors_allowed_origins: Vec<String>,
    /// Upper bound on an uploaded document, in bytes.
    pub max_upload_bytes: usize,
    pub tamper: TamperConfig,
    /// Case-insensitive phrases that mark a genuine document.
    pub authority_keywords: Vec<String>,
    /// Maximum Euclidean distance between two encodings of the same face.
    /// `None` uses the face encoder's own calibrated value.
    pub face_match_tolerance: Option<f32>,
    /// Directory with `text-detection.rten` / `text-recognition.rten`.
    /// `None` uses the ocrs cache directory.
    pub ocr_model_dir: Option<PathBuf>,
    /// Directory with `face-detection.rten` / `face-embedding.rten`.
    pub face_model_dir: Option<PathBuf>,
    /// Lifetime of an issued one-time passcode, in seconds.
    pub otp_ttl_secs: u64,
    /// SMTP relay; `None` logs passcodes instead of mailing them.
    pub smtp: Option<SmtpConfig>,
    /// Record every decision in the audit log.
    pub audit_enabled: bool,
    /// Encrypt stored document bytes when a passphrase is available.
    pub encryption_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".into(),
            data_dir: PathBuf::from("idcheck-data"),
            cors_allowed_origins: vec!["http://localhost:5173".into()],
            max_upload_bytes: 10 * 1024 * 1024,
            tamper: TamperConfig::default(),
            authority_keywords: DEFAULT_AUTHORITY_KEYWORDS
                .iter()
                .map(|k| (*k).to_owned())
                .collect(),
            face_match_tolerance: None,
            ocr_model_dir: None,
            face_model_dir: None,
            otp_ttl_secs: 5 * 60,
            smtp: None,
            audit_enabled: true,
            encryption_enabled: true,
        }
    }
}

impl AppConfig {
    /// Load settings from a JSON file. A missing file yields the defaults;
    /// a present but malformed one is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Path of the registration database inside [`Self::data_dir`].
    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join("registrations.db")
    }

    /// Path of the audit database inside [`Self::data_dir`].
    pub fn audit_path(&self) -> PathBuf {
        self.data_dir.join("audit.db")
    }
}
