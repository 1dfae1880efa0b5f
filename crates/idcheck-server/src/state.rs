// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared handler state and its construction from `AppConfig`.

use std::sync::Arc;

use idcheck_core::config::AppConfig;
use idcheck_core::error::IdCheckError;
use idcheck_document::TextRecognizer;
use idcheck_face::{FaceEncoder, FaceMatcher};
use idcheck_pipeline::{
    AcceptanceEngine, AuditTrail, PhotoVault, RegistrationService, VerificationService,
};
use idcheck_security::{AuditLog, EncryptedStorage, SqliteRegistry};
use lettre::transport::smtp::authentication::Credentials;
use tracing::{info, warn};

use crate::mailer::{LogMailer, Mailer, SmtpMailer};
use crate::otp::{OtpStore, ttl_from_secs};

/// Values read from the environment rather than the config file.
#[derive(Default, Clone)]
pub struct Secrets {
    pub storage_passphrase: Option<String>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("storage_passphrase", &self.storage_passphrase.is_some())
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &self.smtp_password.is_some())
            .finish()
    }
}

impl Secrets {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            storage_passphrase: var("IDCHECK_STORAGE_PASSPHRASE"),
            smtp_username: var("IDCHECK_SMTP_USERNAME"),
            smtp_password: var("IDCHECK_SMTP_PASSWORD"),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub registration: RegistrationService,
    pub verification: VerificationService,
    pub otp: OtpStore,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Open the databases under `config.data_dir` and load whatever models
    /// the build supports.
    pub fn from_config(config: &AppConfig, secrets: &Secrets) -> Result<Self, IdCheckError> {
        std::fs::create_dir_all(&config.data_dir)?;

        let registry = Arc::new(SqliteRegistry::open(config.registry_path())?);
        let vault = photo_vault(config, secrets);
        let audit = if config.audit_enabled {
            AuditTrail::new(AuditLog::open(config.audit_path())?)
        } else {
            info!("audit log disabled");
            AuditTrail::disabled()
        };

        let engine = AcceptanceEngine::from_config(config, text_recognizer(config)?)?;
        let matcher = face_matcher(config, face_encoder(config)?);

        Ok(Self {
            registration: RegistrationService::new(
                registry.clone(),
                Arc::new(engine),
                vault.clone(),
                audit.clone(),
            ),
            verification: VerificationService::new(registry, Arc::new(matcher), vault, audit),
            otp: OtpStore::new(ttl_from_secs(config.otp_ttl_secs)),
            mailer: mailer(config, secrets)?,
        })
    }
}

fn photo_vault(config: &AppConfig, secrets: &Secrets) -> PhotoVault {
    match (&secrets.storage_passphrase, config.encryption_enabled) {
        (Some(passphrase), true) => {
            info!("document photos encrypted at rest");
            PhotoVault::encrypted(EncryptedStorage::new(passphrase.as_str()))
        }
        (None, true) => {
            warn!("IDCHECK_STORAGE_PASSPHRASE not set; document photos stored unencrypted");
            PhotoVault::plaintext()
        }
        (_, false) => PhotoVault::plaintext(),
    }
}

#[cfg(feature = "ocr")]
fn text_recognizer(config: &AppConfig) -> Result<Arc<dyn TextRecognizer>, IdCheckError> {
    use idcheck_document::{OcrConfig, OcrEngine};

    let ocr = OcrConfig::from_optional_dir(config.ocr_model_dir.as_deref());
    Ok(Arc::new(OcrEngine::new(&ocr)?))
}

#[cfg(not(feature = "ocr"))]
fn text_recognizer(_config: &AppConfig) -> Result<Arc<dyn TextRecognizer>, IdCheckError> {
    warn!("built without the `ocr` feature; photographed documents will be unreadable");
    Ok(Arc::new(idcheck_document::UnavailableRecognizer))
}

#[cfg(feature = "models")]
fn face_encoder(config: &AppConfig) -> Result<Arc<dyn FaceEncoder>, IdCheckError> {
    match &config.face_model_dir {
        Some(dir) => Ok(Arc::new(idcheck_face::OnnxFaceEncoder::from_model_dir(dir)?)),
        None => {
            warn!("face_model_dir not configured; face verification unavailable");
            Ok(Arc::new(idcheck_face::UnavailableEncoder))
        }
    }
}

#[cfg(not(feature = "models"))]
fn face_encoder(_config: &AppConfig) -> Result<Arc<dyn FaceEncoder>, IdCheckError> {
    warn!("built without the `models` feature; face verification unavailable");
    Ok(Arc::new(idcheck_face::UnavailableEncoder))
}

fn face_matcher(config: &AppConfig, encoder: Arc<dyn FaceEncoder>) -> FaceMatcher {
    let matcher = FaceMatcher::new(encoder);
    match config.face_match_tolerance {
        Some(tolerance) => {
            info!(tolerance, calibrated = matcher.tolerance(), "face match tolerance overridden");
            matcher.with_tolerance(tolerance)
        }
        None => matcher,
    }
}

fn mailer(config: &AppConfig, secrets: &Secrets) -> Result<Arc<dyn Mailer>, IdCheckError> {
    let Some(smtp) = &config.smtp else {
        warn!("no SMTP relay configured; passcodes will only be logged");
        return Ok(Arc::new(LogMailer));
    };
    let (Some(username), Some(password)) = (&secrets.smtp_username, &secrets.smtp_password)
    else {
        return Err(IdCheckError::Mail(
            "IDCHECK_SMTP_USERNAME and IDCHECK_SMTP_PASSWORD are required when smtp is configured"
                .into(),
        ));
    };
    let credentials = Credentials::new(username.clone(), password.clone());
    Ok(Arc::new(SmtpMailer::new(smtp, credentials)?))
}
