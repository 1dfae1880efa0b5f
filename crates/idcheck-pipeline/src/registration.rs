// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Registration — admit one identity document per email address.
//
//   1. duplicate check (before any image work)
//   2. declared content type
//   3. acceptance decision
//   4. seal, then insert-if-absent, which still reports a duplicate if a
//      concurrent registration won the race
//
// All four steps run on the blocking pool: the decision does image work,
// sealing runs scrypt and the store is SQLite.

use std::sync::Arc;

use idcheck_core::error::IdCheckError;
use idcheck_core::types::{AcceptanceResult, ContentType, RegistrationRecord};
use idcheck_security::{AuditAction, RegistrationStore, hash_bytes};
use tracing::{Span, info, instrument, warn};

use crate::audit::AuditTrail;
use crate::decision::AcceptanceEngine;
use crate::vault::PhotoVault;

#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<dyn RegistrationStore>,
    engine: Arc<AcceptanceEngine>,
    vault: PhotoVault,
    audit: AuditTrail,
}

impl std::fmt::Debug for RegistrationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationService")
            .field("vault", &self.vault)
            .field("audit", &self.audit)
            .finish_non_exhaustive()
    }
}

impl RegistrationService {
    pub fn new(
        store: Arc<dyn RegistrationStore>,
        engine: Arc<AcceptanceEngine>,
        vault: PhotoVault,
        audit: AuditTrail,
    ) -> Self {
        Self {
            store,
            engine,
            vault,
            audit,
        }
    }

    /// Validate `document` and, if accepted, register it under `email`.
    ///
    /// A rejected document is `Ok(Rejected(..))`. Errors are reserved for
    /// requests that never reach a decision: a taken email, an unsupported
    /// type, or an infrastructure fault.
    #[instrument(skip(self, document), fields(document_len = document.len()))]
    pub async fn register(
        &self,
        email: &str,
        document: Vec<u8>,
        declared_mime: &str,
    ) -> Result<AcceptanceResult, IdCheckError> {
        let email = normalise_email(email)?.to_owned();
        let declared_mime = declared_mime.to_owned();
        let service = self.clone();
        let span = Span::current();
        tokio::task::spawn_blocking(move || {
            span.in_scope(|| service.register_blocking(&email, document, &declared_mime))
        })
        .await
        .map_err(|err| IdCheckError::Task(err.to_string()))?
    }

    fn register_blocking(
        &self,
        email: &str,
        document: Vec<u8>,
        declared_mime: &str,
    ) -> Result<AcceptanceResult, IdCheckError> {
        if self.store.exists(email)? {
            info!("email already registered");
            return Err(IdCheckError::DuplicateRegistration(email.to_owned()));
        }

        let content_type = ContentType::from_mime(declared_mime)?;
        let document_hash = hash_bytes(&document);
        let result = self.engine.decide(&document, content_type);
        self.record_decision(email, &document_hash, &result);

        if result.is_accepted() {
            let sealed = self.vault.seal(document)?;
            let record = RegistrationRecord::new(email, sealed, content_type, &document_hash);
            if let Err(err) = self.store.insert(&record) {
                if matches!(err, IdCheckError::DuplicateRegistration(_)) {
                    warn!("lost registration race to a concurrent request");
                }
                return Err(err);
            }
            info!(%content_type, "registration complete");
        }

        Ok(result)
    }

    /// Whether `email` has a registration on file.
    pub async fn is_registered(&self, email: &str) -> Result<bool, IdCheckError> {
        let email = normalise_email(email)?.to_owned();
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.exists(&email))
            .await
            .map_err(|err| IdCheckError::Task(err.to_string()))?
    }

    fn record_decision(&self, email: &str, document_hash: &str, result: &AcceptanceResult) {
        match result {
            AcceptanceResult::Accepted => {
                self.audit
                    .record(AuditAction::Register, email, document_hash, "accepted", true, None)
            }
            AcceptanceResult::Rejected(reason) => {
                let detail = match reason {
                    idcheck_core::RejectionReason::UnreadableFile(detail) => Some(detail.as_str()),
                    _ => None,
                };
                self.audit.record(
                    AuditAction::Register,
                    email,
                    document_hash,
                    reason.code(),
                    false,
                    detail,
                )
            }
        }
    }
}

/// Trim surrounding whitespace; an empty address is invalid input.
pub(crate) fn normalise_email(email: &str) -> Result<&str, IdCheckError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(IdCheckError::InvalidInput("email is required".into()));
    }
    Ok(email)
}
