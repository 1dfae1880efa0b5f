// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use std::sync::{Arc, Mutex};

use idcheck_security::{AuditAction, AuditLog};
use tracing::warn;

/// Shared, optional handle on the audit log.
///
/// Recording never fails the request: a write error is logged and dropped.
#[derive(Clone, Default)]
pub struct AuditTrail {
    log: Option<Arc<Mutex<AuditLog>>>,
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("enabled", &self.log.is_some())
            .finish()
    }
}

impl AuditTrail {
    pub fn new(log: AuditLog) -> Self {
        Self {
            log: Some(Arc::new(Mutex::new(log))),
        }
    }

    /// A trail that records nothing.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn record(
        &self,
        action: AuditAction,
        subject: &str,
        document_hash: &str,
        outcome: &str,
        success: bool,
        details: Option<&str>,
    ) {
        let Some(log) = &self.log else {
            return;
        };
        let result = match log.lock() {
            Ok(log) => log.record(action, subject, document_hash, outcome, success, details),
            Err(_) => {
                warn!("audit log lock poisoned; entry dropped");
                return;
            }
        };
        if let Err(err) = result {
            warn!(%err, outcome, "failed to write audit entry");
        }
    }

    /// Run `f` against the underlying log, if any.
    pub fn with_log<T>(&self, f: impl FnOnce(&AuditLog) -> T) -> Option<T> {
        let log = self.log.as_ref()?;
        let guard = log.lock().ok()?;
        Some(f(&guard))
    }
}
