// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! idcheck-security — authenticity checks and persistence for identity documents.
//!
//! Holds the Verhoeff identifier checksum, the photo tamper heuristics,
//! SHA-256 fingerprints, the registration store, optional at-rest encryption
//! and the append-only audit trail of every decision.

pub mod audit;
pub mod checksum;
pub mod integrity;
pub mod registry;
pub mod storage;
pub mod tamper;

pub use audit::{AuditAction, AuditEntry, AuditLog};
pub use integrity::{hash_bytes, verify_hash};
pub use registry::{RegistrationStore, SqliteRegistry};
pub use storage::EncryptedStorage;
pub use tamper::detect_tampering;
