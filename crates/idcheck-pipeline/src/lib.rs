// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// idcheck-pipeline — The verification flows.
//
// `decision` is the synchronous accept/reject policy over one document.
// `registration` and `verification` are the async services the HTTP layer
// calls; CPU-bound work runs on tokio's blocking pool.

pub mod audit;
pub mod decision;
pub mod registration;
pub mod vault;
pub mod verification;

pub use audit::AuditTrail;
pub use decision::AcceptanceEngine;
pub use registration::RegistrationService;
pub use vault::PhotoVault;
pub use verification::{VerificationService, decode_photo_base64};
