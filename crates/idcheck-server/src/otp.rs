// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// One-time passcodes for email confirmation.
//
// Codes live in memory only: a restart invalidates every outstanding code.
// Each email holds at most one code; issuing again replaces it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, warn};

/// Interval between sweeps of expired codes.
pub const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    /// Correct and unexpired; the code has been consumed.
    Verified,
    /// No code outstanding for this email.
    NotIssued,
    /// Wrong code, or the right code after its deadline.
    Rejected,
}

#[derive(Debug, Clone)]
struct Pending {
    code: String,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
pub struct OtpStore {
    ttl: Duration,
    pending: Arc<Mutex<HashMap<String, Pending>>>,
}

impl OtpStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a fresh six-digit code for `email`.
    pub fn issue(&self, email: &str) -> String {
        self.issue_at(email, Instant::now())
    }

    /// Check `code` for `email`. A successful check removes the code.
    pub fn verify(&self, email: &str, code: &str) -> OtpCheck {
        self.verify_at(email, code, Instant::now())
    }

    /// Drop every expired code, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn outstanding(&self) -> usize {
        self.lock().len()
    }

    fn issue_at(&self, email: &str, now: Instant) -> String {
        let code = generate_code();
        self.lock().insert(
            email.to_owned(),
            Pending {
                code: code.clone(),
                expires_at: now + self.ttl,
            },
        );
        code
    }

    fn verify_at(&self, email: &str, code: &str, now: Instant) -> OtpCheck {
        let mut pending = self.lock();
        let Some(entry) = pending.get(email) else {
            return OtpCheck::NotIssued;
        };
        if entry.expires_at <= now {
            pending.remove(email);
            return OtpCheck::Rejected;
        }
        if entry.code != code.trim() {
            return OtpCheck::Rejected;
        }
        pending.remove(email);
        OtpCheck::Verified
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let mut pending = self.lock();
        let before = pending.len();
        pending.retain(|_, entry| entry.expires_at > now);
        before - pending.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Pending>> {
        // A panic while holding the lock cannot leave a map half-updated.
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sweep expired codes every [`PURGE_INTERVAL`] until the runtime stops.
    pub fn spawn_purge_task(&self) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(PURGE_INTERVAL);
            loop {
                ticker.tick().await;
                let removed = store.purge_expired();
                if removed > 0 {
                    debug!(removed, remaining = store.outstanding(), "purged expired passcodes");
                }
            }
        })
    }
}

fn generate_code() -> String {
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

/// Parse the configured lifetime, falling back to five minutes for zero.
pub fn ttl_from_secs(secs: u64) -> Duration {
    if secs == 0 {
        warn!("otp_ttl_secs is 0; using 300");
        return Duration::from_secs(300);
    }
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> OtpStore {
        OtpStore::new(Duration::from_secs(300))
    }

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert_ne!(code.as_bytes()[0], b'0');
        }
    }

    #[test]
    fn correct_code_verifies_once() {
        let store = store();
        let code = store.issue("asha@example.in");
        assert_eq!(store.verify("asha@example.in", &code), OtpCheck::Verified);
        assert_eq!(store.verify("asha@example.in", &code), OtpCheck::NotIssued);
    }

    #[test]
    fn wrong_code_is_rejected_and_kept() {
        let store = store();
        let code = store.issue("asha@example.in");
        let wrong = if code == "123456" { "654321" } else { "123456" };
        assert_eq!(store.verify("asha@example.in", wrong), OtpCheck::Rejected);
        assert_eq!(store.verify("asha@example.in", &code), OtpCheck::Verified);
    }

    #[test]
    fn expired_code_is_rejected() {
        let store = store();
        let issued = Instant::now();
        let code = store.issue_at("ravi@example.in", issued);
        let later = issued + Duration::from_secs(301);
        assert_eq!(store.verify_at("ravi@example.in", &code, later), OtpCheck::Rejected);
        assert_eq!(store.outstanding(), 0);
    }

    #[test]
    fn reissue_replaces_previous_code() {
        let store = store();
        let now = Instant::now();
        let first = store.issue_at("kiran@example.in", now);
        let second = store.issue_at("kiran@example.in", now);
        assert_eq!(store.outstanding(), 1);
        if first != second {
            assert_eq!(store.verify_at("kiran@example.in", &first, now), OtpCheck::Rejected);
        }
        assert_eq!(store.verify_at("kiran@example.in", &second, now), OtpCheck::Verified);
    }

    #[test]
    fn purge_drops_only_expired_codes() {
        let store = store();
        let now = Instant::now();
        store.issue_at("old@example.in", now);
        store.issue_at("new@example.in", now + Duration::from_secs(200));

        let removed = store.purge_expired_at(now + Duration::from_secs(301));
        assert_eq!(removed, 1);
        assert_eq!(store.outstanding(), 1);
    }

    #[test]
    fn zero_ttl_falls_back_to_five_minutes() {
        assert_eq!(ttl_from_secs(0), Duration::from_secs(300));
        assert_eq!(ttl_from_secs(60), Duration::from_secs(60));
    }
}
