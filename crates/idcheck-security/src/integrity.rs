// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document fingerprints — SHA-256 over the uploaded bytes.

use idcheck_core::error::IdCheckError;
use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
///
/// Every upload is fingerprinted before processing so that audit entries and
/// registration records can be tied back to the exact bytes that were judged.
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Verify that `data` still matches the fingerprint taken at registration.
pub fn verify_hash(data: &[u8], expected_hex: &str) -> Result<(), IdCheckError> {
    let actual = hash_bytes(data);
    if actual.eq_ignore_ascii_case(expected_hex) {
        Ok(())
    } else {
        Err(IdCheckError::IntegrityMismatch {
            expected: expected_hex.to_owned(),
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA256: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn hash_empty_input() {
        assert_eq!(hash_bytes(b""), EMPTY_SHA256);
    }

    #[test]
    fn verify_accepts_uppercase_digest() {
        let data = b"aadhaar.pdf";
        let hex = hash_bytes(data).to_ascii_uppercase();
        assert!(verify_hash(data, &hex).is_ok());
    }

    #[test]
    fn verify_reports_both_digests_on_mismatch() {
        match verify_hash(b"original", &hash_bytes(b"edited")) {
            Err(IdCheckError::IntegrityMismatch { expected, actual }) => {
                assert_eq!(expected, hash_bytes(b"edited"));
                assert_eq!(actual, hash_bytes(b"original"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
