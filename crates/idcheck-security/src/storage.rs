// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// At-rest encryption for stored identity documents: age with a single scrypt
// passphrase recipient.

use age::scrypt;
use age::secrecy::SecretString;
use idcheck_core::error::IdCheckError;
use tracing::{debug, instrument};

/// Seals document bytes into self-contained age files under one passphrase.
#[derive(Clone)]
pub struct EncryptedStorage {
    passphrase: SecretString,
}

impl std::fmt::Debug for EncryptedStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedStorage").finish_non_exhaustive()
    }
}

impl EncryptedStorage {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: SecretString::from(passphrase.into()),
        }
    }

    /// Seal `plaintext` into a binary age file.
    ///
    /// Every call derives a fresh scrypt key, so sealing the same document
    /// twice yields different ciphertexts.
    #[instrument(skip_all, fields(plaintext_len = plaintext.len()))]
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, IdCheckError> {
        let recipient = scrypt::Recipient::new(self.passphrase.clone());
        let sealed = age::encrypt(&recipient, plaintext)
            .map_err(|err| IdCheckError::Encryption(err.to_string()))?;
        debug!(ciphertext_len = sealed.len(), "document sealed");
        Ok(sealed)
    }

    /// Open an age file produced by [`EncryptedStorage::encrypt`]. A wrong
    /// passphrase and a corrupt file both surface as
    /// [`IdCheckError::Decryption`].
    #[instrument(skip_all, fields(ciphertext_len = ciphertext.len()))]
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, IdCheckError> {
        let identity = scrypt::Identity::new(self.passphrase.clone());
        let opened = age::decrypt(&identity, ciphertext)
            .map_err(|err| IdCheckError::Decryption(err.to_string()))?;
        debug!(plaintext_len = opened.len(), "document opened");
        Ok(opened)
    }
}
