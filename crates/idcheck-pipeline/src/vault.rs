// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use idcheck_core::error::IdCheckError;
use idcheck_security::EncryptedStorage;

/// Seals document bytes before they reach the registration store and opens
/// them on the way back out. Without a passphrase both directions are the
/// identity.
#[derive(Debug, Clone, Default)]
pub struct PhotoVault {
    storage: Option<EncryptedStorage>,
}

impl PhotoVault {
    pub fn encrypted(storage: EncryptedStorage) -> Self {
        Self {
            storage: Some(storage),
        }
    }

    pub fn plaintext() -> Self {
        Self::default()
    }

    pub fn is_encrypted(&self) -> bool {
        self.storage.is_some()
    }

    pub fn seal(&self, bytes: Vec<u8>) -> Result<Vec<u8>, IdCheckError> {
        match &self.storage {
            Some(storage) => storage.encrypt(&bytes),
            None => Ok(bytes),
        }
    }

    pub fn open(&self, bytes: Vec<u8>) -> Result<Vec<u8>, IdCheckError> {
        match &self.storage {
            Some(storage) => storage.decrypt(&bytes),
            None => Ok(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plaintext_vault_passes_through() {
        let vault = PhotoVault::plaintext();
        assert_eq!(vault.seal(b"photo".to_vec()).unwrap(), b"photo");
        assert_eq!(vault.open(b"photo".to_vec()).unwrap(), b"photo");
    }

    #[test]
    fn encrypted_vault_round_trips() {
        let vault = PhotoVault::encrypted(EncryptedStorage::new("vault-pass"));
        let sealed = vault.seal(b"photo".to_vec()).unwrap();
        assert_ne!(sealed, b"photo");
        assert_eq!(vault.open(sealed).unwrap(), b"photo");
    }
}
