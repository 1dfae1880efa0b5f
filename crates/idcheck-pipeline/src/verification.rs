// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Face verification — compare a live capture with the photo on the
// registered document.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use idcheck_core::error::IdCheckError;
use idcheck_core::types::MatchResult;
use idcheck_face::FaceMatcher;
use idcheck_security::{AuditAction, RegistrationStore, hash_bytes, verify_hash};
use tracing::{debug, instrument};

use crate::audit::AuditTrail;
use crate::registration::normalise_email;
use crate::vault::PhotoVault;

/// Decode a base64 photo as sent by a browser, with or without a
/// `data:image/...;base64,` prefix.
pub fn decode_photo_base64(encoded: &str) -> Result<Vec<u8>, IdCheckError> {
    let encoded = encoded.trim();
    let payload = match encoded.split_once(',') {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|err| IdCheckError::InvalidInput(format!("photo is not valid base64: {err}")))
}

#[derive(Clone)]
pub struct VerificationService {
    store: Arc<dyn RegistrationStore>,
    matcher: Arc<FaceMatcher>,
    vault: PhotoVault,
    audit: AuditTrail,
}

impl std::fmt::Debug for VerificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationService")
            .field("matcher", &self.matcher)
            .field("vault", &self.vault)
            .finish_non_exhaustive()
    }
}

impl VerificationService {
    pub fn new(
        store: Arc<dyn RegistrationStore>,
        matcher: Arc<FaceMatcher>,
        vault: PhotoVault,
        audit: AuditTrail,
    ) -> Self {
        Self {
            store,
            matcher,
            vault,
            audit,
        }
    }

    /// The registered document bytes for `email`, decrypted and checked
    /// against the fingerprint taken at registration.
    ///
    /// Bytes that no longer hash to the recorded fingerprint are an
    /// [`IdCheckError::IntegrityMismatch`].
    pub fn stored_document(&self, email: &str) -> Result<Vec<u8>, IdCheckError> {
        let email = normalise_email(email)?;
        let record = self
            .store
            .find_by_email(email)?
            .ok_or_else(|| IdCheckError::NotRegistered(email.to_owned()))?;
        let document = self.vault.open(record.photo_bytes)?;
        verify_hash(&document, &record.document_hash)?;
        Ok(document)
    }

    /// [`Self::stored_document`] on the blocking pool; decryption runs scrypt.
    pub async fn load_document(&self, email: &str) -> Result<Vec<u8>, IdCheckError> {
        let service = self.clone();
        let email = email.to_owned();
        tokio::task::spawn_blocking(move || service.stored_document(&email))
            .await
            .map_err(|err| IdCheckError::Task(err.to_string()))?
    }

    /// Compare `photo_base64` with the document registered under `email`.
    ///
    /// Unknown email → [`IdCheckError::NotRegistered`]. A photo that does not
    /// decode is an error, never [`MatchResult::NoFaceDetected`].
    #[instrument(skip(self, photo_base64), fields(photo_len = photo_base64.len()))]
    pub async fn verify(&self, email: &str, photo_base64: &str) -> Result<MatchResult, IdCheckError> {
        let stored = self.load_document(email).await?;
        let captured = decode_photo_base64(photo_base64)?;
        let capture_hash = hash_bytes(&captured);
        debug!(stored_len = stored.len(), captured_len = captured.len(), "Photos loaded");

        let matcher = Arc::clone(&self.matcher);
        let result = tokio::task::spawn_blocking(move || matcher.match_faces(&stored, &captured))
            .await
            .map_err(|err| IdCheckError::Task(err.to_string()))?;

        let email = email.trim();
        match &result {
            Ok(outcome) => {
                let (label, distance) = match outcome {
                    MatchResult::Match { distance } => ("match", Some(*distance)),
                    MatchResult::NoMatch { distance } => ("no-match", Some(*distance)),
                    MatchResult::NoFaceDetected => ("no-face-detected", None),
                };
                let details = distance.map(|d| format!("distance={d:.4}"));
                self.audit.record(
                    AuditAction::VerifyFace,
                    email,
                    &capture_hash,
                    label,
                    outcome.is_match(),
                    details.as_deref(),
                );
            }
            Err(err) => self.audit.record(
                AuditAction::VerifyFace,
                email,
                &capture_hash,
                "error",
                false,
                Some(&err.to_string()),
            ),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use idcheck_core::types::{ContentType, FaceEncoding, RegistrationRecord};
    use idcheck_face::FaceEncoder;
    use idcheck_security::{AuditLog, EncryptedStorage, SqliteRegistry};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    /// Treats the top-left pixel as the whole face; pure black means no face.
    struct CornerPixelEncoder;

    impl FaceEncoder for CornerPixelEncoder {
        fn encode(&self, image: &DynamicImage) -> Result<Vec<FaceEncoding>, IdCheckError> {
            let [r, g, b] = image.to_rgb8().get_pixel(0, 0).0;
            if [r, g, b] == [0, 0, 0] {
                return Ok(Vec::new());
            }
            Ok(vec![FaceEncoding(
                [r, g, b].iter().map(|c| f32::from(*c) / 255.0).collect(),
            )])
        }
    }

    fn png(colour: [u8; 3]) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb(colour)))
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    fn service_with(vault: PhotoVault, stored: Vec<u8>) -> (VerificationService, AuditTrail) {
        let fingerprint = hash_bytes(&stored);
        service_with_record(vault, stored, &fingerprint)
    }

    fn service_with_record(
        vault: PhotoVault,
        stored: Vec<u8>,
        fingerprint: &str,
    ) -> (VerificationService, AuditTrail) {
        let registry = SqliteRegistry::open_in_memory().unwrap();
        registry
            .insert(&RegistrationRecord::new(
                "asha@example.in",
                vault.seal(stored).unwrap(),
                ContentType::Png,
                fingerprint,
            ))
            .unwrap();
        let audit = AuditTrail::new(AuditLog::open_in_memory().unwrap());
        let service = VerificationService::new(
            Arc::new(registry),
            Arc::new(FaceMatcher::new(Arc::new(CornerPixelEncoder))),
            vault,
            audit.clone(),
        );
        (service, audit)
    }

    fn service(stored: Vec<u8>) -> VerificationService {
        service_with(PhotoVault::plaintext(), stored).0
    }

    fn b64(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    #[test]
    fn data_url_prefix_is_stripped() {
        let raw = b"\x89PNG fake";
        let bare = b64(raw);
        assert_eq!(decode_photo_base64(&bare).unwrap(), raw);
        assert_eq!(
            decode_photo_base64(&format!("data:image/png;base64,{bare}")).unwrap(),
            raw
        );
        assert_eq!(
            decode_photo_base64(&format!("  data:image/jpeg;base64,{bare}\n")).unwrap(),
            raw
        );
    }

    #[test]
    fn invalid_base64_is_invalid_input() {
        assert!(matches!(
            decode_photo_base64("data:image/png;base64,@@@"),
            Err(IdCheckError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn same_face_matches() {
        let face = png([200, 160, 140]);
        let result = service(face.clone()).verify("asha@example.in", &b64(&face)).await.unwrap();
        assert!(result.is_match());
    }

    #[tokio::test]
    async fn different_face_does_not_match() {
        let svc = service(png([250, 250, 250]));
        let result = svc
            .verify("asha@example.in", &format!("data:image/png;base64,{}", b64(&png([20, 20, 20]))))
            .await
            .unwrap();
        assert!(matches!(result, MatchResult::NoMatch { .. }));
    }

    #[tokio::test]
    async fn faceless_capture_is_no_face_detected() {
        let svc = service(png([200, 160, 140]));
        let result = svc
            .verify("asha@example.in", &b64(&png([0, 0, 0])))
            .await
            .unwrap();
        assert_eq!(result, MatchResult::NoFaceDetected);
    }

    #[tokio::test]
    async fn unknown_email_is_not_registered() {
        let svc = service(png([200, 160, 140]));
        let err = svc.verify("nobody@example.in", &b64(&png([1, 1, 1]))).await.unwrap_err();
        assert!(matches!(err, IdCheckError::NotRegistered(_)));
    }

    #[tokio::test]
    async fn undecodable_capture_is_image_error() {
        let svc = service(png([200, 160, 140]));
        let err = svc
            .verify("asha@example.in", &b64(b"not an image"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdCheckError::ImageError(_)));
    }

    #[tokio::test]
    async fn encrypted_photo_is_opened_before_matching() {
        let face = png([90, 120, 200]);
        let (svc, audit) = service_with(
            PhotoVault::encrypted(EncryptedStorage::new("vault-pass")),
            face.clone(),
        );

        assert_eq!(svc.stored_document("asha@example.in").unwrap(), face);
        let result = svc.verify("asha@example.in", &b64(&face)).await.unwrap();
        assert!(result.is_match());

        let entries = audit.with_log(|log| log.entries_for_subject("asha@example.in").unwrap()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "verify-face");
        assert_eq!(entries[0].outcome, "match");
        assert!(entries[0].success);
    }

    #[tokio::test]
    async fn altered_stored_document_fails_integrity_check() {
        let face = png([90, 120, 200]);
        let original = hash_bytes(b"original upload");
        let (svc, audit) = service_with_record(PhotoVault::plaintext(), face.clone(), &original);

        let err = svc.load_document("asha@example.in").await.unwrap_err();
        assert!(matches!(
            err,
            IdCheckError::IntegrityMismatch { ref actual, .. } if *actual == hash_bytes(&face)
        ));

        let err = svc.verify("asha@example.in", &b64(&face)).await.unwrap_err();
        assert!(matches!(err, IdCheckError::IntegrityMismatch { .. }));
        assert_eq!(audit.with_log(|log| log.count().unwrap()), Some(0));
    }
}
