use crate::error::DomainError;
use crate::registry::domain::SubjectRef;
use crate::versioning::VersionHistoryStore;
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatureId(pub Uuid);

impl SignatureId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SignatureId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SignatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    Draft,
    Signed,
    Verified,
    Invalid,
    Revoked,
}

impl SignatureStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Signed => "signed",
            Self::Verified => "verified",
            Self::Invalid => "invalid",
            Self::Revoked => "revoked",
        }
    }

    /// A signature in this status satisfies a "must be signed" precondition.
    pub const fn is_usable(self) -> bool {
        matches!(self, Self::Signed | Self::Verified)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub id: SignatureId,
    pub code: String,
    pub subject_ref: SubjectRef,
    pub signer_name: String,
    pub signer_title: Option<String>,
    pub status: SignatureStatus,
    pub document_hash: Option<String>,
    pub signature_hash: Option<String>,
    pub signature_image_ref: Option<String>,
    pub certificate_serial: Option<String>,
    pub certificate_issuer: Option<String>,
    pub valid_from: Option<NaiveDateTime>,
    pub valid_until: Option<NaiveDateTime>,
    pub signed_at: Option<NaiveDateTime>,
    pub verified: bool,
    pub verification_date: Option<NaiveDateTime>,
    pub revocation_reason: Option<String>,
    pub revoked_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

/// Electronic signature records with an internal certificate authority.
///
/// The store owns the signature lifecycle end to end; the version history
/// collaborator receives a snapshot every time a signing succeeds.
pub struct SignatureService {
    records: Mutex<HashMap<SignatureId, Signature>>,
    code_counter: AtomicU64,
    versions: Arc<VersionHistoryStore>,
}

impl SignatureService {
    pub fn new(versions: Arc<VersionHistoryStore>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            code_counter: AtomicU64::new(0),
            versions,
        }
    }

    /// Registers a draft signature for a document. The content digest is
    /// computed here, so the hash witnesses the content as it stood when the
    /// signature was requested.
    pub fn create(
        &self,
        subject_ref: SubjectRef,
        signer_name: impl Into<String>,
        signer_title: Option<String>,
        document_content: &str,
        signature_image_ref: Option<String>,
    ) -> Signature {
        let seq = self.code_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let signature = Signature {
            id: SignatureId::new(),
            code: format!("CK-{seq:06}"),
            subject_ref,
            signer_name: signer_name.into(),
            signer_title,
            status: SignatureStatus::Draft,
            document_hash: Some(sha256_hex(document_content.as_bytes())),
            signature_hash: None,
            signature_image_ref,
            certificate_serial: None,
            certificate_issuer: None,
            valid_from: None,
            valid_until: None,
            signed_at: None,
            verified: false,
            verification_date: None,
            revocation_reason: None,
            revoked_at: None,
            created_at: Utc::now().naive_utc(),
        };
        self.records
            .lock()
            .expect("signature mutex poisoned")
            .insert(signature.id, signature.clone());
        signature
    }

    pub fn fetch(&self, id: SignatureId) -> Result<Signature, DomainError> {
        self.records
            .lock()
            .expect("signature mutex poisoned")
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("signature {id}")))
    }

    /// Signs a draft: seals the signer over the content digest, mints an
    /// internal certificate valid for two years, and snapshots the signed
    /// content into version history.
    pub fn sign(
        &self,
        id: SignatureId,
        content_snapshot: crate::registry::domain::ContentSnapshot,
    ) -> Result<Signature, DomainError> {
        let now = Utc::now().naive_utc();
        let signature = {
            let mut records = self.records.lock().expect("signature mutex poisoned");
            let record = records
                .get_mut(&id)
                .ok_or_else(|| DomainError::not_found(format!("signature {id}")))?;
            if record.status != SignatureStatus::Draft {
                return Err(DomainError::state("sign", record.status.label()));
            }

            let seal = format!(
                "{}:{}:{}",
                record.document_hash.as_deref().unwrap_or_default(),
                record.signer_name,
                now.format("%Y-%m-%dT%H:%M:%S"),
            );
            record.signature_hash = Some(sha256_hex(seal.as_bytes()));
            record.certificate_serial =
                Some(format!("CERT-{}", now.format("%Y%m%d%H%M%S")));
            record.certificate_issuer = Some("Internal CA".to_string());
            record.valid_from = Some(now);
            record.valid_until = Some(now + chrono::Duration::days(365 * 2));
            record.signed_at = Some(now);
            record.status = SignatureStatus::Signed;
            record.clone()
        };

        self.versions.create_version(
            signature.subject_ref,
            content_snapshot,
            format!("signed by {}", signature.signer_name),
            signature.signer_name.clone(),
        );
        info!(code = %signature.code, signer = %signature.signer_name, "document signed");
        Ok(signature)
    }

    /// Checks integrity of a signed record. Re-verifying a verified
    /// signature is a no-op; a signed record without a content digest turns
    /// invalid.
    pub fn verify(&self, id: SignatureId) -> Result<Signature, DomainError> {
        let mut records = self.records.lock().expect("signature mutex poisoned");
        let record = records
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(format!("signature {id}")))?;
        match record.status {
            SignatureStatus::Verified => Ok(record.clone()),
            SignatureStatus::Signed => {
                let intact = record
                    .document_hash
                    .as_deref()
                    .is_some_and(|hash| !hash.is_empty());
                if intact {
                    record.status = SignatureStatus::Verified;
                    record.verified = true;
                    record.verification_date = Some(Utc::now().naive_utc());
                } else {
                    record.status = SignatureStatus::Invalid;
                }
                Ok(record.clone())
            }
            other => Err(DomainError::state("verify", other.label())),
        }
    }

    /// Revocation is terminal and requires a reason. Completed documents
    /// that referenced the signature stay completed; the record only serves
    /// as audit evidence afterwards.
    pub fn revoke(&self, id: SignatureId, reason: impl Into<String>) -> Result<Signature, DomainError> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(DomainError::validation("revocation requires a reason"));
        }
        let mut records = self.records.lock().expect("signature mutex poisoned");
        let record = records
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(format!("signature {id}")))?;
        if record.status == SignatureStatus::Revoked {
            return Err(DomainError::state("revoke", record.status.label()));
        }
        record.status = SignatureStatus::Revoked;
        record.revocation_reason = Some(reason);
        record.revoked_at = Some(Utc::now().naive_utc());
        info!(code = %record.code, "signature revoked");
        Ok(record.clone())
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::domain::{ContentSnapshot, DocumentId, DocumentKind};

    fn service() -> SignatureService {
        SignatureService::new(Arc::new(VersionHistoryStore::new()))
    }

    fn subject() -> SubjectRef {
        SubjectRef::new(DocumentKind::Outgoing, DocumentId::new())
    }

    fn snapshot() -> ContentSnapshot {
        ContentSnapshot {
            subject: "Price list update".to_string(),
            note: None,
        }
    }

    #[test]
    fn create_assigns_sequential_codes_and_hashes_the_content() {
        let service = service();
        let first = service.create(subject(), "Nguyen Van A", None, "content a", None);
        let second = service.create(subject(), "Tran Thi B", None, "content b", None);
        assert_eq!(first.code, "CK-000001");
        assert_eq!(second.code, "CK-000002");
        assert_eq!(first.status, SignatureStatus::Draft);
        assert_eq!(
            first.document_hash.as_deref().map(str::len),
            Some(64),
            "sha-256 hex digest computed at creation"
        );
        assert_ne!(first.document_hash, second.document_hash);
    }

    #[test]
    fn create_keeps_the_signature_image_reference() {
        let service = service();
        let created = service.create(
            subject(),
            "Nguyen Van A",
            None,
            "content",
            Some("images/chop-a.png".to_string()),
        );
        assert_eq!(
            created.signature_image_ref.as_deref(),
            Some("images/chop-a.png")
        );
    }

    #[test]
    fn sign_seals_the_digest_and_mints_certificate() {
        let service = service();
        let created = service.create(
            subject(),
            "Nguyen Van A",
            Some("Director".to_string()),
            "body of the document",
            None,
        );
        let signed = service.sign(created.id, snapshot()).expect("draft signs");

        assert_eq!(signed.status, SignatureStatus::Signed);
        assert_eq!(
            signed.signature_hash.as_deref().map(str::len),
            Some(64),
            "sha-256 seal over digest and signer expected"
        );
        assert!(signed
            .certificate_serial
            .as_deref()
            .expect("serial minted")
            .starts_with("CERT-"));
        assert_eq!(signed.certificate_issuer.as_deref(), Some("Internal CA"));
        let valid_from = signed.valid_from.expect("validity start");
        let valid_until = signed.valid_until.expect("validity end");
        assert_eq!(valid_until - valid_from, chrono::Duration::days(730));
    }

    #[test]
    fn signing_twice_is_a_state_error() {
        let service = service();
        let created = service.create(subject(), "Nguyen Van A", None, "content", None);
        service.sign(created.id, snapshot()).expect("first sign");
        let err = service
            .sign(created.id, snapshot())
            .expect_err("second sign rejected");
        assert!(matches!(err, DomainError::State { .. }));
    }

    #[test]
    fn sign_snapshots_into_version_history() {
        let versions = Arc::new(VersionHistoryStore::new());
        let service = SignatureService::new(Arc::clone(&versions));
        let subject_ref = subject();
        let created = service.create(subject_ref, "Nguyen Van A", None, "content", None);
        service.sign(created.id, snapshot()).expect("sign succeeds");

        let history = versions.list(&subject_ref);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].change_note, "signed by Nguyen Van A");
    }

    #[test]
    fn verify_stamps_the_record_and_is_idempotent() {
        let service = service();
        let created = service.create(subject(), "Nguyen Van A", None, "content", None);
        service.sign(created.id, snapshot()).expect("sign");

        let verified = service.verify(created.id).expect("first verify");
        assert_eq!(verified.status, SignatureStatus::Verified);
        assert!(verified.verified);
        let stamped_at = verified.verification_date.expect("verification stamped");

        let again = service.verify(created.id).expect("second verify");
        assert_eq!(again.status, SignatureStatus::Verified);
        assert_eq!(again.verification_date, Some(stamped_at));
    }

    #[test]
    fn verify_rejects_draft() {
        let service = service();
        let created = service.create(subject(), "Nguyen Van A", None, "content", None);
        let err = service.verify(created.id).expect_err("draft cannot verify");
        assert!(matches!(err, DomainError::State { .. }));
    }

    #[test]
    fn revoke_requires_reason_and_is_terminal() {
        let service = service();
        let created = service.create(subject(), "Nguyen Van A", None, "content", None);
        service.sign(created.id, snapshot()).expect("sign");

        let err = service.revoke(created.id, "  ").expect_err("blank reason");
        assert!(matches!(err, DomainError::Validation(_)));

        let revoked = service
            .revoke(created.id, "key compromised")
            .expect("revoke with reason");
        assert_eq!(revoked.status, SignatureStatus::Revoked);
        assert_eq!(revoked.revocation_reason.as_deref(), Some("key compromised"));

        let err = service
            .revoke(created.id, "again")
            .expect_err("revocation is terminal");
        assert!(matches!(err, DomainError::State { .. }));
    }
}
