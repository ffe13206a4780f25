//! The grant record and its escrow attachments.
//!
//! A [`Grant`] is a plain value. The transition methods (`accept`,
//! `complete_escrow`, `request`, ...) never mutate in place: they check the
//! state machine and return the successor record, which the caller persists
//! with a conditional write against the original status.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::ids::{GrantId, UserId};
use crate::status::GrantStatus;
use crate::time::wait_expiry;
use crate::token::TokenHash;
use crate::transition::can_transition;

/// Length of an X25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;
/// Length of the HKDF salt.
pub const HKDF_SALT_LEN: usize = 32;
/// Length of an AEAD IV / nonce.
pub const IV_LEN: usize = 12;
/// Length of an AEAD authentication tag.
pub const TAG_LEN: usize = 16;

/// Version of the key-wrapping construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum WrapVersion {
    /// X25519 + HKDF-SHA256 + AES-256-GCM.
    V1 = 1,
    /// X25519 + HKDF-SHA256 + ChaCha20-Poly1305.
    V2 = 2,
}

impl WrapVersion {
    /// Numeric form of the version.
    pub const fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Parse the numeric form.
    pub fn from_u16(value: u16) -> Result<Self> {
        match value {
            1 => Ok(WrapVersion::V1),
            2 => Ok(WrapVersion::V2),
            other => Err(CoreError::UnknownAlgorithm(format!("wrap version {other}"))),
        }
    }

    /// The only algorithm this version may be paired with.
    pub const fn algorithm(&self) -> KeyAlgorithm {
        match self {
            WrapVersion::V1 => KeyAlgorithm::X25519HkdfSha256Aes256Gcm,
            WrapVersion::V2 => KeyAlgorithm::X25519HkdfSha256ChaCha20Poly1305,
        }
    }
}

/// Algorithm marker stored next to an escrow artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    /// X25519 agreement, HKDF-SHA256 derivation, AES-256-GCM wrap.
    X25519HkdfSha256Aes256Gcm,
    /// X25519 agreement, HKDF-SHA256 derivation, ChaCha20-Poly1305 wrap.
    X25519HkdfSha256ChaCha20Poly1305,
}

impl KeyAlgorithm {
    /// Stable string form used in storage.
    pub const fn as_str(&self) -> &'static str {
        match self {
            KeyAlgorithm::X25519HkdfSha256Aes256Gcm => "X25519-HKDF-SHA256-AES256GCM",
            KeyAlgorithm::X25519HkdfSha256ChaCha20Poly1305 => "X25519-HKDF-SHA256-CHACHA20POLY1305",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "X25519-HKDF-SHA256-AES256GCM" => Ok(KeyAlgorithm::X25519HkdfSha256Aes256Gcm),
            "X25519-HKDF-SHA256-CHACHA20POLY1305" => {
                Ok(KeyAlgorithm::X25519HkdfSha256ChaCha20Poly1305)
            }
            other => Err(CoreError::UnknownAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Algorithm used to seal a grantee's private key under the grantee's own secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SealAlgorithm {
    /// HKDF-SHA256 key from the grantee secret, AES-256-GCM.
    HkdfSha256Aes256Gcm,
}

impl SealAlgorithm {
    /// Stable string form used in storage.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SealAlgorithm::HkdfSha256Aes256Gcm => "HKDF-SHA256-AES256GCM",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "HKDF-SHA256-AES256GCM" => Ok(SealAlgorithm::HkdfSha256Aes256Gcm),
            other => Err(CoreError::UnknownAlgorithm(other.to_string())),
        }
    }
}

fn check_len(field: &'static str, bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() != expected {
        return Err(CoreError::InvalidLength {
            field,
            expected,
            got: bytes.len(),
        });
    }
    Ok(())
}

/// The owner's vault key, wrapped for one grantee.
///
/// Produced by the owner's client and stored verbatim. The server only checks
/// its shape; it has no key that could open it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowArtifact {
    /// Wrapping construction version.
    pub wrap_version: WrapVersion,
    /// Algorithm marker, must agree with `wrap_version`.
    pub key_algorithm: KeyAlgorithm,
    /// Version of the owner's vault key that was wrapped.
    pub key_version: u32,
    /// Owner's ephemeral X25519 public key.
    pub ephemeral_public_key: Vec<u8>,
    /// HKDF salt.
    pub hkdf_salt: Vec<u8>,
    /// AEAD IV / nonce.
    pub iv: Vec<u8>,
    /// Encrypted vault key, without tag.
    pub ciphertext: Vec<u8>,
    /// AEAD authentication tag.
    pub auth_tag: Vec<u8>,
}

impl EscrowArtifact {
    /// Check the artifact's shape without decrypting it.
    pub fn validate(&self) -> Result<()> {
        if self.wrap_version.algorithm() != self.key_algorithm {
            return Err(CoreError::VersionMismatch {
                version: self.wrap_version.as_u16(),
                algorithm: self.key_algorithm.to_string(),
            });
        }
        match self.wrap_version {
            WrapVersion::V1 | WrapVersion::V2 => {
                check_len("ephemeral public key", &self.ephemeral_public_key, PUBLIC_KEY_LEN)?;
                check_len("hkdf salt", &self.hkdf_salt, HKDF_SALT_LEN)?;
                check_len("iv", &self.iv, IV_LEN)?;
                check_len("auth tag", &self.auth_tag, TAG_LEN)?;
            }
        }
        if self.ciphertext.is_empty() {
            return Err(CoreError::EmptyField("ciphertext"));
        }
        Ok(())
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CoreError::EncodingError(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
    }
}

impl fmt::Debug for EscrowArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EscrowArtifact")
            .field("wrap_version", &self.wrap_version)
            .field("key_algorithm", &self.key_algorithm)
            .field("key_version", &self.key_version)
            .field("ciphertext_len", &self.ciphertext.len())
            .finish_non_exhaustive()
    }
}

/// A grantee's private key, sealed under a secret only the grantee's client holds.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedPrivateKey {
    /// How the private key was sealed.
    pub seal_algorithm: SealAlgorithm,
    /// Salt used to derive the sealing key.
    pub seal_salt: Vec<u8>,
    /// IV used for sealing.
    pub iv: Vec<u8>,
    /// Sealed private key, without tag.
    pub ciphertext: Vec<u8>,
    /// Authentication tag.
    pub auth_tag: Vec<u8>,
}

impl SealedPrivateKey {
    /// Check the record's shape without opening it.
    pub fn validate(&self) -> Result<()> {
        match self.seal_algorithm {
            SealAlgorithm::HkdfSha256Aes256Gcm => {
                check_len("seal salt", &self.seal_salt, HKDF_SALT_LEN)?;
                check_len("private key iv", &self.iv, IV_LEN)?;
                check_len("private key auth tag", &self.auth_tag, TAG_LEN)?;
            }
        }
        if self.ciphertext.is_empty() {
            return Err(CoreError::EmptyField("encrypted private key"));
        }
        Ok(())
    }
}

impl fmt::Debug for SealedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedPrivateKey")
            .field("seal_algorithm", &self.seal_algorithm)
            .finish_non_exhaustive()
    }
}

/// A grantee's enrolled key pair.
///
/// The public key is cleartext so the owner can escrow to it. Created once at
/// acceptance and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GranteeKeyPair {
    /// The grant this key pair belongs to.
    pub grant_id: GrantId,
    /// Grantee X25519 public key.
    pub public_key: Vec<u8>,
    /// The matching private key, sealed.
    pub private_key: SealedPrivateKey,
    /// When the key pair was enrolled (Unix ms).
    pub created_at: i64,
}

impl GranteeKeyPair {
    /// Check the record's shape without opening it.
    pub fn validate(&self) -> Result<()> {
        check_len("grantee public key", &self.public_key, PUBLIC_KEY_LEN)?;
        self.private_key.validate()
    }
}

/// Durable state of one owner → grantee delegation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Grant identifier.
    pub id: GrantId,
    /// The vault owner.
    pub owner_id: UserId,
    /// The grantee, set once the invitation is accepted.
    pub grantee_id: Option<UserId>,
    /// Normalized invitation target address.
    pub grantee_email: String,
    /// Current lifecycle status.
    pub status: GrantStatus,
    /// Wait period between request and automatic activation.
    pub wait_days: u32,
    /// When access was requested (Unix ms).
    pub requested_at: Option<i64>,
    /// When the wait period elapses (Unix ms).
    pub wait_expires_at: Option<i64>,
    /// When access was activated (Unix ms).
    pub activated_at: Option<i64>,
    /// Digest of the invitation token.
    pub token_hash: TokenHash,
    /// Invitation must be redeemed strictly before this instant (Unix ms).
    pub token_expires_at: i64,
    /// Wrapped vault key. Present exactly when escrow is complete.
    pub escrow: Option<EscrowArtifact>,
    /// Creation time (Unix ms).
    pub created_at: i64,
    /// Last modification time (Unix ms).
    pub updated_at: i64,
    /// Incremented by every transition. Conditional writes compare it.
    pub revision: u64,
}

/// Parameters for a new invitation.
#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub owner_id: UserId,
    pub grantee_email: String,
    pub wait_days: u32,
    pub token_hash: TokenHash,
    pub token_expires_at: i64,
}

impl Grant {
    /// Create a fresh `Pending` grant.
    pub fn invitation(params: NewInvitation, now: i64) -> Self {
        Self {
            id: GrantId::generate(),
            owner_id: params.owner_id,
            grantee_id: None,
            grantee_email: params.grantee_email,
            status: GrantStatus::Pending,
            wait_days: params.wait_days,
            requested_at: None,
            wait_expires_at: None,
            activated_at: None,
            token_hash: params.token_hash,
            token_expires_at: params.token_expires_at,
            escrow: None,
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    /// Whether `user` owns this grant.
    pub fn is_owner(&self, user: &UserId) -> bool {
        &self.owner_id == user
    }

    /// Whether `user` is the enrolled grantee.
    pub fn is_grantee(&self, user: &UserId) -> bool {
        self.grantee_id.as_ref() == Some(user)
    }

    /// Whether the invitation can no longer be redeemed at `now`.
    pub fn invitation_expired(&self, now: i64) -> bool {
        now >= self.token_expires_at
    }

    /// Whether the wait period has elapsed on a live request.
    pub fn activation_due(&self, now: i64) -> bool {
        self.status == GrantStatus::Requested
            && self.wait_expires_at.is_some_and(|expires| expires <= now)
    }

    fn require(&self, source: GrantStatus, target: GrantStatus) -> Result<()> {
        if self.status != source {
            return Err(CoreError::IllegalTransition {
                from: self.status,
                to: target,
            });
        }
        Ok(())
    }

    fn advance(&self, target: GrantStatus, now: i64) -> Result<Self> {
        if !can_transition(self.status, target) {
            return Err(CoreError::IllegalTransition {
                from: self.status,
                to: target,
            });
        }
        let mut next = self.clone();
        next.status = target;
        next.updated_at = now;
        next.revision = self.revision + 1;
        Ok(next)
    }

    /// `Pending` → `Accepted`: bind the grantee.
    pub fn accept(&self, grantee: UserId, now: i64) -> Result<Self> {
        self.require(GrantStatus::Pending, GrantStatus::Accepted)?;
        let mut next = self.advance(GrantStatus::Accepted, now)?;
        next.grantee_id = Some(grantee);
        Ok(next)
    }

    /// `Pending` → `Rejected`: the invitee declined.
    pub fn decline(&self, now: i64) -> Result<Self> {
        self.require(GrantStatus::Pending, GrantStatus::Rejected)?;
        self.advance(GrantStatus::Rejected, now)
    }

    /// `Accepted` → `Idle`: attach the wrapped vault key.
    pub fn complete_escrow(&self, artifact: EscrowArtifact, now: i64) -> Result<Self> {
        artifact.validate()?;
        let mut next = self.advance(GrantStatus::Idle, now)?;
        next.escrow = Some(artifact);
        Ok(next)
    }

    /// `Idle` → `Requested`: start the wait period.
    pub fn request(&self, now: i64) -> Result<Self> {
        let mut next = self.advance(GrantStatus::Requested, now)?;
        next.requested_at = Some(now);
        next.wait_expires_at = Some(wait_expiry(now, self.wait_days));
        next.activated_at = None;
        Ok(next)
    }

    /// `Requested` → `Activated`.
    pub fn activate(&self, now: i64) -> Result<Self> {
        let mut next = self.advance(GrantStatus::Activated, now)?;
        next.activated_at = Some(now);
        Ok(next)
    }

    /// `Requested` → `Rejected`: the owner refused the live request.
    pub fn reject_request(&self, now: i64) -> Result<Self> {
        self.require(GrantStatus::Requested, GrantStatus::Rejected)?;
        self.advance(GrantStatus::Rejected, now)
    }

    /// `Idle | Requested | Activated` → `Stale`: drop unusable escrow material.
    pub fn invalidate_escrow(&self, now: i64) -> Result<Self> {
        let mut next = self.advance(GrantStatus::Stale, now)?;
        next.escrow = None;
        next.requested_at = None;
        next.wait_expires_at = None;
        next.activated_at = None;
        Ok(next)
    }

    /// `Stale` → `Accepted`: reopen the grant for a fresh escrow.
    pub fn restart_escrow(&self, now: i64) -> Result<Self> {
        self.require(GrantStatus::Stale, GrantStatus::Accepted)?;
        self.advance(GrantStatus::Accepted, now)
    }

    /// Read-only projection without token or escrow bytes.
    pub fn summary(&self, now: i64) -> GrantSummary {
        GrantSummary {
            id: self.id,
            owner_id: self.owner_id,
            grantee_id: self.grantee_id,
            grantee_email: self.grantee_email.clone(),
            status: self.status,
            wait_days: self.wait_days,
            requested_at: self.requested_at,
            wait_expires_at: self.wait_expires_at,
            activated_at: self.activated_at,
            escrowed: self.escrow.is_some(),
            activation_due: self.activation_due(now),
            created_at: self.created_at,
        }
    }
}

/// Listing view of a grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantSummary {
    pub id: GrantId,
    pub owner_id: UserId,
    pub grantee_id: Option<UserId>,
    pub grantee_email: String,
    pub status: GrantStatus,
    pub wait_days: u32,
    pub requested_at: Option<i64>,
    pub wait_expires_at: Option<i64>,
    pub activated_at: Option<i64>,
    /// Whether an escrow artifact is attached.
    pub escrowed: bool,
    /// Whether the next disclosure read will activate the grant.
    pub activation_due: bool,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::DAY_MILLIS;
    use crate::token::InvitationToken;

    fn artifact() -> EscrowArtifact {
        EscrowArtifact {
            wrap_version: WrapVersion::V1,
            key_algorithm: KeyAlgorithm::X25519HkdfSha256Aes256Gcm,
            key_version: 1,
            ephemeral_public_key: vec![1; PUBLIC_KEY_LEN],
            hkdf_salt: vec![2; HKDF_SALT_LEN],
            iv: vec![3; IV_LEN],
            ciphertext: vec![4; 32],
            auth_tag: vec![5; TAG_LEN],
        }
    }

    fn pending(now: i64) -> Grant {
        Grant::invitation(
            NewInvitation {
                owner_id: UserId::generate(),
                grantee_email: "grantee@example.com".into(),
                wait_days: 7,
                token_hash: InvitationToken::generate().hash(),
                token_expires_at: now + 7 * DAY_MILLIS,
            },
            now,
        )
    }

    #[test]
    fn test_full_lifecycle() {
        let grantee = UserId::generate();
        let g = pending(0);
        assert_eq!(g.status, GrantStatus::Pending);
        assert!(g.grantee_id.is_none());

        let g = g.accept(grantee, 10).unwrap();
        assert!(g.is_grantee(&grantee));

        let g = g.complete_escrow(artifact(), 20).unwrap();
        assert_eq!(g.status, GrantStatus::Idle);
        assert!(g.escrow.is_some());

        let g = g.request(100).unwrap();
        assert_eq!(g.wait_expires_at, Some(100 + 7 * DAY_MILLIS));
        assert!(!g.activation_due(100 + 7 * DAY_MILLIS - 1));
        assert!(g.activation_due(100 + 7 * DAY_MILLIS));

        let g = g.activate(200).unwrap();
        assert_eq!(g.status, GrantStatus::Activated);
        assert_eq!(g.activated_at, Some(200));
        assert_eq!(g.updated_at, 200);
        assert_eq!(g.revision, 4);
    }

    #[test]
    fn test_revision_distinguishes_repeated_status() {
        let first = pending(0)
            .accept(UserId::generate(), 1)
            .unwrap()
            .complete_escrow(artifact(), 2)
            .unwrap()
            .request(3)
            .unwrap();
        let second = first
            .invalidate_escrow(4)
            .unwrap()
            .restart_escrow(5)
            .unwrap()
            .complete_escrow(artifact(), 6)
            .unwrap()
            .request(7)
            .unwrap();

        assert_eq!(first.status, second.status);
        assert!(second.revision > first.revision);

        // A failed transition leaves the record untouched.
        assert!(second.restart_escrow(8).is_err());
        assert_eq!(second.revision, 7);
    }

    #[test]
    fn test_illegal_transition_reports_statuses() {
        let g = pending(0);
        let err = g.request(1).unwrap_err();
        assert!(matches!(
            err,
            CoreError::IllegalTransition {
                from: GrantStatus::Pending,
                to: GrantStatus::Requested
            }
        ));
    }

    #[test]
    fn test_decline_only_from_pending() {
        let g = pending(0).accept(UserId::generate(), 1).unwrap();
        assert!(g.decline(2).is_err());
    }

    #[test]
    fn test_restart_only_from_stale() {
        assert!(pending(0).restart_escrow(1).is_err());
    }

    #[test]
    fn test_reject_request_only_from_requested() {
        assert!(pending(0).reject_request(1).is_err());
    }

    #[test]
    fn test_invalidate_clears_escrow_and_timers() {
        let g = pending(0)
            .accept(UserId::generate(), 1)
            .unwrap()
            .complete_escrow(artifact(), 2)
            .unwrap()
            .request(3)
            .unwrap()
            .invalidate_escrow(4)
            .unwrap();
        assert_eq!(g.status, GrantStatus::Stale);
        assert!(g.escrow.is_none());
        assert!(g.requested_at.is_none());
        assert!(g.wait_expires_at.is_none());
        assert!(g.request(5).is_err());

        let g = g.restart_escrow(6).unwrap();
        assert_eq!(g.status, GrantStatus::Accepted);
        assert!(g.grantee_id.is_some());
    }

    #[test]
    fn test_invitation_expiry_is_exclusive() {
        let g = pending(0);
        assert!(!g.invitation_expired(g.token_expires_at - 1));
        assert!(g.invitation_expired(g.token_expires_at));
    }

    #[test]
    fn test_artifact_validation() {
        assert!(artifact().validate().is_ok());

        let mut bad = artifact();
        bad.key_algorithm = KeyAlgorithm::X25519HkdfSha256ChaCha20Poly1305;
        assert!(matches!(
            bad.validate(),
            Err(CoreError::VersionMismatch { .. })
        ));

        let mut bad = artifact();
        bad.iv = vec![0; 8];
        assert!(matches!(
            bad.validate(),
            Err(CoreError::InvalidLength { field: "iv", .. })
        ));

        let mut bad = artifact();
        bad.ciphertext.clear();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_escrow_rejects_malformed_artifact() {
        let g = pending(0).accept(UserId::generate(), 1).unwrap();
        let mut bad = artifact();
        bad.auth_tag.pop();
        assert!(g.complete_escrow(bad, 2).is_err());
    }

    #[test]
    fn test_artifact_cbor_roundtrip() {
        let a = artifact();
        let decoded = EscrowArtifact::from_bytes(&a.to_bytes().unwrap()).unwrap();
        assert_eq!(a, decoded);
    }

    #[test]
    fn test_artifact_debug_hides_bytes() {
        let debug = format!("{:?}", artifact());
        assert!(debug.contains("ciphertext_len"));
        assert!(!debug.contains("[4, 4"));
    }

    #[test]
    fn test_summary_flags() {
        let g = pending(0);
        let s = g.summary(0);
        assert!(!s.escrowed);
        assert!(!s.activation_due);
        assert_eq!(s.status, GrantStatus::Pending);
    }

    #[test]
    fn test_key_pair_validation() {
        let pair = GranteeKeyPair {
            grant_id: GrantId::generate(),
            public_key: vec![9; PUBLIC_KEY_LEN],
            private_key: SealedPrivateKey {
                seal_algorithm: SealAlgorithm::HkdfSha256Aes256Gcm,
                seal_salt: vec![1; HKDF_SALT_LEN],
                iv: vec![2; IV_LEN],
                ciphertext: vec![3; 32],
                auth_tag: vec![4; TAG_LEN],
            },
            created_at: 0,
        };
        assert!(pair.validate().is_ok());

        let mut bad = pair.clone();
        bad.public_key.truncate(31);
        assert!(bad.validate().is_err());

        let mut bad = pair;
        bad.private_key.seal_salt.clear();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_wrap_version_parse() {
        assert_eq!(WrapVersion::from_u16(2).unwrap(), WrapVersion::V2);
        assert!(WrapVersion::from_u16(9).is_err());
        assert_eq!(
            KeyAlgorithm::parse(KeyAlgorithm::X25519HkdfSha256Aes256Gcm.as_str()).unwrap(),
            KeyAlgorithm::X25519HkdfSha256Aes256Gcm
        );
    }
}
