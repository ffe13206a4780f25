//! Values handed to clients by the disclosure and escrow-target reads.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::grant::{EscrowArtifact, GranteeKeyPair};
use crate::ids::{GrantId, UserId};

/// Everything an activated grantee needs to recover the owner's vault key.
///
/// The server assembles this from stored bytes and never opens any of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowBundle {
    pub grant_id: GrantId,
    pub owner_id: UserId,
    pub grantee_id: UserId,
    /// When the grant became active (Unix ms).
    pub activated_at: i64,
    /// The wrapped vault key, verbatim.
    pub artifact: EscrowArtifact,
    /// The grantee's enrolled key pair, private half still sealed.
    pub key_pair: GranteeKeyPair,
}

impl EscrowBundle {
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

/// The enrolled public key an owner escrows to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTarget {
    pub grant_id: GrantId,
    pub grantee_id: UserId,
    pub public_key: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::{KeyAlgorithm, SealAlgorithm, SealedPrivateKey, WrapVersion};

    #[test]
    fn test_bundle_cbor_is_deterministic() {
        let grant_id = GrantId::from_bytes([1; 16]);
        let bundle = EscrowBundle {
            grant_id,
            owner_id: UserId::from_bytes([2; 16]),
            grantee_id: UserId::from_bytes([3; 16]),
            activated_at: 42,
            artifact: EscrowArtifact {
                wrap_version: WrapVersion::V1,
                key_algorithm: KeyAlgorithm::X25519HkdfSha256Aes256Gcm,
                key_version: 1,
                ephemeral_public_key: vec![4; 32],
                hkdf_salt: vec![5; 32],
                iv: vec![6; 12],
                ciphertext: vec![7; 32],
                auth_tag: vec![8; 16],
            },
            key_pair: GranteeKeyPair {
                grant_id,
                public_key: vec![9; 32],
                private_key: SealedPrivateKey {
                    seal_algorithm: SealAlgorithm::HkdfSha256Aes256Gcm,
                    seal_salt: vec![10; 32],
                    iv: vec![11; 12],
                    ciphertext: vec![12; 32],
                    auth_tag: vec![13; 16],
                },
                created_at: 7,
            },
        };

        let bytes = bundle.to_bytes().unwrap();
        assert_eq!(bytes, bundle.to_bytes().unwrap());
        assert_eq!(EscrowBundle::from_bytes(&bytes).unwrap(), bundle);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            EscrowBundle::from_bytes(&[0xff, 0x00, 0x13]),
            Err(CoreError::DecodingError(_))
        ));
    }
}
