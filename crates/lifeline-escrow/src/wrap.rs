//! Wrapping the owner's vault key for a grantee.
//!
//! The owner's client runs [`wrap_vault_key`]: a fresh ephemeral X25519 key
//! agrees with the grantee's enrolled public key, HKDF-SHA256 turns the shared
//! secret into a wrapping key bound to `(owner, grantee, purpose)`, and an AEAD
//! seals the vault key. The resulting [`EscrowArtifact`] is opaque to the
//! server.
//!
//! After activation the grantee's client runs [`recover_vault_key`] with its
//! unsealed private key. Recovery dispatches on the artifact's version markers
//! and refuses anything it does not recognize.

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use lifeline_core::{EscrowArtifact, KeyAlgorithm, UserId, WrapVersion};

use crate::crypto::{
    Cipher, EphemeralKeyPair, Iv, Salt, SharedKey, X25519PublicKey, X25519StaticSecret,
};
use crate::error::{EscrowError, Result};

/// Purpose label for emergency-access escrow.
pub const EMERGENCY_ACCESS_PURPOSE: &str = "emergency-access/vault-key";

/// The owner's vault-decryption secret key.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct VaultKey(Vec<u8>);

impl VaultKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VaultKey({} bytes)", self.0.len())
    }
}

/// Binds a wrapping key to one owner, one grantee, and one purpose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowContext {
    pub owner_id: UserId,
    pub grantee_id: UserId,
    pub purpose: String,
}

impl EscrowContext {
    /// Context for emergency-access escrow between two users.
    pub fn emergency_access(owner_id: UserId, grantee_id: UserId) -> Self {
        Self {
            owner_id,
            grantee_id,
            purpose: EMERGENCY_ACCESS_PURPOSE.to_string(),
        }
    }

    /// HKDF info string. Length-prefixed so no two contexts collide.
    fn info(&self, version: WrapVersion) -> Vec<u8> {
        let mut info = Vec::with_capacity(64 + self.purpose.len());
        info.extend_from_slice(format!("lifeline/escrow/v{}", version.as_u16()).as_bytes());
        for part in [
            self.owner_id.as_bytes().as_slice(),
            self.grantee_id.as_bytes().as_slice(),
            self.purpose.as_bytes(),
        ] {
            info.extend_from_slice(&(part.len() as u32).to_be_bytes());
            info.extend_from_slice(part);
        }
        info
    }

    /// Associated data authenticated alongside the ciphertext.
    fn aad(&self, version: WrapVersion, key_version: u32) -> Vec<u8> {
        let mut aad = self.info(version);
        aad.extend_from_slice(&key_version.to_be_bytes());
        aad
    }
}

fn cipher_for(version: WrapVersion, algorithm: KeyAlgorithm) -> Result<Cipher> {
    match (version, algorithm) {
        (WrapVersion::V1, KeyAlgorithm::X25519HkdfSha256Aes256Gcm) => Ok(Cipher::Aes256Gcm),
        (WrapVersion::V2, KeyAlgorithm::X25519HkdfSha256ChaCha20Poly1305) => {
            Ok(Cipher::ChaCha20Poly1305)
        }
        (version, algorithm) => Err(EscrowError::UnsupportedFormat(format!(
            "wrap version {} with {}",
            version.as_u16(),
            algorithm
        ))),
    }
}

fn agree(shared: SharedKey) -> Result<SharedKey> {
    if shared.is_degenerate() {
        return Err(EscrowError::InvalidKeyMaterial(
            "key agreement produced a degenerate secret".into(),
        ));
    }
    Ok(shared)
}

/// Owner side: wrap `vault_key` for the grantee holding `recipient`.
pub fn wrap_vault_key(
    vault_key: &VaultKey,
    recipient: &X25519PublicKey,
    context: &EscrowContext,
    version: WrapVersion,
    key_version: u32,
) -> Result<EscrowArtifact> {
    if vault_key.as_bytes().is_empty() {
        return Err(EscrowError::InvalidKeyMaterial("empty vault key".into()));
    }
    let algorithm = version.algorithm();
    let cipher = cipher_for(version, algorithm)?;

    let ephemeral = EphemeralKeyPair::generate();
    let ephemeral_public = ephemeral.public_key();
    let shared = agree(ephemeral.diffie_hellman(recipient))?;

    let salt = Salt::generate();
    let wrap_key = shared.derive_key(&salt, &context.info(version))?;

    let iv = Iv::generate();
    let sealed = wrap_key.seal(
        cipher,
        &iv,
        &context.aad(version, key_version),
        vault_key.as_bytes(),
    )?;

    Ok(EscrowArtifact {
        wrap_version: version,
        key_algorithm: algorithm,
        key_version,
        ephemeral_public_key: ephemeral_public.as_bytes().to_vec(),
        hkdf_salt: salt.as_bytes().to_vec(),
        iv: iv.as_bytes().to_vec(),
        ciphertext: sealed.ciphertext,
        auth_tag: sealed.tag.to_vec(),
    })
}

/// Grantee side: recover the vault key from an escrow artifact.
///
/// Fails with [`EscrowError::AuthenticationFailed`] for any private key other
/// than the one the artifact was wrapped to.
pub fn recover_vault_key(
    artifact: &EscrowArtifact,
    recipient_secret: &X25519StaticSecret,
    context: &EscrowContext,
) -> Result<VaultKey> {
    artifact.validate()?;
    let cipher = cipher_for(artifact.wrap_version, artifact.key_algorithm)?;

    match artifact.wrap_version {
        WrapVersion::V1 | WrapVersion::V2 => {
            let ephemeral_public = X25519PublicKey::from_slice(&artifact.ephemeral_public_key)?;
            let shared = agree(recipient_secret.diffie_hellman(&ephemeral_public))?;

            let salt = Salt::from_slice(&artifact.hkdf_salt)?;
            let wrap_key = shared.derive_key(&salt, &context.info(artifact.wrap_version))?;

            let iv = Iv::from_slice(&artifact.iv)?;
            let plaintext: Zeroizing<Vec<u8>> = wrap_key.open(
                cipher,
                &iv,
                &context.aad(artifact.wrap_version, artifact.key_version),
                &artifact.ciphertext,
                &artifact.auth_tag,
            )?;
            Ok(VaultKey::from_bytes(plaintext.as_slice()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn setup() -> (X25519StaticSecret, EscrowContext) {
        (
            X25519StaticSecret::generate(),
            EscrowContext::emergency_access(UserId::generate(), UserId::generate()),
        )
    }

    #[test]
    fn test_wrap_recover_roundtrip_all_versions() {
        let (grantee, ctx) = setup();
        let vault_key = VaultKey::from_bytes([0x5a; 32]);

        for version in [WrapVersion::V1, WrapVersion::V2] {
            let artifact =
                wrap_vault_key(&vault_key, &grantee.public_key(), &ctx, version, 3).unwrap();
            assert!(artifact.validate().is_ok());
            assert_eq!(artifact.key_algorithm, version.algorithm());

            let recovered = recover_vault_key(&artifact, &grantee, &ctx).unwrap();
            assert_eq!(recovered, vault_key);
        }
    }

    #[test]
    fn test_wrong_private_key_fails_authentication() {
        let (grantee, ctx) = setup();
        let intruder = X25519StaticSecret::generate();
        let vault_key = VaultKey::from_bytes(b"owner vault key".to_vec());
        let artifact =
            wrap_vault_key(&vault_key, &grantee.public_key(), &ctx, WrapVersion::V1, 1).unwrap();

        assert!(matches!(
            recover_vault_key(&artifact, &intruder, &ctx),
            Err(EscrowError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_context_binding() {
        let (grantee, ctx) = setup();
        let vault_key = VaultKey::from_bytes([1; 32]);
        let artifact =
            wrap_vault_key(&vault_key, &grantee.public_key(), &ctx, WrapVersion::V2, 1).unwrap();

        let mut swapped = ctx.clone();
        std::mem::swap(&mut swapped.owner_id, &mut swapped.grantee_id);
        assert!(recover_vault_key(&artifact, &grantee, &swapped).is_err());

        let mut other_purpose = ctx.clone();
        other_purpose.purpose = "sharing".into();
        assert!(recover_vault_key(&artifact, &grantee, &other_purpose).is_err());
    }

    #[test]
    fn test_tampered_fields_fail() {
        let (grantee, ctx) = setup();
        let vault_key = VaultKey::from_bytes([1; 32]);
        let artifact =
            wrap_vault_key(&vault_key, &grantee.public_key(), &ctx, WrapVersion::V1, 1).unwrap();

        let mut bad = artifact.clone();
        bad.ciphertext[0] ^= 1;
        assert!(recover_vault_key(&bad, &grantee, &ctx).is_err());

        let mut bad = artifact.clone();
        bad.key_version = 2;
        assert!(recover_vault_key(&bad, &grantee, &ctx).is_err());

        let mut bad = artifact;
        bad.hkdf_salt[0] ^= 1;
        assert!(recover_vault_key(&bad, &grantee, &ctx).is_err());
    }

    #[test]
    fn test_mismatched_markers_rejected() {
        let (grantee, ctx) = setup();
        let vault_key = VaultKey::from_bytes([1; 32]);
        let mut artifact =
            wrap_vault_key(&vault_key, &grantee.public_key(), &ctx, WrapVersion::V1, 1).unwrap();
        artifact.wrap_version = WrapVersion::V2;

        assert!(recover_vault_key(&artifact, &grantee, &ctx).is_err());
    }

    #[test]
    fn test_empty_vault_key_rejected() {
        let (grantee, ctx) = setup();
        let empty = VaultKey::from_bytes(Vec::new());
        assert!(wrap_vault_key(&empty, &grantee.public_key(), &ctx, WrapVersion::V1, 1).is_err());
    }

    #[test]
    fn test_low_order_recipient_rejected() {
        let (_, ctx) = setup();
        let zero = X25519PublicKey::from_bytes([0; 32]);
        let vault_key = VaultKey::from_bytes([1; 32]);
        assert!(wrap_vault_key(&vault_key, &zero, &ctx, WrapVersion::V1, 1).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_roundtrip_arbitrary_keys(
            seed in any::<[u8; 32]>(),
            key in prop::collection::vec(any::<u8>(), 1..128),
            v2 in any::<bool>(),
        ) {
            let grantee = X25519StaticSecret::from_bytes(seed);
            let ctx = EscrowContext::emergency_access(UserId::from_bytes([1; 16]), UserId::from_bytes([2; 16]));
            let version = if v2 { WrapVersion::V2 } else { WrapVersion::V1 };
            let vault_key = VaultKey::from_bytes(key);

            let artifact = wrap_vault_key(&vault_key, &grantee.public_key(), &ctx, version, 1).unwrap();
            let recovered = recover_vault_key(&artifact, &grantee, &ctx).unwrap();
            prop_assert_eq!(recovered.as_bytes(), vault_key.as_bytes());
        }
    }
}
