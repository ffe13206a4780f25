//! Grantee key enrollment.
//!
//! When accepting an invitation, the grantee's client generates an X25519 key
//! pair and seals the private half under an [`UnlockSecret`] that only the
//! grantee holds (typically derived from their own vault credentials). The
//! server stores the sealed bytes and the cleartext public key; it cannot
//! open the seal.

use zeroize::{Zeroize, ZeroizeOnDrop};

use lifeline_core::{SealAlgorithm, SealedPrivateKey};

use crate::crypto::{hkdf_sha256, Cipher, Iv, Salt, X25519PublicKey, X25519StaticSecret};
use crate::error::{EscrowError, Result};

const SEAL_INFO: &[u8] = b"lifeline/grantee-key-seal/v1";

/// The grantee's own secret, unrelated to anything the server holds.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct UnlockSecret([u8; 32]);

impl UnlockSecret {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Generate a random secret.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }
}

/// What a grantee submits when accepting an invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    /// Cleartext public key the owner will escrow to.
    pub public_key: Vec<u8>,
    /// The sealed private key.
    pub sealed_private_key: SealedPrivateKey,
}

/// A freshly generated grantee key pair, held only on the grantee's client.
pub struct GranteeKeyMaterial {
    secret: X25519StaticSecret,
}

impl GranteeKeyMaterial {
    /// Generate a new key pair.
    pub fn generate() -> Self {
        Self {
            secret: X25519StaticSecret::generate(),
        }
    }

    /// Wrap an existing secret.
    pub fn from_secret(secret: X25519StaticSecret) -> Self {
        Self { secret }
    }

    /// The public half.
    pub fn public_key(&self) -> X25519PublicKey {
        self.secret.public_key()
    }

    /// The private half.
    pub fn secret(&self) -> &X25519StaticSecret {
        &self.secret
    }

    /// Seal the private key under `unlock` and produce the enrollment submission.
    pub fn seal(&self, unlock: &UnlockSecret) -> Result<Enrollment> {
        let public_key = self.public_key();
        let salt = Salt::generate();
        let key = hkdf_sha256(&unlock.0, &salt, SEAL_INFO)?;
        let iv = Iv::generate();
        let secret_bytes = self.secret.to_bytes();

        let sealed = key.seal(
            Cipher::Aes256Gcm,
            &iv,
            public_key.as_bytes(),
            secret_bytes.as_slice(),
        )?;

        Ok(Enrollment {
            public_key: public_key.as_bytes().to_vec(),
            sealed_private_key: SealedPrivateKey {
                seal_algorithm: SealAlgorithm::HkdfSha256Aes256Gcm,
                seal_salt: salt.as_bytes().to_vec(),
                iv: iv.as_bytes().to_vec(),
                ciphertext: sealed.ciphertext,
                auth_tag: sealed.tag.to_vec(),
            },
        })
    }
}

/// Open a sealed private key and check it matches `public_key`.
pub fn unseal_private_key(
    sealed: &SealedPrivateKey,
    public_key: &[u8],
    unlock: &UnlockSecret,
) -> Result<X25519StaticSecret> {
    sealed.validate()?;
    match sealed.seal_algorithm {
        SealAlgorithm::HkdfSha256Aes256Gcm => {
            let salt = Salt::from_slice(&sealed.seal_salt)?;
            let key = hkdf_sha256(&unlock.0, &salt, SEAL_INFO)?;
            let iv = Iv::from_slice(&sealed.iv)?;
            let plaintext = key.open(
                Cipher::Aes256Gcm,
                &iv,
                public_key,
                &sealed.ciphertext,
                &sealed.auth_tag,
            )?;

            let bytes: [u8; 32] = plaintext.as_slice().try_into().map_err(|_| {
                EscrowError::InvalidKeyMaterial("sealed private key has wrong length".into())
            })?;
            let secret = X25519StaticSecret::from_bytes(bytes);
            if secret.public_key().as_bytes().as_slice() != public_key {
                return Err(EscrowError::InvalidKeyMaterial(
                    "private key does not match enrolled public key".into(),
                ));
            }
            Ok(secret)
        }
    }
}
