//! Cryptographic building blocks for key escrow.
//!
//! Provides X25519 key agreement, HKDF-SHA256 key derivation, and detached
//! AES-256-GCM / ChaCha20-Poly1305 authenticated encryption.

use aes_gcm::{
    aead::{generic_array::GenericArray, AeadInPlace, KeyInit},
    Aes256Gcm,
};
use chacha20poly1305::ChaCha20Poly1305;
use hkdf::Hkdf;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use lifeline_core::{HKDF_SALT_LEN, IV_LEN, PUBLIC_KEY_LEN, TAG_LEN};

use crate::error::{EscrowError, Result};

/// An X25519 public key (32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct X25519PublicKey(pub [u8; PUBLIC_KEY_LEN]);

impl X25519PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse from a slice of exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; PUBLIC_KEY_LEN] = bytes.try_into().map_err(|_| {
            EscrowError::InvalidKeyMaterial(format!(
                "public key must be {} bytes, got {}",
                PUBLIC_KEY_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    /// Convert to x25519-dalek PublicKey.
    pub fn to_dalek(&self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl From<PublicKey> for X25519PublicKey {
    fn from(pk: PublicKey) -> Self {
        Self(*pk.as_bytes())
    }
}

/// An X25519 static secret key.
///
/// The grantee's long-lived private key. Never leaves the grantee's client
/// except sealed.
pub struct X25519StaticSecret(StaticSecret);

impl X25519StaticSecret {
    /// Generate a new random secret.
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; 32]);
        rand::thread_rng().fill_bytes(&mut bytes[..]);
        Self(StaticSecret::from(*bytes))
    }

    /// Create from seed bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// Export the secret bytes.
    pub fn to_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.0.to_bytes())
    }

    /// Derive the public key.
    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey::from(PublicKey::from(&self.0))
    }

    /// Perform key agreement with a peer's public key.
    pub fn diffie_hellman(&self, peer_public: &X25519PublicKey) -> SharedKey {
        let shared = self.0.diffie_hellman(&peer_public.to_dalek());
        SharedKey(*shared.as_bytes())
    }
}

/// Ephemeral key pair for one-time key agreement.
pub struct EphemeralKeyPair {
    secret: EphemeralSecret,
    public: X25519PublicKey,
}

impl EphemeralKeyPair {
    /// Generate a new ephemeral key pair.
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(rand::thread_rng());
        let public = X25519PublicKey::from(PublicKey::from(&secret));
        Self { secret, public }
    }

    /// Get the public key.
    pub fn public_key(&self) -> X25519PublicKey {
        self.public
    }

    /// Perform key agreement with a peer's public key.
    ///
    /// Consumes the ephemeral secret (can only be used once).
    pub fn diffie_hellman(self, peer_public: &X25519PublicKey) -> SharedKey {
        let shared = self.secret.diffie_hellman(&peer_public.to_dalek());
        SharedKey(*shared.as_bytes())
    }
}

/// A shared secret derived from X25519 key agreement.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedKey([u8; 32]);

impl SharedKey {
    /// Wrap raw input keying material.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive a symmetric key with HKDF-SHA256.
    pub fn derive_key(&self, salt: &Salt, info: &[u8]) -> Result<SymmetricKey> {
        hkdf_sha256(&self.0, salt, info)
    }

    /// Whether agreement collapsed to the all-zero point (low-order peer key).
    pub fn is_degenerate(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

/// HKDF-SHA256 from arbitrary input keying material.
pub fn hkdf_sha256(ikm: &[u8], salt: &Salt, info: &[u8]) -> Result<SymmetricKey> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt.as_bytes()), ikm);
    let mut okm = [0u8; 32];
    hkdf.expand(info, &mut okm)
        .map_err(|e| EscrowError::KeyDerivationError(e.to_string()))?;
    Ok(SymmetricKey(okm))
}

/// A random HKDF salt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Salt([u8; HKDF_SALT_LEN]);

impl Salt {
    /// Generate a new random salt.
    pub fn generate() -> Self {
        let mut bytes = [0u8; HKDF_SALT_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Parse from a slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; HKDF_SALT_LEN] = bytes
            .try_into()
            .map_err(|_| EscrowError::InvalidKeyMaterial("bad salt length".into()))?;
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; HKDF_SALT_LEN] {
        &self.0
    }
}

/// A 96-bit AEAD nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Iv([u8; IV_LEN]);

impl Iv {
    /// Generate a new random IV.
    pub fn generate() -> Self {
        let mut bytes = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Parse from a slice.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; IV_LEN] = bytes
            .try_into()
            .map_err(|_| EscrowError::InvalidKeyMaterial("bad iv length".into()))?;
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; IV_LEN] {
        &self.0
    }
}

/// AEAD cipher selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cipher {
    Aes256Gcm,
    ChaCha20Poly1305,
}

/// Output of detached encryption.
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LEN],
}

/// A 256-bit symmetric key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; 32]);

impl SymmetricKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encrypt with a detached tag.
    pub fn seal(&self, cipher: Cipher, iv: &Iv, aad: &[u8], plaintext: &[u8]) -> Result<Sealed> {
        let nonce = GenericArray::from_slice(iv.as_bytes());
        let mut buffer = plaintext.to_vec();
        let tag = match cipher {
            Cipher::Aes256Gcm => {
                let aead = Aes256Gcm::new_from_slice(&self.0)
                    .map_err(|e| EscrowError::EncryptionError(e.to_string()))?;
                aead.encrypt_in_place_detached(nonce, aad, &mut buffer)
                    .map_err(|e| EscrowError::EncryptionError(e.to_string()))?
            }
            Cipher::ChaCha20Poly1305 => {
                let aead = ChaCha20Poly1305::new_from_slice(&self.0)
                    .map_err(|e| EscrowError::EncryptionError(e.to_string()))?;
                aead.encrypt_in_place_detached(nonce, aad, &mut buffer)
                    .map_err(|e| EscrowError::EncryptionError(e.to_string()))?
            }
        };
        let mut out = [0u8; TAG_LEN];
        out.copy_from_slice(tag.as_slice());
        Ok(Sealed {
            ciphertext: buffer,
            tag: out,
        })
    }

    /// Decrypt and authenticate. Any mismatch is [`EscrowError::AuthenticationFailed`].
    pub fn open(
        &self,
        cipher: Cipher,
        iv: &Iv,
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        if tag.len() != TAG_LEN {
            return Err(EscrowError::AuthenticationFailed);
        }
        let nonce = GenericArray::from_slice(iv.as_bytes());
        let tag = GenericArray::from_slice(tag);
        let mut buffer = Zeroizing::new(ciphertext.to_vec());
        match cipher {
            Cipher::Aes256Gcm => {
                let aead = Aes256Gcm::new_from_slice(&self.0)
                    .map_err(|_| EscrowError::AuthenticationFailed)?;
                aead.decrypt_in_place_detached(nonce, aad, buffer.as_mut_slice(), tag)
                    .map_err(|_| EscrowError::AuthenticationFailed)?;
            }
            Cipher::ChaCha20Poly1305 => {
                let aead = ChaCha20Poly1305::new_from_slice(&self.0)
                    .map_err(|_| EscrowError::AuthenticationFailed)?;
                aead.decrypt_in_place_detached(nonce, aad, buffer.as_mut_slice(), tag)
                    .map_err(|_| EscrowError::AuthenticationFailed)?;
            }
        }
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_x25519_key_agreement() {
        let alice_secret = X25519StaticSecret::generate();
        let alice_public = alice_secret.public_key();
        let bob_secret = X25519StaticSecret::generate();
        let bob_public = bob_secret.public_key();

        let alice_shared = alice_secret.diffie_hellman(&bob_public);
        let bob_shared = bob_secret.diffie_hellman(&alice_public);

        assert_eq!(alice_shared.as_bytes(), bob_shared.as_bytes());
    }

    #[test]
    fn test_ephemeral_key_agreement() {
        let bob_secret = X25519StaticSecret::generate();
        let bob_public = bob_secret.public_key();

        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_key();
        let alice_shared = ephemeral.diffie_hellman(&bob_public);
        let bob_shared = bob_secret.diffie_hellman(&ephemeral_public);

        assert_eq!(alice_shared.as_bytes(), bob_shared.as_bytes());
    }

    #[test]
    fn test_static_secret_bytes_roundtrip() {
        let secret = X25519StaticSecret::generate();
        let restored = X25519StaticSecret::from_bytes(*secret.to_bytes());
        assert_eq!(secret.public_key(), restored.public_key());
    }

    #[test]
    fn test_seal_open_both_ciphers() {
        let key = SymmetricKey::from_bytes([7; 32]);
        for cipher in [Cipher::Aes256Gcm, Cipher::ChaCha20Poly1305] {
            let iv = Iv::generate();
            let sealed = key.seal(cipher, &iv, b"aad", b"vault key bytes").unwrap();
            assert_ne!(sealed.ciphertext, b"vault key bytes");

            let opened = key
                .open(cipher, &iv, b"aad", &sealed.ciphertext, &sealed.tag)
                .unwrap();
            assert_eq!(opened.as_slice(), b"vault key bytes");
        }
    }

    #[test]
    fn test_open_wrong_key_fails() {
        let key1 = SymmetricKey::from_bytes([1; 32]);
        let key2 = SymmetricKey::from_bytes([2; 32]);
        let iv = Iv::generate();
        let sealed = key1.seal(Cipher::Aes256Gcm, &iv, b"", b"secret").unwrap();

        assert!(matches!(
            key2.open(Cipher::Aes256Gcm, &iv, b"", &sealed.ciphertext, &sealed.tag),
            Err(EscrowError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_open_wrong_aad_fails() {
        let key = SymmetricKey::from_bytes([1; 32]);
        let iv = Iv::generate();
        let sealed = key.seal(Cipher::ChaCha20Poly1305, &iv, b"a", b"secret").unwrap();

        assert!(key
            .open(Cipher::ChaCha20Poly1305, &iv, b"b", &sealed.ciphertext, &sealed.tag)
            .is_err());
    }

    #[test]
    fn test_open_cross_cipher_fails() {
        let key = SymmetricKey::from_bytes([1; 32]);
        let iv = Iv::generate();
        let sealed = key.seal(Cipher::Aes256Gcm, &iv, b"", b"secret").unwrap();

        assert!(key
            .open(Cipher::ChaCha20Poly1305, &iv, b"", &sealed.ciphertext, &sealed.tag)
            .is_err());
    }

    #[test]
    fn test_hkdf_deterministic() {
        let shared = SharedKey::from_bytes([0x42; 32]);
        let salt = Salt::from_slice(&[9; HKDF_SALT_LEN]).unwrap();

        let k1 = shared.derive_key(&salt, b"ctx").unwrap();
        let k2 = shared.derive_key(&salt, b"ctx").unwrap();
        assert_eq!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn test_hkdf_context_and_salt_separate_keys() {
        let shared = SharedKey::from_bytes([0x42; 32]);
        let salt_a = Salt::from_slice(&[1; HKDF_SALT_LEN]).unwrap();
        let salt_b = Salt::from_slice(&[2; HKDF_SALT_LEN]).unwrap();

        let base = shared.derive_key(&salt_a, b"context-a").unwrap();
        let other_info = shared.derive_key(&salt_a, b"context-b").unwrap();
        let other_salt = shared.derive_key(&salt_b, b"context-a").unwrap();

        assert_ne!(base.as_bytes(), other_info.as_bytes());
        assert_ne!(base.as_bytes(), other_salt.as_bytes());
    }

    #[test]
    fn test_public_key_from_slice_checks_length() {
        assert!(X25519PublicKey::from_slice(&[0; 31]).is_err());
        assert!(X25519PublicKey::from_slice(&[0; 32]).is_ok());
    }
}
