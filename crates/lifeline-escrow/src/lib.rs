//! # Lifeline Escrow
//!
//! Client-side cryptography for emergency access. Nothing in this crate runs
//! on the server: the server only stores the artifacts it produces.
//!
//! ## Encryption Model
//!
//! 1. **Enrollment**: the grantee generates an X25519 key pair and seals the
//!    private key under a secret only they hold ([`GranteeKeyMaterial::seal`]).
//! 2. **Escrow**: the owner wraps their vault key to the grantee's public key
//!    with an ephemeral X25519 agreement, HKDF-SHA256 and an AEAD
//!    ([`wrap_vault_key`]).
//! 3. **Recovery**: once access is activated, the grantee unseals their private
//!    key and unwraps the vault key ([`recover_vault_key`]).
//!
//! ## Usage
//!
//! ```rust
//! use lifeline_core::{UserId, WrapVersion};
//! use lifeline_escrow::{
//!     recover_vault_key, unseal_private_key, wrap_vault_key, EscrowContext,
//!     GranteeKeyMaterial, UnlockSecret, VaultKey, X25519PublicKey,
//! };
//!
//! let owner = UserId::generate();
//! let grantee = UserId::generate();
//!
//! // Grantee enrolls
//! let unlock = UnlockSecret::generate();
//! let enrollment = GranteeKeyMaterial::generate().seal(&unlock).unwrap();
//!
//! // Owner escrows
//! let ctx = EscrowContext::emergency_access(owner, grantee);
//! let recipient = X25519PublicKey::from_slice(&enrollment.public_key).unwrap();
//! let vault_key = VaultKey::from_bytes([7u8; 32]);
//! let artifact = wrap_vault_key(&vault_key, &recipient, &ctx, WrapVersion::V1, 1).unwrap();
//!
//! // Grantee recovers
//! let secret =
//!     unseal_private_key(&enrollment.sealed_private_key, &enrollment.public_key, &unlock).unwrap();
//! assert_eq!(recover_vault_key(&artifact, &secret, &ctx).unwrap(), vault_key);
//! ```

pub mod crypto;
pub mod enrollment;
pub mod error;
pub mod wrap;

pub use crypto::{
    Cipher, EphemeralKeyPair, Iv, Salt, SharedKey, SymmetricKey, X25519PublicKey,
    X25519StaticSecret,
};
pub use enrollment::{unseal_private_key, Enrollment, GranteeKeyMaterial, UnlockSecret};
pub use error::{EscrowError, Result};
pub use wrap::{
    recover_vault_key, wrap_vault_key, EscrowContext, VaultKey, EMERGENCY_ACCESS_PURPOSE,
};
