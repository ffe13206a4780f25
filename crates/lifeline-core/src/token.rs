//! Single-use invitation bearer tokens.
//!
//! The plaintext token is handed to the owner exactly once, at invitation
//! time. Only its Blake3 digest is ever persisted, so a leaked grant table
//! cannot be used to redeem invitations.

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CoreError, Result};

/// Domain separation context for token hashing.
const TOKEN_HASH_CONTEXT: &str = "lifeline 2024 invitation-token v1";

/// Byte length of a token before hex encoding.
pub const TOKEN_LEN: usize = 32;

/// A plaintext invitation token.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct InvitationToken([u8; TOKEN_LEN]);

impl InvitationToken {
    /// Generate a fresh random token.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Parse the hex form a grantee presents.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim()).map_err(|_| CoreError::MalformedToken)?;
        let arr: [u8; TOKEN_LEN] = bytes.try_into().map_err(|_| CoreError::MalformedToken)?;
        Ok(Self(arr))
    }

    /// The hex form handed to the owner.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Compute the digest that is persisted in place of the token.
    pub fn hash(&self) -> TokenHash {
        let mut hasher = blake3::Hasher::new_derive_key(TOKEN_HASH_CONTEXT);
        hasher.update(&self.0);
        TokenHash(*hasher.finalize().as_bytes())
    }
}

impl fmt::Debug for InvitationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InvitationToken(<redacted>)")
    }
}

/// One-way digest of an invitation token.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenHash(pub [u8; 32]);

impl TokenHash {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenHash({})", &self.to_hex()[..16])
    }
}

impl TryFrom<&[u8]> for TokenHash {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> std::result::Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}
