//! Owner vault entries as seen by emergency access.
//!
//! Entries belong to the surrounding vault application. Lifeline only passes
//! their ciphertext through to an activated grantee and never opens them.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::UserId;

/// One encrypted vault entry.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedEntry {
    /// Entry identifier, assigned by the vault application.
    pub id: Uuid,
    /// Owner of the entry.
    pub owner_id: UserId,
    /// Encrypted entry body, opaque to the server.
    pub ciphertext: Vec<u8>,
    /// Last modification time (Unix ms).
    pub updated_at: i64,
    /// Soft-deletion time, if deleted.
    pub deleted_at: Option<i64>,
}

impl EncryptedEntry {
    /// Whether the entry is live.
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

impl fmt::Debug for EncryptedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedEntry")
            .field("id", &self.id)
            .field("owner_id", &self.owner_id)
            .field("ciphertext_len", &self.ciphertext.len())
            .field("deleted_at", &self.deleted_at)
            .finish()
    }
}
