//! Store traits: the abstract interface for grant persistence.
//!
//! Implementations include SQLite (primary) and in-memory (for tests). Every
//! status change goes through [`GrantStore::update_grant`], which only writes
//! when the stored record is still the one the caller read.

use async_trait::async_trait;
use lifeline_core::{
    EncryptedEntry, Grant, GrantId, GrantStatus, GranteeKeyPair, TokenHash, UserId,
};

use crate::error::Result;

/// The stored state a conditional update requires.
///
/// The revision makes the guard exact: a grant that left `status` and came
/// back to it since the read no longer matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expected {
    pub status: GrantStatus,
    pub revision: u64,
}

impl Expected {
    /// Expect `grant` exactly as it was read.
    pub fn of(grant: &Grant) -> Self {
        Self {
            status: grant.status,
            revision: grant.revision,
        }
    }
}

/// Result of a conditional update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    /// The record was replaced.
    Updated,
    /// The stored record no longer matched; nothing was written.
    Conflict {
        /// Status now on record, or `None` if the grant is gone.
        current: Option<GrantStatus>,
    },
}

impl UpdateResult {
    /// Whether the write happened.
    pub fn is_updated(&self) -> bool {
        matches!(self, UpdateResult::Updated)
    }
}

/// Async interface for grant and key-pair persistence.
///
/// # Design Notes
///
/// - **Unique tokens**: a token hash maps to at most one grant.
/// - **Conditional writes**: `update_grant` compares the stored status and
///   revision with `expected` and replaces the record atomically, so two racing
///   transitions from the same read cannot both succeed.
/// - **One key pair per grant**: enrollment is written together with the
///   `Pending -> Accepted` transition and can never be replaced.
#[async_trait]
pub trait GrantStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Grant Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a new grant. Fails with `Duplicate` if the id or token hash is taken.
    async fn insert_grant(&self, grant: &Grant) -> Result<()>;

    /// Get a grant by id.
    async fn get_grant(&self, id: &GrantId) -> Result<Option<Grant>>;

    /// Get a grant by the hash of its invitation token.
    async fn get_grant_by_token(&self, token_hash: &TokenHash) -> Result<Option<Grant>>;

    /// Replace the stored grant with `next` if it still matches `expected`.
    async fn update_grant(&self, next: &Grant, expected: Expected) -> Result<UpdateResult>;

    /// Delete a grant and its key pair. Returns whether anything was removed.
    async fn delete_grant(&self, id: &GrantId) -> Result<bool>;

    /// All grants owned by `owner`, oldest first.
    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Grant>>;

    /// All grants where `grantee` is the enrolled grantee, oldest first.
    async fn list_by_grantee(&self, grantee: &UserId) -> Result<Vec<Grant>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Enrollment
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply an acceptance and store the grantee key pair in one step.
    ///
    /// Nothing is written unless the stored status is still `Pending` and no
    /// key pair exists for the grant yet.
    async fn accept_grant(&self, next: &Grant, key_pair: &GranteeKeyPair)
        -> Result<UpdateResult>;

    /// Get the enrolled key pair for a grant.
    async fn get_key_pair(&self, grant_id: &GrantId) -> Result<Option<GranteeKeyPair>>;
}

/// Read access to the owner's encrypted vault entries.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Store or replace an entry.
    async fn put_entry(&self, entry: &EncryptedEntry) -> Result<()>;

    /// All non-deleted entries of `owner`, ordered by id.
    async fn list_live_entries(&self, owner: &UserId) -> Result<Vec<EncryptedEntry>>;
}
