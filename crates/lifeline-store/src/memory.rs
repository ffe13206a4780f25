//! In-memory implementation of the store traits.
//!
//! Primarily for testing. Same semantics as SQLite but nothing persists.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use uuid::Uuid;

use lifeline_core::{
    EncryptedEntry, Grant, GrantId, GrantStatus, GranteeKeyPair, TokenHash, UserId,
};

use crate::error::{Result, StoreError};
use crate::traits::{EntryStore, Expected, GrantStore, UpdateResult};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock; every
/// conditional update holds the write lock for its compare and its write.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Grants indexed by id.
    grants: HashMap<GrantId, Grant>,

    /// Token index: token hash -> grant id.
    tokens: HashMap<TokenHash, GrantId>,

    /// Enrolled key pairs.
    key_pairs: HashMap<GrantId, GranteeKeyPair>,

    /// Vault entries, ordered by id.
    entries: BTreeMap<Uuid, EncryptedEntry>,
}

impl MemoryStoreInner {
    /// `None` when the stored grant matches; `revision` is skipped when absent.
    fn compare(
        &self,
        id: &GrantId,
        status: GrantStatus,
        revision: Option<u64>,
    ) -> Option<UpdateResult> {
        match self.grants.get(id) {
            Some(current)
                if current.status == status
                    && revision.map_or(true, |r| r == current.revision) =>
            {
                None
            }
            Some(current) => Some(UpdateResult::Conflict {
                current: Some(current.status),
            }),
            None => Some(UpdateResult::Conflict { current: None }),
        }
    }

    fn ordered(&self, keep: impl Fn(&Grant) -> bool) -> Vec<Grant> {
        let mut grants: Vec<Grant> = self.grants.values().filter(|g| keep(*g)).cloned().collect();
        grants.sort_by_key(|g| (g.created_at, g.id));
        grants
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GrantStore for MemoryStore {
    async fn insert_grant(&self, grant: &Grant) -> Result<()> {
        let mut inner = self.write()?;

        if inner.grants.contains_key(&grant.id) {
            return Err(StoreError::Duplicate(grant.id.to_string()));
        }
        if inner.tokens.contains_key(&grant.token_hash) {
            return Err(StoreError::Duplicate("token hash".into()));
        }

        inner.tokens.insert(grant.token_hash, grant.id);
        inner.grants.insert(grant.id, grant.clone());
        Ok(())
    }

    async fn get_grant(&self, id: &GrantId) -> Result<Option<Grant>> {
        let inner = self.read()?;
        Ok(inner.grants.get(id).cloned())
    }

    async fn get_grant_by_token(&self, token_hash: &TokenHash) -> Result<Option<Grant>> {
        let inner = self.read()?;
        Ok(inner
            .tokens
            .get(token_hash)
            .and_then(|id| inner.grants.get(id))
            .cloned())
    }

    async fn update_grant(&self, next: &Grant, expected: Expected) -> Result<UpdateResult> {
        let mut inner = self.write()?;

        if let Some(conflict) = inner.compare(&next.id, expected.status, Some(expected.revision)) {
            return Ok(conflict);
        }

        inner.grants.insert(next.id, next.clone());
        Ok(UpdateResult::Updated)
    }

    async fn delete_grant(&self, id: &GrantId) -> Result<bool> {
        let mut inner = self.write()?;

        inner.key_pairs.remove(id);
        match inner.grants.remove(id) {
            Some(grant) => {
                inner.tokens.remove(&grant.token_hash);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Grant>> {
        let inner = self.read()?;
        Ok(inner.ordered(|g| g.is_owner(owner)))
    }

    async fn list_by_grantee(&self, grantee: &UserId) -> Result<Vec<Grant>> {
        let inner = self.read()?;
        Ok(inner.ordered(|g| g.is_grantee(grantee)))
    }

    async fn accept_grant(
        &self,
        next: &Grant,
        key_pair: &GranteeKeyPair,
    ) -> Result<UpdateResult> {
        let mut inner = self.write()?;

        if let Some(conflict) = inner.compare(&next.id, GrantStatus::Pending, None) {
            return Ok(conflict);
        }
        if inner.key_pairs.contains_key(&next.id) {
            return Err(StoreError::KeyPairExists(next.id.to_string()));
        }

        inner.key_pairs.insert(next.id, key_pair.clone());
        inner.grants.insert(next.id, next.clone());
        Ok(UpdateResult::Updated)
    }

    async fn get_key_pair(&self, grant_id: &GrantId) -> Result<Option<GranteeKeyPair>> {
        let inner = self.read()?;
        Ok(inner.key_pairs.get(grant_id).cloned())
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn put_entry(&self, entry: &EncryptedEntry) -> Result<()> {
        let mut inner = self.write()?;
        inner.entries.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn list_live_entries(&self, owner: &UserId) -> Result<Vec<EncryptedEntry>> {
        let inner = self.read()?;
        Ok(inner
            .entries
            .values()
            .filter(|e| &e.owner_id == owner && e.is_live())
            .cloned()
            .collect())
    }
}
