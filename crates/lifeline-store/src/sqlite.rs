//! SQLite implementation of the store traits.
//!
//! This is the primary storage backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via `tokio::task::spawn_blocking`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, Transaction};
use uuid::Uuid;

use lifeline_core::{
    EncryptedEntry, EscrowArtifact, Grant, GrantId, GrantStatus, GranteeKeyPair, KeyAlgorithm,
    SealAlgorithm, SealedPrivateKey, TokenHash, UserId, WrapVersion,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{EntryStore, Expected, GrantStore, UpdateResult};

const GRANT_COLUMNS: &str = "id, owner_id, grantee_id, grantee_email, status, wait_days, \
     requested_at, wait_expires_at, activated_at, token_hash, token_expires_at, \
     ephemeral_public_key, encrypted_vault_key, vault_key_iv, vault_key_auth_tag, hkdf_salt, \
     wrap_version, key_version, key_algorithm, created_at, updated_at, revision";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

/// Raw column values, decoded into a [`Grant`] outside the rusqlite callback.
struct GrantRow {
    id: Vec<u8>,
    owner_id: Vec<u8>,
    grantee_id: Option<Vec<u8>>,
    grantee_email: String,
    status: String,
    wait_days: u32,
    requested_at: Option<i64>,
    wait_expires_at: Option<i64>,
    activated_at: Option<i64>,
    token_hash: Vec<u8>,
    token_expires_at: i64,
    ephemeral_public_key: Option<Vec<u8>>,
    encrypted_vault_key: Option<Vec<u8>>,
    vault_key_iv: Option<Vec<u8>>,
    vault_key_auth_tag: Option<Vec<u8>>,
    hkdf_salt: Option<Vec<u8>>,
    wrap_version: Option<u16>,
    key_version: Option<u32>,
    key_algorithm: Option<String>,
    created_at: i64,
    updated_at: i64,
    revision: u64,
}

impl GrantRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            owner_id: row.get("owner_id")?,
            grantee_id: row.get("grantee_id")?,
            grantee_email: row.get("grantee_email")?,
            status: row.get("status")?,
            wait_days: row.get("wait_days")?,
            requested_at: row.get("requested_at")?,
            wait_expires_at: row.get("wait_expires_at")?,
            activated_at: row.get("activated_at")?,
            token_hash: row.get("token_hash")?,
            token_expires_at: row.get("token_expires_at")?,
            ephemeral_public_key: row.get("ephemeral_public_key")?,
            encrypted_vault_key: row.get("encrypted_vault_key")?,
            vault_key_iv: row.get("vault_key_iv")?,
            vault_key_auth_tag: row.get("vault_key_auth_tag")?,
            hkdf_salt: row.get("hkdf_salt")?,
            wrap_version: row.get("wrap_version")?,
            key_version: row.get("key_version")?,
            key_algorithm: row.get("key_algorithm")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            revision: row.get("revision")?,
        })
    }

    fn into_grant(self) -> Result<Grant> {
        let escrow = match (
            self.ephemeral_public_key,
            self.encrypted_vault_key,
            self.vault_key_iv,
            self.vault_key_auth_tag,
            self.hkdf_salt,
            self.wrap_version,
            self.key_version,
            self.key_algorithm,
        ) {
            (
                Some(ephemeral_public_key),
                Some(ciphertext),
                Some(iv),
                Some(auth_tag),
                Some(hkdf_salt),
                Some(wrap_version),
                Some(key_version),
                Some(key_algorithm),
            ) => Some(EscrowArtifact {
                wrap_version: WrapVersion::from_u16(wrap_version)?,
                key_algorithm: KeyAlgorithm::parse(&key_algorithm)?,
                key_version,
                ephemeral_public_key,
                hkdf_salt,
                iv,
                ciphertext,
                auth_tag,
            }),
            (None, None, None, None, None, None, None, None) => None,
            _ => {
                return Err(StoreError::InvalidData(
                    "partially populated escrow columns".into(),
                ))
            }
        };

        Ok(Grant {
            id: GrantId::from_bytes(array(self.id, "id")?),
            owner_id: UserId::from_bytes(array(self.owner_id, "owner_id")?),
            grantee_id: self
                .grantee_id
                .map(|b| array(b, "grantee_id").map(UserId::from_bytes))
                .transpose()?,
            grantee_email: self.grantee_email,
            status: self.status.parse()?,
            wait_days: self.wait_days,
            requested_at: self.requested_at,
            wait_expires_at: self.wait_expires_at,
            activated_at: self.activated_at,
            token_hash: TokenHash::from_bytes(array(self.token_hash, "token_hash")?),
            token_expires_at: self.token_expires_at,
            escrow,
            created_at: self.created_at,
            updated_at: self.updated_at,
            revision: self.revision,
        })
    }
}

fn array<const N: usize>(bytes: Vec<u8>, field: &str) -> Result<[u8; N]> {
    bytes.try_into().map_err(|b: Vec<u8>| {
        StoreError::InvalidData(format!("{}: expected {} bytes, got {}", field, N, b.len()))
    })
}

fn query_grants(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Grant>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, GrantRow::read)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(GrantRow::into_grant).collect()
}

fn query_grant(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Option<Grant>> {
    conn.query_row(sql, params, GrantRow::read)
        .optional()?
        .map(GrantRow::into_grant)
        .transpose()
}

type KeyPairRow = (Vec<u8>, Vec<u8>, String, SealedBytes, i64);

fn read_key_pair(row: &Row<'_>) -> rusqlite::Result<KeyPairRow> {
    Ok((
        row.get("grant_id")?,
        row.get("public_key")?,
        row.get("seal_algorithm")?,
        SealedBytes {
            seal_salt: row.get("seal_salt")?,
            iv: row.get("private_key_iv")?,
            ciphertext: row.get("encrypted_private_key")?,
            auth_tag: row.get("private_key_auth_tag")?,
        },
        row.get("created_at")?,
    ))
}

struct SealedBytes {
    seal_salt: Vec<u8>,
    iv: Vec<u8>,
    ciphertext: Vec<u8>,
    auth_tag: Vec<u8>,
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

/// Conditional write of every mutable grant column.
///
/// Matches on `status`, and on `revision` when one is given.
fn write_if_current(
    conn: &Connection,
    next: &Grant,
    status: GrantStatus,
    revision: Option<u64>,
) -> Result<UpdateResult> {
    let escrow = next.escrow.as_ref();
    let changed = conn.execute(
        "UPDATE grants SET
            grantee_id = ?1, status = ?2, requested_at = ?3, wait_expires_at = ?4,
            activated_at = ?5, ephemeral_public_key = ?6, encrypted_vault_key = ?7,
            vault_key_iv = ?8, vault_key_auth_tag = ?9, hkdf_salt = ?10, wrap_version = ?11,
            key_version = ?12, key_algorithm = ?13, updated_at = ?14, revision = ?15
         WHERE id = ?16 AND status = ?17 AND (?18 IS NULL OR revision = ?18)",
        params![
            next.grantee_id.as_ref().map(|g| g.as_bytes().as_slice()),
            next.status.as_str(),
            next.requested_at,
            next.wait_expires_at,
            next.activated_at,
            escrow.map(|a| a.ephemeral_public_key.as_slice()),
            escrow.map(|a| a.ciphertext.as_slice()),
            escrow.map(|a| a.iv.as_slice()),
            escrow.map(|a| a.auth_tag.as_slice()),
            escrow.map(|a| a.hkdf_salt.as_slice()),
            escrow.map(|a| a.wrap_version.as_u16()),
            escrow.map(|a| a.key_version),
            escrow.map(|a| a.key_algorithm.as_str()),
            next.updated_at,
            next.revision,
            next.id.as_bytes().as_slice(),
            status.as_str(),
            revision,
        ],
    )?;

    if changed == 1 {
        return Ok(UpdateResult::Updated);
    }

    let current: Option<String> = conn
        .query_row(
            "SELECT status FROM grants WHERE id = ?1",
            params![next.id.as_bytes().as_slice()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(UpdateResult::Conflict {
        current: current.map(|s| s.parse::<GrantStatus>()).transpose()?,
    })
}

fn insert_key_pair(tx: &Transaction<'_>, key_pair: &GranteeKeyPair) -> Result<()> {
    let sealed = &key_pair.private_key;
    tx.execute(
        "INSERT INTO grantee_key_pairs (
            grant_id, public_key, seal_algorithm, seal_salt, encrypted_private_key,
            private_key_iv, private_key_auth_tag, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            key_pair.grant_id.as_bytes().as_slice(),
            key_pair.public_key,
            sealed.seal_algorithm.as_str(),
            sealed.seal_salt,
            sealed.ciphertext,
            sealed.iv,
            sealed.auth_tag,
            key_pair.created_at,
        ],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            StoreError::KeyPairExists(key_pair.grant_id.to_string())
        } else {
            StoreError::Database(e)
        }
    })?;
    Ok(())
}

#[async_trait]
impl GrantStore for SqliteStore {
    async fn insert_grant(&self, grant: &Grant) -> Result<()> {
        let grant = grant.clone();
        self.blocking(move |conn| {
            let escrow = grant.escrow.as_ref();
            conn.execute(
                &format!(
                    "INSERT INTO grants ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, \
                     ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
                    GRANT_COLUMNS
                ),
                params![
                    grant.id.as_bytes().as_slice(),
                    grant.owner_id.as_bytes().as_slice(),
                    grant.grantee_id.as_ref().map(|g| g.as_bytes().as_slice()),
                    grant.grantee_email,
                    grant.status.as_str(),
                    grant.wait_days,
                    grant.requested_at,
                    grant.wait_expires_at,
                    grant.activated_at,
                    grant.token_hash.as_bytes().as_slice(),
                    grant.token_expires_at,
                    escrow.map(|a| a.ephemeral_public_key.as_slice()),
                    escrow.map(|a| a.ciphertext.as_slice()),
                    escrow.map(|a| a.iv.as_slice()),
                    escrow.map(|a| a.auth_tag.as_slice()),
                    escrow.map(|a| a.hkdf_salt.as_slice()),
                    escrow.map(|a| a.wrap_version.as_u16()),
                    escrow.map(|a| a.key_version),
                    escrow.map(|a| a.key_algorithm.as_str()),
                    grant.created_at,
                    grant.updated_at,
                    grant.revision,
                ],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    StoreError::Duplicate(grant.id.to_string())
                } else {
                    StoreError::Database(e)
                }
            })?;
            Ok(())
        })
        .await
    }

    async fn get_grant(&self, id: &GrantId) -> Result<Option<Grant>> {
        let id = *id;
        self.blocking(move |conn| {
            query_grant(
                conn,
                &format!("SELECT {} FROM grants WHERE id = ?1", GRANT_COLUMNS),
                params![id.as_bytes().as_slice()],
            )
        })
        .await
    }

    async fn get_grant_by_token(&self, token_hash: &TokenHash) -> Result<Option<Grant>> {
        let token_hash = *token_hash;
        self.blocking(move |conn| {
            query_grant(
                conn,
                &format!("SELECT {} FROM grants WHERE token_hash = ?1", GRANT_COLUMNS),
                params![token_hash.as_bytes().as_slice()],
            )
        })
        .await
    }

    async fn update_grant(&self, next: &Grant, expected: Expected) -> Result<UpdateResult> {
        let next = next.clone();
        self.blocking(move |conn| {
            write_if_current(conn, &next, expected.status, Some(expected.revision))
        })
        .await
    }

    async fn delete_grant(&self, id: &GrantId) -> Result<bool> {
        let id = *id;
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM grantee_key_pairs WHERE grant_id = ?1",
                params![id.as_bytes().as_slice()],
            )?;
            let removed = tx.execute(
                "DELETE FROM grants WHERE id = ?1",
                params![id.as_bytes().as_slice()],
            )?;
            tx.commit()?;
            Ok(removed > 0)
        })
        .await
    }

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Grant>> {
        let owner = *owner;
        self.blocking(move |conn| {
            query_grants(
                conn,
                &format!(
                    "SELECT {} FROM grants WHERE owner_id = ?1 ORDER BY created_at, id",
                    GRANT_COLUMNS
                ),
                params![owner.as_bytes().as_slice()],
            )
        })
        .await
    }

    async fn list_by_grantee(&self, grantee: &UserId) -> Result<Vec<Grant>> {
        let grantee = *grantee;
        self.blocking(move |conn| {
            query_grants(
                conn,
                &format!(
                    "SELECT {} FROM grants WHERE grantee_id = ?1 ORDER BY created_at, id",
                    GRANT_COLUMNS
                ),
                params![grantee.as_bytes().as_slice()],
            )
        })
        .await
    }

    async fn accept_grant(
        &self,
        next: &Grant,
        key_pair: &GranteeKeyPair,
    ) -> Result<UpdateResult> {
        let next = next.clone();
        let key_pair = key_pair.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let result = write_if_current(&tx, &next, GrantStatus::Pending, None)?;
            if !result.is_updated() {
                return Ok(result);
            }
            insert_key_pair(&tx, &key_pair)?;
            tx.commit()?;
            Ok(UpdateResult::Updated)
        })
        .await
    }

    async fn get_key_pair(&self, grant_id: &GrantId) -> Result<Option<GranteeKeyPair>> {
        let grant_id = *grant_id;
        self.blocking(move |conn| {
            let row = conn
                .query_row(
                    "SELECT grant_id, public_key, seal_algorithm, seal_salt, encrypted_private_key,
                            private_key_iv, private_key_auth_tag, created_at
                     FROM grantee_key_pairs WHERE grant_id = ?1",
                    params![grant_id.as_bytes().as_slice()],
                    read_key_pair,
                )
                .optional()?;

            row.map(|(id, public_key, seal_algorithm, sealed, created_at)| {
                Ok(GranteeKeyPair {
                    grant_id: GrantId::from_bytes(array(id, "grant_id")?),
                    public_key,
                    private_key: SealedPrivateKey {
                        seal_algorithm: SealAlgorithm::parse(&seal_algorithm)?,
                        seal_salt: sealed.seal_salt,
                        iv: sealed.iv,
                        ciphertext: sealed.ciphertext,
                        auth_tag: sealed.auth_tag,
                    },
                    created_at,
                })
            })
            .transpose()
        })
        .await
    }
}

#[async_trait]
impl EntryStore for SqliteStore {
    async fn put_entry(&self, entry: &EncryptedEntry) -> Result<()> {
        let entry = entry.clone();
        self.blocking(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO vault_entries (id, owner_id, ciphertext, updated_at, deleted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.id.as_bytes().as_slice(),
                    entry.owner_id.as_bytes().as_slice(),
                    entry.ciphertext,
                    entry.updated_at,
                    entry.deleted_at,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn list_live_entries(&self, owner: &UserId) -> Result<Vec<EncryptedEntry>> {
        let owner = *owner;
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, ciphertext, updated_at FROM vault_entries
                 WHERE owner_id = ?1 AND deleted_at IS NULL ORDER BY id",
            )?;
            let rows = stmt
                .query_map(params![owner.as_bytes().as_slice()], |row| {
                    Ok((
                        row.get::<_, Vec<u8>>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter()
                .map(|(id, ciphertext, updated_at)| {
                    Ok(EncryptedEntry {
                        id: Uuid::from_slice(&id)
                            .map_err(|e| StoreError::InvalidData(format!("entry id: {}", e)))?,
                        owner_id: owner,
                        ciphertext,
                        updated_at,
                        deleted_at: None,
                    })
                })
                .collect()
        })
        .await
    }
}
