//! Database schema migrations for SQLite.
//!
//! Simple versioned migrations: each version transforms the schema from N-1 to N.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// Idempotent: safe to call on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, lifeline_core::now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::debug!(from = current, to = CURRENT_VERSION, "migrated grant store schema");
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: grants, grantee key pairs, vault entries.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE grants (
            id BLOB PRIMARY KEY,                  -- 16 bytes, UUID
            owner_id BLOB NOT NULL,               -- 16 bytes
            grantee_id BLOB,                      -- set on acceptance
            grantee_email TEXT NOT NULL,          -- normalized
            status TEXT NOT NULL,
            wait_days INTEGER NOT NULL,
            requested_at INTEGER,                 -- Unix ms
            wait_expires_at INTEGER,
            activated_at INTEGER,
            token_hash BLOB NOT NULL UNIQUE,      -- 32 bytes, never the raw token
            token_expires_at INTEGER NOT NULL,

            -- Escrow artifact: all eight present or all absent
            ephemeral_public_key BLOB,
            encrypted_vault_key BLOB,
            vault_key_iv BLOB,
            vault_key_auth_tag BLOB,
            hkdf_salt BLOB,
            wrap_version INTEGER,
            key_version INTEGER,
            key_algorithm TEXT,

            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            revision INTEGER NOT NULL DEFAULT 0,

            CHECK (
                (ephemeral_public_key IS NULL) + (encrypted_vault_key IS NULL)
                + (vault_key_iv IS NULL) + (vault_key_auth_tag IS NULL)
                + (hkdf_salt IS NULL) + (wrap_version IS NULL)
                + (key_version IS NULL) + (key_algorithm IS NULL) IN (0, 8)
            )
        );

        -- At most one key pair per grant, never replaced
        CREATE TABLE grantee_key_pairs (
            grant_id BLOB PRIMARY KEY REFERENCES grants(id) ON DELETE CASCADE,
            public_key BLOB NOT NULL,
            seal_algorithm TEXT NOT NULL,
            seal_salt BLOB NOT NULL,
            encrypted_private_key BLOB NOT NULL,
            private_key_iv BLOB NOT NULL,
            private_key_auth_tag BLOB NOT NULL,
            created_at INTEGER NOT NULL
        );

        -- Owner vault entries, opaque ciphertext
        CREATE TABLE vault_entries (
            id BLOB PRIMARY KEY,
            owner_id BLOB NOT NULL,
            ciphertext BLOB NOT NULL,
            updated_at INTEGER NOT NULL,
            deleted_at INTEGER
        );

        CREATE INDEX idx_grants_owner ON grants(owner_id, created_at);
        CREATE INDEX idx_grants_grantee ON grants(grantee_id, created_at);
        CREATE INDEX idx_vault_entries_owner ON vault_entries(owner_id);
        "#,
    )?;

    Ok(())
}
