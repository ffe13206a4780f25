//! # Lifeline Store
//!
//! Persistence for emergency-access grants. Provides a trait-based interface
//! with SQLite and in-memory implementations.
//!
//! ## Key Types
//!
//! - [`GrantStore`] - Async trait for grant and key-pair persistence
//! - [`EntryStore`] - Read access to the owner's encrypted vault entries
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`UpdateResult`] - Outcome of a conditional status update
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lifeline_store::{Expected, GrantStore, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("lifeline.db").unwrap();
//!
//!     // let next = grant.request(now)?;
//!     // match store.update_grant(&next, Expected::of(&grant)).await? { ... }
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Conditional updates**: a write only lands if the stored status and
//!   revision equal the ones the caller read, otherwise `Conflict` reports
//!   what is there now
//! - **Atomic escrow**: the eight escrow columns are all set or all null
//! - **Hashed tokens**: only the token hash is stored, and it is unique

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{EntryStore, Expected, GrantStore, UpdateResult};
