//! # Lifeline
//!
//! Break-glass emergency access for an end-to-end encrypted vault. A vault
//! owner names a trusted grantee who can read the owner's encrypted data after
//! an explicit approval or a waiting period, while the server never holds a
//! usable copy of the owner's vault key.
//!
//! ## Overview
//!
//! - **Invitation**: the owner invites an email address; the invitee redeems a
//!   single-use token and enrolls an X25519 key pair
//! - **Escrow**: the owner's client wraps the vault key to the grantee's public
//!   key ([`escrow::wrap_vault_key`]) and submits the ciphertext
//! - **Request**: the grantee asks for access, which starts the wait period
//! - **Activation**: the owner approves early, or the first disclosure read
//!   after the wait period activates the grant
//! - **Disclosure**: the activated grantee fetches the escrow bundle and the
//!   owner's entries, all still encrypted
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lifeline::{AccessConfig, Caller, Collaborators, EmergencyAccess};
//! use lifeline::store::SqliteStore;
//! use lifeline::core::UserId;
//!
//! async fn example() {
//!     let config = AccessConfig::default();
//!     let (queue, receiver) = lifeline::notify::channel(config.notification_buffer);
//!     // lifeline::notify::spawn_dispatcher(receiver, my_notifier);
//!
//!     let store = SqliteStore::open("lifeline.db").unwrap();
//!     let collaborators = Collaborators::standard(&config, queue);
//!     let service = EmergencyAccess::new(store, config, collaborators).unwrap();
//!
//!     let owner = Caller::new(UserId::generate(), "owner@example.com");
//!     let invite = service
//!         .create_invitation(&owner, "grantee@example.com", 7)
//!         .await
//!         .unwrap();
//!     // Deliver invite.token to the grantee out of band.
//! #   drop((invite, receiver));
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `lifeline::core` - Grant record, status machine, tokens
//! - `lifeline::escrow` - Client-side wrap / recover and enrollment helpers
//! - `lifeline::store` - Grant persistence and SQLite

pub mod audit;
pub mod clock;
pub mod config;
pub mod error;
pub mod notify;
pub mod ratelimit;
pub mod service;

// Re-export component crates
pub use lifeline_core as core;
pub use lifeline_escrow as escrow;
pub use lifeline_store as store;

pub use audit::{AuditAction, AuditRecord, AuditSink, MemoryAuditLog, TracingAuditSink};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AccessConfig, ConfigError, RateLimitConfig};
pub use error::{AccessError, CollaboratorError, InternalError, Result};
pub use notify::{
    spawn_dispatcher, NotificationEvent, NotificationQueue, NotificationReceiver, Notifier,
    Recipient, RecordingNotifier, Template,
};
pub use ratelimit::{FixedWindowLimiter, RateLimiter};
pub use service::{
    AccessRequest, Caller, Collaborators, CreatedInvitation, EmergencyAccess, InvitationRef,
};

// Commonly used core types
pub use lifeline_core::{
    EncryptedEntry, EscrowArtifact, EscrowBundle, EscrowTarget, GrantId, GrantStatus,
    GrantSummary, InvitationToken, UserId,
};
