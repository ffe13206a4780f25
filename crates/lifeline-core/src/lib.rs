//! # Lifeline Core
//!
//! Pure primitives for Lifeline emergency access: the grant record, its
//! lifecycle state machine, and single-use invitation tokens.
//!
//! This crate contains no I/O, no storage, no networking. Every function is
//! deterministic over its inputs; wall-clock time is always passed in.
//!
//! ## Key Types
//!
//! - [`Grant`] - Durable state of one owner → grantee delegation
//! - [`GrantStatus`] - Lifecycle state of a grant
//! - [`can_transition`] - Pure decision function for legal transitions
//! - [`EscrowArtifact`] - Opaque, versioned wrapped vault key
//! - [`GranteeKeyPair`] - Grantee's enrolled public key and sealed private key
//! - [`InvitationToken`] / [`TokenHash`] - Bearer token and its persisted digest
//!
//! ## Lifecycle
//!
//! ```text
//! PENDING ──accept──▶ ACCEPTED ──escrow──▶ IDLE ──request──▶ REQUESTED ──approve / elapse──▶ ACTIVATED
//! PENDING ──decline─▶ REJECTED             REQUESTED ──owner rejects──▶ REJECTED
//! IDLE | REQUESTED | ACTIVATED ──invalidate──▶ STALE ──restart──▶ ACCEPTED
//! ```

pub mod disclosure;
pub mod email;
pub mod entry;
pub mod error;
pub mod grant;
pub mod ids;
pub mod status;
pub mod time;
pub mod token;
pub mod transition;

pub use disclosure::{EscrowBundle, EscrowTarget};
pub use email::{emails_match, normalize_email};
pub use entry::EncryptedEntry;
pub use error::{CoreError, Result};
pub use grant::{
    EscrowArtifact, Grant, GrantSummary, GranteeKeyPair, KeyAlgorithm, NewInvitation,
    SealAlgorithm, SealedPrivateKey, WrapVersion, HKDF_SALT_LEN, IV_LEN, PUBLIC_KEY_LEN,
    TAG_LEN,
};
pub use ids::{GrantId, UserId};
pub use status::GrantStatus;
pub use time::{now_millis, wait_expiry, DAY_MILLIS};
pub use token::{InvitationToken, TokenHash};
pub use transition::{can_transition, legal_targets};
