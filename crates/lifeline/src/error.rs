//! Caller-facing error taxonomy.

use lifeline_core::{CoreError, GrantStatus};
use lifeline_escrow::EscrowError;
use lifeline_store::StoreError;
use thiserror::Error;

/// Errors returned by [`EmergencyAccess`](crate::EmergencyAccess) operations.
///
/// Every variant except `Internal` is a named, expected condition. `Internal`
/// displays a fixed message; its source is kept for logs only.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Grant or token absent, or the caller is not a party to the grant.
    #[error("not found")]
    NotFound,

    /// The grant's current status does not allow the operation.
    #[error("operation not allowed while grant is {0}")]
    InvalidStatus(GrantStatus),

    /// The invitation token is past its expiry.
    #[error("invitation expired")]
    InvitationExpired,

    /// The invitation token has already been redeemed or declined.
    #[error("invitation already used")]
    InvitationAlreadyUsed,

    /// The caller is a party, but not the one this operation requires.
    #[error("not authorized for grant")]
    NotAuthorizedForGrant,

    /// The grant is activated but its escrow material is missing.
    #[error("escrow incomplete")]
    EscrowIncomplete,

    /// The caller exceeded the rate limit for this operation.
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// Malformed request data.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A collaborator failed.
    #[error("internal error")]
    Internal(#[source] InternalError),
}

impl AccessError {
    /// Stable machine-readable name of the condition.
    pub fn code(&self) -> &'static str {
        match self {
            AccessError::NotFound => "NOT_FOUND",
            AccessError::InvalidStatus(_) => "INVALID_STATUS",
            AccessError::InvitationExpired => "INVITATION_EXPIRED",
            AccessError::InvitationAlreadyUsed => "INVITATION_ALREADY_USED",
            AccessError::NotAuthorizedForGrant => "NOT_AUTHORIZED_FOR_GRANT",
            AccessError::EscrowIncomplete => "ESCROW_INCOMPLETE",
            AccessError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            AccessError::InvalidInput(_) => "INVALID_INPUT",
            AccessError::Internal(_) => "INTERNAL",
        }
    }

    pub(crate) fn inconsistent(message: impl Into<String>) -> Self {
        AccessError::Internal(InternalError::Inconsistent(message.into()))
    }
}

/// Source of an [`AccessError::Internal`].
#[derive(Debug, Error)]
pub enum InternalError {
    /// Persistence failed.
    #[error("store: {0}")]
    Store(#[from] StoreError),

    /// Audit, notification or rate-limit collaborator failed.
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// Persisted state violates an invariant.
    #[error("inconsistent state: {0}")]
    Inconsistent(String),
}

/// Failure reported by an external collaborator.
#[derive(Debug, Error)]
#[error("{collaborator} failed: {message}")]
pub struct CollaboratorError {
    pub collaborator: &'static str,
    pub message: String,
}

impl CollaboratorError {
    pub fn new(collaborator: &'static str, message: impl Into<String>) -> Self {
        Self {
            collaborator,
            message: message.into(),
        }
    }
}

impl From<StoreError> for AccessError {
    fn from(e: StoreError) -> Self {
        AccessError::Internal(InternalError::Store(e))
    }
}

impl From<CollaboratorError> for AccessError {
    fn from(e: CollaboratorError) -> Self {
        AccessError::Internal(InternalError::Collaborator(e))
    }
}

impl From<CoreError> for AccessError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::IllegalTransition { from, .. } => AccessError::InvalidStatus(from),
            other => AccessError::InvalidInput(other.to_string()),
        }
    }
}

impl From<EscrowError> for AccessError {
    fn from(e: EscrowError) -> Self {
        AccessError::InvalidInput(e.to_string())
    }
}

/// Result type for access operations.
pub type Result<T> = std::result::Result<T, AccessError>;
