//! Grant lifecycle status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle state of a grant.
///
/// The status is owned by the persisted record and never cached by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrantStatus {
    /// Invitation issued, not yet redeemed.
    Pending,
    /// Grantee enrolled a key pair; waiting for the owner to escrow.
    Accepted,
    /// Escrow complete; no access requested.
    Idle,
    /// Grantee requested access; wait period running.
    Requested,
    /// Access granted to the grantee.
    Activated,
    /// Declined by either party.
    Rejected,
    /// Escrow material is no longer usable and must be re-established.
    Stale,
}

impl GrantStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [GrantStatus; 7] = [
        GrantStatus::Pending,
        GrantStatus::Accepted,
        GrantStatus::Idle,
        GrantStatus::Requested,
        GrantStatus::Activated,
        GrantStatus::Rejected,
        GrantStatus::Stale,
    ];

    /// Stable string form used in storage and error codes.
    pub const fn as_str(&self) -> &'static str {
        match self {
            GrantStatus::Pending => "PENDING",
            GrantStatus::Accepted => "ACCEPTED",
            GrantStatus::Idle => "IDLE",
            GrantStatus::Requested => "REQUESTED",
            GrantStatus::Activated => "ACTIVATED",
            GrantStatus::Rejected => "REJECTED",
            GrantStatus::Stale => "STALE",
        }
    }

    /// Whether a grantee has enrolled (and therefore `grantee_id` is set).
    ///
    /// `Rejected` is ambiguous on its own: a declined invitation never
    /// enrolled, a rejected request did. Callers check the record instead.
    pub const fn is_enrolled(&self) -> bool {
        matches!(
            self,
            GrantStatus::Accepted
                | GrantStatus::Idle
                | GrantStatus::Requested
                | GrantStatus::Activated
                | GrantStatus::Stale
        )
    }

    /// Whether the status admits no further transition.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, GrantStatus::Rejected)
    }
}

impl fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrantStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GrantStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::UnknownStatus(s.to_string()))
    }
}
