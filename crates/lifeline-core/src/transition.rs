//! The grant state machine.
//!
//! [`can_transition`] is the single source of truth for which lifecycle
//! moves are legal. It is a pure function of two statuses: it never reads the
//! clock, never touches storage, and is safe to call from any thread. Time
//! gating (invitation expiry, wait periods) is the caller's job.

use crate::status::GrantStatus;

/// Check whether a grant may move from `current` to `target`.
///
/// Everything not listed here fails closed, including self-transitions and
/// any move out of `Rejected`.
pub const fn can_transition(current: GrantStatus, target: GrantStatus) -> bool {
    use GrantStatus::*;

    matches!(
        (current, target),
        (Pending, Accepted)
            | (Pending, Rejected)
            | (Accepted, Idle)
            | (Idle, Requested)
            | (Requested, Activated)
            | (Requested, Rejected)
            | (Idle, Stale)
            | (Requested, Stale)
            | (Activated, Stale)
            | (Stale, Accepted)
    )
}

/// All statuses reachable from `current` in one step.
pub fn legal_targets(current: GrantStatus) -> Vec<GrantStatus> {
    GrantStatus::ALL
        .into_iter()
        .filter(|target| can_transition(current, *target))
        .collect()
}
