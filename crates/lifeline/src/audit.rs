//! Audit trail of grant transitions and disclosures.
//!
//! Records name the actor, the grant and the action. Metadata carries counts
//! and timestamps only; key material and entry contents never appear here.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use lifeline_core::{GrantId, UserId};

use crate::error::CollaboratorError;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditAction {
    InvitationCreated,
    InvitationAccepted,
    InvitationDeclined,
    EscrowCompleted,
    AccessRequested,
    AccessApproved,
    AccessAutoActivated,
    RequestRejected,
    EscrowInvalidated,
    EscrowRestarted,
    GrantRevoked,
    EscrowedKeyDisclosed,
    OwnerEntriesDisclosed,
}

impl AuditAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AuditAction::InvitationCreated => "emergency_access.invitation_created",
            AuditAction::InvitationAccepted => "emergency_access.invitation_accepted",
            AuditAction::InvitationDeclined => "emergency_access.invitation_declined",
            AuditAction::EscrowCompleted => "emergency_access.escrow_completed",
            AuditAction::AccessRequested => "emergency_access.access_requested",
            AuditAction::AccessApproved => "emergency_access.access_approved",
            AuditAction::AccessAutoActivated => "emergency_access.access_auto_activated",
            AuditAction::RequestRejected => "emergency_access.request_rejected",
            AuditAction::EscrowInvalidated => "emergency_access.escrow_invalidated",
            AuditAction::EscrowRestarted => "emergency_access.escrow_restarted",
            AuditAction::GrantRevoked => "emergency_access.grant_revoked",
            AuditAction::EscrowedKeyDisclosed => "emergency_access.escrowed_key_disclosed",
            AuditAction::OwnerEntriesDisclosed => "emergency_access.owner_entries_disclosed",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable audit entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub actor: UserId,
    pub action: AuditAction,
    pub target: GrantId,
    pub metadata: BTreeMap<String, String>,
    /// Unix ms.
    pub at: i64,
}

impl AuditRecord {
    pub fn new(actor: UserId, action: AuditAction, target: GrantId, at: i64) -> Self {
        Self {
            actor,
            action,
            target,
            metadata: BTreeMap::new(),
            at,
        }
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }
}

/// Destination for audit records.
///
/// A failing sink fails the operation that produced the record.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: &AuditRecord) -> Result<(), CollaboratorError>;
}

/// Writes audit records as structured `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<(), CollaboratorError> {
        tracing::info!(
            target: "lifeline::audit",
            actor = %record.actor,
            action = record.action.as_str(),
            grant = %record.target,
            at = record.at,
            metadata = ?record.metadata,
            "audit"
        );
        Ok(())
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Number of records with `action`.
    pub fn count(&self, action: AuditAction) -> usize {
        self.records().iter().filter(|r| r.action == action).count()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditLog {
    async fn record(&self, record: &AuditRecord) -> Result<(), CollaboratorError> {
        self.records
            .lock()
            .map_err(|_| CollaboratorError::new("audit log", "lock poisoned"))?
            .push(record.clone());
        Ok(())
    }
}
