//! The emergency access service.
//!
//! [`EmergencyAccess`] is stateless between calls: every operation reads the
//! grant, decides with the pure transition methods on [`Grant`], and writes
//! the successor with a conditional update against the status it read. A lost
//! race surfaces as a conflict from the store and is mapped to a named error
//! (or, for idempotent operations, to the already-persisted outcome).
//!
//! Side effects run after the write: the audit record first, then a
//! fire-and-forget notification onto the post-commit queue. Neither can fail
//! a committed transition. Disclosures are audited before they return, and a
//! failing sink withholds them.

use std::sync::Arc;

use lifeline_core::{
    emails_match, normalize_email, EncryptedEntry, EscrowArtifact, EscrowBundle, EscrowTarget,
    Grant, GrantId, GrantStatus, GrantSummary, GranteeKeyPair, InvitationToken, NewInvitation,
    UserId,
};
use lifeline_escrow::{Enrollment, X25519PublicKey};
use lifeline_store::{EntryStore, Expected, GrantStore, StoreError, UpdateResult};

use crate::audit::{AuditAction, AuditRecord, AuditSink, TracingAuditSink};
use crate::clock::{Clock, SystemClock};
use crate::config::{AccessConfig, ConfigError};
use crate::error::{AccessError, Result};
use crate::notify::{NotificationEvent, NotificationQueue, Recipient, Template};
use crate::ratelimit::{FixedWindowLimiter, RateLimiter};

/// An authenticated caller, as established by the surrounding system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: UserId,
    /// Verified account email, matched against invitation targets.
    pub email: String,
}

impl Caller {
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}

/// Result of [`EmergencyAccess::create_invitation`].
///
/// The token appears here once and is never stored.
#[derive(Debug)]
pub struct CreatedInvitation {
    pub grant_id: GrantId,
    pub token: InvitationToken,
    pub expires_at: i64,
}

/// How an invitee refers to the invitation they decline.
#[derive(Debug, Clone)]
pub enum InvitationRef {
    Token(InvitationToken),
    Grant(GrantId),
}

/// Result of [`EmergencyAccess::request_access`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRequest {
    pub status: GrantStatus,
    pub wait_expires_at: i64,
}

/// External collaborators the service calls into.
pub struct Collaborators {
    pub clock: Arc<dyn Clock>,
    pub audit: Arc<dyn AuditSink>,
    pub limiter: Arc<dyn RateLimiter>,
    pub notifications: NotificationQueue,
}

impl Collaborators {
    /// System clock, tracing audit sink and an in-process limiter from `config`.
    pub fn standard(config: &AccessConfig, notifications: NotificationQueue) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            limiter: Arc::new(FixedWindowLimiter::from_config(
                &config.rate_limit,
                clock.clone(),
            )),
            clock,
            audit: Arc::new(TracingAuditSink),
            notifications,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Party {
    Owner,
    Grantee,
}

/// Emergency access operations over a grant store.
pub struct EmergencyAccess<S> {
    store: Arc<S>,
    config: AccessConfig,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditSink>,
    limiter: Arc<dyn RateLimiter>,
    notifications: NotificationQueue,
}

impl<S: GrantStore + EntryStore> EmergencyAccess<S> {
    /// Create a service instance. Fails if `config` does not validate.
    pub fn new(
        store: S,
        config: AccessConfig,
        collaborators: Collaborators,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            store: Arc::new(store),
            config,
            clock: collaborators.clock,
            audit: collaborators.audit,
            limiter: collaborators.limiter,
            notifications: collaborators.notifications,
        })
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Invitation & Enrollment
    // ─────────────────────────────────────────────────────────────────────────

    /// Owner invites `grantee_email` with a wait period of `wait_days`.
    pub async fn create_invitation(
        &self,
        owner: &Caller,
        grantee_email: &str,
        wait_days: u32,
    ) -> Result<CreatedInvitation> {
        self.throttle("invite", owner).await?;

        if !self.config.wait_days_allowed(wait_days) {
            return Err(AccessError::InvalidInput(format!(
                "wait_days must be between {} and {}",
                self.config.min_wait_days, self.config.max_wait_days
            )));
        }
        let grantee_email = normalize_email(grantee_email)
            .ok_or_else(|| AccessError::InvalidInput("malformed grantee email".into()))?;
        if emails_match(&grantee_email, &owner.email) {
            return Err(AccessError::InvalidInput("cannot invite yourself".into()));
        }

        let now = self.now();
        let token = InvitationToken::generate();
        let expires_at = now.saturating_add(self.config.invitation_ttl_millis());
        let grant = Grant::invitation(
            NewInvitation {
                owner_id: owner.id,
                grantee_email,
                wait_days,
                token_hash: token.hash(),
                token_expires_at: expires_at,
            },
            now,
        );

        self.store.insert_grant(&grant).await?;
        tracing::info!(grant_id = %grant.id, wait_days, "emergency access invitation created");

        self.record_committed(
            AuditRecord::new(owner.id, AuditAction::InvitationCreated, grant.id, now)
                .with("wait_days", wait_days),
        )
        .await;
        self.notify(
            NotificationEvent::new(
                Recipient::Email(grant.grantee_email.clone()),
                Template::InvitationCreated,
                grant.id,
            )
            .with("owner_id", owner.id)
            .with("wait_days", wait_days)
            .with("expires_at", expires_at),
        );

        Ok(CreatedInvitation {
            grant_id: grant.id,
            token,
            expires_at,
        })
    }

    /// Invitee redeems `token` and enrolls their key pair.
    pub async fn accept_invitation(
        &self,
        caller: &Caller,
        token: &InvitationToken,
        enrollment: &Enrollment,
    ) -> Result<GrantStatus> {
        self.throttle("accept", caller).await?;

        X25519PublicKey::from_slice(&enrollment.public_key)?;
        enrollment.sealed_private_key.validate()?;

        let now = self.now();
        let grant = self
            .store
            .get_grant_by_token(&token.hash())
            .await?
            .ok_or(AccessError::NotFound)?;

        if grant.status != GrantStatus::Pending {
            return Err(AccessError::InvitationAlreadyUsed);
        }
        if grant.invitation_expired(now) {
            return Err(AccessError::InvitationExpired);
        }
        if grant.is_owner(&caller.id) || !emails_match(&grant.grantee_email, &caller.email) {
            return Err(AccessError::NotAuthorizedForGrant);
        }

        let key_pair = GranteeKeyPair {
            grant_id: grant.id,
            public_key: enrollment.public_key.clone(),
            private_key: enrollment.sealed_private_key.clone(),
            created_at: now,
        };
        let next = grant.accept(caller.id, now)?;

        match self.store.accept_grant(&next, &key_pair).await {
            Ok(UpdateResult::Updated) => {}
            Ok(UpdateResult::Conflict { current: Some(_) }) | Err(StoreError::KeyPairExists(_)) => {
                return Err(AccessError::InvitationAlreadyUsed)
            }
            Ok(UpdateResult::Conflict { current: None }) => return Err(AccessError::NotFound),
            Err(e) => return Err(e.into()),
        }
        tracing::info!(grant_id = %grant.id, "emergency access invitation accepted");

        self.record_committed(AuditRecord::new(
            caller.id,
            AuditAction::InvitationAccepted,
            grant.id,
            now,
        ))
        .await;
        self.notify(
            NotificationEvent::new(
                Recipient::User(grant.owner_id),
                Template::InvitationAccepted,
                grant.id,
            )
            .with("grantee_id", caller.id),
        );

        Ok(next.status)
    }

    /// Invitee declines a pending invitation.
    pub async fn decline_invitation(
        &self,
        caller: &Caller,
        invitation: &InvitationRef,
    ) -> Result<GrantStatus> {
        let grant = match invitation {
            InvitationRef::Token(token) => self
                .store
                .get_grant_by_token(&token.hash())
                .await?
                .ok_or(AccessError::NotFound)?,
            InvitationRef::Grant(id) => {
                let grant = self.store.get_grant(id).await?.ok_or(AccessError::NotFound)?;
                if !grant.is_owner(&caller.id) && !emails_match(&grant.grantee_email, &caller.email)
                {
                    return Err(AccessError::NotFound);
                }
                grant
            }
        };

        if grant.is_owner(&caller.id) || !emails_match(&grant.grantee_email, &caller.email) {
            return Err(AccessError::NotAuthorizedForGrant);
        }

        let now = self.now();
        let next = grant.decline(now)?;
        self.commit(&next, &grant).await?;
        tracing::info!(grant_id = %grant.id, "emergency access invitation declined");

        self.record_committed(AuditRecord::new(
            caller.id,
            AuditAction::InvitationDeclined,
            grant.id,
            now,
        ))
        .await;
        self.notify(NotificationEvent::new(
            Recipient::User(grant.owner_id),
            Template::InvitationDeclined,
            grant.id,
        ));

        Ok(next.status)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Key Escrow
    // ─────────────────────────────────────────────────────────────────────────

    /// Owner fetches the enrolled public key to escrow to.
    pub async fn get_escrow_target(
        &self,
        owner: &Caller,
        grant_id: &GrantId,
    ) -> Result<EscrowTarget> {
        let grant = self.load_as(owner, grant_id, Party::Owner).await?;
        if grant.status != GrantStatus::Accepted {
            return Err(AccessError::InvalidStatus(grant.status));
        }

        let grantee_id = grant
            .grantee_id
            .ok_or_else(|| AccessError::inconsistent("accepted grant has no grantee"))?;
        let key_pair = self
            .store
            .get_key_pair(grant_id)
            .await?
            .ok_or_else(|| AccessError::inconsistent("accepted grant has no key pair"))?;

        Ok(EscrowTarget {
            grant_id: grant.id,
            grantee_id,
            public_key: key_pair.public_key,
        })
    }

    /// Owner attaches the wrapped vault key: `Accepted` → `Idle`.
    pub async fn complete_escrow(
        &self,
        owner: &Caller,
        grant_id: &GrantId,
        artifact: EscrowArtifact,
    ) -> Result<GrantStatus> {
        let grant = self.load_as(owner, grant_id, Party::Owner).await?;
        let now = self.now();

        let wrap_version = artifact.wrap_version.as_u16();
        let key_version = artifact.key_version;
        let next = grant.complete_escrow(artifact, now)?;
        self.commit(&next, &grant).await?;
        tracing::info!(grant_id = %grant.id, wrap_version, key_version, "escrow completed");

        self.record_committed(
            AuditRecord::new(owner.id, AuditAction::EscrowCompleted, grant.id, now)
                .with("wrap_version", wrap_version)
                .with("key_version", key_version),
        )
        .await;
        self.notify(NotificationEvent::new(
            grantee_recipient(&grant),
            Template::EscrowCompleted,
            grant.id,
        ));

        Ok(next.status)
    }

    /// Owner discards escrow that no longer opens the vault.
    pub async fn invalidate_escrow(
        &self,
        owner: &Caller,
        grant_id: &GrantId,
    ) -> Result<GrantStatus> {
        let grant = self.load_as(owner, grant_id, Party::Owner).await?;
        let now = self.now();

        let next = grant.invalidate_escrow(now)?;
        self.commit(&next, &grant).await?;
        tracing::info!(grant_id = %grant.id, from = %grant.status, "escrow invalidated");

        self.record_committed(
            AuditRecord::new(owner.id, AuditAction::EscrowInvalidated, grant.id, now)
                .with("from", grant.status),
        )
        .await;
        self.notify(NotificationEvent::new(
            grantee_recipient(&grant),
            Template::EscrowInvalidated,
            grant.id,
        ));

        Ok(next.status)
    }

    /// Owner reopens a stale grant for a fresh escrow: `Stale` → `Accepted`.
    pub async fn restart_escrow(&self, owner: &Caller, grant_id: &GrantId) -> Result<GrantStatus> {
        let grant = self.load_as(owner, grant_id, Party::Owner).await?;
        let now = self.now();

        let next = grant.restart_escrow(now)?;
        self.commit(&next, &grant).await?;
        tracing::debug!(grant_id = %grant.id, "escrow restarted");

        self.record_committed(AuditRecord::new(
            owner.id,
            AuditAction::EscrowRestarted,
            grant.id,
            now,
        ))
        .await;

        Ok(next.status)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Request / Wait / Activation
    // ─────────────────────────────────────────────────────────────────────────

    /// Grantee starts the wait period.
    ///
    /// Repeating the call while a request is live (or already activated)
    /// returns the existing expiry and changes nothing.
    pub async fn request_access(
        &self,
        grantee: &Caller,
        grant_id: &GrantId,
    ) -> Result<AccessRequest> {
        self.throttle("request", grantee).await?;
        let grant = self.load_as(grantee, grant_id, Party::Grantee).await?;

        if matches!(grant.status, GrantStatus::Requested | GrantStatus::Activated) {
            tracing::debug!(
                grant_id = %grant.id,
                status = %grant.status,
                "repeat access request ignored"
            );
            return existing_request(&grant);
        }

        let now = self.now();
        let next = grant.request(now)?;
        match self.store.update_grant(&next, Expected::of(&grant)).await? {
            UpdateResult::Updated => {}
            UpdateResult::Conflict {
                current: Some(GrantStatus::Requested | GrantStatus::Activated),
            } => {
                let current = self
                    .store
                    .get_grant(grant_id)
                    .await?
                    .ok_or(AccessError::NotFound)?;
                tracing::debug!(grant_id = %grant.id, "concurrent access request already recorded");
                return existing_request(&current);
            }
            UpdateResult::Conflict {
                current: Some(status),
            } => return Err(AccessError::InvalidStatus(status)),
            UpdateResult::Conflict { current: None } => return Err(AccessError::NotFound),
        }

        let result = existing_request(&next)?;
        tracing::info!(
            grant_id = %grant.id,
            wait_expires_at = result.wait_expires_at,
            "emergency access requested"
        );

        self.record_committed(
            AuditRecord::new(grantee.id, AuditAction::AccessRequested, grant.id, now)
                .with("wait_expires_at", result.wait_expires_at),
        )
        .await;
        self.notify(
            NotificationEvent::new(
                Recipient::User(grant.owner_id),
                Template::AccessRequested,
                grant.id,
            )
            .with("wait_expires_at", result.wait_expires_at),
        );

        Ok(result)
    }

    /// Owner grants access before the wait period ends.
    pub async fn approve_early(&self, owner: &Caller, grant_id: &GrantId) -> Result<GrantStatus> {
        let grant = self.load_as(owner, grant_id, Party::Owner).await?;
        let now = self.now();

        let next = grant.activate(now)?;
        self.commit(&next, &grant).await?;
        tracing::info!(grant_id = %grant.id, "emergency access approved early");

        self.record_committed(AuditRecord::new(
            owner.id,
            AuditAction::AccessApproved,
            grant.id,
            now,
        ))
        .await;
        self.notify(NotificationEvent::new(
            grantee_recipient(&grant),
            Template::AccessApproved,
            grant.id,
        ));

        Ok(next.status)
    }

    /// Owner refuses the live request: `Requested` → `Rejected`.
    pub async fn reject_request(&self, owner: &Caller, grant_id: &GrantId) -> Result<GrantStatus> {
        let grant = self.load_as(owner, grant_id, Party::Owner).await?;
        let now = self.now();

        let next = grant.reject_request(now)?;
        self.commit(&next, &grant).await?;
        tracing::info!(grant_id = %grant.id, "emergency access request rejected");

        self.record_committed(AuditRecord::new(
            owner.id,
            AuditAction::RequestRejected,
            grant.id,
            now,
        ))
        .await;
        self.notify(NotificationEvent::new(
            grantee_recipient(&grant),
            Template::RequestRejected,
            grant.id,
        ));

        Ok(next.status)
    }

    /// Complete a due request as a side effect of a read.
    ///
    /// Only the caller whose conditional write lands records the activation;
    /// everyone else continues with what is persisted.
    async fn activate_if_due(&self, actor: &Caller, grant: Grant) -> Result<Grant> {
        let now = self.now();
        if !grant.activation_due(now) {
            return Ok(grant);
        }

        let next = grant.activate(now)?;
        match self.store.update_grant(&next, Expected::of(&grant)).await? {
            UpdateResult::Updated => {
                tracing::info!(grant_id = %grant.id, "emergency access activated after wait period");
                self.record_committed(
                    AuditRecord::new(actor.id, AuditAction::AccessAutoActivated, grant.id, now)
                        .with("wait_expires_at", grant.wait_expires_at.unwrap_or_default()),
                )
                .await;
                self.notify(NotificationEvent::new(
                    Recipient::User(grant.owner_id),
                    Template::AccessActivated,
                    grant.id,
                ));
                Ok(next)
            }
            UpdateResult::Conflict { current: Some(_) } => {
                tracing::debug!(grant_id = %grant.id, "lazy activation lost race, re-reading");
                self.store
                    .get_grant(&grant.id)
                    .await?
                    .ok_or(AccessError::NotFound)
            }
            UpdateResult::Conflict { current: None } => Err(AccessError::NotFound),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Disclosure
    // ─────────────────────────────────────────────────────────────────────────

    /// Grantee fetches the wrapped vault key and their sealed key pair.
    pub async fn get_escrowed_key(
        &self,
        grantee: &Caller,
        grant_id: &GrantId,
    ) -> Result<EscrowBundle> {
        self.throttle("escrowed_key", grantee).await?;
        let grant = self.load_as(grantee, grant_id, Party::Grantee).await?;
        let grant = self.activate_if_due(grantee, grant).await?;

        if grant.status != GrantStatus::Activated {
            return Err(AccessError::InvalidStatus(grant.status));
        }

        let (Some(artifact), Some(activated_at)) = (grant.escrow.clone(), grant.activated_at) else {
            tracing::error!(grant_id = %grant.id, "activated grant has no escrow artifact");
            return Err(AccessError::EscrowIncomplete);
        };
        let Some(key_pair) = self.store.get_key_pair(&grant.id).await? else {
            tracing::error!(grant_id = %grant.id, "activated grant has no grantee key pair");
            return Err(AccessError::EscrowIncomplete);
        };

        self.record_disclosure(
            AuditRecord::new(
                grantee.id,
                AuditAction::EscrowedKeyDisclosed,
                grant.id,
                self.now(),
            )
            .with("key_version", artifact.key_version),
        )
        .await?;
        tracing::debug!(grant_id = %grant.id, "escrowed key disclosed");

        Ok(EscrowBundle {
            grant_id: grant.id,
            owner_id: grant.owner_id,
            grantee_id: grantee.id,
            activated_at,
            artifact,
            key_pair,
        })
    }

    /// Grantee fetches the owner's live entries, still encrypted.
    pub async fn get_owner_entries(
        &self,
        grantee: &Caller,
        grant_id: &GrantId,
    ) -> Result<Vec<EncryptedEntry>> {
        self.throttle("owner_entries", grantee).await?;
        let grant = self.load_as(grantee, grant_id, Party::Grantee).await?;

        if grant.status != GrantStatus::Activated {
            return Err(AccessError::InvalidStatus(grant.status));
        }

        let entries = self.store.list_live_entries(&grant.owner_id).await?;
        self.record_disclosure(
            AuditRecord::new(
                grantee.id,
                AuditAction::OwnerEntriesDisclosed,
                grant.id,
                self.now(),
            )
            .with("count", entries.len()),
        )
        .await?;
        tracing::debug!(grant_id = %grant.id, count = entries.len(), "owner entries disclosed");

        Ok(entries)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Management
    // ─────────────────────────────────────────────────────────────────────────

    /// Owner deletes the grant and its key pair, whatever its status.
    pub async fn revoke_grant(&self, owner: &Caller, grant_id: &GrantId) -> Result<()> {
        let grant = self.load_as(owner, grant_id, Party::Owner).await?;
        if !self.store.delete_grant(grant_id).await? {
            return Err(AccessError::NotFound);
        }
        let now = self.now();
        tracing::info!(grant_id = %grant.id, status = %grant.status, "emergency access revoked");

        self.record_committed(
            AuditRecord::new(owner.id, AuditAction::GrantRevoked, grant.id, now)
                .with("status", grant.status),
        )
        .await;
        self.notify(NotificationEvent::new(
            grantee_recipient(&grant),
            Template::GrantRevoked,
            grant.id,
        ));

        Ok(())
    }

    /// Grants the caller has issued.
    pub async fn list_owned_grants(&self, owner: &Caller) -> Result<Vec<GrantSummary>> {
        let now = self.now();
        let grants = self.store.list_by_owner(&owner.id).await?;
        Ok(grants.iter().map(|g| g.summary(now)).collect())
    }

    /// Grants the caller has accepted. Status is as persisted; a due request
    /// shows `activation_due` but is not activated here.
    pub async fn list_received_grants(&self, grantee: &Caller) -> Result<Vec<GrantSummary>> {
        let now = self.now();
        let grants = self.store.list_by_grantee(&grantee.id).await?;
        Ok(grants.iter().map(|g| g.summary(now)).collect())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    async fn throttle(&self, operation: &str, caller: &Caller) -> Result<()> {
        let key = format!("{}:{}", operation, caller.id);
        if self.limiter.check(&key).await? {
            Ok(())
        } else {
            tracing::warn!(operation, caller = %caller.id, "rate limit exceeded");
            Err(AccessError::RateLimitExceeded)
        }
    }

    /// Load a grant for `caller` acting as `party`.
    ///
    /// Non-parties get `NotFound` so grant existence does not leak.
    async fn load_as(&self, caller: &Caller, grant_id: &GrantId, party: Party) -> Result<Grant> {
        let grant = self
            .store
            .get_grant(grant_id)
            .await?
            .ok_or(AccessError::NotFound)?;

        let is_owner = grant.is_owner(&caller.id);
        let is_grantee = grant.is_grantee(&caller.id);
        match party {
            Party::Owner if is_owner => Ok(grant),
            Party::Grantee if is_grantee => Ok(grant),
            _ if is_owner || is_grantee => Err(AccessError::NotAuthorizedForGrant),
            _ => Err(AccessError::NotFound),
        }
    }

    /// Write `next` over `read`, failing if anything changed in between.
    async fn commit(&self, next: &Grant, read: &Grant) -> Result<()> {
        match self.store.update_grant(next, Expected::of(read)).await? {
            UpdateResult::Updated => Ok(()),
            UpdateResult::Conflict {
                current: Some(status),
            } => Err(AccessError::InvalidStatus(status)),
            UpdateResult::Conflict { current: None } => Err(AccessError::NotFound),
        }
    }

    /// Audit a change that is already committed.
    ///
    /// The write cannot be taken back, so a sink failure is logged and the
    /// operation completes, notification included.
    async fn record_committed(&self, record: AuditRecord) {
        if let Err(e) = self.audit.record(&record).await {
            tracing::error!(
                grant_id = %record.target,
                action = record.action.as_str(),
                error = %e,
                "audit record lost for committed change"
            );
        }
    }

    /// Audit a disclosure before any data leaves. Failure withholds the data.
    async fn record_disclosure(&self, record: AuditRecord) -> Result<()> {
        self.audit.record(&record).await?;
        Ok(())
    }

    fn notify(&self, event: NotificationEvent) {
        self.notifications.emit(event);
    }
}

fn existing_request(grant: &Grant) -> Result<AccessRequest> {
    let wait_expires_at = grant
        .wait_expires_at
        .ok_or_else(|| AccessError::inconsistent("requested grant has no wait expiry"))?;
    Ok(AccessRequest {
        status: grant.status,
        wait_expires_at,
    })
}

fn grantee_recipient(grant: &Grant) -> Recipient {
    match grant.grantee_id {
        Some(id) => Recipient::User(id),
        None => Recipient::Email(grant.grantee_email.clone()),
    }
}
