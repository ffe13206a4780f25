//! Test fixtures and helpers.
//!
//! A [`TestFixture`] wires an [`EmergencyAccess`] service to a manual clock,
//! an in-memory audit log and a drainable notification queue, and carries an
//! owner and a grantee holding real key material, so tests can drive whole
//! flows through the public API.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use uuid::Uuid;

use lifeline::{
    AccessConfig, AccessError, AuditRecord, AuditSink, Caller, CollaboratorError, Collaborators,
    CreatedInvitation, EmergencyAccess, FixedWindowLimiter, ManualClock, MemoryAuditLog,
    NotificationEvent, NotificationReceiver, Notifier, RateLimitConfig,
};
use lifeline_core::{
    EncryptedEntry, EscrowArtifact, EscrowBundle, EscrowTarget, GrantId, UserId, WrapVersion,
};
use lifeline_escrow::{
    recover_vault_key, unseal_private_key, wrap_vault_key, Enrollment, EscrowContext,
    EscrowError, GranteeKeyMaterial, UnlockSecret, VaultKey, X25519PublicKey,
};
use lifeline_store::{EntryStore, GrantStore, MemoryStore};

/// Fixed starting time for fixtures (2023-11-14T22:13:20Z).
pub const START_MILLIS: i64 = 1_700_000_000_000;

/// The vault owner: an identity plus the vault key they escrow.
pub struct Owner {
    pub caller: Caller,
    pub vault_key: VaultKey,
}

impl Owner {
    pub fn new(email: &str) -> Self {
        Self {
            caller: Caller::new(UserId::generate(), email),
            vault_key: VaultKey::from_bytes(rand::random::<[u8; 32]>().to_vec()),
        }
    }

    /// Wrap the vault key to an enrolled grantee, as the owner's client would.
    pub fn wrap_for(
        &self,
        target: &EscrowTarget,
        version: WrapVersion,
    ) -> Result<EscrowArtifact, AccessError> {
        let recipient = X25519PublicKey::from_slice(&target.public_key)?;
        let context = EscrowContext::emergency_access(self.caller.id, target.grantee_id);
        Ok(wrap_vault_key(&self.vault_key, &recipient, &context, version, 1)?)
    }
}

/// The grantee: an identity plus the secret that seals their private key.
pub struct Grantee {
    pub caller: Caller,
    pub unlock: UnlockSecret,
}

impl Grantee {
    pub fn new(email: &str) -> Self {
        Self {
            caller: Caller::new(UserId::generate(), email),
            unlock: UnlockSecret::generate(),
        }
    }

    /// Generate and seal a fresh key pair, as the grantee's client would.
    pub fn enroll(&self) -> Enrollment {
        GranteeKeyMaterial::generate()
            .seal(&self.unlock)
            .expect("sealing a fresh key pair")
    }

    /// Open a disclosure bundle back into the owner's vault key.
    pub fn recover(&self, bundle: &EscrowBundle) -> Result<VaultKey, EscrowError> {
        let secret = unseal_private_key(
            &bundle.key_pair.private_key,
            &bundle.key_pair.public_key,
            &self.unlock,
        )?;
        let context = EscrowContext::emergency_access(bundle.owner_id, bundle.grantee_id);
        recover_vault_key(&bundle.artifact, &secret, &context)
    }
}

/// Relaxed limits so flows are never throttled unless a test asks for it.
pub fn test_config() -> AccessConfig {
    AccessConfig {
        rate_limit: RateLimitConfig {
            max_requests: 10_000,
            window_secs: 60,
        },
        ..AccessConfig::default()
    }
}

/// A wired service with two parties.
pub struct TestFixture<S = MemoryStore> {
    pub service: Arc<EmergencyAccess<S>>,
    pub clock: Arc<ManualClock>,
    pub audit: Arc<MemoryAuditLog>,
    pub outbox: NotificationReceiver,
    pub owner: Owner,
    pub grantee: Grantee,
}

impl TestFixture<MemoryStore> {
    /// In-memory store with [`test_config`].
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new(), test_config())
    }
}

impl Default for TestFixture<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: GrantStore + EntryStore> TestFixture<S> {
    /// Wire `store` with `config`.
    pub fn with_store(store: S, config: AccessConfig) -> Self {
        let clock = Arc::new(ManualClock::new(START_MILLIS));
        let audit = Arc::new(MemoryAuditLog::new());
        let (queue, outbox) = lifeline::notify::channel(config.notification_buffer);
        let collaborators = Collaborators {
            clock: clock.clone(),
            audit: audit.clone(),
            limiter: Arc::new(FixedWindowLimiter::from_config(
                &config.rate_limit,
                clock.clone(),
            )),
            notifications: queue,
        };

        Self {
            service: Arc::new(
                EmergencyAccess::new(store, config, collaborators).expect("valid test config"),
            ),
            clock,
            audit,
            outbox,
            owner: Owner::new("owner@example.com"),
            grantee: Grantee::new("grantee@example.com"),
        }
    }

    /// Owner invites the fixture grantee.
    pub async fn invite(&self, wait_days: u32) -> CreatedInvitation {
        self.service
            .create_invitation(&self.owner.caller, &self.grantee.caller.email, wait_days)
            .await
            .expect("create invitation")
    }

    /// Grantee accepts `invitation` with a fresh key pair.
    pub async fn accept(&self, invitation: &CreatedInvitation) {
        self.service
            .accept_invitation(&self.grantee.caller, &invitation.token, &self.grantee.enroll())
            .await
            .expect("accept invitation");
    }

    /// Owner wraps their vault key to the enrolled grantee and submits it.
    pub async fn escrow(&self, grant_id: &GrantId, version: WrapVersion) -> Result<(), AccessError> {
        let target = self
            .service
            .get_escrow_target(&self.owner.caller, grant_id)
            .await?;
        let artifact = self.owner.wrap_for(&target, version)?;

        self.service
            .complete_escrow(&self.owner.caller, grant_id, artifact)
            .await?;
        Ok(())
    }

    /// Invite, accept and escrow: returns an `Idle` grant.
    pub async fn idle_grant(&self, wait_days: u32) -> GrantId {
        let invitation = self.invite(wait_days).await;
        self.accept(&invitation).await;
        self.escrow(&invitation.grant_id, WrapVersion::V1)
            .await
            .expect("complete escrow");
        invitation.grant_id
    }

    /// Seed `count` live entries and one deleted entry for the owner.
    pub async fn seed_entries(&self, count: usize) -> Vec<EncryptedEntry> {
        let mut live = Vec::with_capacity(count);
        for i in 0..count {
            let entry = EncryptedEntry {
                id: Uuid::new_v4(),
                owner_id: self.owner.caller.id,
                ciphertext: vec![i as u8; 48],
                updated_at: START_MILLIS,
                deleted_at: None,
            };
            self.service.store().put_entry(&entry).await.expect("put entry");
            live.push(entry);
        }
        let deleted = EncryptedEntry {
            id: Uuid::new_v4(),
            owner_id: self.owner.caller.id,
            ciphertext: vec![0xde; 48],
            updated_at: START_MILLIS,
            deleted_at: Some(START_MILLIS),
        };
        self.service.store().put_entry(&deleted).await.expect("put entry");

        live.sort_by_key(|e| e.id);
        live
    }

    /// Take every notification queued so far.
    pub fn sent(&mut self) -> Vec<NotificationEvent> {
        self.outbox.drain()
    }

    /// Route the queue into `notifier` through a dispatcher task instead.
    ///
    /// Afterwards [`sent`](Self::sent) always returns nothing.
    pub fn dispatch_to(&mut self, notifier: Arc<dyn Notifier>) -> JoinHandle<()> {
        let (_, placeholder) = lifeline::notify::channel(1);
        let receiver = std::mem::replace(&mut self.outbox, placeholder);
        lifeline::spawn_dispatcher(receiver, notifier)
    }
}

/// An audit sink that always fails.
#[derive(Debug, Default)]
pub struct FailingAuditSink;

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn record(&self, _record: &AuditRecord) -> Result<(), CollaboratorError> {
        Err(CollaboratorError::new("audit sink", "unavailable"))
    }
}
