//! End-to-end grant lifecycles driven through the public API.

use std::sync::Arc;

use lifeline::core::{GrantStatus, WrapVersion, DAY_MILLIS};
use lifeline::escrow::{EscrowError, UnlockSecret};
use lifeline::store::{GrantStore, MemoryStore, SqliteStore};
use lifeline::{
    AccessError, AuditAction, Collaborators, EmergencyAccess, FixedWindowLimiter, InvitationRef,
    ManualClock, Recipient, RecordingNotifier, Template,
};
use lifeline_testkit::{test_config, FailingAuditSink, Grantee, Owner, TestFixture, START_MILLIS};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

#[tokio::test]
async fn test_wait_elapses_and_next_read_activates() {
    init_tracing();
    let mut fixture = TestFixture::new();
    let grantee = fixture.grantee.caller.clone();
    let grant_id = fixture.idle_grant(7).await;
    let live = fixture.seed_entries(3).await;

    let request = fixture
        .service
        .request_access(&grantee, &grant_id)
        .await
        .unwrap();
    assert_eq!(request.status, GrantStatus::Requested);
    assert_eq!(request.wait_expires_at, START_MILLIS + 7 * DAY_MILLIS);

    // Owner never responds.
    fixture.clock.advance_days(8);

    let bundle = fixture
        .service
        .get_escrowed_key(&grantee, &grant_id)
        .await
        .unwrap();
    assert_eq!(bundle.grantee_id, grantee.id);
    assert_eq!(bundle.activated_at, START_MILLIS + 8 * DAY_MILLIS);

    let persisted = fixture
        .service
        .store()
        .get_grant(&grant_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(persisted.status, GrantStatus::Activated);

    // Grantee's client recovers the exact vault key.
    assert_eq!(
        fixture.grantee.recover(&bundle).unwrap(),
        fixture.owner.vault_key
    );

    let entries = fixture
        .service
        .get_owner_entries(&grantee, &grant_id)
        .await
        .unwrap();
    assert_eq!(entries, live);

    // A second read does not re-transition or duplicate audit entries.
    fixture
        .service
        .get_escrowed_key(&grantee, &grant_id)
        .await
        .unwrap();
    assert_eq!(fixture.audit.count(AuditAction::AccessAutoActivated), 1);
    assert_eq!(fixture.audit.count(AuditAction::EscrowedKeyDisclosed), 2);
    assert_eq!(fixture.audit.count(AuditAction::OwnerEntriesDisclosed), 1);

    let disclosed = fixture
        .audit
        .records()
        .into_iter()
        .find(|r| r.action == AuditAction::OwnerEntriesDisclosed)
        .unwrap();
    assert_eq!(disclosed.metadata.get("count").map(String::as_str), Some("3"));

    let templates: Vec<Template> = fixture.sent().iter().map(|e| e.template).collect();
    assert_eq!(
        templates
            .iter()
            .filter(|t| **t == Template::AccessActivated)
            .count(),
        1
    );
}

#[tokio::test]
async fn test_early_approval_then_late_read() {
    let mut fixture = TestFixture::new();
    let owner = fixture.owner.caller.clone();
    let grantee = fixture.grantee.caller.clone();
    let grant_id = fixture.idle_grant(7).await;
    fixture.sent();

    fixture
        .service
        .request_access(&grantee, &grant_id)
        .await
        .unwrap();
    let sent = fixture.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].template, Template::AccessRequested);
    assert_eq!(sent[0].recipient, Recipient::User(owner.id));
    fixture.clock.advance_days(2);

    let status = fixture
        .service
        .approve_early(&owner, &grant_id)
        .await
        .unwrap();
    assert_eq!(status, GrantStatus::Activated);

    let sent = fixture.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].template, Template::AccessApproved);
    assert_eq!(sent[0].recipient, Recipient::User(grantee.id));

    fixture.clock.advance_days(6);
    let bundle = fixture
        .service
        .get_escrowed_key(&grantee, &grant_id)
        .await
        .unwrap();

    assert_eq!(bundle.activated_at, START_MILLIS + 2 * DAY_MILLIS);
    assert_eq!(fixture.audit.count(AuditAction::AccessApproved), 1);
    assert_eq!(fixture.audit.count(AuditAction::AccessAutoActivated), 0);

    // Approving again is not a legal transition.
    assert!(matches!(
        fixture.service.approve_early(&owner, &grant_id).await,
        Err(AccessError::InvalidStatus(GrantStatus::Activated))
    ));
    // The read after an early approval activates nothing new.
    assert!(fixture
        .sent()
        .iter()
        .all(|e| e.template != Template::AccessActivated));
}

#[tokio::test]
async fn test_token_cannot_be_reused() {
    let fixture = TestFixture::new();
    let invitation = fixture.invite(3).await;
    fixture.accept(&invitation).await;

    let err = fixture
        .service
        .accept_invitation(
            &fixture.grantee.caller,
            &invitation.token,
            &fixture.grantee.enroll(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::InvitationAlreadyUsed));
    assert_eq!(err.code(), "INVITATION_ALREADY_USED");

    // Still the first enrollment.
    assert_eq!(fixture.audit.count(AuditAction::InvitationAccepted), 1);
    let grant = fixture
        .service
        .store()
        .get_grant(&invitation.grant_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(grant.status, GrantStatus::Accepted);

    // Declining a consumed token is refused as well.
    assert!(matches!(
        fixture
            .service
            .decline_invitation(
                &fixture.grantee.caller,
                &InvitationRef::Token(invitation.token.clone())
            )
            .await,
        Err(AccessError::InvalidStatus(GrantStatus::Accepted))
    ));
}

#[tokio::test]
async fn test_one_day_wait_boundary() {
    let fixture = TestFixture::new();
    let grantee = fixture.grantee.caller.clone();
    let grant_id = fixture.idle_grant(1).await;

    fixture
        .service
        .request_access(&grantee, &grant_id)
        .await
        .unwrap();

    fixture.clock.set(START_MILLIS + DAY_MILLIS - 1_000);
    assert!(matches!(
        fixture.service.get_escrowed_key(&grantee, &grant_id).await,
        Err(AccessError::InvalidStatus(GrantStatus::Requested))
    ));

    fixture.clock.set(START_MILLIS + DAY_MILLIS + 1_000);
    let bundle = fixture
        .service
        .get_escrowed_key(&grantee, &grant_id)
        .await
        .unwrap();
    assert_eq!(bundle.activated_at, START_MILLIS + DAY_MILLIS + 1_000);
}

#[tokio::test]
async fn test_stale_requires_restart_and_fresh_escrow() {
    let fixture = TestFixture::new();
    let owner = fixture.owner.caller.clone();
    let grantee = fixture.grantee.caller.clone();
    let grant_id = fixture.idle_grant(3).await;
    fixture
        .service
        .request_access(&grantee, &grant_id)
        .await
        .unwrap();

    let status = fixture
        .service
        .invalidate_escrow(&owner, &grant_id)
        .await
        .unwrap();
    assert_eq!(status, GrantStatus::Stale);

    let stale = fixture
        .service
        .store()
        .get_grant(&grant_id)
        .await
        .unwrap()
        .unwrap();
    assert!(stale.escrow.is_none());
    assert!(stale.wait_expires_at.is_none());

    assert!(matches!(
        fixture.service.request_access(&grantee, &grant_id).await,
        Err(AccessError::InvalidStatus(GrantStatus::Stale))
    ));
    assert!(matches!(
        fixture.escrow(&grant_id, WrapVersion::V1).await,
        Err(AccessError::InvalidStatus(GrantStatus::Stale))
    ));

    let status = fixture
        .service
        .restart_escrow(&owner, &grant_id)
        .await
        .unwrap();
    assert_eq!(status, GrantStatus::Accepted);
    assert!(matches!(
        fixture.service.restart_escrow(&owner, &grant_id).await,
        Err(AccessError::InvalidStatus(GrantStatus::Accepted))
    ));

    fixture.escrow(&grant_id, WrapVersion::V2).await.unwrap();
    let request = fixture
        .service
        .request_access(&grantee, &grant_id)
        .await
        .unwrap();
    assert_eq!(request.status, GrantStatus::Requested);
}

#[tokio::test]
async fn test_decline_notifies_owner() {
    let mut fixture = TestFixture::new();
    let invitation = fixture.invite(3).await;
    fixture.sent();

    let status = fixture
        .service
        .decline_invitation(
            &fixture.grantee.caller,
            &InvitationRef::Token(invitation.token.clone()),
        )
        .await
        .unwrap();
    assert_eq!(status, GrantStatus::Rejected);

    let sent = fixture.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].template, Template::InvitationDeclined);
    assert_eq!(
        sent[0].recipient,
        Recipient::User(fixture.owner.caller.id)
    );
}

#[tokio::test]
async fn test_other_grantee_key_cannot_recover() {
    let fixture = TestFixture::new();
    let grantee = fixture.grantee.caller.clone();
    let grant_id = fixture.idle_grant(1).await;
    fixture
        .service
        .request_access(&grantee, &grant_id)
        .await
        .unwrap();
    fixture.clock.advance_days(1);

    let bundle = fixture
        .service
        .get_escrowed_key(&grantee, &grant_id)
        .await
        .unwrap();

    // Someone holding a different unlock secret cannot open the sealed key.
    let impostor = Grantee {
        caller: grantee.clone(),
        unlock: UnlockSecret::generate(),
    };
    assert!(matches!(
        impostor.recover(&bundle),
        Err(EscrowError::AuthenticationFailed)
    ));
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_operation() {
    let mut fixture = TestFixture::new();
    let notifier = Arc::new(RecordingNotifier::new());
    notifier.set_failing(true);
    let _dispatcher = fixture.dispatch_to(notifier.clone());

    let grant_id = fixture.idle_grant(2).await;
    let request = fixture
        .service
        .request_access(&fixture.grantee.caller, &grant_id)
        .await
        .unwrap();
    assert_eq!(request.status, GrantStatus::Requested);
    assert!(notifier.events().is_empty());
}

#[tokio::test]
async fn test_audit_outage_keeps_committed_work() {
    init_tracing();
    let clock = Arc::new(ManualClock::new(START_MILLIS));
    let config = test_config();
    let (queue, mut outbox) = lifeline::notify::channel(config.notification_buffer);
    let service = EmergencyAccess::new(
        MemoryStore::new(),
        config.clone(),
        Collaborators {
            clock: clock.clone(),
            audit: Arc::new(FailingAuditSink),
            limiter: Arc::new(FixedWindowLimiter::from_config(
                &config.rate_limit,
                clock.clone(),
            )),
            notifications: queue,
        },
    )
    .unwrap();

    let owner = Owner::new("owner@example.com");
    let grantee = Grantee::new("grantee@example.com");

    // The invitation lands and its one-time token reaches the caller.
    let invitation = service
        .create_invitation(&owner.caller, "grantee@example.com", 2)
        .await
        .unwrap();
    let sent = outbox.drain();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].template, Template::InvitationCreated);

    let status = service
        .accept_invitation(&grantee.caller, &invitation.token, &grantee.enroll())
        .await
        .unwrap();
    assert_eq!(status, GrantStatus::Accepted);
    let target = service
        .get_escrow_target(&owner.caller, &invitation.grant_id)
        .await
        .unwrap();
    service
        .complete_escrow(
            &owner.caller,
            &invitation.grant_id,
            owner.wrap_for(&target, WrapVersion::V1).unwrap(),
        )
        .await
        .unwrap();
    service
        .request_access(&grantee.caller, &invitation.grant_id)
        .await
        .unwrap();
    outbox.drain();

    // The read that completes the wait persists the activation and tells the
    // owner, then withholds the key because the disclosure goes unrecorded.
    clock.advance_days(3);
    assert!(matches!(
        service
            .get_escrowed_key(&grantee.caller, &invitation.grant_id)
            .await,
        Err(AccessError::Internal(_))
    ));
    let persisted = service
        .store()
        .get_grant(&invitation.grant_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(persisted.status, GrantStatus::Activated);

    let sent = outbox.drain();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].template, Template::AccessActivated);
    assert_eq!(sent[0].recipient, Recipient::User(owner.caller.id));

    // A retry sees the persisted activation and sends nothing further.
    assert!(service
        .get_escrowed_key(&grantee.caller, &invitation.grant_id)
        .await
        .is_err());
    assert!(outbox.drain().is_empty());
}

#[tokio::test]
async fn test_full_flow_on_sqlite() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path().join("lifeline.db")).unwrap();
    let fixture = TestFixture::with_store(store, test_config());
    let grantee = fixture.grantee.caller.clone();

    let grant_id = fixture.idle_grant(7).await;
    let live = fixture.seed_entries(2).await;
    fixture
        .service
        .request_access(&grantee, &grant_id)
        .await
        .unwrap();
    fixture.clock.advance_days(8);

    let bundle = fixture
        .service
        .get_escrowed_key(&grantee, &grant_id)
        .await
        .unwrap();
    assert_eq!(
        fixture.grantee.recover(&bundle).unwrap(),
        fixture.owner.vault_key
    );
    assert_eq!(
        fixture
            .service
            .get_owner_entries(&grantee, &grant_id)
            .await
            .unwrap(),
        live
    );
}
