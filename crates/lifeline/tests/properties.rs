//! Property tests over generated grants, parties and key material.

use proptest::prelude::*;

use lifeline::core::{
    legal_targets, Grant, GrantStatus, InvitationToken, NewInvitation, DAY_MILLIS,
};
use lifeline::escrow::{
    recover_vault_key, wrap_vault_key, EscrowContext, EscrowError, GranteeKeyMaterial, VaultKey,
};
use lifeline::store::GrantStore;
use lifeline::AccessError;
use lifeline_testkit::generators::{
    grant_id, grant_status, user_id, vault_key_bytes, wait_days, wrap_version,
};
use lifeline_testkit::{TestFixture, START_MILLIS};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn grant_in(status: GrantStatus, owner: lifeline::UserId, wait_days: u32, revision: u64) -> Grant {
    let mut grant = Grant::invitation(
        NewInvitation {
            owner_id: owner,
            grantee_email: "grantee@example.com".into(),
            wait_days,
            token_hash: InvitationToken::generate().hash(),
            token_expires_at: START_MILLIS + DAY_MILLIS,
        },
        START_MILLIS,
    );
    grant.status = status;
    grant.revision = revision;
    grant
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_activation_waits_exactly_the_period(days in wait_days()) {
        runtime().block_on(async {
            let fixture = TestFixture::new();
            let grantee = fixture.grantee.caller.clone();
            let grant_id = fixture.idle_grant(days).await;

            let request = fixture
                .service
                .request_access(&grantee, &grant_id)
                .await
                .unwrap();
            let expires = START_MILLIS + i64::from(days) * DAY_MILLIS;
            assert_eq!(request.wait_expires_at, expires);

            fixture.clock.set(expires - 1_000);
            assert!(matches!(
                fixture.service.get_escrowed_key(&grantee, &grant_id).await,
                Err(AccessError::InvalidStatus(GrantStatus::Requested))
            ));

            fixture.clock.set(expires + 1_000);
            let bundle = fixture
                .service
                .get_escrowed_key(&grantee, &grant_id)
                .await
                .unwrap();
            assert_eq!(bundle.activated_at, expires + 1_000);
            assert_eq!(
                fixture.grantee.recover(&bundle).unwrap(),
                fixture.owner.vault_key
            );
        });
    }

    #[test]
    fn test_unknown_grant_is_not_found(id in grant_id()) {
        runtime().block_on(async {
            let fixture = TestFixture::new();
            fixture.idle_grant(3).await;

            assert!(fixture.service.store().get_grant(&id).await.unwrap().is_none());
            assert!(matches!(
                fixture.service.request_access(&fixture.grantee.caller, &id).await,
                Err(AccessError::NotFound)
            ));
            assert!(matches!(
                fixture.service.approve_early(&fixture.owner.caller, &id).await,
                Err(AccessError::NotFound)
            ));
        });
    }

    #[test]
    fn test_transitions_stay_legal_and_count_revisions(
        status in grant_status(),
        owner in user_id(),
        days in wait_days(),
        revision in 0u64..1_000,
    ) {
        let grant = grant_in(status, owner, days, revision);
        let now = START_MILLIS + DAY_MILLIS;
        let legal = legal_targets(status);

        let attempts = [
            grant.decline(now),
            grant.request(now),
            grant.activate(now),
            grant.reject_request(now),
            grant.invalidate_escrow(now),
            grant.restart_escrow(now),
        ];
        for next in attempts.into_iter().flatten() {
            prop_assert!(legal.contains(&next.status));
            prop_assert_eq!(next.revision, revision + 1);
            prop_assert_eq!(next.updated_at, now);
            prop_assert_eq!(next.owner_id, owner);
        }
    }

    #[test]
    fn test_wrapped_key_opens_only_in_its_context(
        key in vault_key_bytes(),
        version in wrap_version(),
        owner in user_id(),
        grantee in user_id(),
    ) {
        prop_assume!(owner != grantee);
        let material = GranteeKeyMaterial::generate();
        let vault_key = VaultKey::from_bytes(key);
        let context = EscrowContext::emergency_access(owner, grantee);

        let artifact =
            wrap_vault_key(&vault_key, &material.public_key(), &context, version, 1).unwrap();
        prop_assert_eq!(artifact.wrap_version, version);
        prop_assert_eq!(
            recover_vault_key(&artifact, material.secret(), &context).unwrap(),
            vault_key
        );

        let swapped = EscrowContext::emergency_access(grantee, owner);
        prop_assert!(matches!(
            recover_vault_key(&artifact, material.secret(), &swapped),
            Err(EscrowError::AuthenticationFailed)
        ));
    }
}
