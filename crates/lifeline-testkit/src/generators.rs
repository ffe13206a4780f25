//! Proptest generators for property-based testing.

use proptest::prelude::*;

use lifeline_core::{
    EscrowArtifact, GrantId, GrantStatus, UserId, WrapVersion, HKDF_SALT_LEN,
    IV_LEN, PUBLIC_KEY_LEN, TAG_LEN,
};

/// Generate any grant status.
pub fn grant_status() -> impl Strategy<Value = GrantStatus> {
    prop::sample::select(GrantStatus::ALL.to_vec())
}

/// Generate a random UserId.
pub fn user_id() -> impl Strategy<Value = UserId> {
    any::<[u8; 16]>().prop_map(UserId::from_bytes)
}

/// Generate a random GrantId.
pub fn grant_id() -> impl Strategy<Value = GrantId> {
    any::<[u8; 16]>().prop_map(GrantId::from_bytes)
}

/// Generate a wait period inside the default bounds.
pub fn wait_days() -> impl Strategy<Value = u32> {
    1u32..=90
}

/// Generate a vault key of plausible length.
pub fn vault_key_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=64)
}

/// Generate a simple, valid email address.
pub fn email() -> impl Strategy<Value = String> {
    ("[a-z][a-z0-9.]{0,15}", "[a-z]{1,12}\\.[a-z]{2,4}")
        .prop_map(|(local, domain)| format!("{}@{}", local, domain))
}

/// Generate a wrap version with its matching algorithm.
pub fn wrap_version() -> impl Strategy<Value = WrapVersion> {
    prop_oneof![Just(WrapVersion::V1), Just(WrapVersion::V2)]
}

/// Generate a well-shaped escrow artifact with random bytes.
///
/// Passes server-side validation; it does not decrypt to anything.
pub fn escrow_artifact() -> impl Strategy<Value = EscrowArtifact> {
    (
        wrap_version(),
        any::<u32>(),
        prop::collection::vec(any::<u8>(), PUBLIC_KEY_LEN),
        prop::collection::vec(any::<u8>(), HKDF_SALT_LEN),
        prop::collection::vec(any::<u8>(), IV_LEN),
        prop::collection::vec(any::<u8>(), 1..=96),
        prop::collection::vec(any::<u8>(), TAG_LEN),
    )
        .prop_map(
            |(wrap_version, key_version, ephemeral_public_key, hkdf_salt, iv, ciphertext, auth_tag)| {
                EscrowArtifact {
                    wrap_version,
                    key_algorithm: wrap_version.algorithm(),
                    key_version,
                    ephemeral_public_key,
                    hkdf_salt,
                    iv,
                    ciphertext,
                    auth_tag,
                }
            },
        )
}
