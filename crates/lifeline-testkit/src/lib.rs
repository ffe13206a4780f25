//! # Lifeline Testkit
//!
//! Testing utilities for Lifeline.
//!
//! ## Overview
//!
//! - **Fixtures**: a wired service on a manual clock with an owner and a
//!   grantee that hold real key material
//! - **Generators**: Proptest strategies for ids, statuses and artifacts
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use lifeline_testkit::TestFixture;
//!
//! async fn example() {
//!     let fixture = TestFixture::new();
//!     let grant_id = fixture.idle_grant(7).await;
//!
//!     fixture
//!         .service
//!         .request_access(&fixture.grantee.caller, &grant_id)
//!         .await
//!         .unwrap();
//!     fixture.clock.advance_days(8);
//!
//!     let bundle = fixture
//!         .service
//!         .get_escrowed_key(&fixture.grantee.caller, &grant_id)
//!         .await
//!         .unwrap();
//!     assert_eq!(fixture.grantee.recover(&bundle).unwrap(), fixture.owner.vault_key);
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{test_config, FailingAuditSink, Grantee, Owner, TestFixture, START_MILLIS};
