//! Integration tests for administrative revocation and session cleanup.

mod common;

use assert_matches::assert_matches;
use chrono::Duration;
use common::{client, harness};
use keyward_core::error::AuthError;

#[tokio::test]
async fn revoke_session_checks_ownership() {
    let h = harness();
    let alice = h.register("alice@x.com").await;
    let bob = h.register("bob@x.com").await;

    let alice_session = h.service.list_sessions(alice.principal.id).await.unwrap()[0].id;

    assert_matches!(
        h.service.revoke_session(bob.principal.id, alice_session).await,
        Err(AuthError::NotFound)
    );
    assert_matches!(
        h.service.revoke_session(alice.principal.id, 9_999).await,
        Err(AuthError::NotFound)
    );
    assert_eq!(h.service.list_sessions(alice.principal.id).await.unwrap().len(), 1);

    h.service
        .revoke_session(alice.principal.id, alice_session)
        .await
        .unwrap();
    assert!(h.service.list_sessions(alice.principal.id).await.unwrap().is_empty());

    // Revoking again is a no-op, not an error.
    h.service
        .revoke_session(alice.principal.id, alice_session)
        .await
        .unwrap();
}

#[tokio::test]
async fn revoke_all_is_scoped_to_one_owner() {
    let h = harness();
    let alice = h.register("alice@x.com").await;
    h.login("alice@x.com").await;
    let bob = h.register("bob@x.com").await;
    h.login("bob@x.com").await;

    assert_eq!(h.service.revoke_all(alice.principal.id).await.unwrap(), 2);
    assert!(h.service.list_sessions(alice.principal.id).await.unwrap().is_empty());
    assert_eq!(h.service.list_sessions(bob.principal.id).await.unwrap().len(), 2);

    assert_matches!(
        h.service.rotate(&alice.tokens.refresh_token, &client("10.0.0.1")).await,
        Err(AuthError::TokenInvalid)
    );
    h.service
        .rotate(&bob.tokens.refresh_token, &client("10.0.0.1"))
        .await
        .unwrap();

    // Nothing left to revoke.
    assert_eq!(h.service.revoke_all(alice.principal.id).await.unwrap(), 0);
}

#[tokio::test]
async fn list_sessions_is_newest_first_and_hides_hashes() {
    let h = harness();
    let first = h.register("a@x.com").await;
    h.clock.advance(Duration::minutes(1));
    h.service
        .login("a@x.com", common::PASSWORD, &client("172.16.0.4"))
        .await
        .unwrap();

    let sessions = h.service.list_sessions(first.principal.id).await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert!(sessions[0].created_at > sessions[1].created_at);
    assert_eq!(sessions[0].ip_address.as_deref(), Some("172.16.0.4"));

    let json = serde_json::to_string(&sessions).unwrap();
    assert!(!json.contains("refresh_token_hash"));
}

#[tokio::test]
async fn cleanup_expired_deletes_exactly_the_expired_sessions() {
    let h = harness();
    h.register("a@x.com").await;
    h.clock.advance(Duration::days(4));
    let fresh = h.login("a@x.com").await;

    h.clock.advance(Duration::days(3));
    assert_eq!(h.service.cleanup_expired().await.unwrap(), 1);
    assert_eq!(h.store.session_count().await, 1);

    // Idempotent.
    assert_eq!(h.service.cleanup_expired().await.unwrap(), 0);
    h.service
        .rotate(&fresh.tokens.refresh_token, &client("10.0.0.2"))
        .await
        .unwrap();
}

#[tokio::test]
async fn cleanup_old_revoked_honours_retention() {
    let h = harness();
    let session = h.register("a@x.com").await;
    h.service.revoke_all(session.principal.id).await.unwrap();
    h.login("a@x.com").await;

    h.clock.advance(Duration::days(1));
    assert_eq!(h.service.cleanup_old_revoked(2).await.unwrap(), 0);

    h.clock.advance(Duration::days(2));
    assert_eq!(h.service.cleanup_old_revoked(2).await.unwrap(), 1);
    assert_eq!(h.store.session_count().await, 1);
}

#[tokio::test]
async fn negative_retention_is_rejected() {
    let h = harness();
    assert_matches!(
        h.service.cleanup_old_revoked(-1).await,
        Err(AuthError::Validation(_))
    );
}

#[tokio::test]
async fn out_of_range_retention_is_rejected() {
    let h = harness();
    let session = h.register("a@x.com").await;
    h.service.revoke_all(session.principal.id).await.unwrap();

    for retention_days in [200_000_000, i64::MAX] {
        assert_matches!(
            h.service.cleanup_old_revoked(retention_days).await,
            Err(AuthError::Validation(_))
        );
    }
    assert_eq!(h.store.session_count().await, 1);
}

#[tokio::test]
async fn cleanup_unlinks_rotation_chain() {
    let h = harness();
    let first = h.register("a@x.com").await;
    h.clock.advance(Duration::days(3));
    let rotated = h
        .service
        .rotate(&first.tokens.refresh_token, &client("10.0.0.1"))
        .await
        .unwrap();

    h.clock.advance(Duration::days(5));
    assert_eq!(h.service.cleanup_old_revoked(1).await.unwrap(), 1);

    let remaining = h.store.all_sessions_for(first.principal.id).await;
    assert_eq!(remaining.len(), 1);
    assert!(remaining[0].previous_session_id.is_none());
    h.service
        .rotate(&rotated.tokens.refresh_token, &client("10.0.0.1"))
        .await
        .unwrap();
}
