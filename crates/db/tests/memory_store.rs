//! Behaviour of the in-process store against the store trait contract.

use std::sync::Arc;

use chrono::{Duration, Utc};
use keyward_core::lockout::LockoutPolicy;
use keyward_core::types::{DbId, Timestamp};
use keyward_db::models::session::CreateSession;
use keyward_db::models::user::CreateUser;
use keyward_db::{CredentialStore, MemoryStore, SessionStore, StoreError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_user(identifier: &str) -> CreateUser {
    CreateUser {
        identifier: identifier.to_string(),
        display_name: None,
        password_hash: "$argon2id$placeholder".to_string(),
        roles: vec!["user".to_string()],
    }
}

fn new_session(user_id: DbId, tag: &str, expires_at: Timestamp) -> CreateSession {
    CreateSession {
        user_id,
        session_id: format!("sid-{tag}"),
        refresh_token_hash: format!("hash-{tag}"),
        expires_at,
        ip_address: None,
        user_agent: None,
        previous_session_id: None,
    }
}

// ---------------------------------------------------------------------------
// Credential records
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_identifier_conflicts() {
    let store = MemoryStore::new();
    let now = Utc::now();
    store.create_user(&new_user("a@x.com"), now).await.unwrap();

    let err = store
        .create_user(&new_user("a@x.com"), now)
        .await
        .expect_err("second insert must fail");
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
async fn concurrent_increments_are_not_lost() {
    let store = Arc::new(MemoryStore::new());
    let now = Utc::now();
    let user = store.create_user(&new_user("a@x.com"), now).await.unwrap();

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.atomic_increment_failures(user.id, now).await })
        })
        .collect();

    let mut seen: Vec<i32> = Vec::new();
    for task in futures::future::join_all(tasks).await {
        let attempts = task.unwrap().unwrap().expect("user exists");
        seen.push(attempts.failed_login_count);
    }
    seen.sort_unstable();
    assert_eq!(seen, (1..=20).collect::<Vec<_>>());

    let stored = store.find_user_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.failed_login_count, 20);
}

#[tokio::test]
async fn lock_is_never_shortened_and_success_resets() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let user = store.create_user(&new_user("a@x.com"), now).await.unwrap();

    let long = now + Duration::hours(1);
    store.lock_until(user.id, long, now).await.unwrap();
    store
        .lock_until(user.id, now + Duration::minutes(5), now)
        .await
        .unwrap();
    let stored = store.find_user_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.locked_until, Some(long));

    store
        .record_login_success(user.id, &LockoutPolicy::default().on_success(now))
        .await
        .unwrap();
    let stored = store.find_user_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.failed_login_count, 0);
    assert_eq!(stored.locked_until, None);
    assert_eq!(stored.last_login_at, Some(now));
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rotate_revokes_predecessor_and_links_successor() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let user = store.create_user(&new_user("a@x.com"), now).await.unwrap();
    let old = store
        .create_session(&new_session(user.id, "1", now + Duration::days(7)), now)
        .await
        .unwrap();

    let next = store
        .rotate_session(old.id, &new_session(user.id, "2", now + Duration::days(7)), now)
        .await
        .unwrap()
        .expect("live session rotates");
    assert_eq!(next.previous_session_id, Some(old.id));

    let old = store.find_session_by_id(old.id).await.unwrap().unwrap();
    assert!(old.is_revoked);
    assert_eq!(old.last_used_at, Some(now));

    // A second rotation of the same predecessor writes nothing.
    let again = store
        .rotate_session(old.id, &new_session(user.id, "3", now + Duration::days(7)), now)
        .await
        .unwrap();
    assert!(again.is_none());
    assert_eq!(store.session_count().await, 2);
}

#[tokio::test]
async fn revoke_all_only_touches_one_owner() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let later = now + Duration::days(1);
    let alice = store.create_user(&new_user("alice@x.com"), now).await.unwrap();
    let bob = store.create_user(&new_user("bob@x.com"), now).await.unwrap();
    store.create_session(&new_session(alice.id, "a1", later), now).await.unwrap();
    store.create_session(&new_session(alice.id, "a2", later), now).await.unwrap();
    store.create_session(&new_session(bob.id, "b1", later), now).await.unwrap();

    assert_eq!(store.revoke_all_for_owner(alice.id, now).await.unwrap(), 2);
    assert!(store.list_active_sessions(alice.id, now).await.unwrap().is_empty());
    assert_eq!(store.list_active_sessions(bob.id, now).await.unwrap().len(), 1);
}

#[tokio::test]
async fn cleanup_deletes_expired_and_old_revoked() {
    let store = MemoryStore::new();
    let now = Utc::now();
    let user = store.create_user(&new_user("a@x.com"), now).await.unwrap();

    store
        .create_session(&new_session(user.id, "expired", now - Duration::minutes(1)), now)
        .await
        .unwrap();
    let live = store
        .create_session(&new_session(user.id, "live", now + Duration::days(1)), now)
        .await
        .unwrap();
    let old_revoked = store
        .create_session(
            &new_session(user.id, "revoked", now + Duration::days(1)),
            now - Duration::days(40),
        )
        .await
        .unwrap();
    store
        .revoke_session(old_revoked.id, now - Duration::days(40))
        .await
        .unwrap();

    assert_eq!(store.delete_expired(now).await.unwrap(), 1);
    assert_eq!(store.delete_expired(now).await.unwrap(), 0);

    assert_eq!(
        store
            .delete_revoked_before(now - Duration::days(30))
            .await
            .unwrap(),
        1
    );
    let remaining = store.all_sessions_for(user.id).await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, live.id);
}
