//! Integration tests for the Auth Service against a real Postgres
//! instance, covering login, refresh rotation, and the concurrent-replay
//! scenario from spec.md §8.

mod common;

use mithril_cms::auth::jwt::TokenService;
use mithril_cms::auth::AuthService;

use common::TestDatabase;

fn service(db: &TestDatabase) -> AuthService {
    let tokens = TokenService::new(b"test-secret-at-least-32-bytes-long!", 900);
    AuthService::new(db.pool().clone(), tokens, 7)
}

#[tokio::test]
async fn ensure_admin_is_idempotent_and_login_succeeds() {
    let db = TestDatabase::new("auth_bootstrap").await;
    let auth = service(&db);

    let first = auth.ensure_admin("admin@example.com", "correct horse battery staple").await.unwrap();
    let second = auth.ensure_admin("admin@example.com", "a different password entirely").await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.password_hash, second.password_hash);

    let session = auth.login("admin@example.com", "correct horse battery staple").await.unwrap();
    assert_eq!(session.admin_id, first.id);
    assert!(!session.access_token.is_empty());
    assert_eq!(session.refresh_token.len(), 64);
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let db = TestDatabase::new("auth_wrong_pw").await;
    let auth = service(&db);
    auth.ensure_admin("admin@example.com", "correct horse battery staple").await.unwrap();

    let err = auth.login("admin@example.com", "wrong password").await.unwrap_err();
    assert_eq!(err.status_code(), 401);
}

#[tokio::test]
async fn login_with_unknown_email_is_unauthorized() {
    let db = TestDatabase::new("auth_unknown_email").await;
    let auth = service(&db);

    let err = auth.login("nobody@example.com", "whatever").await.unwrap_err();
    assert_eq!(err.status_code(), 401);
}

#[tokio::test]
async fn refresh_rotates_the_token_and_old_one_stops_working() {
    let db = TestDatabase::new("auth_refresh_rotate").await;
    let auth = service(&db);
    auth.ensure_admin("admin@example.com", "correct horse battery staple").await.unwrap();
    let session = auth.login("admin@example.com", "correct horse battery staple").await.unwrap();

    let rotated = auth.refresh(&session.refresh_token).await.unwrap();
    assert_eq!(rotated.admin_id, session.admin_id);
    assert_ne!(rotated.refresh_token, session.refresh_token);

    let reused = auth.refresh(&session.refresh_token).await;
    assert!(reused.is_err());
}

#[tokio::test]
async fn concurrent_refresh_replay_revokes_every_session_for_the_admin() {
    let db = TestDatabase::new("auth_refresh_replay").await;
    let auth = service(&db);
    let admin = auth.ensure_admin("admin@example.com", "correct horse battery staple").await.unwrap();
    let session = auth.login("admin@example.com", "correct horse battery staple").await.unwrap();

    let auth_a = auth.clone();
    let auth_b = auth.clone();
    let token_a = session.refresh_token.clone();
    let token_b = session.refresh_token.clone();

    let (result_a, result_b) =
        tokio::join!(tokio::spawn(async move { auth_a.refresh(&token_a).await }), tokio::spawn(async move {
            auth_b.refresh(&token_b).await
        }));

    let result_a = result_a.unwrap();
    let result_b = result_b.unwrap();

    let successes = [&result_a, &result_b].into_iter().filter(|r| r.is_ok()).count();
    let failures = [&result_a, &result_b].into_iter().filter(|r| r.is_err()).count();
    assert_eq!(successes, 1);
    assert_eq!(failures, 1);

    let remaining: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM refresh_tokens WHERE admin_id = $1")
        .bind(admin.id)
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(remaining.0, 0);
}

#[tokio::test]
async fn logout_is_idempotent() {
    let db = TestDatabase::new("auth_logout").await;
    let auth = service(&db);
    auth.ensure_admin("admin@example.com", "correct horse battery staple").await.unwrap();
    let session = auth.login("admin@example.com", "correct horse battery staple").await.unwrap();

    auth.logout(&session.refresh_token).await.unwrap();
    auth.logout(&session.refresh_token).await.unwrap();
}
