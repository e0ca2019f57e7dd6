//! Session lifecycle tests against the service layer.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MemoryStore, PASSWORD, register_user, test_codec, test_session_config};
use msisdn_auth::credentials::CredentialStore;
use msisdn_auth::db::{Database, UserRole};
use msisdn_auth::session::{SessionConfig, SessionError, SessionService};

fn memory_session() -> (SessionService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let session = SessionService::new(store.clone(), test_codec(), test_session_config());
    (session, store)
}

async fn sqlite_session() -> (SessionService, Database) {
    let db = Database::open(":memory:").await.unwrap();
    let session = SessionService::new(Arc::new(db.users()), test_codec(), test_session_config());
    (session, db)
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_issues_pair_and_stores_refresh_token() {
    let (session, store) = memory_session();

    let tokens = register_user(&session, "alice@example.com", UserRole::User).await;

    let access = session.codec().verify_access(&tokens.access_token).unwrap();
    assert_eq!(access.role, UserRole::User);

    let refresh = session.codec().verify_refresh(&tokens.refresh_token).unwrap();
    assert_eq!(
        store.stored_refresh_token(&refresh.user_id).as_deref(),
        Some(tokens.refresh_token.as_str())
    );
}

#[tokio::test]
async fn test_register_admin_role_in_access_token() {
    let (session, _) = memory_session();

    let tokens = register_user(&session, "root@example.com", UserRole::Admin).await;

    let access = session.codec().verify_access(&tokens.access_token).unwrap();
    assert_eq!(access.role, UserRole::Admin);
}

#[tokio::test]
async fn test_register_rejects_invalid_input() {
    let (session, _) = memory_session();

    let result = session
        .register_native("not-an-email", PASSWORD, UserRole::User)
        .await;
    assert!(matches!(result, Err(SessionError::InvalidInput(_))));

    let result = session
        .register_native("alice@example.com", "weakpass", UserRole::User)
        .await;
    assert!(matches!(result, Err(SessionError::InvalidInput(_))));
}

#[tokio::test]
async fn test_register_duplicate_username() {
    let (session, db) = sqlite_session().await;
    let tokens = register_user(&session, "alice@example.com", UserRole::User).await;
    let before = db
        .users()
        .get_by_username("alice@example.com")
        .await
        .unwrap()
        .unwrap();

    let result = session
        .register_native("Alice@Example.com", PASSWORD, UserRole::User)
        .await;
    assert_eq!(result, Err(SessionError::UserAlreadyExists));

    // The existing session is untouched
    let after = db
        .users()
        .get_by_username("alice@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.refresh_token, before.refresh_token);
    assert_eq!(after.refresh_token, tokens.refresh_token);
    assert!(
        session
            .refresh_tokens(&after.id, &tokens.refresh_token)
            .await
            .is_ok()
    );
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_success_replaces_stored_refresh_token() {
    let (session, db) = sqlite_session().await;
    let first = register_user(&session, "alice@example.com", UserRole::User).await;

    let second = session
        .login_native("alice@example.com", PASSWORD)
        .await
        .unwrap();
    assert_ne!(first.refresh_token, second.refresh_token);

    let user = db
        .users()
        .get_by_username("alice@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.refresh_token, second.refresh_token);

    // The refresh token from the first session is no longer valid
    let claims = session.codec().verify_refresh(&first.refresh_token).unwrap();
    let result = session
        .refresh_tokens(&claims.user_id, &first.refresh_token)
        .await;
    assert_eq!(result, Err(SessionError::RefreshTokenMismatch));
}

#[tokio::test]
async fn test_login_wrong_password() {
    let (session, _) = memory_session();
    register_user(&session, "alice@example.com", UserRole::User).await;

    let result = session.login_native("alice@example.com", "Wr0ngpass!").await;
    assert_eq!(result, Err(SessionError::InvalidCredentials));
}

#[tokio::test]
async fn test_login_unknown_user() {
    let (session, _) = memory_session();

    let result = session.login_native("nobody@example.com", PASSWORD).await;
    assert_eq!(result, Err(SessionError::UserNotFound));
}

#[tokio::test]
async fn test_login_requires_both_fields() {
    let (session, _) = memory_session();

    assert!(matches!(
        session.login_native("", PASSWORD).await,
        Err(SessionError::InvalidInput(_))
    ));
    assert!(matches!(
        session.login_native("alice@example.com", "").await,
        Err(SessionError::InvalidInput(_))
    ));
}

// =============================================================================
// Refresh
// =============================================================================

#[tokio::test]
async fn test_refresh_rotates_token() {
    let (session, db) = sqlite_session().await;
    let tokens = register_user(&session, "alice@example.com", UserRole::Admin).await;
    let claims = session.codec().verify_refresh(&tokens.refresh_token).unwrap();

    let rotated = session
        .refresh_tokens(&claims.user_id, &tokens.refresh_token)
        .await
        .unwrap();
    assert_ne!(rotated.refresh_token, tokens.refresh_token);

    // Role is carried over from the stored record
    let access = session.codec().verify_access(&rotated.access_token).unwrap();
    assert_eq!(access.role, UserRole::Admin);

    let user = db.users().get_by_id(&claims.user_id).await.unwrap().unwrap();
    assert_eq!(user.refresh_token, rotated.refresh_token);
}

#[tokio::test]
async fn test_refresh_replay_is_rejected() {
    let (session, _) = memory_session();
    let tokens = register_user(&session, "alice@example.com", UserRole::User).await;
    let claims = session.codec().verify_refresh(&tokens.refresh_token).unwrap();

    session
        .refresh_tokens(&claims.user_id, &tokens.refresh_token)
        .await
        .unwrap();

    let replay = session
        .refresh_tokens(&claims.user_id, &tokens.refresh_token)
        .await;
    assert_eq!(replay, Err(SessionError::RefreshTokenMismatch));
}

#[tokio::test]
async fn test_refresh_unknown_user() {
    let (session, _) = memory_session();
    let token = session.codec().issue_refresh("missing-user").unwrap();

    let result = session.refresh_tokens("missing-user", &token).await;
    assert_eq!(result, Err(SessionError::UserNotFound));
}

#[tokio::test]
async fn test_concurrent_refresh_only_one_wins() {
    let store = Arc::new(MemoryStore::with_delay(Duration::from_millis(10)));
    let session = SessionService::new(store.clone(), test_codec(), test_session_config());
    let tokens = register_user(&session, "alice@example.com", UserRole::User).await;
    let claims = session.codec().verify_refresh(&tokens.refresh_token).unwrap();

    let (a, b) = tokio::join!(
        session.refresh_tokens(&claims.user_id, &tokens.refresh_token),
        session.refresh_tokens(&claims.user_id, &tokens.refresh_token),
    );

    let winner = match (a, b) {
        (Ok(pair), Err(SessionError::RefreshTokenMismatch))
        | (Err(SessionError::RefreshTokenMismatch), Ok(pair)) => pair,
        other => panic!("expected exactly one successful refresh, got {:?}", other),
    };

    assert_eq!(
        store.stored_refresh_token(&claims.user_id).as_deref(),
        Some(winner.refresh_token.as_str())
    );
}

// =============================================================================
// Logout
// =============================================================================

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let (session, store) = memory_session();
    let tokens = register_user(&session, "alice@example.com", UserRole::User).await;
    let claims = session.codec().verify_refresh(&tokens.refresh_token).unwrap();

    session.log_out_user(&claims.user_id).await.unwrap();
    assert_eq!(
        store.stored_refresh_token(&claims.user_id).as_deref(),
        Some("")
    );

    let result = session
        .refresh_tokens(&claims.user_id, &tokens.refresh_token)
        .await;
    assert_eq!(result, Err(SessionError::RefreshTokenMismatch));

    // Logging in again starts a new session
    session
        .login_native("alice@example.com", PASSWORD)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_logout_unknown_user() {
    let (session, _) = memory_session();

    assert_eq!(
        session.log_out_user("missing-user").await,
        Err(SessionError::UserNotFound)
    );
}

// =============================================================================
// Imported identities
// =============================================================================

#[tokio::test]
async fn test_sign_in_imported_registers_then_logs_in() {
    let (session, db) = sqlite_session().await;

    let first = session.sign_in_imported("bob@example.com").await.unwrap();
    let second = session.sign_in_imported("bob@example.com").await.unwrap();
    assert_ne!(first.refresh_token, second.refresh_token);

    let user = db
        .users()
        .get_by_username("bob@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.role, UserRole::User);
    assert!(user.password_hash.is_empty());
    assert_eq!(user.refresh_token, second.refresh_token);
}

#[tokio::test]
async fn test_imported_user_cannot_use_password_login() {
    let (session, _) = memory_session();
    session.register_imported("bob@example.com").await.unwrap();

    let result = session.login_native("bob@example.com", PASSWORD).await;
    assert_eq!(result, Err(SessionError::InvalidCredentials));
}

#[tokio::test]
async fn test_register_imported_duplicate() {
    let (session, _) = memory_session();
    register_user(&session, "bob@example.com", UserRole::User).await;

    assert_eq!(
        session.register_imported("bob@example.com").await,
        Err(SessionError::UserAlreadyExists)
    );
}

#[tokio::test]
async fn test_login_imported_unknown() {
    let (session, _) = memory_session();

    assert_eq!(
        session.login_imported("bob@example.com").await,
        Err(SessionError::UserNotFound)
    );
}

// =============================================================================
// Store timeouts
// =============================================================================

#[tokio::test]
async fn test_slow_store_times_out() {
    let store = Arc::new(MemoryStore::with_delay(Duration::from_millis(500)));
    let config = SessionConfig {
        store_timeout: Duration::from_millis(20),
        password_cost: 4,
    };
    let session = SessionService::new(store, test_codec(), config);

    let result = session
        .register_native("alice@example.com", PASSWORD, UserRole::User)
        .await;
    match result {
        Err(SessionError::Unexpected(message)) => assert!(message.contains("timed out")),
        other => panic!("expected a timeout, got {:?}", other),
    }
}
