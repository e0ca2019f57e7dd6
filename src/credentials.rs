//! Credential store interface.
//!
//! One record per account. Besides the login material the record holds the
//! single refresh token that is currently valid for the user, or an empty
//! string when the user is logged out.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::db::UserRole;

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    /// bcrypt hash; empty for accounts created from an external identity
    pub password_hash: String,
    pub role: UserRole,
    pub refresh_token: String,
}

/// Fields of a user about to be created.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub role: UserRole,
    pub refresh_token: &'a str,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A user with the same username already exists
    #[error("username already taken")]
    Conflict,

    #[error("credential store timed out")]
    Timeout,

    #[error("credential store failure: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::Conflict;
            }
        }
        StoreError::Backend(err.to_string())
    }
}

/// Run a store call, failing with `Timeout` if it takes longer than `limit`.
pub async fn bounded<T, E>(
    limit: Duration,
    fut: impl Future<Output = Result<T, E>>,
) -> Result<T, StoreError>
where
    E: Into<StoreError>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(StoreError::Timeout),
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Insert a new user. Fails with `Conflict` if the username is taken.
    async fn create(&self, user: &NewUser<'_>) -> Result<(), StoreError>;

    /// Unconditionally replace the stored refresh token. Returns false if no
    /// user has this id.
    async fn update_refresh_token(&self, id: &str, token: &str) -> Result<bool, StoreError>;

    /// Replace the stored refresh token only if it still equals `current`.
    /// Returns false when the user is gone or the token was already rotated.
    async fn swap_refresh_token(
        &self,
        id: &str,
        current: &str,
        next: &str,
    ) -> Result<bool, StoreError>;

    /// Clear the stored refresh token. Returns false if no user has this id.
    async fn clear_refresh_token(&self, id: &str) -> Result<bool, StoreError>;
}
