//! Session lifecycle: registration, login, refresh and logout.
//!
//! The service owns the refresh token invariants. Each user has at most one
//! valid refresh token, stored on the user record. Login overwrites it,
//! refresh rotates it with a compare-and-swap and logout clears it. Any
//! refresh token other than the stored one is rejected, which turns a
//! replayed or stolen token into a `RefreshTokenMismatch`.

mod password;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::credentials::{CredentialStore, NewUser, StoreError, User, bounded};
use crate::db::UserRole;
use crate::jwt::{TokenCodec, TokenError};
use crate::validation::{validate_password, validate_username};

pub use password::{hash_password, verify_password};

/// Default bound on every credential store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// A freshly issued access/refresh token pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("user not found")]
    UserNotFound,

    #[error("user already exists")]
    UserAlreadyExists,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("refresh token does not match the stored token")]
    RefreshTokenMismatch,

    #[error("malformed token")]
    MalformedToken,

    #[error("token expired")]
    ExpiredToken,

    #[error("signing key unavailable: {0}")]
    KeyUnavailable(String),

    #[error("failed to sign token: {0}")]
    SigningFailure(String),

    #[error("{0}")]
    Unexpected(String),
}

impl From<TokenError> for SessionError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed => SessionError::MalformedToken,
            TokenError::Expired => SessionError::ExpiredToken,
            TokenError::KeyUnavailable(msg) => SessionError::KeyUnavailable(msg),
            TokenError::SigningFailure(msg) => SessionError::SigningFailure(msg),
            TokenError::Unexpected(msg) => SessionError::Unexpected(msg),
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => SessionError::UserAlreadyExists,
            other => SessionError::Unexpected(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Upper bound for each credential store call
    pub store_timeout: Duration,
    /// bcrypt cost for new password hashes
    pub password_cost: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store_timeout: DEFAULT_STORE_TIMEOUT,
            password_cost: bcrypt::DEFAULT_COST,
        }
    }
}

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn CredentialStore>,
    codec: Arc<TokenCodec>,
    config: SessionConfig,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        codec: Arc<TokenCodec>,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            codec,
            config,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Upper bound for credential store calls.
    pub fn store_timeout(&self) -> Duration {
        self.config.store_timeout
    }

    /// Shared handle to the codec, for route guards.
    pub fn codec_handle(&self) -> Arc<TokenCodec> {
        self.codec.clone()
    }

    /// Register a user with a password and issue their first token pair.
    pub async fn register_native(
        &self,
        username: &str,
        password: &str,
        role: UserRole,
    ) -> Result<TokenPair, SessionError> {
        validate_username(username).map_err(SessionError::InvalidInput)?;
        validate_password(password).map_err(SessionError::InvalidInput)?;

        if self.find_by_username(username).await?.is_some() {
            return Err(SessionError::UserAlreadyExists);
        }

        let password_hash = hash_password(password, self.config.password_cost).await?;
        let tokens = self.create_user(username, &password_hash, role).await?;

        info!(username = %username, role = %role, "User registered");
        Ok(tokens)
    }

    /// Log in with username and password.
    pub async fn login_native(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenPair, SessionError> {
        if username.is_empty() || password.is_empty() {
            return Err(SessionError::InvalidInput(
                "Email and password are required".into(),
            ));
        }

        let user = self
            .find_by_username(username)
            .await?
            .ok_or(SessionError::UserNotFound)?;

        if !verify_password(password, &user.password_hash).await? {
            return Err(SessionError::InvalidCredentials);
        }

        let tokens = self.start_session(&user).await?;
        info!(username = %user.username, "User logged in");
        Ok(tokens)
    }

    /// Register a user whose identity was verified by an external provider.
    /// Such users have no password and always get the `user` role.
    pub async fn register_imported(&self, identity: &str) -> Result<TokenPair, SessionError> {
        validate_username(identity).map_err(SessionError::InvalidInput)?;

        if self.find_by_username(identity).await?.is_some() {
            return Err(SessionError::UserAlreadyExists);
        }

        let tokens = self.create_user(identity, "", UserRole::User).await?;
        info!(username = %identity, "Imported user registered");
        Ok(tokens)
    }

    /// Log in a user whose identity was verified by an external provider.
    pub async fn login_imported(&self, identity: &str) -> Result<TokenPair, SessionError> {
        if identity.is_empty() {
            return Err(SessionError::InvalidInput("Identity is required".into()));
        }

        let user = self
            .find_by_username(identity)
            .await?
            .ok_or(SessionError::UserNotFound)?;

        let tokens = self.start_session(&user).await?;
        info!(username = %user.username, "Imported user logged in");
        Ok(tokens)
    }

    /// Log in an external identity, registering it on first sight.
    pub async fn sign_in_imported(&self, identity: &str) -> Result<TokenPair, SessionError> {
        match self.login_imported(identity).await {
            Err(SessionError::UserNotFound) => match self.register_imported(identity).await {
                // Lost a race with a concurrent first sign-in
                Err(SessionError::UserAlreadyExists) => self.login_imported(identity).await,
                other => other,
            },
            other => other,
        }
    }

    /// Exchange a refresh token for a new pair, rotating the stored token.
    ///
    /// `presented` must be byte-for-byte the token currently stored for the
    /// user. The rotation only succeeds if the stored token is still
    /// `presented` at write time, so of two concurrent refreshes with the
    /// same token exactly one wins.
    pub async fn refresh_tokens(
        &self,
        user_id: &str,
        presented: &str,
    ) -> Result<TokenPair, SessionError> {
        let user = self
            .bounded(self.store.get_by_id(user_id))
            .await?
            .ok_or(SessionError::UserNotFound)?;

        if user.refresh_token.is_empty() || user.refresh_token != presented {
            warn!(user_id = %user_id, "Refresh token does not match stored token");
            return Err(SessionError::RefreshTokenMismatch);
        }

        let tokens = self.issue_pair(&user.id, user.role)?;

        let swapped = self
            .bounded(
                self.store
                    .swap_refresh_token(&user.id, presented, &tokens.refresh_token),
            )
            .await?;
        if !swapped {
            warn!(user_id = %user_id, "Refresh token was rotated concurrently");
            return Err(SessionError::RefreshTokenMismatch);
        }

        Ok(tokens)
    }

    /// Revoke the user's refresh token.
    pub async fn log_out_user(&self, user_id: &str) -> Result<(), SessionError> {
        let cleared = self.bounded(self.store.clear_refresh_token(user_id)).await?;
        if !cleared {
            return Err(SessionError::UserNotFound);
        }
        info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, SessionError> {
        self.bounded(self.store.get_by_username(username)).await
    }

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<TokenPair, SessionError> {
        let id = uuid::Uuid::new_v4().to_string();
        let tokens = self.issue_pair(&id, role)?;

        self.bounded(self.store.create(&NewUser {
            id: &id,
            username,
            password_hash,
            role,
            refresh_token: &tokens.refresh_token,
        }))
        .await?;

        Ok(tokens)
    }

    /// Issue a new pair for an existing user and overwrite their stored
    /// refresh token.
    async fn start_session(&self, user: &User) -> Result<TokenPair, SessionError> {
        let tokens = self.issue_pair(&user.id, user.role)?;

        let updated = self
            .bounded(
                self.store
                    .update_refresh_token(&user.id, &tokens.refresh_token),
            )
            .await?;
        if !updated {
            return Err(SessionError::UserNotFound);
        }

        Ok(tokens)
    }

    fn issue_pair(&self, user_id: &str, role: UserRole) -> Result<TokenPair, SessionError> {
        Ok(TokenPair {
            access_token: self.codec.issue_access(role)?,
            refresh_token: self.codec.issue_refresh(user_id)?,
        })
    }

    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, SessionError> {
        Ok(bounded(self.config.store_timeout, fut).await?)
    }
}
