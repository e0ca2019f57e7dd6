#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Response;
use msisdn_auth::credentials::{CredentialStore, NewUser, StoreError, User};
use msisdn_auth::db::{Database, UserRole};
use msisdn_auth::jwt::{ACCESS_TOKEN_DURATION_SECS, SigningAlgorithm, TokenCodec, TokenLifetimes};
use msisdn_auth::keys::PemPair;
use msisdn_auth::lookup::{LookupError, NumberInfo, NumberLookup};
use msisdn_auth::session::{SessionConfig, SessionService, TokenPair};
use msisdn_auth::{ServerConfig, create_app};

pub const PASSWORD: &str = "Passw0rd!";
pub const KNOWN_MSISDN: &str = "38640123456";

pub fn test_codec() -> Arc<TokenCodec> {
    Arc::new(
        TokenCodec::from_pems(
            SigningAlgorithm::EdDsa,
            &PemPair::new(
                include_bytes!("../../testdata/keys/access_private.pem").as_slice(),
                include_bytes!("../../testdata/keys/access_public.pem").as_slice(),
            ),
            &PemPair::new(
                include_bytes!("../../testdata/keys/refresh_private.pem").as_slice(),
                include_bytes!("../../testdata/keys/refresh_public.pem").as_slice(),
            ),
            TokenLifetimes::default(),
        )
        .unwrap(),
    )
}

/// Fast hashing for tests.
pub fn test_session_config() -> SessionConfig {
    SessionConfig {
        store_timeout: Duration::from_secs(5),
        password_cost: 4,
    }
}

/// Lookup backend that knows a single number.
pub struct FixedLookup;

#[async_trait]
impl NumberLookup for FixedLookup {
    async fn lookup(&self, msisdn: &str) -> Result<NumberInfo, LookupError> {
        if msisdn == KNOWN_MSISDN {
            Ok(NumberInfo {
                mno: "Telekom Slovenije".into(),
                country_code: "386".into(),
                subscriber_number: "40123456".into(),
                country_identifier: "SI".into(),
            })
        } else {
            Err(LookupError::NotFound)
        }
    }
}

pub struct TestApp {
    pub app: axum::Router,
    pub db: Database,
    pub codec: Arc<TokenCodec>,
    pub session: SessionService,
}

/// Helper to create a test app with an in-memory database.
pub async fn create_test_app() -> TestApp {
    let db = Database::open(":memory:").await.unwrap();
    let codec = test_codec();

    let config = ServerConfig {
        db: db.clone(),
        codec: codec.clone(),
        session: test_session_config(),
        secure_cookies: false,
        lookup: Arc::new(FixedLookup),
    };

    TestApp {
        app: create_app(&config),
        session: config.session_service(),
        db,
        codec,
    }
}

/// Register a native user and return their first token pair.
pub async fn register_user(session: &SessionService, username: &str, role: UserRole) -> TokenPair {
    session
        .register_native(username, PASSWORD, role)
        .await
        .unwrap()
}

/// An access token for `role` that expired a minute ago.
pub fn expired_access(codec: &TokenCodec, role: UserRole) -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    codec
        .issue_access_at(role, now - ACCESS_TOKEN_DURATION_SECS - 60)
        .unwrap()
}

/// Build a cookie header with auth tokens.
pub fn auth_cookies(access: &str, refresh: &str) -> String {
    format!("access_token={}; refresh_token={}", access, refresh)
}

/// Extract all Set-Cookie headers from response.
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Value of a cookie set by the response, unless it is being cleared.
pub fn set_cookie_value(cookies: &[String], name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    cookies
        .iter()
        .filter(|c| !c.contains("Max-Age=0"))
        .find_map(|c| c.strip_prefix(&prefix))
        .and_then(|rest| rest.split(';').next())
        .map(|value| value.to_string())
}

/// Check if cookies contain a cookie being cleared (Max-Age=0).
pub fn has_cleared_cookie(cookies: &[String], cookie_name: &str) -> bool {
    let prefix = format!("{}=;", cookie_name);
    cookies
        .iter()
        .any(|c| c.starts_with(&prefix) && c.contains("Max-Age=0"))
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

/// Credential store kept in memory. `delay` is applied to every call, with a
/// yield in between so concurrent callers interleave.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<String, User>>,
    delay: Option<Duration>,
}

impl MemoryStore {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            delay: Some(delay),
        }
    }

    pub fn stored_refresh_token(&self, id: &str) -> Option<String> {
        self.users
            .lock()
            .unwrap()
            .get(id)
            .map(|user| user.refresh_token.clone())
    }

    async fn pause(&self) {
        tokio::task::yield_now().await;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.pause().await;
        let users = self.users.lock().unwrap();
        Ok(users
            .values()
            .find(|user| user.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.pause().await;
        Ok(self.users.lock().unwrap().get(id).cloned())
    }

    async fn create(&self, user: &NewUser<'_>) -> Result<(), StoreError> {
        self.pause().await;
        let mut users = self.users.lock().unwrap();
        if users
            .values()
            .any(|existing| existing.username.eq_ignore_ascii_case(user.username))
        {
            return Err(StoreError::Conflict);
        }
        users.insert(
            user.id.to_string(),
            User {
                id: user.id.to_string(),
                username: user.username.to_string(),
                password_hash: user.password_hash.to_string(),
                role: user.role,
                refresh_token: user.refresh_token.to_string(),
            },
        );
        Ok(())
    }

    async fn update_refresh_token(&self, id: &str, token: &str) -> Result<bool, StoreError> {
        self.pause().await;
        match self.users.lock().unwrap().get_mut(id) {
            Some(user) => {
                user.refresh_token = token.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn swap_refresh_token(
        &self,
        id: &str,
        current: &str,
        next: &str,
    ) -> Result<bool, StoreError> {
        self.pause().await;
        match self.users.lock().unwrap().get_mut(id) {
            Some(user) if !user.refresh_token.is_empty() && user.refresh_token == current => {
                user.refresh_token = next.to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear_refresh_token(&self, id: &str) -> Result<bool, StoreError> {
        self.pause().await;
        match self.users.lock().unwrap().get_mut(id) {
            Some(user) => {
                user.refresh_token.clear();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
