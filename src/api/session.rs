//! Session API endpoints for non-browser clients.
//!
//! - POST `/register` - Create an account, returns a token pair
//! - POST `/login` - Exchange credentials for a token pair
//! - POST `/refresh` - Rotate the refresh token, returns a new pair
//! - POST `/logout` - Revoke the refresh token
//!
//! Refresh and logout take `{"refresh_token": "..."}` and fall back to the
//! refresh cookie when the body does not carry one. Successful register,
//! login and refresh also set the session cookies; logout and rejected
//! refreshes clear them.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;
use tracing::{debug, error, warn};

use super::error::ApiError;
use crate::auth::{CookieSettings, REFRESH_COOKIE_NAME, append_cookies, get_cookie};
use crate::db::UserRole;
use crate::jwt::RefreshClaims;
use crate::session::{SessionError, SessionService, TokenPair};

#[derive(Clone)]
pub struct SessionState {
    pub session: SessionService,
    pub cookies: CookieSettings,
}

pub fn router(state: SessionState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .with_state(state)
}

#[derive(Deserialize)]
struct CredentialsRequest {
    email: String,
    password: String,
}

#[derive(Deserialize, Default)]
struct RefreshTokenRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

async fn register(
    State(state): State<SessionState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Response, ApiError> {
    let tokens = state
        .session
        .register_native(payload.email.trim(), &payload.password, UserRole::User)
        .await?;

    let mut response = (StatusCode::CREATED, Json(&tokens)).into_response();
    append_cookies(&mut response, state.cookies.session(&tokens));
    Ok(response)
}

async fn login(
    State(state): State<SessionState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Response, ApiError> {
    let tokens = state
        .session
        .login_native(payload.email.trim(), &payload.password)
        .await?;

    let mut response = Json(&tokens).into_response();
    append_cookies(&mut response, state.cookies.session(&tokens));
    Ok(response)
}

/// Rotate the session. Rejected refresh tokens also clear the session
/// cookies, so a cookie client is sent back to login.
async fn refresh(State(state): State<SessionState>, headers: HeaderMap, body: Bytes) -> Response {
    match rotate(&state, &headers, &body).await {
        Ok(tokens) => {
            let mut response = Json(&tokens).into_response();
            append_cookies(&mut response, state.cookies.session(&tokens));
            response
        }
        Err(e) => {
            let clear = matches!(e, ApiError::Unauthorized(_));
            let mut response = e.into_response();
            if clear {
                append_cookies(&mut response, state.cookies.cleared());
            }
            response
        }
    }
}

async fn rotate(
    state: &SessionState,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<TokenPair, ApiError> {
    let raw = presented_refresh_token(headers, body)?;
    let claims = verify(state, &raw)?;

    state
        .session
        .refresh_tokens(&claims.user_id, &raw)
        .await
        .map_err(|e| match e {
            SessionError::UserNotFound | SessionError::RefreshTokenMismatch => {
                warn!(user_id = %claims.user_id, "Refresh rejected, possible token replay");
                ApiError::invalid_refresh_token()
            }
            other => other.into(),
        })
}

/// Revoke the presented refresh token if it verifies, then clear the
/// session cookies regardless.
async fn logout(State(state): State<SessionState>, headers: HeaderMap, body: Bytes) -> Response {
    match presented_refresh_token(&headers, &body) {
        Ok(raw) => match state.session.codec().verify_refresh(&raw) {
            Ok(claims) => match state.session.log_out_user(&claims.user_id).await {
                Ok(()) | Err(SessionError::UserNotFound) => {}
                Err(e) => error!(error = %e, "Failed to revoke refresh token on logout"),
            },
            Err(e) => debug!(error = %e, "Logout with unverifiable refresh token"),
        },
        Err(_) => debug!("Logout without a refresh token"),
    }

    let mut response = StatusCode::NO_CONTENT.into_response();
    append_cookies(&mut response, state.cookies.cleared());
    response
}

/// Refresh token from the JSON body, or from the refresh cookie.
fn presented_refresh_token(headers: &HeaderMap, body: &Bytes) -> Result<String, ApiError> {
    let request: RefreshTokenRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RefreshTokenRequest::default()
    } else {
        serde_json::from_slice(body).map_err(|_| ApiError::bad_request("Invalid JSON body"))?
    };

    request
        .refresh_token
        .filter(|token| !token.is_empty())
        .or_else(|| {
            get_cookie(headers, REFRESH_COOKIE_NAME)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
        })
        .ok_or_else(|| ApiError::unauthorized("No refresh token"))
}

fn verify(state: &SessionState, raw: &str) -> Result<RefreshClaims, ApiError> {
    state.session.codec().verify_refresh(raw).map_err(|e| {
        warn!(error = %e, "Refresh token failed verification");
        ApiError::invalid_refresh_token()
    })
}
