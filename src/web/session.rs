//! Browser session routes.
//!
//! - GET `/` - Home page
//! - GET/POST `/login`, GET/POST `/register` - Forms; success sets the
//!   session cookies and redirects to the service
//! - GET `/refresh?redirect=` - Rotate the session and go back to `redirect`
//! - GET `/logout?redirect=` - Revoke the session and clear cookies
//!
//! POST `/refresh` and POST `/logout` redirect to their GET forms.

use std::sync::Arc;

use axum::{
    Form, Router,
    extract::{Query, RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::{debug, error, warn};

use super::pages;
use super::{DEFAULT_AFTER_LOGIN, DEFAULT_AFTER_LOGOUT, safe_redirect_target};
use crate::api::BAD_CREDENTIALS_MESSAGE;
use crate::auth::{CookieSettings, LOGIN_PATH, MaybeUser, REFRESH_COOKIE_NAME, append_cookies, get_cookie};
use crate::db::UserRole;
use crate::impl_has_auth_backend;
use crate::jwt::TokenCodec;
use crate::session::{SessionError, SessionService};

#[derive(Clone)]
pub struct WebSessionState {
    pub session: SessionService,
    pub codec: Arc<TokenCodec>,
    pub cookies: CookieSettings,
}

impl_has_auth_backend!(WebSessionState);

pub fn router(state: WebSessionState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/login", get(login_form).post(login))
        .route("/register", get(register_form).post(register))
        .route("/refresh", get(refresh).post(redirect_to_get_refresh))
        .route("/logout", get(logout).post(redirect_to_get_logout))
        .with_state(state)
}

#[derive(Deserialize, Default)]
struct RedirectQuery {
    redirect: Option<String>,
}

#[derive(Deserialize)]
struct LoginForm {
    email: String,
    password: String,
    redirect: Option<String>,
}

#[derive(Deserialize)]
struct RegisterForm {
    email: String,
    password: String,
}

async fn home(MaybeUser(claims): MaybeUser) -> Html<String> {
    Html(pages::home(claims.map(|c| c.role)))
}

async fn login_form(Query(query): Query<RedirectQuery>) -> Html<String> {
    Html(pages::login(None, "", query.redirect.as_deref()))
}

async fn login(State(state): State<WebSessionState>, Form(form): Form<LoginForm>) -> Response {
    let email = form.email.trim();
    let redirect = form.redirect.as_deref();

    match state.session.login_native(email, &form.password).await {
        Ok(tokens) => {
            let target = safe_redirect_target(redirect, DEFAULT_AFTER_LOGIN);
            let mut response = Redirect::to(&target).into_response();
            append_cookies(&mut response, state.cookies.session(&tokens));
            response
        }
        Err(SessionError::InvalidInput(message)) => (
            StatusCode::BAD_REQUEST,
            Html(pages::login(Some(&message), email, redirect)),
        )
            .into_response(),
        Err(SessionError::UserNotFound | SessionError::InvalidCredentials) => (
            StatusCode::UNAUTHORIZED,
            Html(pages::login(Some(BAD_CREDENTIALS_MESSAGE), email, redirect)),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Login failed");
            internal_error()
        }
    }
}

async fn register_form() -> Html<String> {
    Html(pages::register(None, ""))
}

async fn register(State(state): State<WebSessionState>, Form(form): Form<RegisterForm>) -> Response {
    let email = form.email.trim();

    match state
        .session
        .register_native(email, &form.password, UserRole::User)
        .await
    {
        Ok(tokens) => {
            let mut response = Redirect::to(DEFAULT_AFTER_LOGIN).into_response();
            append_cookies(&mut response, state.cookies.session(&tokens));
            response
        }
        Err(SessionError::InvalidInput(message)) => (
            StatusCode::BAD_REQUEST,
            Html(pages::register(Some(&message), email)),
        )
            .into_response(),
        Err(SessionError::UserAlreadyExists) => (
            StatusCode::CONFLICT,
            Html(pages::register(Some("Email already in use"), email)),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Registration failed");
            internal_error()
        }
    }
}

/// Rotate the session using the refresh cookie, then send the browser back
/// to where the guard intercepted it.
async fn refresh(
    State(state): State<WebSessionState>,
    Query(query): Query<RedirectQuery>,
    headers: HeaderMap,
) -> Response {
    let target = safe_redirect_target(query.redirect.as_deref(), DEFAULT_AFTER_LOGIN);

    let Some(raw) = get_cookie(&headers, REFRESH_COOKIE_NAME).filter(|t| !t.is_empty()) else {
        return to_login(&state);
    };

    let claims = match state.codec.verify_refresh(raw) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(error = %e, "Refresh cookie failed verification");
            return to_login(&state);
        }
    };

    match state.session.refresh_tokens(&claims.user_id, raw).await {
        Ok(tokens) => {
            let mut response = Redirect::to(&target).into_response();
            append_cookies(&mut response, state.cookies.session(&tokens));
            append_cookies(&mut response, [state.cookies.marker()]);
            response
        }
        Err(SessionError::RefreshTokenMismatch | SessionError::UserNotFound) => {
            warn!(user_id = %claims.user_id, "Refresh rejected, possible token replay");
            to_login(&state)
        }
        Err(e) => {
            error!(error = %e, "Refresh failed");
            internal_error()
        }
    }
}

/// Revoke the session (best effort) and clear the cookies.
async fn logout(
    State(state): State<WebSessionState>,
    Query(query): Query<RedirectQuery>,
    headers: HeaderMap,
) -> Response {
    let target = safe_redirect_target(query.redirect.as_deref(), DEFAULT_AFTER_LOGOUT);

    if let Some(raw) = get_cookie(&headers, REFRESH_COOKIE_NAME).filter(|t| !t.is_empty()) {
        match state.codec.verify_refresh(raw) {
            Ok(claims) => match state.session.log_out_user(&claims.user_id).await {
                Ok(()) | Err(SessionError::UserNotFound) => {}
                Err(e) => error!(error = %e, "Failed to revoke refresh token on logout"),
            },
            Err(e) => debug!(error = %e, "Logout with unverifiable refresh cookie"),
        }
    }

    let mut response = Redirect::to(&target).into_response();
    append_cookies(&mut response, state.cookies.cleared());
    response
}

async fn redirect_to_get_refresh(RawQuery(query): RawQuery) -> Redirect {
    Redirect::to(&with_query("/refresh", query))
}

async fn redirect_to_get_logout(RawQuery(query): RawQuery) -> Redirect {
    Redirect::to(&with_query("/logout", query))
}

fn with_query(path: &str, query: Option<String>) -> String {
    match query {
        Some(query) if !query.is_empty() => format!("{}?{}", path, query),
        _ => path.to_string(),
    }
}

fn to_login(state: &WebSessionState) -> Response {
    let mut response = Redirect::to(LOGIN_PATH).into_response();
    append_cookies(&mut response, state.cookies.cleared());
    response
}

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Html(pages::internal_error())).into_response()
}
