//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Serialize;

use super::cookie::append_cookies;

/// Path of the JSON refresh endpoint, reported with `token_expired`.
pub const API_REFRESH_PATH: &str = "/api/refresh";

pub const LOGIN_PATH: &str = "/login";

/// Internal auth error kind shared by the API and page guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    NotAuthenticated,
    TokenExpired,
    InvalidToken,
    InsufficientRole,
}

/// API authentication errors (returns JSON, optionally clearing cookies).
#[derive(Debug)]
pub struct ApiAuthError {
    pub(super) kind: AuthErrorKind,
    pub(super) clear_cookies: Vec<String>,
}

impl ApiAuthError {
    pub(super) fn new(kind: AuthErrorKind) -> Self {
        Self {
            kind,
            clear_cookies: Vec::new(),
        }
    }

    pub(super) fn clearing(kind: AuthErrorKind, cookies: impl IntoIterator<Item = String>) -> Self {
        Self {
            kind,
            clear_cookies: cookies.into_iter().collect(),
        }
    }

    pub fn kind(&self) -> AuthErrorKind {
        self.kind
    }

    fn status_code(&self) -> StatusCode {
        match self.kind {
            AuthErrorKind::NotAuthenticated
            | AuthErrorKind::TokenExpired
            | AuthErrorKind::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthErrorKind::InsufficientRole => StatusCode::FORBIDDEN,
        }
    }

    fn code(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::NotAuthenticated => "authentication_required",
            AuthErrorKind::TokenExpired => "token_expired",
            AuthErrorKind::InvalidToken => "invalid_token",
            AuthErrorKind::InsufficientRole => "insufficient_privilege",
        }
    }

    fn message(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::NotAuthenticated => "Authentication required",
            AuthErrorKind::TokenExpired => "Access token expired",
            AuthErrorKind::InvalidToken => "Invalid token",
            AuthErrorKind::InsufficientRole => "Insufficient permissions",
        }
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
            code: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            refresh_endpoint: Option<&'static str>,
        }

        let refresh_endpoint = match self.kind {
            AuthErrorKind::TokenExpired => Some(API_REFRESH_PATH),
            _ => None,
        };

        let mut response = (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
                code: self.code(),
                refresh_endpoint,
            }),
        )
            .into_response();

        append_cookies(&mut response, self.clear_cookies);
        response
    }
}

/// Page authentication errors (redirects for browsers).
#[derive(Debug)]
pub enum PageAuthError {
    /// Send the browser to the login page, clearing the given cookies
    Login { clear_cookies: Vec<String> },
    /// Send the browser through the refresh endpoint and back to `target`
    Refresh { target: String },
    Forbidden,
}

impl IntoResponse for PageAuthError {
    fn into_response(self) -> Response {
        match self {
            PageAuthError::Login { clear_cookies } => {
                let mut response = Redirect::to(LOGIN_PATH).into_response();
                append_cookies(&mut response, clear_cookies);
                response
            }
            PageAuthError::Refresh { target } => {
                let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
                Redirect::to(&format!("/refresh?redirect={}", encoded)).into_response()
            }
            PageAuthError::Forbidden => (
                StatusCode::FORBIDDEN,
                Html("<!DOCTYPE html><title>Forbidden</title><h1>403 Forbidden</h1><p>You do not have access to this page.</p>"),
            )
                .into_response(),
        }
    }
}
