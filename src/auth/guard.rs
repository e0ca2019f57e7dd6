//! Per-request route guard.
//!
//! [`decide`] is the pure decision procedure: given the presented tokens it
//! forwards the request, asks for a login, asks for a refresh or rejects.
//! The middleware functions map a decision to a browser response (redirects)
//! or an API response (JSON errors).

use axum::{
    extract::{OriginalUri, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::cookie::{
    ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, REFRESH_MARKER_COOKIE_NAME, append_cookies,
    bearer_token, get_cookie,
};
use super::errors::{ApiAuthError, AuthErrorKind, PageAuthError};
use super::extractors::CurrentUser;
use super::state::HasAuthBackend;
use crate::db::UserRole;
use crate::jwt::{AccessClaims, TokenCodec, TokenError};

/// Role requirement of a route group.
pub trait RoleConstraint: Send + Sync + 'static {
    fn allows(role: UserRole) -> bool;
}

/// Any authenticated user (`user` or `admin`).
pub struct AnyRole;

impl RoleConstraint for AnyRole {
    fn allows(_role: UserRole) -> bool {
        true
    }
}

/// Only `admin`.
pub struct AdminOnly;

impl RoleConstraint for AdminOnly {
    fn allows(role: UserRole) -> bool {
        role == UserRole::Admin
    }
}

/// Tokens presented with a request. Empty values count as absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresentedTokens<'a> {
    pub access: Option<&'a str>,
    pub refresh: Option<&'a str>,
    pub refresh_attempted: bool,
}

impl<'a> PresentedTokens<'a> {
    /// The bearer header takes precedence over the access cookie.
    pub fn from_headers(headers: &'a axum::http::HeaderMap) -> Self {
        let non_empty = |value: Option<&'a str>| value.filter(|v| !v.is_empty());

        Self {
            access: bearer_token(headers).or_else(|| non_empty(get_cookie(headers, ACCESS_COOKIE_NAME))),
            refresh: non_empty(get_cookie(headers, REFRESH_COOKIE_NAME)),
            refresh_attempted: non_empty(get_cookie(headers, REFRESH_MARKER_COOKIE_NAME))
                .is_some(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Access token could not be decoded
    MalformedAccess,
    /// Access token has a bad signature, wrong algorithm or future `nbf`
    InvalidAccess,
    /// Access token expired and no refresh token was presented
    RefreshMissing,
    /// Access token expired and the refresh token does not verify
    RefreshInvalid,
    /// Access token still expired although a refresh just happened
    RefreshAlreadyAttempted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Forward(AccessClaims),
    NoToken,
    InsufficientRole(UserRole),
    /// Access token expired (or absent) with a valid refresh token
    RefreshRequired,
    Rejected(RejectReason),
}

/// Decide what to do with a request for a route guarded by `R`.
pub fn decide<R: RoleConstraint>(codec: &TokenCodec, tokens: &PresentedTokens<'_>) -> GuardDecision {
    let Some(access) = tokens.access else {
        // Browsers drop the access cookie once its Max-Age is reached, so a
        // lone refresh token means the access token expired.
        return match tokens.refresh {
            None => GuardDecision::NoToken,
            Some(_) => after_expiry(codec, tokens),
        };
    };

    match codec.verify_access(access) {
        Ok(claims) if R::allows(claims.role) => GuardDecision::Forward(claims),
        Ok(claims) => GuardDecision::InsufficientRole(claims.role),
        Err(TokenError::Expired) => after_expiry(codec, tokens),
        Err(TokenError::Malformed) => GuardDecision::Rejected(RejectReason::MalformedAccess),
        Err(_) => GuardDecision::Rejected(RejectReason::InvalidAccess),
    }
}

fn after_expiry(codec: &TokenCodec, tokens: &PresentedTokens<'_>) -> GuardDecision {
    if tokens.refresh_attempted {
        return GuardDecision::Rejected(RejectReason::RefreshAlreadyAttempted);
    }

    match tokens.refresh {
        None => GuardDecision::Rejected(RejectReason::RefreshMissing),
        Some(refresh) => match codec.verify_refresh(refresh) {
            Ok(_) => GuardDecision::RefreshRequired,
            Err(_) => GuardDecision::Rejected(RejectReason::RefreshInvalid),
        },
    }
}

/// Middleware for browser routes: failures become redirects.
pub async fn require_page<S, R>(State(state): State<S>, request: Request, next: Next) -> Response
where
    S: HasAuthBackend + Clone + Send + Sync + 'static,
    R: RoleConstraint,
{
    let (decision, refresh_attempted) = {
        let tokens = PresentedTokens::from_headers(request.headers());
        (decide::<R>(state.codec(), &tokens), tokens.refresh_attempted)
    };

    match decision {
        GuardDecision::Forward(claims) => forward(request, next, claims, refresh_attempted, &state).await,
        GuardDecision::NoToken => PageAuthError::Login {
            clear_cookies: Vec::new(),
        }
        .into_response(),
        GuardDecision::InsufficientRole(role) => {
            debug!(role = %role, path = %request.uri().path(), "Insufficient role for page");
            PageAuthError::Forbidden.into_response()
        }
        GuardDecision::RefreshRequired => {
            let target = original_target(&request);
            PageAuthError::Refresh { target }.into_response()
        }
        GuardDecision::Rejected(reason) => {
            log_rejection(reason);
            PageAuthError::Login {
                clear_cookies: state.cookies().cleared().into(),
            }
            .into_response()
        }
    }
}

/// Middleware for JSON API routes: failures become 401/403 JSON errors.
pub async fn require_api<S, R>(State(state): State<S>, request: Request, next: Next) -> Response
where
    S: HasAuthBackend + Clone + Send + Sync + 'static,
    R: RoleConstraint,
{
    let (decision, refresh_attempted) = {
        let tokens = PresentedTokens::from_headers(request.headers());
        (decide::<R>(state.codec(), &tokens), tokens.refresh_attempted)
    };

    match decision {
        GuardDecision::Forward(claims) => forward(request, next, claims, refresh_attempted, &state).await,
        GuardDecision::NoToken => ApiAuthError::new(AuthErrorKind::NotAuthenticated).into_response(),
        GuardDecision::InsufficientRole(_) => {
            ApiAuthError::new(AuthErrorKind::InsufficientRole).into_response()
        }
        GuardDecision::RefreshRequired => {
            ApiAuthError::new(AuthErrorKind::TokenExpired).into_response()
        }
        // Bearer clients keep the refresh token themselves
        GuardDecision::Rejected(RejectReason::RefreshMissing) => {
            ApiAuthError::clearing(AuthErrorKind::TokenExpired, state.cookies().cleared())
                .into_response()
        }
        GuardDecision::Rejected(reason) => {
            log_rejection(reason);
            ApiAuthError::clearing(AuthErrorKind::InvalidToken, state.cookies().cleared())
                .into_response()
        }
    }
}

async fn forward<S: HasAuthBackend>(
    mut request: Request,
    next: Next,
    claims: AccessClaims,
    refresh_attempted: bool,
    state: &S,
) -> Response {
    request.extensions_mut().insert(CurrentUser(claims));
    let mut response = next.run(request).await;
    if refresh_attempted {
        append_cookies(&mut response, [state.cookies().cleared_marker()]);
    }
    response
}

/// Path and query of the request as the client sent it, before any nesting.
fn original_target(request: &Request) -> String {
    let uri = match request.extensions().get::<OriginalUri>() {
        Some(OriginalUri(uri)) => uri.clone(),
        None => request.uri().clone(),
    };
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string())
}

fn log_rejection(reason: RejectReason) {
    match reason {
        RejectReason::MalformedAccess | RejectReason::RefreshMissing => {
            debug!(?reason, "Rejected request")
        }
        RejectReason::InvalidAccess
        | RejectReason::RefreshInvalid
        | RejectReason::RefreshAlreadyAttempted => warn!(?reason, "Rejected request"),
    }
}
