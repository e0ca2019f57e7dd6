//! Axum extractors for authentication.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::errors::{ApiAuthError, AuthErrorKind};
use super::guard::PresentedTokens;
use super::state::HasAuthBackend;
use crate::jwt::AccessClaims;

/// Claims of the access token that let the request through the guard.
///
/// Inserted into the request extensions by the guard middleware; extracting
/// it on a route without a guard fails with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AccessClaims);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiAuthError::new(AuthErrorKind::NotAuthenticated))
    }
}

/// Optional authentication for public pages - never fails.
/// Only a currently valid access token counts; no refresh is attempted.
pub struct MaybeUser(pub Option<AccessClaims>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = PresentedTokens::from_headers(&parts.headers);
        let claims = tokens
            .access
            .and_then(|token| state.codec().verify_access(token).ok());
        Ok(MaybeUser(claims))
    }
}
