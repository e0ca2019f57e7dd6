//! Cookie and header parsing utilities for authentication.

use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::Response;

use crate::jwt::TokenLifetimes;
use crate::session::TokenPair;

/// Cookie name for the access token (short-lived, 15 minutes).
pub const ACCESS_COOKIE_NAME: &str = "access_token";

/// Cookie name for the refresh token (12 to 24 hours).
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// Set by the refresh endpoint right after a rotation. If the guard sees it
/// together with an expired access token, the refresh already happened once
/// for this request and is not attempted again.
pub const REFRESH_MARKER_COOKIE_NAME: &str = "refresh_attempted";

/// Lifetime of the refresh marker cookie in seconds.
pub const REFRESH_MARKER_MAX_AGE_SECS: u64 = 60;

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Builds the `Set-Cookie` values for session cookies.
#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    /// Add the `Secure` attribute (when served over HTTPS)
    pub secure: bool,
    pub access_max_age: u64,
    pub refresh_max_age: u64,
}

impl CookieSettings {
    /// Cookie lifetimes follow the lifetimes of the tokens they carry.
    pub fn new(secure: bool, lifetimes: TokenLifetimes) -> Self {
        Self {
            secure,
            access_max_age: lifetimes.access_secs,
            refresh_max_age: lifetimes.refresh_secs,
        }
    }

    fn build(&self, name: &str, value: &str, max_age: u64) -> String {
        let secure = if self.secure { "; Secure" } else { "" };
        format!(
            "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}{}",
            name, value, max_age, secure
        )
    }

    /// Cookies carrying a freshly issued token pair.
    pub fn session(&self, tokens: &TokenPair) -> [String; 2] {
        [
            self.build(ACCESS_COOKIE_NAME, &tokens.access_token, self.access_max_age),
            self.build(
                REFRESH_COOKIE_NAME,
                &tokens.refresh_token,
                self.refresh_max_age,
            ),
        ]
    }

    /// Cookies that remove the session and the refresh marker.
    pub fn cleared(&self) -> [String; 3] {
        [
            self.build(ACCESS_COOKIE_NAME, "", 0),
            self.build(REFRESH_COOKIE_NAME, "", 0),
            self.cleared_marker(),
        ]
    }

    pub fn marker(&self) -> String {
        self.build(REFRESH_MARKER_COOKIE_NAME, "1", REFRESH_MARKER_MAX_AGE_SECS)
    }

    pub fn cleared_marker(&self) -> String {
        self.build(REFRESH_MARKER_COOKIE_NAME, "", 0)
    }
}

/// Append `Set-Cookie` headers to a response.
pub fn append_cookies<I>(response: &mut Response, cookies: I)
where
    I: IntoIterator<Item = String>,
{
    let headers = response.headers_mut();
    for cookie in cookies {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            headers.append(header::SET_COOKIE, value);
        }
    }
}
