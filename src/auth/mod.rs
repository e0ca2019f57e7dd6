//! Token authentication with role-based access control.
//!
//! Dual-token system: short-lived access tokens (15 min, stateless) and
//! longer-lived refresh tokens (12 to 24 hours, one per user in the
//! credential store). Guarded browser routes send an expired session through
//! the refresh endpoint once; guarded API routes answer with JSON errors.

mod cookie;
mod errors;
mod extractors;
mod guard;
mod state;

pub use cookie::{
    ACCESS_COOKIE_NAME, CookieSettings, REFRESH_COOKIE_NAME, REFRESH_MARKER_COOKIE_NAME,
    REFRESH_MARKER_MAX_AGE_SECS, append_cookies, bearer_token, get_cookie,
};
pub use errors::{API_REFRESH_PATH, ApiAuthError, AuthErrorKind, LOGIN_PATH, PageAuthError};
pub use extractors::{CurrentUser, MaybeUser};
pub use guard::{
    AdminOnly, AnyRole, GuardDecision, PresentedTokens, RejectReason, RoleConstraint, decide,
    require_api, require_page,
};
pub use state::HasAuthBackend;
