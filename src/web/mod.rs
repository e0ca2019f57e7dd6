//! Browser-facing routes.

mod pages;
mod service;
mod session;

use axum::Router;
use std::sync::Arc;

use crate::auth::CookieSettings;
use crate::db::Database;
use crate::lookup::NumberLookup;
use crate::session::SessionService;

/// Where a browser lands after login, registration or a refresh without an
/// explicit target.
pub const DEFAULT_AFTER_LOGIN: &str = "/service/lookup";

pub const DEFAULT_AFTER_LOGOUT: &str = "/login";

/// Create the router for the browser pages.
pub fn create_web_router(
    db: Database,
    session: SessionService,
    lookup: Arc<dyn NumberLookup>,
    cookies: CookieSettings,
) -> Router {
    let codec = session.codec_handle();

    let service_state = service::ServiceState {
        db,
        store_timeout: session.store_timeout(),
        lookup,
        codec: codec.clone(),
        cookies,
    };

    let session_state = session::WebSessionState {
        session,
        codec,
        cookies,
    };

    Router::new()
        .merge(session::router(session_state))
        .merge(service::router(service_state))
}

/// Accept `raw` as a redirect target only if it is a local absolute path.
/// Anything else (absent, scheme-relative `//host`, backslashes, control
/// characters) yields `default`.
pub fn safe_redirect_target(raw: Option<&str>, default: &str) -> String {
    match raw {
        Some(target)
            if target.starts_with('/')
                && !target.starts_with("//")
                && !target.contains('\\')
                && !target.chars().any(char::is_control) =>
        {
            target.to_string()
        }
        _ => default.to_string(),
    }
}
