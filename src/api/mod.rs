mod admin;
mod error;
mod lookup;
mod session;

use axum::Router;
use std::sync::Arc;

use crate::auth::CookieSettings;
use crate::db::Database;
use crate::lookup::NumberLookup;
use crate::session::SessionService;

pub use error::{ApiError, BAD_CREDENTIALS_MESSAGE};

/// Create the API router.
pub fn create_api_router(
    db: Database,
    session: SessionService,
    lookup: Arc<dyn NumberLookup>,
    cookies: CookieSettings,
) -> Router {
    let codec = session.codec_handle();

    let lookup_state = lookup::LookupState {
        lookup,
        codec: codec.clone(),
        cookies,
    };

    let admin_state = admin::AdminState {
        db,
        store_timeout: session.store_timeout(),
        codec,
        cookies,
    };

    let session_state = session::SessionState { session, cookies };

    Router::new()
        .merge(session::router(session_state))
        .nest("/lookup", lookup::router(lookup_state))
        .nest("/admin", admin::router(admin_state))
}
