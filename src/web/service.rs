//! Guarded browser pages.
//!
//! - GET/POST `/service/lookup` - Number lookup form (any authenticated user)
//! - GET `/admin/panel` - User listing (admin only)

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Form, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::{error, warn};

use super::pages;
use crate::auth::{AdminOnly, AnyRole, CookieSettings, require_page};
use crate::credentials::bounded;
use crate::db::Database;
use crate::impl_has_auth_backend;
use crate::jwt::TokenCodec;
use crate::lookup::{LookupError, NumberLookup, normalize_msisdn};

#[derive(Clone)]
pub struct ServiceState {
    pub db: Database,
    pub store_timeout: Duration,
    pub lookup: Arc<dyn NumberLookup>,
    pub codec: Arc<TokenCodec>,
    pub cookies: CookieSettings,
}

impl_has_auth_backend!(ServiceState);

pub fn router(state: ServiceState) -> Router {
    let user_routes = Router::new()
        .route("/service/lookup", get(lookup_form).post(lookup_number))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_page::<ServiceState, AnyRole>,
        ));

    let admin_routes = Router::new()
        .route("/admin/panel", get(admin_panel))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_page::<ServiceState, AdminOnly>,
        ));

    Router::new()
        .merge(user_routes)
        .merge(admin_routes)
        .with_state(state)
}

#[derive(Deserialize)]
struct LookupForm {
    msisdn: String,
}

async fn lookup_form() -> Html<String> {
    Html(pages::lookup("", None, None))
}

async fn lookup_number(State(state): State<ServiceState>, Form(form): Form<LookupForm>) -> Response {
    let result = match normalize_msisdn(&form.msisdn) {
        Ok(msisdn) => state.lookup.lookup(&msisdn).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(info) => Html(pages::lookup(&form.msisdn, Some(&info), None)).into_response(),
        Err(LookupError::InvalidNumber(message)) => (
            StatusCode::BAD_REQUEST,
            Html(pages::lookup(&form.msisdn, None, Some(&message))),
        )
            .into_response(),
        Err(LookupError::NotFound) => (
            StatusCode::NOT_FOUND,
            Html(pages::lookup(&form.msisdn, None, Some("Number not found"))),
        )
            .into_response(),
        Err(LookupError::Unavailable(message)) => {
            warn!(error = %message, "Number lookup unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Html(pages::lookup(
                    &form.msisdn,
                    None,
                    Some("Number lookup is unavailable, please try again later"),
                )),
            )
                .into_response()
        }
    }
}

async fn admin_panel(State(state): State<ServiceState>) -> Response {
    match bounded(state.store_timeout, state.db.users().list()).await {
        Ok(users) => Html(pages::admin_panel(&users)).into_response(),
        Err(e) => {
            error!("Failed to list users: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Html(pages::internal_error())).into_response()
        }
    }
}
