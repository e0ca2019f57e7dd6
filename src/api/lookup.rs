//! Number lookup API endpoint (any authenticated user).

use std::sync::Arc;

use axum::{
    Json, Router, extract::State, middleware, response::IntoResponse, routing::post,
};
use serde::Deserialize;
use tracing::info;

use super::error::ApiError;
use crate::auth::{AnyRole, CookieSettings, CurrentUser, require_api};
use crate::impl_has_auth_backend;
use crate::jwt::TokenCodec;
use crate::lookup::{NumberLookup, normalize_msisdn};

#[derive(Clone)]
pub struct LookupState {
    pub lookup: Arc<dyn NumberLookup>,
    pub codec: Arc<TokenCodec>,
    pub cookies: CookieSettings,
}

impl_has_auth_backend!(LookupState);

pub fn router(state: LookupState) -> Router {
    Router::new()
        .route("/", post(lookup_number))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api::<LookupState, AnyRole>,
        ))
        .with_state(state)
}

#[derive(Deserialize)]
struct LookupRequest {
    msisdn: String,
}

async fn lookup_number(
    State(state): State<LookupState>,
    CurrentUser(claims): CurrentUser,
    Json(payload): Json<LookupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let msisdn = normalize_msisdn(&payload.msisdn)?;
    let info = state.lookup.lookup(&msisdn).await?;

    info!(role = %claims.role, country = %info.country_identifier, "Number looked up");
    Ok(Json(info))
}
