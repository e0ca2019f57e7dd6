//! Admin API endpoints.
//!
//! All endpoints require admin role.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get},
};
use tracing::info;

use super::error::{ApiError, ResultExt, validate_uuid};
use crate::auth::{AdminOnly, CookieSettings, require_api};
use crate::credentials::bounded;
use crate::db::Database;
use crate::impl_has_auth_backend;
use crate::jwt::TokenCodec;

/// State for admin endpoints.
#[derive(Clone)]
pub struct AdminState {
    pub db: Database,
    pub store_timeout: Duration,
    pub codec: Arc<TokenCodec>,
    pub cookies: CookieSettings,
}

impl_has_auth_backend!(AdminState);

pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/{id}", delete(delete_user))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api::<AdminState, AdminOnly>,
        ))
        .with_state(state)
}

/// List all users.
async fn list_users(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    let users = bounded(state.store_timeout, state.db.users().list())
        .await
        .db_err("Failed to list users")?;

    Ok(Json(users))
}

/// Remove a user. Their refresh token goes with the record, so the session
/// ends at the latest when the current access token expires.
async fn delete_user(
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&id)?;

    let users = state.db.users();
    let deleted = bounded(state.store_timeout, users.delete(&id))
        .await
        .db_err("Failed to delete user")?;

    if !deleted {
        return Err(ApiError::not_found("User not found"));
    }

    info!(user_id = %id, "User deleted by admin");
    Ok(StatusCode::NO_CONTENT)
}
