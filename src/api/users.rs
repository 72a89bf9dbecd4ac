//! User API endpoints.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use serde::Serialize;
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::auth::Auth;
use crate::db::{Account, Database};
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_state!(UsersState);

pub fn router(state: UsersState) -> Router {
    Router::new().route("/me", get(me)).with_state(state)
}

#[derive(Serialize)]
struct UserBody {
    id: String,
    email: String,
    name: String,
}

impl From<Account> for UserBody {
    fn from(account: Account) -> Self {
        Self {
            id: account.uuid,
            email: account.email,
            name: account.name,
        }
    }
}

/// Return the authenticated user's stored record. Unlike the claims echoed
/// by the auth resource, this reflects the database row, so it stays
/// accurate even if the account changed after the token was issued.
async fn me(
    State(state): State<UsersState>,
    Auth(principal): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let account = state
        .db
        .users()
        .get_by_uuid(&principal.id)
        .await
        .db_err("Failed to load user")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(
        serde_json::json!({ "user": UserBody::from(account) }),
    ))
}
