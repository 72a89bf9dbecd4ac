//! Authentication API endpoints.
//!
//! - POST `/signup` - Create an account and start a session
//! - POST `/signin` - Password sign-in
//! - POST `/refresh` - Exchange the refresh cookie for a new token pair
//! - POST `/logout` - End the session and clear the cookie
//! - GET `/me` - Return the authenticated principal

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use crate::auth::{
    Auth, REFRESH_COOKIE_NAME, clear_refresh_cookie, get_cookie, refresh_cookie,
};
use crate::db::Account;
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;
use crate::session::SessionService;

#[derive(Clone)]
pub struct AuthState {
    pub sessions: SessionService,
    pub jwt: Arc<JwtConfig>,
    pub secure_cookies: bool,
}

impl_has_auth_state!(AuthState);

pub fn router(state: AuthState) -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .with_state(state)
}

#[derive(Deserialize)]
struct SignupRequest {
    email: String,
    name: String,
    password: String,
}

#[derive(Deserialize)]
struct SigninRequest {
    email: String,
    password: String,
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

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    user: UserBody,
    access_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: Option<String>,
}

async fn signup(
    State(state): State<AuthState>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&payload.email);
    validate_email(&email)?;
    let name = payload.name.trim();
    validate_name(name)?;
    validate_password(&payload.password)?;

    let (account, pair) = state.sessions.signup(&email, name, &payload.password).await?;

    let cookie = refresh_cookie(
        &pair.refresh_token,
        state.jwt.refresh_ttl_secs(),
        state.secure_cookies,
    );

    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, cookie)],
        Json(SessionResponse {
            user: UserBody::from(account),
            access_token: pair.access_token,
        }),
    ))
}

async fn signin(
    State(state): State<AuthState>,
    Json(payload): Json<SigninRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = normalize_email(&payload.email);

    let (account, pair) = state.sessions.signin(&email, &payload.password).await?;

    let cookie = refresh_cookie(
        &pair.refresh_token,
        state.jwt.refresh_ttl_secs(),
        state.secure_cookies,
    );

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(SessionResponse {
            user: UserBody::from(account),
            access_token: pair.access_token,
        }),
    ))
}

/// Exchange the refresh cookie for a new token pair, rotating the stored
/// token. An absent cookie means "no session" and is not an error; a token
/// that fails verification or was already consumed is.
async fn refresh(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<axum::response::Response, ApiError> {
    let Some(token) = get_cookie(&headers, REFRESH_COOKIE_NAME) else {
        return Ok(Json(RefreshResponse { access_token: None }).into_response());
    };

    let claims = state
        .jwt
        .verify_refresh_token(token)
        .map_err(|_| ApiError::unauthorized("Invalid or expired refresh token"))?;

    let (_, pair) = state.sessions.refresh(&claims.sub, token).await?;

    let cookie = refresh_cookie(
        &pair.refresh_token,
        state.jwt.refresh_ttl_secs(),
        state.secure_cookies,
    );

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(RefreshResponse {
            access_token: Some(pair.access_token),
        }),
    )
        .into_response())
}

async fn logout(
    State(state): State<AuthState>,
    Auth(principal): Auth,
) -> Result<impl IntoResponse, ApiError> {
    state.sessions.logout(&principal.id).await?;

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, clear_refresh_cookie(state.secure_cookies))],
        Json(serde_json::json!({ "success": true })),
    ))
}

async fn me(Auth(principal): Auth) -> impl IntoResponse {
    Json(serde_json::json!({ "user": principal }))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    };

    if !valid {
        return Err(ApiError::bad_request("email must be a valid email address"));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.len() < 3 {
        return Err(ApiError::bad_request(
            "name must be at least 3 characters long",
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::bad_request(
            "password must be at least 8 characters long",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(ApiError::bad_request(
            "password must contain at least one letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ApiError::bad_request(
            "password must contain at least one number",
        ));
    }
    if password.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ApiError::bad_request(
            "password must contain at least one special character",
        ));
    }
    Ok(())
}
