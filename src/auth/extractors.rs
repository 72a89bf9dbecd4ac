//! Axum extractor for bearer authentication.

use axum::{extract::FromRequestParts, http::header, http::request::Parts};

use super::errors::AuthError;
use super::state::HasAuthState;
use super::types::Principal;

/// Extractor for endpoints that require a valid access token.
/// Verifies the `Authorization: Bearer` header against the access secret
/// and hands the decoded principal to the handler as an argument.
pub struct Auth(pub Principal);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;

        let claims = state
            .jwt()
            .verify_access_token(token)
            .map_err(|_| AuthError::InvalidToken)?;

        Ok(Auth(Principal::from(claims)))
    }
}

/// Pull the token out of the `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}
