//! Authentication error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Bearer authentication failure. Every kind answers 401 with a JSON body;
/// the client is not told whether the token was missing, malformed or
/// expired beyond the message.
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
}

impl AuthError {
    fn message(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "Not authenticated",
            AuthError::InvalidToken => "Invalid or expired token",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}
