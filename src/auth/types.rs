//! Authenticated identity types.

use serde::Serialize;

use crate::jwt::Claims;

/// The verified identity of an authorized request, decoded from the
/// access token. Handlers receive this as an explicit argument.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    /// Account UUID (the token subject)
    pub id: String,
    pub email: String,
    pub name: String,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
        }
    }
}
