//! JWT signing and verification for access and refresh tokens.
//!
//! Two independent secrets are used: one for short-lived access tokens and
//! one for long-lived refresh tokens. A token signed with one secret never
//! verifies against the other, so the token classes are not interchangeable.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Default access token lifetime: 15 minutes.
pub const DEFAULT_ACCESS_TTL_SECS: u64 = 15 * 60;

/// Default refresh token lifetime: 7 days.
pub const DEFAULT_REFRESH_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Claims carried by both token classes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account UUID)
    pub sub: String,
    /// Account email
    pub email: String,
    /// Display name
    pub name: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Unique token ID, set on refresh tokens only. Guarantees every
    /// rotation mints a distinct token even within the same second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// Keys and lifetimes for both token classes.
pub struct JwtConfig {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

impl JwtConfig {
    /// Create a configuration from the two secrets and token lifetimes.
    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl_secs: u64,
        refresh_ttl_secs: u64,
    ) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret),
            access_decoding: DecodingKey::from_secret(access_secret),
            refresh_encoding: EncodingKey::from_secret(refresh_secret),
            refresh_decoding: DecodingKey::from_secret(refresh_secret),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    /// Refresh token lifetime in seconds. Also used for the cookie Max-Age.
    pub fn refresh_ttl_secs(&self) -> u64 {
        self.refresh_ttl_secs
    }

    /// Sign a short-lived access token.
    pub fn sign_access_token(
        &self,
        sub: &str,
        email: &str,
        name: &str,
    ) -> Result<String, JwtError> {
        sign(
            &self.access_encoding,
            sub,
            email,
            name,
            self.access_ttl_secs,
            None,
        )
    }

    /// Sign a long-lived refresh token.
    pub fn sign_refresh_token(
        &self,
        sub: &str,
        email: &str,
        name: &str,
    ) -> Result<String, JwtError> {
        sign(
            &self.refresh_encoding,
            sub,
            email,
            name,
            self.refresh_ttl_secs,
            Some(uuid::Uuid::new_v4().to_string()),
        )
    }

    /// Verify and decode an access token.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        verify(&self.access_decoding, token)
    }

    /// Verify and decode a refresh token.
    pub fn verify_refresh_token(&self, token: &str) -> Result<Claims, JwtError> {
        verify(&self.refresh_decoding, token)
    }
}

fn sign(
    key: &EncodingKey,
    sub: &str,
    email: &str,
    name: &str,
    ttl_secs: u64,
    jti: Option<String>,
) -> Result<String, JwtError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| JwtError::TimeError)?
        .as_secs();

    let claims = Claims {
        sub: sub.to_string(),
        email: email.to_string(),
        name: name.to_string(),
        iat: now,
        exp: now + ttl_secs,
        jti,
    };

    jsonwebtoken::encode(&Header::default(), &claims, key).map_err(JwtError::Encoding)
}

fn verify(key: &DecodingKey, token: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // No clock-skew leeway beyond what the ttl already encodes.
    validation.leeway = 0;

    let token_data =
        jsonwebtoken::decode::<Claims>(token, key, &validation).map_err(classify_error)?;

    Ok(token_data.claims)
}

/// Map jsonwebtoken errors onto the expired/malformed/invalid taxonomy.
fn classify_error(e: jsonwebtoken::errors::Error) -> JwtError {
    use jsonwebtoken::errors::ErrorKind;
    match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => JwtError::Malformed,
        _ => JwtError::Invalid,
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Token lifetime has lapsed
    Expired,
    /// Structurally invalid input
    Malformed,
    /// Bad signature or otherwise unverifiable token
    Invalid,
    /// System time error
    TimeError,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Expired => write!(f, "Token expired"),
            JwtError::Malformed => write!(f, "Token malformed"),
            JwtError::Invalid => write!(f, "Token invalid"),
            JwtError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for JwtError {}
