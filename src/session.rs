//! Session orchestration: signup, signin, refresh rotation, logout.
//!
//! The stored refresh-token digest is the sole source of truth for which
//! refresh token (if any) is currently valid. Every successful refresh
//! rotates it, so a captured, already-consumed token is useless even
//! before its nominal expiry.

use std::sync::Arc;

use crate::db::{Account, Database};
use crate::jwt::{JwtConfig, JwtError};
use crate::password;

/// A freshly minted access/refresh token pair. Never persisted as-is; the
/// refresh token is stored only as a bcrypt digest.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Failures surfaced by session operations.
#[derive(Debug)]
pub enum SessionError {
    /// Signup with an email that is already registered.
    DuplicateEmail,
    /// Signin with an unknown email or a wrong password. One variant for
    /// both cases so the response cannot be used for account enumeration.
    InvalidCredentials,
    /// Refresh with no active session, a consumed token, or a lost
    /// rotation race.
    Unauthorized,
    Hash(bcrypt::BcryptError),
    Token(JwtError),
    Database(sqlx::Error),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::DuplicateEmail => write!(f, "Email already registered"),
            SessionError::InvalidCredentials => write!(f, "Invalid credentials"),
            SessionError::Unauthorized => write!(f, "Unauthorized"),
            SessionError::Hash(e) => write!(f, "Hashing error: {}", e),
            SessionError::Token(e) => write!(f, "Token error: {}", e),
            SessionError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<sqlx::Error> for SessionError {
    fn from(e: sqlx::Error) -> Self {
        SessionError::Database(e)
    }
}

impl From<bcrypt::BcryptError> for SessionError {
    fn from(e: bcrypt::BcryptError) -> Self {
        SessionError::Hash(e)
    }
}

impl From<JwtError> for SessionError {
    fn from(e: JwtError) -> Self {
        SessionError::Token(e)
    }
}

/// Coordinates the hasher, token signer and account store. Constructed
/// explicitly with its collaborators; no global state.
#[derive(Clone)]
pub struct SessionService {
    db: Database,
    jwt: Arc<JwtConfig>,
}

impl SessionService {
    pub fn new(db: Database, jwt: Arc<JwtConfig>) -> Self {
        Self { db, jwt }
    }

    /// Create an account and start its first session.
    /// The email must already be normalized (trimmed, lowercased).
    pub async fn signup(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<(Account, TokenPair), SessionError> {
        if self.db.users().get_by_email(email).await?.is_some() {
            return Err(SessionError::DuplicateEmail);
        }

        let password_hash = password::hash(password)?;
        let uuid = uuid::Uuid::new_v4().to_string();
        let id = self
            .db
            .users()
            .create(&uuid, email, name, &password_hash)
            .await?;

        let (pair, digest) = self.issue_tokens(&uuid, email, name, id).await?;

        let account = Account {
            id,
            uuid,
            email: email.to_string(),
            name: name.to_string(),
            password_hash,
            refresh_token_hash: Some(digest),
        };
        Ok((account, pair))
    }

    /// Verify credentials and start a new session, replacing any previous one.
    pub async fn signin(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(Account, TokenPair), SessionError> {
        let mut account = self
            .db
            .users()
            .get_by_email(email)
            .await?
            .ok_or(SessionError::InvalidCredentials)?;

        if !password::verify(password, &account.password_hash) {
            return Err(SessionError::InvalidCredentials);
        }

        let (pair, digest) = self
            .issue_tokens(&account.uuid, &account.email, &account.name, account.id)
            .await?;
        account.refresh_token_hash = Some(digest);
        Ok((account, pair))
    }

    /// Exchange a refresh token for a new pair. The presented token must
    /// already have passed signature and expiry verification against the
    /// refresh secret; this checks it is the one currently on record and
    /// rotates the record to the replacement.
    pub async fn refresh(
        &self,
        uuid: &str,
        presented_token: &str,
    ) -> Result<(Account, TokenPair), SessionError> {
        let mut account = self
            .db
            .users()
            .get_by_uuid(uuid)
            .await?
            .ok_or(SessionError::Unauthorized)?;

        let stored = account
            .refresh_token_hash
            .take()
            .ok_or(SessionError::Unauthorized)?;

        // A token that no longer matches the stored digest has either been
        // consumed by a previous refresh or was never current: reuse or theft.
        if !password::verify_token(presented_token, &stored) {
            return Err(SessionError::Unauthorized);
        }

        let pair = self.mint_pair(&account.uuid, &account.email, &account.name)?;
        let new_digest = password::hash_token(&pair.refresh_token)?;

        // Conditional rotation keyed on the old digest: of two racing
        // refresh calls presenting the same token, only one can win.
        let rotated = self
            .db
            .users()
            .rotate_refresh_hash(account.id, &stored, &new_digest)
            .await?;
        if !rotated {
            return Err(SessionError::Unauthorized);
        }

        account.refresh_token_hash = Some(new_digest);
        Ok((account, pair))
    }

    /// End the session by clearing the stored digest. Idempotent.
    pub async fn logout(&self, uuid: &str) -> Result<(), SessionError> {
        if let Some(account) = self.db.users().get_by_uuid(uuid).await? {
            self.db.users().set_refresh_hash(account.id, None).await?;
        }
        Ok(())
    }

    /// Mint a pair and overwrite the stored digest (signup and signin paths).
    /// Returns the pair together with the digest that was stored.
    async fn issue_tokens(
        &self,
        uuid: &str,
        email: &str,
        name: &str,
        id: i64,
    ) -> Result<(TokenPair, String), SessionError> {
        let pair = self.mint_pair(uuid, email, name)?;
        let digest = password::hash_token(&pair.refresh_token)?;
        self.db.users().set_refresh_hash(id, Some(&digest)).await?;
        Ok((pair, digest))
    }

    fn mint_pair(&self, uuid: &str, email: &str, name: &str) -> Result<TokenPair, SessionError> {
        Ok(TokenPair {
            access_token: self.jwt.sign_access_token(uuid, email, name)?,
            refresh_token: self.jwt.sign_refresh_token(uuid, email, name)?,
        })
    }
}
