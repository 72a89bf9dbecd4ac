//! Password and refresh-token hashing.
//!
//! Both passwords and refresh tokens are stored as bcrypt digests, so a
//! leaked database row never yields a usable credential. Tokens take a
//! separate path: bcrypt reads at most 72 bytes of input, and JWTs minted
//! for the same account share a common prefix longer than that, so tokens
//! are reduced to a fixed-width SHA-256 form before hashing. Passwords are
//! user-chosen and short; they are hashed as-is.

use base64::Engine;
use sha2::{Digest, Sha256};

/// Fixed bcrypt work factor. Bounds both attack cost and request latency.
pub const HASH_COST: u32 = 12;

/// Hash a plaintext password with the fixed work factor.
pub fn hash(plain: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(plain, HASH_COST)
}

/// Verify a plaintext password against a stored digest.
/// A malformed digest is treated as a mismatch, never an error.
pub fn verify(plain: &str, digest: &str) -> bool {
    bcrypt::verify(plain, digest).unwrap_or(false)
}

/// Hash a token for storage. Every byte of the token contributes to the
/// digest, so two tokens differing only past bcrypt's input window still
/// produce distinguishable digests.
pub fn hash_token(token: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(compress_token(token), HASH_COST)
}

/// Verify a token against a digest produced by [`hash_token`].
pub fn verify_token(token: &str, digest: &str) -> bool {
    bcrypt::verify(compress_token(token), digest).unwrap_or(false)
}

/// SHA-256 the token and base64 the result: 44 bytes, inside bcrypt's
/// 72-byte input window.
fn compress_token(token: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(Sha256::digest(token.as_bytes()))
}
