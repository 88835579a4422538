//! Password hashing

use crate::error::{Error, Result};

/// Default bcrypt work factor
pub const DEFAULT_COST: u32 = 12;

/// bcrypt only reads the first 72 bytes of its input
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Hash a password with a random salt.
///
/// Passwords longer than [`MAX_PASSWORD_BYTES`] are rejected instead of
/// being silently truncated.
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(Error::Validation(format!(
            "Password must be at most {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }
    Ok(bcrypt::hash(password, cost)?)
}

/// Check a password against a stored hash. Malformed hashes never match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// [`hash_password`] on the blocking pool
pub async fn hash_password_async(password: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| Error::Other(format!("Hashing task failed: {}", e)))?
}

/// [`verify_password`] on the blocking pool
pub async fn verify_password_async(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .unwrap_or(false)
}

const DUMMY_PASSWORD: &str = "no-account-has-this-password";

/// A hash at `cost` that stands in for a missing account during login.
///
/// Fails with a config error when `cost` is outside bcrypt's range, so it
/// doubles as a startup check of `auth.bcrypt_cost`.
pub fn dummy_hash(cost: u32) -> Result<String> {
    bcrypt::hash(DUMMY_PASSWORD, cost)
        .map_err(|e| Error::Config(format!("Invalid bcrypt cost {}: {}", cost, e)))
}

/// Check a login attempt against the account's stored hash.
///
/// With no account the password is still run through bcrypt against
/// `dummy`, and the result is always `false`. Unknown emails and wrong
/// passwords take the same time.
pub async fn verify_login(password: String, stored: Option<String>, dummy: &str) -> bool {
    let known = stored.is_some();
    let hash = stored.unwrap_or_else(|| dummy.to_string());
    let matched = verify_password_async(password, hash).await;
    matched && known
}
