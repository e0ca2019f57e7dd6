//! bcrypt hashing, run on the blocking thread pool.

use super::SessionError;

/// Hash a password with the given bcrypt cost.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, SessionError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| SessionError::Unexpected(format!("hash task failed: {}", e)))?
        .map_err(|e| SessionError::Unexpected(format!("failed to hash password: {}", e)))
}

/// Check a password against a stored hash. An empty hash (an account created
/// through an external identity provider) never matches.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, SessionError> {
    if hash.is_empty() {
        return Ok(false);
    }

    let password = password.to_string();
    let hash = hash.to_string();
    let result = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| SessionError::Unexpected(format!("verify task failed: {}", e)))?;

    match result {
        Ok(valid) => Ok(valid),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is unreadable");
            Ok(false)
        }
    }
}
