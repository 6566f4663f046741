//! Password hashing
//!
//! bcrypt is deliberately slow, so hashing and verification run on the
//! blocking pool instead of a runtime worker.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

pub async fn hash_password(password: String, cost: u32) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| PasswordError::Hashing(e.to_string()))?
        .map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// False for a wrong password or an unparsable hash
pub async fn verify_password(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("s3cret-pass".to_string(), 4).await.unwrap();
        assert_ne!(hash, "s3cret-pass");
        assert!(verify_password("s3cret-pass".to_string(), hash.clone()).await);
        assert!(!verify_password("wrong".to_string(), hash).await);
    }

    #[tokio::test]
    async fn test_garbage_hash_does_not_verify() {
        assert!(!verify_password("anything".to_string(), "not-a-hash".to_string()).await);
    }
}
