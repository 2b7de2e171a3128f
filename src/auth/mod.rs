//! Password hashing and verification.
//!
//! Hashes are Argon2id PHC strings with a random per-password salt. Both
//! operations are CPU-bound, so the async wrappers run them on the blocking pool.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

use crate::db::Repository;
use crate::errors::AppError;

/// Error types for password operations
#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("Invalid password hash format: {0}")]
    InvalidHashFormat(String),
}

/// Hash a password with Argon2id default parameters.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

/// Verify a password against a stored PHC hash.
///
/// Returns `Ok(false)` on mismatch; errors are reserved for unreadable hashes.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHashFormat(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}

/// Hash on the blocking thread pool.
pub async fn hash_password_blocking(password: String) -> Result<String, AppError> {
    let hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;
    Ok(hash)
}

/// Verify on the blocking thread pool.
pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool, AppError> {
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await??;
    Ok(matches)
}

/// Create `username` unless it already exists. Returns whether a user was created.
pub async fn seed_user(repo: &Repository, username: &str, password: &str) -> Result<bool, AppError> {
    if repo.get_user_by_username(username).await?.is_some() {
        return Ok(false);
    }

    let hash = hash_password_blocking(password.to_string()).await?;
    match repo.create_user(username, &hash).await {
        Ok(_) => Ok(true),
        // Another instance seeded it first.
        Err(AppError::Conflict(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_argon2id_phc() {
        let hash = hash_password("TestPassword123!").expect("Failed to hash password");
        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
        assert!(!hash.contains("TestPassword123!"));
    }

    #[test]
    fn test_verify_password_correct_and_incorrect() {
        let hash = hash_password("CorrectPassword123!").unwrap();
        assert!(verify_password("CorrectPassword123!", &hash).unwrap());
        assert!(!verify_password("WrongPassword123!", &hash).unwrap());
        assert!(!verify_password("correctpassword123!", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        let result = verify_password("AnyPassword", "not-a-phc-string");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat(_))));
    }

    #[test]
    fn test_hashes_are_salted() {
        let hash1 = hash_password("SamePassword").unwrap();
        let hash2 = hash_password("SamePassword").unwrap();
        assert_ne!(hash1, hash2);
        assert!(verify_password("SamePassword", &hash1).unwrap());
        assert!(verify_password("SamePassword", &hash2).unwrap());
    }

    #[tokio::test]
    async fn test_blocking_wrappers() {
        let hash = hash_password_blocking("pw".to_string()).await.unwrap();
        assert!(verify_password_blocking("pw".to_string(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password_blocking("nope".to_string(), hash)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_seed_user_is_idempotent() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let database = crate::config::DatabaseConfig::Sqlite {
            path: temp_dir.path().join("seed.sqlite"),
        };
        let pool = crate::db::init_database(&database, 1).await.unwrap();
        let repo = Repository::new(pool);

        assert!(seed_user(&repo, "admin", "first").await.unwrap());
        assert!(!seed_user(&repo, "admin", "second").await.unwrap());

        // The original password survives a second seed
        let user = repo.get_user_by_username("admin").await.unwrap().unwrap();
        assert!(verify_password("first", &user.password_hash).unwrap());
        assert!(!verify_password("second", &user.password_hash).unwrap());
    }
}
