//! Secret hashing for verification requests.
//!
//! A signup request carries the user's chosen password before any account
//! exists to attach it to; only the hash is ever stored on the verification
//! record. The default algorithm is Argon2id with a fresh random salt.

use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher as Argon2PasswordHasher, PasswordVerifier};
use async_trait::async_trait;

use crate::error::{AuthError, AuthResult};

/// Custom hasher trait for pluggable hashing strategies. When provided to the
/// ledger this overrides the default Argon2 path.
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    /// Hash a plaintext secret and return the hash string.
    async fn hash(&self, secret: &str) -> AuthResult<String>;
    /// Verify a secret against a hash string.
    async fn verify(&self, hash: &str, secret: &str) -> AuthResult<bool>;
}

/// Hash `secret` using the custom `hasher` (if provided) or the default
/// Argon2 algorithm.
pub async fn hash_secret(
    hasher: Option<&Arc<dyn PasswordHasher>>,
    secret: &str,
) -> AuthResult<String> {
    if let Some(hasher) = hasher {
        return hasher.hash(secret).await;
    }

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| AuthError::PasswordHash(format!("failed to hash secret: {e}")))?;

    Ok(hash.to_string())
}

/// Verify `secret` against `hash` using the custom `hasher` (if provided) or
/// the default Argon2 algorithm. A mismatch is `Ok(false)`, not an error.
pub async fn verify_secret(
    hasher: Option<&Arc<dyn PasswordHasher>>,
    secret: &str,
    hash: &str,
) -> AuthResult<bool> {
    if let Some(hasher) = hasher {
        return hasher.verify(hash, secret).await;
    }

    let parsed = PasswordHash::new(hash)
        .map_err(|e| AuthError::PasswordHash(format!("invalid secret hash: {e}")))?;

    match Argon2::default().verify_password(secret.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::PasswordHash(format!(
            "failed to verify secret: {e}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify_round_trip() {
        let hash = hash_secret(None, "correct horse battery staple")
            .await
            .unwrap();
        assert_ne!(hash, "correct horse battery staple");
        assert!(hash.starts_with("$argon2"));

        assert!(verify_secret(None, "correct horse battery staple", &hash)
            .await
            .unwrap());
        assert!(!verify_secret(None, "wrong guess", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_hashes_are_salted() {
        let a = hash_secret(None, "same secret").await.unwrap();
        let b = hash_secret(None, "same secret").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_garbage_hash_is_an_error() {
        let err = verify_secret(None, "anything", "not-a-hash")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 500);
    }

    struct ReversingHasher;

    #[async_trait]
    impl PasswordHasher for ReversingHasher {
        async fn hash(&self, secret: &str) -> AuthResult<String> {
            Ok(secret.chars().rev().collect())
        }

        async fn verify(&self, hash: &str, secret: &str) -> AuthResult<bool> {
            Ok(hash.chars().rev().collect::<String>() == secret)
        }
    }

    #[tokio::test]
    async fn test_custom_hasher_overrides_default() {
        let hasher: Arc<dyn PasswordHasher> = Arc::new(ReversingHasher);
        let hash = hash_secret(Some(&hasher), "abc").await.unwrap();
        assert_eq!(hash, "cba");
        assert!(verify_secret(Some(&hasher), "abc", &hash).await.unwrap());
        assert!(!verify_secret(Some(&hasher), "abd", &hash).await.unwrap());
    }
}
