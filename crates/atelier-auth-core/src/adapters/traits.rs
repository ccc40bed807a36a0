use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AuthResult;
use crate::types::{
    CreateProfile, CreateVerificationRecord, Profile, VerificationPurpose, VerificationRecord,
};

/// Verification-record persistence operations.
///
/// Implementations own atomicity: `replace_verification` must be a single
/// atomic step (no delete-then-insert window), and `mark_verified` must be a
/// conditional update so that only one of two concurrent redemptions wins.
#[async_trait]
pub trait VerificationStore: Send + Sync + 'static {
    /// Insert a fresh record, evicting any prior record for the same
    /// (email, purpose) pair. The store assigns `id`, `created_at` and a
    /// zeroed attempt counter.
    async fn replace_verification(
        &self,
        create: CreateVerificationRecord,
    ) -> AuthResult<VerificationRecord>;

    /// Unconsumed record matching (email, code, purpose), if any.
    async fn get_pending_by_code(
        &self,
        email: &str,
        code: &str,
        purpose: VerificationPurpose,
    ) -> AuthResult<Option<VerificationRecord>>;

    /// Unconsumed record matching (token, purpose), if any.
    async fn get_pending_by_token(
        &self,
        token: &str,
        purpose: VerificationPurpose,
    ) -> AuthResult<Option<VerificationRecord>>;

    /// Consumed record matching (token, purpose), if any.
    async fn get_verified_by_token(
        &self,
        token: &str,
        purpose: VerificationPurpose,
    ) -> AuthResult<Option<VerificationRecord>>;

    /// Set `verified_at`, but only while it is still null. Returns whether
    /// this caller won the redemption.
    async fn mark_verified(&self, id: &str, verified_at: DateTime<Utc>) -> AuthResult<bool>;

    /// Atomically bump the attempt counter of the pending record for this
    /// address. Counting is keyed by email, not record id.
    async fn increment_attempts(
        &self,
        email: &str,
        purpose: VerificationPurpose,
    ) -> AuthResult<()>;

    /// Most recent record for (email, purpose) by creation time, consumed or
    /// not. Drives the resend cooldown.
    async fn latest_verification(
        &self,
        email: &str,
        purpose: VerificationPurpose,
    ) -> AuthResult<Option<VerificationRecord>>;

    /// Delete by token. Deleting a nonexistent token is not an error.
    async fn delete_by_token(&self, token: &str) -> AuthResult<()>;

    /// Remove every record past its deadline; returns how many went.
    async fn delete_expired_verifications(&self) -> AuthResult<usize>;
}

/// Profile persistence operations.
#[async_trait]
pub trait ProfileStore: Send + Sync + 'static {
    /// Insert a new profile; fails on id or email conflict.
    async fn create_profile(&self, create: CreateProfile) -> AuthResult<Profile>;
    async fn get_profile_by_id(&self, id: &str) -> AuthResult<Option<Profile>>;
    async fn get_profile_by_email(&self, email: &str) -> AuthResult<Option<Profile>>;
}

/// Lookup against the authoritative account-identity store (the hosted auth
/// service's user listing). Read-only from this crate's point of view.
#[async_trait]
pub trait IdentityRegistry: Send + Sync + 'static {
    async fn email_exists(&self, email: &str) -> AuthResult<bool>;
}
