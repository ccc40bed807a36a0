//! Verification ledger: issue, track, and redeem short-lived proof of email
//! ownership.
//!
//! Each request produces one record carrying two independent credentials — a
//! numeric code for interactive entry and an opaque token for link clicks —
//! and one outbound message delivering both. Record state is derived on
//! every read from `verified_at`, `expires_at` and `attempts`; the ledger
//! never caches a status.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::rngs::OsRng;
use rand::Rng;
use uuid::Uuid;
use validator::ValidateEmail;

use atelier_auth_core::adapters::{IdentityRegistry, ProfileStore, VerificationStore};
use atelier_auth_core::email::EmailProvider;
use atelier_auth_core::password::{hash_secret, PasswordHasher};
use atelier_auth_core::types::{
    CreateVerificationRecord, VerificationPurpose, VerificationRecord,
};
use atelier_auth_core::{AuthError, AuthResult};


pub struct LedgerConfig {
    /// How long a code/link stays redeemable. Default: 10 minutes.
    pub code_expiry: Duration,
    /// Minimum gap between two verification messages to the same address.
    /// Default: 60 seconds.
    pub resend_cooldown: Duration,
    /// Failed code entries tolerated before the code channel locks for the
    /// record. Default: 5. The link channel is not attempt-limited.
    pub max_code_attempts: i32,
    /// Digits in the interactive code. Default: 6.
    pub code_length: u32,
    /// Application name used in outbound messages.
    pub app_name: String,
    /// Public base URL the verification link points at.
    pub base_url: String,
    /// Path of the link-redemption endpoint, appended to `base_url`.
    pub verify_path: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            code_expiry: Duration::minutes(10),
            resend_cooldown: Duration::seconds(60),
            max_code_attempts: 5,
            code_length: 6,
            app_name: "Atelier".to_string(),
            base_url: "http://localhost:3000".to_string(),
            verify_path: "/api/auth/verify-email".to_string(),
        }
    }
}

/// The verification service. Generic over the record/profile store and the
/// identity registry so tests can run fully in memory.
pub struct VerificationLedger<S, R> {
    config: LedgerConfig,
    store: Arc<S>,
    registry: Arc<R>,
    mailer: Arc<dyn EmailProvider>,
    hasher: Option<Arc<dyn PasswordHasher>>,
}

impl<S, R> VerificationLedger<S, R>
where
    S: VerificationStore + ProfileStore,
    R: IdentityRegistry,
{
    pub fn new(store: Arc<S>, registry: Arc<R>, mailer: Arc<dyn EmailProvider>) -> Self {
        Self {
            config: LedgerConfig::default(),
            store,
            registry,
            mailer,
            hasher: None,
        }
    }

    pub fn with_config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn code_expiry(mut self, expiry: Duration) -> Self {
        self.config.code_expiry = expiry;
        self
    }

    pub fn resend_cooldown(mut self, cooldown: Duration) -> Self {
        self.config.resend_cooldown = cooldown;
        self
    }

    pub fn max_code_attempts(mut self, cap: i32) -> Self {
        self.config.max_code_attempts = cap;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Override the default Argon2 secret hashing.
    pub fn custom_password_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Start a verification: refuse addresses that already have an account,
    /// mint both credentials, persist one record, and dispatch one message.
    ///
    /// A dispatch failure rolls the record back — a verification the user
    /// can never learn the code for must not survive.
    pub async fn create_verification(
        &self,
        email: &str,
        secret: Option<&str>,
        purpose: VerificationPurpose,
    ) -> AuthResult<()> {
        let email = normalize_email(email)?;

        // Two independent existence checks: the hosted identity registry and
        // the local profile table can disagree while an account is mid-flight.
        if self.registry.email_exists(&email).await? {
            return Err(AuthError::DuplicateEmail);
        }
        if self.store.get_profile_by_email(&email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        let code = generate_code(self.config.code_length);
        let token = Uuid::new_v4().to_string();
        let hashed_secret = match secret {
            Some(secret) => Some(hash_secret(self.hasher.as_ref(), secret).await?),
            None => None,
        };

        // Atomic replace: at most one active record per (email, purpose).
        self.store
            .replace_verification(CreateVerificationRecord {
                email: email.clone(),
                code: Some(code.clone()),
                token: token.clone(),
                hashed_secret,
                purpose,
                expires_at: Utc::now() + self.config.code_expiry,
            })
            .await?;

        let verify_url = format!(
            "{}{}?token={}",
            self.config.base_url, self.config.verify_path, token
        );
        let (subject, html, text) = compose_message(&self.config, &code, &verify_url);

        if let Err(err) = self.mailer.send(&email, &subject, &html, &text).await {
            if let Err(cleanup) = self.store.delete_by_token(&token).await {
                tracing::error!(
                    email = %email,
                    error = %cleanup,
                    "failed to roll back verification record after dispatch failure"
                );
            }
            tracing::warn!(email = %email, error = %err, "verification message dispatch failed");
            return Err(AuthError::Dispatch(err.to_string()));
        }

        tracing::info!(email = %email, purpose = %purpose, "verification message dispatched");
        Ok(())
    }

    /// Redeem the interactive code for the signup flow. Returns the record's
    /// token, the caller's capability to finalize the account.
    pub async fn verify_code(&self, email: &str, code: &str) -> AuthResult<String> {
        let email = normalize_email(email)?;

        let Some(record) = self
            .store
            .get_pending_by_code(&email, code, VerificationPurpose::Signup)
            .await?
        else {
            // A wrong guess still burns budget on whatever record is live
            // for the address. Best-effort: a counter miss must not mask the
            // InvalidCode outcome.
            if let Err(err) = self
                .store
                .increment_attempts(&email, VerificationPurpose::Signup)
                .await
            {
                tracing::warn!(email = %email, error = %err, "attempt counter update failed");
            }
            return Err(AuthError::InvalidCode);
        };

        let now = Utc::now();
        if record.is_expired(now) {
            return Err(AuthError::Expired);
        }
        if record.attempts_exhausted(self.config.max_code_attempts) {
            return Err(AuthError::AttemptsExceeded);
        }

        if !self.store.mark_verified(&record.id, now).await? {
            // Lost to a concurrent redemption; indistinguishable from a
            // consumed code on purpose.
            return Err(AuthError::InvalidCode);
        }

        tracing::info!(email = %email, "verification code redeemed");
        Ok(record.token)
    }

    /// Redeem the link token for the signup flow. Not attempt-limited.
    pub async fn verify_token(&self, token: &str) -> AuthResult<VerificationRecord> {
        let Some(mut record) = self
            .store
            .get_pending_by_token(token, VerificationPurpose::Signup)
            .await?
        else {
            return Err(AuthError::InvalidToken);
        };

        let now = Utc::now();
        if record.is_expired(now) {
            return Err(AuthError::Expired);
        }

        if !self.store.mark_verified(&record.id, now).await? {
            return Err(AuthError::InvalidToken);
        }

        record.verified_at = Some(now);
        tracing::info!(email = %record.email, "verification link redeemed");
        Ok(record)
    }

    /// Idempotent read of a consumed signup record, used by the finalize
    /// step to confirm a token was actually verified. Absence is `None`, not
    /// an error; the finalize step owns the user-facing failure.
    pub async fn verified_record(&self, token: &str) -> AuthResult<Option<VerificationRecord>> {
        self.store
            .get_verified_by_token(token, VerificationPurpose::Signup)
            .await
    }

    /// Unconditional delete by token, idempotent. Called exactly once after
    /// account finalization succeeds so the record cannot be reused.
    pub async fn delete_verification(&self, token: &str) -> AuthResult<()> {
        self.store.delete_by_token(token).await?;
        tracing::info!(token = %token, "verification record deleted");
        Ok(())
    }

    /// Whether a resend is allowed: true when no record exists for the
    /// address or the most recent one is older than the cooldown.
    pub async fn resend_allowed(&self, email: &str) -> AuthResult<bool> {
        let email = normalize_email(email)?;

        let Some(latest) = self
            .store
            .latest_verification(&email, VerificationPurpose::Signup)
            .await?
        else {
            return Ok(true);
        };

        Ok(Utc::now() - latest.created_at >= self.config.resend_cooldown)
    }

    /// Maintenance sweep removing records past their deadline.
    pub async fn purge_expired(&self) -> AuthResult<usize> {
        let purged = self.store.delete_expired_verifications().await?;
        if purged > 0 {
            tracing::debug!(purged, "expired verification records purged");
        }
        Ok(purged)
    }
}

fn normalize_email(raw: &str) -> AuthResult<String> {
    let email = raw.trim().to_ascii_lowercase();
    if !email.validate_email() {
        return Err(AuthError::validation(format!(
            "not a valid email address: {raw}"
        )));
    }
    Ok(email)
}

/// Uniform draw over [10^(n-1), 10^n): fixed width, no leading zero. The
/// code is a guessable low-entropy secret, so it comes from the OS CSPRNG.
fn generate_code(length: u32) -> String {
    let low = 10u64.pow(length - 1);
    let high = 10u64.pow(length);
    OsRng.gen_range(low..high).to_string()
}

fn compose_message(config: &LedgerConfig, code: &str, verify_url: &str) -> (String, String, String) {
    let minutes = config.code_expiry.num_minutes();
    let subject = format!("Your {} verification code", config.app_name);
    let html = format!(
        "<p>Your verification code is <strong>{code}</strong>.</p>\
         <p>You can also verify by clicking the link below:</p>\
         <p><a href=\"{verify_url}\">Verify Email</a></p>\
         <p>The code expires in {minutes} minutes.</p>"
    );
    let text = format!(
        "Your verification code is {code}. You can also verify at {verify_url} \
         The code expires in {minutes} minutes."
    );
    (subject, html, text)
}
