use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Why a verification record exists.
///
/// The purpose partitions every query: a record issued for one purpose is
/// invisible to operations running under another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationPurpose {
    #[serde(rename = "signup")]
    Signup,
    #[serde(rename = "reset-password")]
    ResetPassword,
}

impl VerificationPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::ResetPassword => "reset-password",
        }
    }
}

impl fmt::Display for VerificationPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationPurpose {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "signup" => Ok(Self::Signup),
            "reset-password" => Ok(Self::ResetPassword),
            other => Err(AuthError::persistence(format!(
                "unknown verification purpose: {other}"
            ))),
        }
    }
}

/// A pending or consumed email-verification attempt.
///
/// Record state is always derived from the fields on read: pending/consumed
/// from `verified_at` nullness, expiry from the clock, exhaustion from
/// `attempts`. There is no status column to drift out of sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub id: String,
    pub email: String,
    /// 6-digit interactive credential. Nullable once a flow no longer needs it.
    pub code: Option<String>,
    /// Opaque link-click credential, globally unique, independent of `code`.
    pub token: String,
    /// Password hash captured at request time. The hash never leaves the
    /// store boundary in serialized form.
    #[serde(skip)]
    pub hashed_secret: Option<String>,
    pub purpose: VerificationPurpose,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
    #[serde(rename = "verifiedAt")]
    pub verified_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl VerificationRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn attempts_exhausted(&self, cap: i32) -> bool {
        self.attempts >= cap
    }

    pub fn is_pending(&self) -> bool {
        self.verified_at.is_none()
    }
}

/// Creation data for a verification record. The store assigns `id`,
/// `created_at` and a zeroed attempt counter.
#[derive(Debug, Clone)]
pub struct CreateVerificationRecord {
    pub email: String,
    pub code: Option<String>,
    pub token: String,
    pub hashed_secret: Option<String>,
    pub purpose: VerificationPurpose,
    pub expires_at: DateTime<Utc>,
}

/// Account profile owned by the surrounding application.
///
/// `id` equals the external identity's subject id by convention (1:1).
/// Contact fields stay unset until the user completes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    #[serde(rename = "mainAddress")]
    pub main_address: Option<String>,
    #[serde(rename = "detailAddress")]
    pub detail_address: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Creation data for a profile provisioned on first OAuth login.
#[derive(Debug, Clone)]
pub struct CreateProfile {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

/// An already-authenticated identity handed over by an external provider.
/// Never persisted by this crate; consumed once per callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalIdentity {
    #[serde(rename = "subjectId")]
    pub subject_id: String,
    pub email: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    pub provider: String,
}

/// Result of reconciling an external identity against the profile store.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackOutcome {
    pub identity: ExternalIdentity,
    pub profile: Profile,
    #[serde(rename = "isNewUser")]
    pub is_new_user: bool,
}
