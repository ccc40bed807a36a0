use thiserror::Error;

/// Identity-core error types.
///
/// Each variant maps to an HTTP status code via [`AuthError::status_code`]
/// and to a stable machine-readable tag via [`AuthError::error_code`], so
/// transport adapters can build uniform error responses without matching on
/// variants themselves.
#[derive(Error, Debug)]
pub enum AuthError {
    // --- 400 Bad Request ---
    #[error("An account with this email already exists")]
    DuplicateEmail,

    #[error("Invalid verification code")]
    InvalidCode,

    #[error("Invalid verification link")]
    InvalidToken,

    #[error("Verification expired, request a new code")]
    Expired,

    #[error("The identity provider did not supply an email address")]
    MissingEmail,

    #[error("Validation error: {0}")]
    Validation(String),

    // --- 409 Conflict ---
    #[error("An account with this email already exists, sign in with the original method")]
    EmailConflict { existing_profile_id: String },

    // --- 429 Too Many Requests ---
    #[error("Too many verification attempts, request a new code")]
    AttemptsExceeded,

    // --- 500 Internal Server Error ---
    #[error("Verification message could not be sent: {0}")]
    Dispatch(String),

    #[error("Storage error: {0}")]
    Persistence(String),

    #[error("Profile creation failed: {0}")]
    ProfileCreation(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

impl AuthError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::DuplicateEmail
            | Self::InvalidCode
            | Self::InvalidToken
            | Self::Expired
            | Self::MissingEmail
            | Self::Validation(_) => 400,
            Self::EmailConflict { .. } => 409,
            Self::AttemptsExceeded => 429,
            Self::Dispatch(_)
            | Self::Persistence(_)
            | Self::ProfileCreation(_)
            | Self::PasswordHash(_) => 500,
        }
    }

    /// Stable tag for clients that branch on the failure kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateEmail => "EMAIL_ALREADY_EXISTS",
            Self::InvalidCode => "INVALID_CODE",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::Expired => "VERIFICATION_EXPIRED",
            Self::MissingEmail => "OAUTH_EMAIL_MISSING",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::EmailConflict { .. } => "EMAIL_CONFLICT",
            Self::AttemptsExceeded => "ATTEMPTS_EXCEEDED",
            Self::Dispatch(_) => "DISPATCH_FAILED",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
            Self::ProfileCreation(_) => "PROFILE_CREATION_FAILED",
            Self::PasswordHash(_) => "PASSWORD_HASH_ERROR",
        }
    }

    // --- Constructors ---

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }
}

#[cfg(feature = "sqlx-postgres")]
impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Persistence(err.to_string())
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
