//! # Atelier Auth Core
//!
//! Shared abstractions for the atelier identity services: the error
//! taxonomy, domain types, store traits with an in-memory adapter (and an
//! optional Postgres adapter behind `sqlx-postgres`), and the collaborator
//! seams for outbound email, audit events, and secret hashing.

pub mod adapters;
pub mod audit;
pub mod email;
pub mod error;
pub mod password;
pub mod types;

// Re-export commonly used items
pub use adapters::{IdentityRegistry, MemoryStore, ProfileStore, VerificationStore};
#[cfg(feature = "sqlx-postgres")]
pub use adapters::PgStore;
pub use audit::{AuditEvent, AuditSeverity, AuditSink, NullAuditSink, TracingAuditSink};
pub use email::{ConsoleEmailProvider, EmailProvider};
pub use error::{AuthError, AuthResult};
pub use password::{hash_secret, verify_secret, PasswordHasher};
pub use types::{
    CallbackOutcome, CreateProfile, CreateVerificationRecord, ExternalIdentity, Profile,
    VerificationPurpose, VerificationRecord,
};
