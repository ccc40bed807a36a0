//! # Atelier Auth
//!
//! Identity core of the atelier storefront: time-boxed, attempt-limited,
//! dual-channel email verification and OAuth identity reconciliation.
//!
//! Two services compose the crate:
//!
//! - [`VerificationLedger`] issues and redeems short-lived proof of email
//!   ownership through a 6-digit code (interactive) and an opaque link token
//!   (passive), for signup and password-reset flows.
//! - [`IdentityReconciler`] maps a freshly-authenticated external identity
//!   to exactly one local profile, refusing to link on email collision so a
//!   provider-issued identity can never silently take over an existing
//!   account.
//!
//! Persistence, outbound email, and audit logging are reached through the
//! traits in [`atelier_auth_core`]; the crate owns no transport surface.

pub mod ledger;
pub mod oauth;

pub use ledger::{LedgerConfig, VerificationLedger};
pub use oauth::IdentityReconciler;

pub use atelier_auth_core::{
    AuditEvent, AuditSeverity, AuditSink, AuthError, AuthResult, CallbackOutcome,
    ConsoleEmailProvider, EmailProvider, ExternalIdentity, IdentityRegistry, MemoryStore,
    NullAuditSink, PasswordHasher, Profile, ProfileStore, TracingAuditSink, VerificationPurpose,
    VerificationRecord, VerificationStore,
};
