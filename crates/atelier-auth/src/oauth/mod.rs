//! Identity reconciliation: map a freshly-authenticated external identity to
//! exactly one local profile.
//!
//! The provider-issued subject id is trusted as stable, so a subject-id
//! match is the fast path and bypasses all email logic. An email match under
//! a *different* subject id is never linked automatically: auto-linking on
//! email is a known account-takeover vector when the provider's own email
//! verification is weaker than ours, so the conflict goes back to the user.

use std::sync::Arc;

use serde_json::json;

use atelier_auth_core::adapters::ProfileStore;
use atelier_auth_core::audit::{AuditEvent, AuditSeverity, AuditSink};
use atelier_auth_core::types::{CallbackOutcome, CreateProfile, ExternalIdentity, Profile};
use atelier_auth_core::{AuthError, AuthResult};


/// Pure decision function over (subject-id match, email match), with a
/// single possible insert when neither matches. Every outcome branch emits
/// exactly one audit event before returning.
pub struct IdentityReconciler<P> {
    profiles: Arc<P>,
    audit: Arc<dyn AuditSink>,
}

impl<P: ProfileStore> IdentityReconciler<P> {
    pub fn new(profiles: Arc<P>, audit: Arc<dyn AuditSink>) -> Self {
        Self { profiles, audit }
    }

    pub async fn handle_callback(&self, identity: ExternalIdentity) -> AuthResult<CallbackOutcome> {
        // Fast path for returning users.
        if let Some(profile) = self.profiles.get_profile_by_id(&identity.subject_id).await? {
            self.audit.record(
                AuditEvent::new(
                    "auth",
                    "oauth_login_success",
                    format!("{} sign-in", identity.provider),
                )
                .subject(identity.subject_id.as_str())
                .metadata(json!({
                    "provider": identity.provider,
                    "email": identity.email.clone().unwrap_or_default(),
                    "isNewUser": false,
                })),
            );
            tracing::info!(subject = %identity.subject_id, provider = %identity.provider, "returning user signed in");
            return Ok(CallbackOutcome {
                identity,
                profile,
                is_new_user: false,
            });
        }

        if let Some(email) = identity.email.as_deref() {
            if let Some(existing) = self.profiles.get_profile_by_email(email).await? {
                self.audit.record(
                    AuditEvent::new(
                        "auth",
                        "oauth_email_conflict",
                        format!(
                            "{} sign-in rejected, email belongs to an existing account",
                            identity.provider
                        ),
                    )
                    .subject(identity.subject_id.as_str())
                    .severity(AuditSeverity::Warning)
                    .metadata(json!({
                        "email": email,
                        "existingProfileId": existing.id,
                    })),
                );
                return Err(AuthError::EmailConflict {
                    existing_profile_id: existing.id,
                });
            }
        }

        let profile = self.provision_profile(&identity).await?;
        self.audit.record(
            AuditEvent::new(
                "auth",
                "oauth_signup_success",
                format!("{} sign-up, profile provisioned", identity.provider),
            )
            .subject(identity.subject_id.as_str())
            .metadata(json!({
                "provider": identity.provider,
                "email": identity.email.clone().unwrap_or_default(),
                "name": profile.name,
            })),
        );
        tracing::info!(subject = %identity.subject_id, provider = %identity.provider, "new user provisioned");
        Ok(CallbackOutcome {
            identity,
            profile,
            is_new_user: true,
        })
    }

    async fn provision_profile(&self, identity: &ExternalIdentity) -> AuthResult<Profile> {
        let Some(email) = identity.email.as_deref() else {
            // Reconciliation cannot proceed without an identifying email.
            return Err(AuthError::MissingEmail);
        };

        match self
            .profiles
            .create_profile(CreateProfile {
                id: identity.subject_id.clone(),
                email: email.to_string(),
                name: identity.display_name.clone(),
            })
            .await
        {
            Ok(profile) => Ok(profile),
            Err(err) => {
                self.audit.record(
                    AuditEvent::new(
                        "auth",
                        "oauth_profile_creation_failed",
                        format!("{} profile insert failed", identity.provider),
                    )
                    .subject(identity.subject_id.as_str())
                    .severity(AuditSeverity::Error)
                    .metadata(json!({
                        "email": email,
                        "error": err.to_string(),
                    })),
                );
                Err(AuthError::ProfileCreation(err.to_string()))
            }
        }
    }
}
