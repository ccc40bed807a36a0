use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::types::{
    CreateProfile, CreateVerificationRecord, Profile, VerificationPurpose, VerificationRecord,
};

use super::traits::{IdentityRegistry, ProfileStore, VerificationStore};

/// In-memory store for testing and development.
///
/// Implements all three store traits behind plain mutexes. Each trait method
/// takes its locks for the whole operation, which gives the memory adapter
/// the same atomicity the Postgres adapter gets from single statements.
pub struct MemoryStore {
    verifications: Mutex<HashMap<String, VerificationRecord>>,
    profiles: Mutex<HashMap<String, Profile>>,
    profile_email_index: Mutex<HashMap<String, String>>,
    identities: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an email as known to the hosted identity registry. The registry
    /// is independent of the profile table, matching the split between the
    /// platform's user listing and the application's own rows.
    pub fn register_identity(&self, email: impl Into<String>) {
        self.identities.lock().unwrap().insert(email.into());
    }

    pub fn verification_count(&self) -> usize {
        self.verifications.lock().unwrap().len()
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.lock().unwrap().len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            verifications: Mutex::new(HashMap::new()),
            profiles: Mutex::new(HashMap::new()),
            profile_email_index: Mutex::new(HashMap::new()),
            identities: Mutex::new(HashSet::new()),
        }
    }
}

#[async_trait]
impl VerificationStore for MemoryStore {
    async fn replace_verification(
        &self,
        create: CreateVerificationRecord,
    ) -> AuthResult<VerificationRecord> {
        let mut verifications = self.verifications.lock().unwrap();

        // Eviction and insert happen under one lock: at most one record per
        // (email, purpose) is ever observable.
        verifications.retain(|_, record| {
            !(record.email == create.email && record.purpose == create.purpose)
        });

        let record = VerificationRecord {
            id: Uuid::new_v4().to_string(),
            email: create.email,
            code: create.code,
            token: create.token,
            hashed_secret: create.hashed_secret,
            purpose: create.purpose,
            expires_at: create.expires_at,
            verified_at: None,
            attempts: 0,
            created_at: Utc::now(),
        };
        verifications.insert(record.id.clone(), record.clone());

        Ok(record)
    }

    async fn get_pending_by_code(
        &self,
        email: &str,
        code: &str,
        purpose: VerificationPurpose,
    ) -> AuthResult<Option<VerificationRecord>> {
        let verifications = self.verifications.lock().unwrap();
        Ok(verifications
            .values()
            .find(|r| {
                r.email == email
                    && r.code.as_deref() == Some(code)
                    && r.purpose == purpose
                    && r.verified_at.is_none()
            })
            .cloned())
    }

    async fn get_pending_by_token(
        &self,
        token: &str,
        purpose: VerificationPurpose,
    ) -> AuthResult<Option<VerificationRecord>> {
        let verifications = self.verifications.lock().unwrap();
        Ok(verifications
            .values()
            .find(|r| r.token == token && r.purpose == purpose && r.verified_at.is_none())
            .cloned())
    }

    async fn get_verified_by_token(
        &self,
        token: &str,
        purpose: VerificationPurpose,
    ) -> AuthResult<Option<VerificationRecord>> {
        let verifications = self.verifications.lock().unwrap();
        Ok(verifications
            .values()
            .find(|r| r.token == token && r.purpose == purpose && r.verified_at.is_some())
            .cloned())
    }

    async fn mark_verified(&self, id: &str, verified_at: DateTime<Utc>) -> AuthResult<bool> {
        let mut verifications = self.verifications.lock().unwrap();
        match verifications.get_mut(id) {
            Some(record) if record.verified_at.is_none() => {
                record.verified_at = Some(verified_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment_attempts(
        &self,
        email: &str,
        purpose: VerificationPurpose,
    ) -> AuthResult<()> {
        let mut verifications = self.verifications.lock().unwrap();
        for record in verifications.values_mut() {
            if record.email == email && record.purpose == purpose && record.verified_at.is_none() {
                record.attempts += 1;
            }
        }
        Ok(())
    }

    async fn latest_verification(
        &self,
        email: &str,
        purpose: VerificationPurpose,
    ) -> AuthResult<Option<VerificationRecord>> {
        let verifications = self.verifications.lock().unwrap();
        Ok(verifications
            .values()
            .filter(|r| r.email == email && r.purpose == purpose)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn delete_by_token(&self, token: &str) -> AuthResult<()> {
        let mut verifications = self.verifications.lock().unwrap();
        verifications.retain(|_, record| record.token != token);
        Ok(())
    }

    async fn delete_expired_verifications(&self) -> AuthResult<usize> {
        let mut verifications = self.verifications.lock().unwrap();
        let now = Utc::now();
        let before = verifications.len();
        verifications.retain(|_, record| !record.is_expired(now));
        Ok(before - verifications.len())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn create_profile(&self, create: CreateProfile) -> AuthResult<Profile> {
        let mut profiles = self.profiles.lock().unwrap();
        let mut email_index = self.profile_email_index.lock().unwrap();

        if profiles.contains_key(&create.id) {
            return Err(AuthError::persistence(format!(
                "profile id already exists: {}",
                create.id
            )));
        }
        if email_index.contains_key(&create.email) {
            return Err(AuthError::persistence(format!(
                "profile email already exists: {}",
                create.email
            )));
        }

        let profile = Profile {
            id: create.id,
            email: create.email,
            name: create.name,
            phone: None,
            main_address: None,
            detail_address: None,
            created_at: Utc::now(),
        };
        profiles.insert(profile.id.clone(), profile.clone());
        email_index.insert(profile.email.clone(), profile.id.clone());

        Ok(profile)
    }

    async fn get_profile_by_id(&self, id: &str) -> AuthResult<Option<Profile>> {
        let profiles = self.profiles.lock().unwrap();
        Ok(profiles.get(id).cloned())
    }

    async fn get_profile_by_email(&self, email: &str) -> AuthResult<Option<Profile>> {
        let email_index = self.profile_email_index.lock().unwrap();
        let profiles = self.profiles.lock().unwrap();

        if let Some(id) = email_index.get(email) {
            Ok(profiles.get(id).cloned())
        } else {
            Ok(None)
        }
    }
}

#[async_trait]
impl IdentityRegistry for MemoryStore {
    async fn email_exists(&self, email: &str) -> AuthResult<bool> {
        Ok(self.identities.lock().unwrap().contains(email))
    }
}
