//! End-to-end signup flows: verification request through account
//! finalization, on both redemption channels, plus the interplay between the
//! ledger and OAuth-provisioned profiles.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use atelier_auth::{
    AuthError, AuthResult, EmailProvider, ExternalIdentity, IdentityReconciler, MemoryStore,
    NullAuditSink, VerificationLedger, VerificationPurpose,
};

struct Outbox {
    sent: Mutex<Vec<String>>,
}

impl Outbox {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
        })
    }

    fn last(&self) -> String {
        self.sent.lock().unwrap().last().unwrap().clone()
    }

    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl EmailProvider for Outbox {
    async fn send(&self, _to: &str, _subject: &str, _html: &str, text: &str) -> AuthResult<()> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

fn code_from(text: &str) -> String {
    text.split("code is ").nth(1).unwrap().chars().take(6).collect()
}

fn token_from(text: &str) -> String {
    let start = text.find("token=").unwrap() + "token=".len();
    text[start..]
        .chars()
        .take_while(|c| c.is_ascii_hexdigit() || *c == '-')
        .collect()
}

fn setup() -> (Arc<MemoryStore>, Arc<Outbox>, VerificationLedger<MemoryStore, MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let outbox = Outbox::new();
    let ledger = VerificationLedger::new(store.clone(), store.clone(), outbox.clone());
    (store, outbox, ledger)
}

#[tokio::test]
async fn test_code_channel_signup_round_trip() {
    let (store, outbox, ledger) = setup();

    // Request verification.
    ledger
        .create_verification("shopper@example.com", Some("op3n-sesame!"), VerificationPurpose::Signup)
        .await
        .unwrap();
    assert_eq!(outbox.count(), 1);

    // An immediate resend is throttled.
    assert!(!ledger.resend_allowed("shopper@example.com").await.unwrap());

    // Redeem the code interactively.
    let code = code_from(&outbox.last());
    let token = ledger.verify_code("shopper@example.com", &code).await.unwrap();

    // The finalize step confirms the token before committing an account.
    let record = ledger.verified_record(&token).await.unwrap().unwrap();
    assert_eq!(record.email, "shopper@example.com");
    assert!(record.verified_at.is_some());
    assert!(record.hashed_secret.is_some());

    // Account committed: the record is deleted and cannot be reused.
    ledger.delete_verification(&token).await.unwrap();
    assert!(ledger.verified_record(&token).await.unwrap().is_none());
    assert!(matches!(
        ledger.verify_code("shopper@example.com", &code).await.unwrap_err(),
        AuthError::InvalidCode
    ));
    assert_eq!(store.verification_count(), 0);
}

#[tokio::test]
async fn test_link_channel_signup_round_trip() {
    let (_store, outbox, ledger) = setup();

    ledger
        .create_verification("clicker@example.com", Some("op3n-sesame!"), VerificationPurpose::Signup)
        .await
        .unwrap();

    let token = token_from(&outbox.last());
    let record = ledger.verify_token(&token).await.unwrap();
    assert_eq!(record.email, "clicker@example.com");

    let record = ledger.verified_record(&token).await.unwrap().unwrap();
    assert!(record.verified_at.is_some());

    ledger.delete_verification(&token).await.unwrap();
    assert!(ledger.verified_record(&token).await.unwrap().is_none());
}

#[tokio::test]
async fn test_superseding_request_invalidates_old_message() {
    let (_store, outbox, ledger) = setup();

    ledger
        .create_verification("shopper@example.com", Some("pw-one"), VerificationPurpose::Signup)
        .await
        .unwrap();
    let old_token = token_from(&outbox.last());

    ledger
        .create_verification("shopper@example.com", Some("pw-two"), VerificationPurpose::Signup)
        .await
        .unwrap();
    let new_token = token_from(&outbox.last());

    assert_eq!(outbox.count(), 2);
    assert!(matches!(
        ledger.verify_token(&old_token).await.unwrap_err(),
        AuthError::InvalidToken
    ));
    ledger.verify_token(&new_token).await.unwrap();
}

#[tokio::test]
async fn test_oauth_profile_blocks_password_signup_for_same_email() {
    let (store, _outbox, ledger) = setup();

    // A Google user signs in first; a profile is provisioned.
    let reconciler = IdentityReconciler::new(store.clone(), Arc::new(NullAuditSink));
    let outcome = reconciler
        .handle_callback(ExternalIdentity {
            subject_id: "google-sub-1".into(),
            email: Some("dual@example.com".into()),
            display_name: Some("Dual".into()),
            provider: "google".into(),
        })
        .await
        .unwrap();
    assert!(outcome.is_new_user);

    // A later password signup for the same address is refused outright.
    let err = ledger
        .create_verification("dual@example.com", Some("pw"), VerificationPurpose::Signup)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::DuplicateEmail));
}

#[tokio::test]
async fn test_registry_identity_blocks_signup() {
    let (store, _outbox, ledger) = setup();

    // The hosted auth service already knows this address even though no
    // local profile exists yet.
    store.register_identity("half-provisioned@example.com");

    let err = ledger
        .create_verification("half-provisioned@example.com", Some("pw"), VerificationPurpose::Signup)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::DuplicateEmail));
}

#[tokio::test]
async fn test_reset_and_signup_records_do_not_collide() {
    let (store, outbox, ledger) = setup();

    ledger
        .create_verification("shopper@example.com", Some("pw"), VerificationPurpose::Signup)
        .await
        .unwrap();
    let signup_token = token_from(&outbox.last());

    ledger
        .create_verification("shopper@example.com", None, VerificationPurpose::ResetPassword)
        .await
        .unwrap();

    // The reset request did not evict the signup record.
    assert_eq!(store.verification_count(), 2);
    ledger.verify_token(&signup_token).await.unwrap();
}
