//! PostgreSQL store via SQLx.
//!
//! The schema carries the invariants the memory adapter enforces with its
//! lock: `UNIQUE (email, purpose)` backs the atomic replace, and redemption
//! is a conditional `UPDATE ... WHERE verified_at IS NULL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::AuthResult;
use crate::types::{
    CreateProfile, CreateVerificationRecord, Profile, VerificationPurpose, VerificationRecord,
};

use super::traits::{ProfileStore, VerificationStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS email_verifications (
    id            TEXT PRIMARY KEY,
    email         TEXT NOT NULL,
    code          TEXT,
    token         TEXT NOT NULL UNIQUE,
    hashed_secret TEXT,
    purpose       TEXT NOT NULL,
    expires_at    TIMESTAMPTZ NOT NULL,
    verified_at   TIMESTAMPTZ,
    attempts      INTEGER NOT NULL DEFAULT 0,
    created_at    TIMESTAMPTZ NOT NULL,
    UNIQUE (email, purpose)
);

CREATE TABLE IF NOT EXISTS profiles (
    id             TEXT PRIMARY KEY,
    email          TEXT NOT NULL UNIQUE,
    name           TEXT,
    phone          TEXT,
    main_address   TEXT,
    detail_address TEXT,
    created_at     TIMESTAMPTZ NOT NULL
);
"#;

/// PostgreSQL adapter implementing [`VerificationStore`] and [`ProfileStore`].
///
/// The identity registry is deliberately not implemented here: the
/// authoritative user listing belongs to the hosted auth service, and callers
/// supply their own [`IdentityRegistry`](super::traits::IdentityRegistry)
/// fronting it.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the tables this adapter expects.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn test_connection(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn verification_from_row(row: &PgRow) -> Result<VerificationRecord, sqlx::Error> {
    let purpose: String = row.try_get("purpose")?;
    let purpose = purpose
        .parse::<VerificationPurpose>()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    Ok(VerificationRecord {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        code: row.try_get("code")?,
        token: row.try_get("token")?,
        hashed_secret: row.try_get("hashed_secret")?,
        purpose,
        expires_at: row.try_get("expires_at")?,
        verified_at: row.try_get("verified_at")?,
        attempts: row.try_get("attempts")?,
        created_at: row.try_get("created_at")?,
    })
}

fn profile_from_row(row: &PgRow) -> Result<Profile, sqlx::Error> {
    Ok(Profile {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        main_address: row.try_get("main_address")?,
        detail_address: row.try_get("detail_address")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl VerificationStore for PgStore {
    async fn replace_verification(
        &self,
        create: CreateVerificationRecord,
    ) -> AuthResult<VerificationRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO email_verifications
                (id, email, code, token, hashed_secret, purpose,
                 expires_at, verified_at, attempts, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NULL, 0, $8)
            ON CONFLICT (email, purpose) DO UPDATE SET
                code          = EXCLUDED.code,
                token         = EXCLUDED.token,
                hashed_secret = EXCLUDED.hashed_secret,
                expires_at    = EXCLUDED.expires_at,
                verified_at   = NULL,
                attempts      = 0,
                created_at    = EXCLUDED.created_at
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&create.email)
        .bind(&create.code)
        .bind(&create.token)
        .bind(&create.hashed_secret)
        .bind(create.purpose.as_str())
        .bind(create.expires_at)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(verification_from_row(&row)?)
    }

    async fn get_pending_by_code(
        &self,
        email: &str,
        code: &str,
        purpose: VerificationPurpose,
    ) -> AuthResult<Option<VerificationRecord>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM email_verifications
            WHERE email = $1 AND code = $2 AND purpose = $3 AND verified_at IS NULL
            "#,
        )
        .bind(email)
        .bind(code)
        .bind(purpose.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(verification_from_row).transpose().map_err(Into::into)
    }

    async fn get_pending_by_token(
        &self,
        token: &str,
        purpose: VerificationPurpose,
    ) -> AuthResult<Option<VerificationRecord>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM email_verifications
            WHERE token = $1 AND purpose = $2 AND verified_at IS NULL
            "#,
        )
        .bind(token)
        .bind(purpose.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(verification_from_row).transpose().map_err(Into::into)
    }

    async fn get_verified_by_token(
        &self,
        token: &str,
        purpose: VerificationPurpose,
    ) -> AuthResult<Option<VerificationRecord>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM email_verifications
            WHERE token = $1 AND purpose = $2 AND verified_at IS NOT NULL
            "#,
        )
        .bind(token)
        .bind(purpose.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(verification_from_row).transpose().map_err(Into::into)
    }

    async fn mark_verified(&self, id: &str, verified_at: DateTime<Utc>) -> AuthResult<bool> {
        let result = sqlx::query(
            "UPDATE email_verifications SET verified_at = $1 WHERE id = $2 AND verified_at IS NULL",
        )
        .bind(verified_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn increment_attempts(
        &self,
        email: &str,
        purpose: VerificationPurpose,
    ) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE email_verifications SET attempts = attempts + 1
            WHERE email = $1 AND purpose = $2 AND verified_at IS NULL
            "#,
        )
        .bind(email)
        .bind(purpose.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest_verification(
        &self,
        email: &str,
        purpose: VerificationPurpose,
    ) -> AuthResult<Option<VerificationRecord>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM email_verifications
            WHERE email = $1 AND purpose = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(purpose.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(verification_from_row).transpose().map_err(Into::into)
    }

    async fn delete_by_token(&self, token: &str) -> AuthResult<()> {
        sqlx::query("DELETE FROM email_verifications WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_expired_verifications(&self) -> AuthResult<usize> {
        let result = sqlx::query("DELETE FROM email_verifications WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() as usize)
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn create_profile(&self, create: CreateProfile) -> AuthResult<Profile> {
        let row = sqlx::query(
            r#"
            INSERT INTO profiles (id, email, name, phone, main_address, detail_address, created_at)
            VALUES ($1, $2, $3, NULL, NULL, NULL, $4)
            RETURNING *
            "#,
        )
        .bind(&create.id)
        .bind(&create.email)
        .bind(&create.name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(profile_from_row(&row)?)
    }

    async fn get_profile_by_id(&self, id: &str) -> AuthResult<Option<Profile>> {
        let row = sqlx::query("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(profile_from_row).transpose().map_err(Into::into)
    }

    async fn get_profile_by_email(&self, email: &str) -> AuthResult<Option<Profile>> {
        let row = sqlx::query("SELECT * FROM profiles WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(profile_from_row).transpose().map_err(Into::into)
    }
}
