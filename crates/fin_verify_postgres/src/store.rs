//! Postgres implementations of the fin_verify_core port traits.
//!
//! Each adapter is a newtype wrapping PgPool. All SQL is runtime-checked
//! (sqlx::query, not sqlx::query!) to avoid a compile-time DB requirement.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use fin_verify_core::error::VerifyError;
use fin_verify_core::ports::{ChallengeStore, ConsentStore, Result, SummaryStore, TaxRecordStore};
use fin_verify_core::types::*;

use crate::sqlx_types::{PgChallengeRow, PgConsentRow, PgSummaryRow, PgTaxRecordRow};

const SUMMARY_COLUMNS: &str =
    "id, user_id, transaction_id, raw_payload, normalized_payload, created_at";

// ── PgChallengeStore ──────────────────────────────────────────

pub struct PgChallengeStore {
    pool: PgPool,
}

impl PgChallengeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChallengeStore for PgChallengeStore {
    async fn insert(&self, challenge: &VerificationChallenge) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO verification_challenges (
                transaction_id, user_id, source, pan, uan, mobile, status, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&challenge.transaction_id)
        .bind(&challenge.user_id)
        .bind(&challenge.source)
        .bind(&challenge.subject.pan)
        .bind(&challenge.subject.uan)
        .bind(&challenge.subject.mobile)
        .bind(challenge.status.as_str())
        .bind(challenge.created_at)
        .execute(&self.pool)
        .await
        .map_err(VerifyError::persistence)?;
        Ok(())
    }

    async fn get(&self, transaction_id: &str) -> Result<Option<VerificationChallenge>> {
        let row = sqlx::query_as::<_, PgChallengeRow>(
            r#"
            SELECT transaction_id, user_id, source, pan, uan, mobile,
                   status, created_at, resolved_at
            FROM verification_challenges
            WHERE transaction_id = $1
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(VerifyError::persistence)?;
        row.map(|r| r.try_into().map_err(VerifyError::Persistence))
            .transpose()
    }

    async fn mark_failed(&self, transaction_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE verification_challenges
            SET status = 'failed', resolved_at = now()
            WHERE transaction_id = $1
              AND status = 'initiated'
            "#,
        )
        .bind(transaction_id)
        .execute(&self.pool)
        .await
        .map_err(VerifyError::persistence)?;
        Ok(result.rows_affected() == 1)
    }

    async fn resolve(
        &self,
        transaction_id: &str,
        summary: NewSummary,
    ) -> Result<VerificationSummary> {
        let mut tx = self.pool.begin().await.map_err(VerifyError::persistence)?;

        let result = sqlx::query(
            r#"
            UPDATE verification_challenges
            SET status = 'resolved', resolved_at = now()
            WHERE transaction_id = $1
              AND status = 'initiated'
            "#,
        )
        .bind(transaction_id)
        .execute(&mut *tx)
        .await
        .map_err(VerifyError::persistence)?;

        if result.rows_affected() == 0 {
            return Err(VerifyError::InvalidState(format!(
                "transaction {transaction_id} is not awaiting resolution"
            )));
        }

        // Summary insert shares the transaction with the status flip.
        let record = insert_summary(&mut *tx, summary.into_record()).await?;

        tx.commit().await.map_err(VerifyError::persistence)?;
        Ok(record)
    }
}

async fn insert_summary<'e, E>(executor: E, record: VerificationSummary) -> Result<VerificationSummary>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO verification_summaries (
            id, user_id, transaction_id, raw_payload, normalized_payload, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(record.id)
    .bind(&record.user_id)
    .bind(&record.transaction_id)
    .bind(&record.raw_payload)
    .bind(&record.normalized_payload)
    .bind(record.created_at)
    .execute(executor)
    .await
    .map_err(VerifyError::persistence)?;
    Ok(record)
}

// ── PgConsentStore ────────────────────────────────────────────

pub struct PgConsentStore {
    pool: PgPool,
}

impl PgConsentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConsentStore for PgConsentStore {
    async fn upsert(&self, user_id: &str, req: &ConsentUpsert) -> Result<ConsentGrant> {
        let row = sqlx::query_as::<_, PgConsentRow>(
            r#"
            INSERT INTO consent_grants (id, user_id, source, scope, duration, active)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, source) DO UPDATE
            SET scope = EXCLUDED.scope,
                duration = EXCLUDED.duration,
                active = EXCLUDED.active,
                updated_at = now()
            RETURNING id, user_id, source, scope, duration, active, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&req.source)
        .bind(&req.scope)
        .bind(&req.duration)
        .bind(req.active)
        .fetch_one(&self.pool)
        .await
        .map_err(VerifyError::persistence)?;
        Ok(row.into())
    }

    async fn get(&self, user_id: &str, source: &str) -> Result<Option<ConsentGrant>> {
        let row = sqlx::query_as::<_, PgConsentRow>(
            r#"
            SELECT id, user_id, source, scope, duration, active, created_at, updated_at
            FROM consent_grants
            WHERE user_id = $1 AND source = $2
            "#,
        )
        .bind(user_id)
        .bind(source)
        .fetch_optional(&self.pool)
        .await
        .map_err(VerifyError::persistence)?;
        Ok(row.map(Into::into))
    }
}

// ── PgSummaryStore ────────────────────────────────────────────

pub struct PgSummaryStore {
    pool: PgPool,
}

impl PgSummaryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SummaryStore for PgSummaryStore {
    async fn append(&self, summary: NewSummary) -> Result<VerificationSummary> {
        insert_summary(&self.pool, summary.into_record()).await
    }

    async fn list(&self, user_id: &str) -> Result<Vec<VerificationSummary>> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM verification_summaries \
             WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, PgSummaryRow>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(VerifyError::persistence)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn latest(&self, user_id: &str) -> Result<Option<VerificationSummary>> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM verification_summaries \
             WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, PgSummaryRow>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(VerifyError::persistence)?;
        Ok(row.map(Into::into))
    }
}

// ── PgTaxRecordStore ──────────────────────────────────────────

pub struct PgTaxRecordStore {
    pool: PgPool,
}

impl PgTaxRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaxRecordStore for PgTaxRecordStore {
    async fn append(&self, record: NewTaxRecord) -> Result<TaxRecord> {
        let record = record.into_record();
        sqlx::query(
            r#"
            INSERT INTO tax_records (
                id, user_id, pan, year, pan_data, ais_data, normalized_payload, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.id)
        .bind(&record.user_id)
        .bind(&record.pan)
        .bind(&record.year)
        .bind(&record.pan_data)
        .bind(&record.ais_data)
        .bind(&record.normalized_payload)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(VerifyError::persistence)?;
        Ok(record)
    }

    async fn list(&self, user_id: &str) -> Result<Vec<TaxRecord>> {
        let rows = sqlx::query_as::<_, PgTaxRecordRow>(
            r#"
            SELECT id, user_id, pan, year, pan_data, ais_data, normalized_payload, created_at
            FROM tax_records
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(VerifyError::persistence)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
