//! Row shapes returned by runtime-checked queries, converted into core types.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use fin_verify_core::types::{
    ChallengeStatus, ConsentGrant, SubjectIdentifiers, TaxRecord, VerificationChallenge,
    VerificationSummary,
};

#[derive(Debug, sqlx::FromRow)]
pub struct PgChallengeRow {
    pub transaction_id: String,
    pub user_id: String,
    pub source: String,
    pub pan: Option<String>,
    pub uan: Option<String>,
    pub mobile: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<PgChallengeRow> for VerificationChallenge {
    type Error = String;

    fn try_from(row: PgChallengeRow) -> Result<Self, Self::Error> {
        let status = ChallengeStatus::parse(&row.status)
            .ok_or_else(|| format!("unknown challenge status '{}'", row.status))?;
        Ok(Self {
            transaction_id: row.transaction_id,
            user_id: row.user_id,
            source: row.source,
            subject: SubjectIdentifiers {
                pan: row.pan,
                uan: row.uan,
                mobile: row.mobile,
            },
            status,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PgConsentRow {
    pub id: Uuid,
    pub user_id: String,
    pub source: String,
    pub scope: String,
    pub duration: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PgConsentRow> for ConsentGrant {
    fn from(row: PgConsentRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            source: row.source,
            scope: row.scope,
            duration: row.duration,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PgSummaryRow {
    pub id: Uuid,
    pub user_id: String,
    pub transaction_id: String,
    pub raw_payload: serde_json::Value,
    pub normalized_payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<PgSummaryRow> for VerificationSummary {
    fn from(row: PgSummaryRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            transaction_id: row.transaction_id,
            raw_payload: row.raw_payload,
            normalized_payload: row.normalized_payload,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PgTaxRecordRow {
    pub id: Uuid,
    pub user_id: String,
    pub pan: String,
    pub year: String,
    pub pan_data: serde_json::Value,
    pub ais_data: serde_json::Value,
    pub normalized_payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<PgTaxRecordRow> for TaxRecord {
    fn from(row: PgTaxRecordRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            pan: row.pan,
            year: row.year,
            pan_data: row.pan_data,
            ais_data: row.ais_data,
            normalized_payload: row.normalized_payload,
            created_at: row.created_at,
        }
    }
}
