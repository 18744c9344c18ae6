use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::normalize::NormalizedSummary;

/// Default data source for OTP challenges.
pub const DEFAULT_SOURCE: &str = "epfo";

/// Tax data source: PAN profile plus annual information statement.
pub const ITR_SOURCE: &str = "itr";

// ─── Challenge ────────────────────────────────────────────────

/// Lifecycle of one OTP challenge. Only `Initiated` may transition, and only
/// to one of the two terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    Initiated,
    Resolved,
    Failed,
}

impl ChallengeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::Resolved => "resolved",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initiated" => Some(Self::Initiated),
            "resolved" => Some(Self::Resolved),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: ChallengeStatus) -> bool {
        matches!(
            (self, next),
            (Self::Initiated, Self::Resolved) | (Self::Initiated, Self::Failed)
        )
    }
}

impl std::fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifiers of the person being verified. Validated before any provider call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectIdentifiers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uan: Option<String>,
    pub mobile: String,
}

/// One initiated OTP flow, keyed by the provider-issued `transaction_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationChallenge {
    pub transaction_id: String,
    pub user_id: String,
    pub source: String,
    pub subject: SubjectIdentifiers,
    pub status: ChallengeStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl VerificationChallenge {
    pub fn initiated(
        transaction_id: impl Into<String>,
        user_id: impl Into<String>,
        source: impl Into<String>,
        subject: SubjectIdentifiers,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            user_id: user_id.into(),
            source: source.into(),
            subject,
            status: ChallengeStatus::Initiated,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }
}

/// Caller input for `initiate_challenge`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitiateChallenge {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub pan: Option<String>,
    #[serde(default)]
    pub uan: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InitiatedChallenge {
    pub transaction_id: String,
    pub status: ChallengeStatus,
    pub created_at: DateTime<Utc>,
}

/// Successful resolve: the raw provider payload and its canonical form.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedChallenge {
    pub transaction_id: String,
    pub raw: serde_json::Value,
    pub normalized: NormalizedSummary,
}

// ─── Consent ──────────────────────────────────────────────────

/// A user's grant for one data source. At most one per (user_id, source).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentGrant {
    pub id: Uuid,
    pub user_id: String,
    pub source: String,
    pub scope: String,
    pub duration: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConsentUpsert {
    pub source: String,
    pub scope: String,
    pub duration: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

// ─── Summary ──────────────────────────────────────────────────

/// Append-only record of one resolved challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub id: Uuid,
    pub user_id: String,
    pub transaction_id: String,
    pub raw_payload: serde_json::Value,
    pub normalized_payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Insert shape for [`VerificationSummary`]; id and timestamp are assigned on append.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSummary {
    pub user_id: String,
    pub transaction_id: String,
    pub raw_payload: serde_json::Value,
    pub normalized_payload: serde_json::Value,
}

impl NewSummary {
    pub fn into_record(self) -> VerificationSummary {
        VerificationSummary {
            id: Uuid::now_v7(),
            user_id: self.user_id,
            transaction_id: self.transaction_id,
            raw_payload: self.raw_payload,
            normalized_payload: self.normalized_payload,
            created_at: Utc::now(),
        }
    }
}

// ─── Passbook ─────────────────────────────────────────────────

/// Direct passbook fetch, no OTP. Consent-gated, not persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct PassbookRequest {
    #[serde(default)]
    pub uan: Option<String>,
    #[serde(default)]
    pub dob: Option<String>,
    #[serde(default)]
    pub pan: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassbookResult {
    pub raw: serde_json::Value,
    pub normalized: NormalizedSummary,
}

// ─── Tax (ITR) ────────────────────────────────────────────────

/// Caller input for an ITR collection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItrRequest {
    #[serde(default)]
    pub pan: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
}

/// One stored ITR pull: both provider payloads and their canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRecord {
    pub id: Uuid,
    pub user_id: String,
    pub pan: String,
    pub year: String,
    pub pan_data: serde_json::Value,
    pub ais_data: serde_json::Value,
    pub normalized_payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTaxRecord {
    pub user_id: String,
    pub pan: String,
    pub year: String,
    pub pan_data: serde_json::Value,
    pub ais_data: serde_json::Value,
    pub normalized_payload: serde_json::Value,
}

impl NewTaxRecord {
    pub fn into_record(self) -> TaxRecord {
        TaxRecord {
            id: Uuid::now_v7(),
            user_id: self.user_id,
            pan: self.pan,
            year: self.year,
            pan_data: self.pan_data,
            ais_data: self.ais_data,
            normalized_payload: self.normalized_payload,
            created_at: Utc::now(),
        }
    }
}
