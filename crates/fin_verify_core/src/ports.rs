//! Storage port traits for the verification pipeline.
//! Implemented by fin_verify_postgres and [`crate::memory::MemoryStore`];
//! core logic depends only on these traits.

use async_trait::async_trait;

use crate::error::VerifyError;
use crate::types::*;

pub type Result<T> = std::result::Result<T, VerifyError>;

/// Persisted OTP challenges keyed by provider transaction id.
///
/// Status writes are compare-and-swap against `Initiated`: a challenge that
/// already reached a terminal state is never overwritten.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Insert a new challenge. A duplicate transaction id is a `Persistence` error.
    async fn insert(&self, challenge: &VerificationChallenge) -> Result<()>;

    async fn get(&self, transaction_id: &str) -> Result<Option<VerificationChallenge>>;

    /// `Initiated -> Failed`, stamping `resolved_at`. Returns `false` when the challenge was not
    /// `Initiated` (or does not exist) and nothing changed.
    async fn mark_failed(&self, transaction_id: &str) -> Result<bool>;

    /// `Initiated -> Resolved` and append the summary, atomically.
    ///
    /// Fails with `InvalidState` if the challenge is no longer `Initiated`;
    /// in that case no summary is written.
    async fn resolve(
        &self,
        transaction_id: &str,
        summary: NewSummary,
    ) -> Result<VerificationSummary>;
}

/// Per-user, per-source consent grants.
#[async_trait]
pub trait ConsentStore: Send + Sync {
    /// Create or replace the grant for `(user_id, req.source)`.
    async fn upsert(&self, user_id: &str, req: &ConsentUpsert) -> Result<ConsentGrant>;

    async fn get(&self, user_id: &str, source: &str) -> Result<Option<ConsentGrant>>;
}

/// Append-only summary history.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    async fn append(&self, summary: NewSummary) -> Result<VerificationSummary>;

    /// Newest first.
    async fn list(&self, user_id: &str) -> Result<Vec<VerificationSummary>>;

    async fn latest(&self, user_id: &str) -> Result<Option<VerificationSummary>>;
}

/// Stored tax (ITR) pulls, one row per collection.
#[async_trait]
pub trait TaxRecordStore: Send + Sync {
    async fn append(&self, record: NewTaxRecord) -> Result<TaxRecord>;

    /// Newest first.
    async fn list(&self, user_id: &str) -> Result<Vec<TaxRecord>>;
}
