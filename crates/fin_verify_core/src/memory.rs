//! In-memory implementation of the storage ports.
//!
//! Used when no database is configured and by tests. One mutex guards every
//! table so that the resolve transition and its summary append are a single
//! atomic step, matching the Postgres transaction.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::VerifyError;
use crate::ports::{ChallengeStore, ConsentStore, Result, SummaryStore, TaxRecordStore};
use crate::types::*;

#[derive(Default)]
struct Tables {
    challenges: HashMap<String, VerificationChallenge>,
    consents: HashMap<(String, String), ConsentGrant>,
    summaries: Vec<VerificationSummary>,
    tax_records: Vec<TaxRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn challenge_count(&self) -> usize {
        self.lock().challenges.len()
    }

    /// Number of stored summaries for `transaction_id`.
    pub fn summary_count(&self, transaction_id: &str) -> usize {
        self.lock()
            .summaries
            .iter()
            .filter(|s| s.transaction_id == transaction_id)
            .count()
    }
}

fn newest_first(rows: &mut [VerificationSummary]) {
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl ChallengeStore for MemoryStore {
    async fn insert(&self, challenge: &VerificationChallenge) -> Result<()> {
        let mut tables = self.lock();
        if tables.challenges.contains_key(&challenge.transaction_id) {
            return Err(VerifyError::Persistence(format!(
                "duplicate transaction_id {}",
                challenge.transaction_id
            )));
        }
        tables
            .challenges
            .insert(challenge.transaction_id.clone(), challenge.clone());
        Ok(())
    }

    async fn get(&self, transaction_id: &str) -> Result<Option<VerificationChallenge>> {
        Ok(self.lock().challenges.get(transaction_id).cloned())
    }

    async fn mark_failed(&self, transaction_id: &str) -> Result<bool> {
        let mut tables = self.lock();
        match tables.challenges.get_mut(transaction_id) {
            Some(c) if c.status.can_transition_to(ChallengeStatus::Failed) => {
                c.status = ChallengeStatus::Failed;
                c.resolved_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn resolve(
        &self,
        transaction_id: &str,
        summary: NewSummary,
    ) -> Result<VerificationSummary> {
        let mut tables = self.lock();
        let challenge = tables
            .challenges
            .get_mut(transaction_id)
            .filter(|c| c.status.can_transition_to(ChallengeStatus::Resolved))
            .ok_or_else(|| {
                VerifyError::InvalidState(format!(
                    "transaction {transaction_id} is not awaiting resolution"
                ))
            })?;
        challenge.status = ChallengeStatus::Resolved;
        challenge.resolved_at = Some(Utc::now());

        let record = summary.into_record();
        tables.summaries.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl ConsentStore for MemoryStore {
    async fn upsert(&self, user_id: &str, req: &ConsentUpsert) -> Result<ConsentGrant> {
        let mut tables = self.lock();
        let now = Utc::now();
        let key = (user_id.to_string(), req.source.clone());
        let grant = tables
            .consents
            .entry(key)
            .and_modify(|g| {
                g.scope = req.scope.clone();
                g.duration = req.duration.clone();
                g.active = req.active;
                g.updated_at = now;
            })
            .or_insert_with(|| ConsentGrant {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                source: req.source.clone(),
                scope: req.scope.clone(),
                duration: req.duration.clone(),
                active: req.active,
                created_at: now,
                updated_at: now,
            });
        Ok(grant.clone())
    }

    async fn get(&self, user_id: &str, source: &str) -> Result<Option<ConsentGrant>> {
        let key = (user_id.to_string(), source.to_string());
        Ok(self.lock().consents.get(&key).cloned())
    }
}

#[async_trait]
impl SummaryStore for MemoryStore {
    async fn append(&self, summary: NewSummary) -> Result<VerificationSummary> {
        let record = summary.into_record();
        self.lock().summaries.push(record.clone());
        Ok(record)
    }

    async fn list(&self, user_id: &str) -> Result<Vec<VerificationSummary>> {
        let mut rows: Vec<_> = self
            .lock()
            .summaries
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut rows);
        Ok(rows)
    }

    async fn latest(&self, user_id: &str) -> Result<Option<VerificationSummary>> {
        Ok(SummaryStore::list(self, user_id).await?.into_iter().next())
    }
}

#[async_trait]
impl TaxRecordStore for MemoryStore {
    async fn append(&self, record: NewTaxRecord) -> Result<TaxRecord> {
        let record = record.into_record();
        self.lock().tax_records.push(record.clone());
        Ok(record)
    }

    async fn list(&self, user_id: &str) -> Result<Vec<TaxRecord>> {
        let mut rows: Vec<_> = self
            .lock()
            .tax_records
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn challenge(txn: &str) -> VerificationChallenge {
        VerificationChallenge::initiated(
            txn,
            "u1",
            DEFAULT_SOURCE,
            SubjectIdentifiers {
                pan: Some("ABCDE1234F".into()),
                uan: None,
                mobile: "9876543210".into(),
            },
        )
    }

    fn summary(user: &str, txn: &str) -> NewSummary {
        NewSummary {
            user_id: user.into(),
            transaction_id: txn.into(),
            raw_payload: json!({"balance": 1}),
            normalized_payload: json!({"balance": 1}),
        }
    }

    #[tokio::test]
    async fn duplicate_insert_is_persistence_error() {
        let store = MemoryStore::new();
        store.insert(&challenge("tx-1")).await.unwrap();
        let err = store.insert(&challenge("tx-1")).await.unwrap_err();
        assert!(matches!(err, VerifyError::Persistence(_)));
    }

    #[tokio::test]
    async fn resolve_is_compare_and_swap() {
        let store = MemoryStore::new();
        store.insert(&challenge("tx-1")).await.unwrap();

        store.resolve("tx-1", summary("u1", "tx-1")).await.unwrap();
        let err = store.resolve("tx-1", summary("u1", "tx-1")).await.unwrap_err();
        assert!(matches!(err, VerifyError::InvalidState(_)));
        assert_eq!(store.summary_count("tx-1"), 1);

        let c = ChallengeStore::get(&store, "tx-1").await.unwrap().unwrap();
        assert_eq!(c.status, ChallengeStatus::Resolved);
        assert!(c.resolved_at.is_some());
        assert!(!store.mark_failed("tx-1").await.unwrap());
    }

    #[tokio::test]
    async fn failed_challenge_cannot_resolve() {
        let store = MemoryStore::new();
        store.insert(&challenge("tx-1")).await.unwrap();
        assert!(store.mark_failed("tx-1").await.unwrap());
        assert!(!store.mark_failed("tx-1").await.unwrap());
        assert!(store.resolve("tx-1", summary("u1", "tx-1")).await.is_err());
        assert_eq!(store.summary_count("tx-1"), 0);
    }

    #[tokio::test]
    async fn unknown_transaction() {
        let store = MemoryStore::new();
        assert!(ChallengeStore::get(&store, "nope").await.unwrap().is_none());
        assert!(!store.mark_failed("nope").await.unwrap());
        assert!(store.resolve("nope", summary("u1", "nope")).await.is_err());
    }

    #[tokio::test]
    async fn summaries_newest_first_per_user() {
        let store = MemoryStore::new();
        let a = SummaryStore::append(&store, summary("u1", "tx-a")).await.unwrap();
        let b = SummaryStore::append(&store, summary("u1", "tx-b")).await.unwrap();
        SummaryStore::append(&store, summary("u2", "tx-c")).await.unwrap();

        let rows = SummaryStore::list(&store, "u1").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, b.id);
        assert_eq!(rows[1].id, a.id);

        let latest = store.latest("u1").await.unwrap().unwrap();
        assert_eq!(latest.id, b.id);
        assert!(store.latest("nobody").await.unwrap().is_none());
        assert!(SummaryStore::list(&store, "nobody").await.unwrap().is_empty());
    }

    fn tax_record(user: &str, year: &str) -> NewTaxRecord {
        NewTaxRecord {
            user_id: user.into(),
            pan: "ABCDE1234F".into(),
            year: year.into(),
            pan_data: json!({"data": {"full_name": "R"}}),
            ais_data: json!({"data": {"total_income": 1}}),
            normalized_payload: json!({"full_name": "R", "total_income": 1}),
        }
    }

    #[tokio::test]
    async fn tax_records_newest_first_per_user() {
        let store = MemoryStore::new();
        let older = TaxRecordStore::append(&store, tax_record("u1", "2022-23")).await.unwrap();
        let newer = TaxRecordStore::append(&store, tax_record("u1", "2023-24")).await.unwrap();
        TaxRecordStore::append(&store, tax_record("u2", "2023-24")).await.unwrap();

        let rows = TaxRecordStore::list(&store, "u1").await.unwrap();
        assert_eq!(
            rows.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![newer.id, older.id]
        );
        assert!(TaxRecordStore::list(&store, "nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn consent_upsert_keeps_one_row() {
        let store = MemoryStore::new();
        let req = ConsentUpsert {
            source: "epfo".into(),
            scope: "passbook".into(),
            duration: "1y".into(),
            active: true,
        };
        let first = store.upsert("u1", &req).await.unwrap();
        let second = store
            .upsert(
                "u1",
                &ConsentUpsert {
                    active: false,
                    ..req.clone()
                },
            )
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
        assert!(!ConsentStore::get(&store, "u1", "epfo").await.unwrap().unwrap().active);
    }
}
