//! Postgres store integration tests.
//!
//! Requires a running PostgreSQL database.
//! Run with: DATABASE_URL="postgresql:///verify_test" cargo test -p fin_verify_postgres -- --ignored

use std::sync::Arc;

use fin_verify_core::error::VerifyError;
use fin_verify_core::ports::{ChallengeStore, ConsentStore, SummaryStore, TaxRecordStore};
use fin_verify_core::types::*;
use fin_verify_postgres::{connect, run_migrations, DatabaseConfig, PgStores};
use serde_json::json;
use uuid::Uuid;

async fn stores() -> PgStores {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
    let mut config = DatabaseConfig::new(url);
    config.max_connections = 5;
    let pool = connect(&config).await.expect("failed to connect to test database");
    run_migrations(&pool).await.expect("migrations failed");
    PgStores::new(pool)
}

/// Unique ids keep tests independent on a shared database.
fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

fn challenge(txn: &str, user: &str) -> VerificationChallenge {
    VerificationChallenge::initiated(
        txn,
        user,
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
        raw_payload: json!({"passbook": {"balance": 15000}}),
        normalized_payload: json!({"balance": 15000}),
    }
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn challenge_round_trip_and_cas() {
    let s = stores().await;
    let user = unique("user");
    let txn = unique("tx");

    s.challenges.insert(&challenge(&txn, &user)).await.unwrap();
    let dup = s.challenges.insert(&challenge(&txn, &user)).await.unwrap_err();
    assert!(matches!(dup, VerifyError::Persistence(_)));

    let loaded = s.challenges.get(&txn).await.unwrap().unwrap();
    assert_eq!(loaded.status, ChallengeStatus::Initiated);
    assert_eq!(loaded.subject.pan.as_deref(), Some("ABCDE1234F"));

    let record = s.challenges.resolve(&txn, summary(&user, &txn)).await.unwrap();
    assert_eq!(record.transaction_id, txn);

    let again = s.challenges.resolve(&txn, summary(&user, &txn)).await.unwrap_err();
    assert!(matches!(again, VerifyError::InvalidState(_)));
    assert!(!s.challenges.mark_failed(&txn).await.unwrap());

    let loaded = s.challenges.get(&txn).await.unwrap().unwrap();
    assert_eq!(loaded.status, ChallengeStatus::Resolved);
    assert!(loaded.resolved_at.is_some());
    assert_eq!(s.summaries.list(&user).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn concurrent_resolves_write_one_summary() {
    let s = Arc::new(stores().await);
    let user = unique("user");
    let txn = unique("tx");
    s.challenges.insert(&challenge(&txn, &user)).await.unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let s = Arc::clone(&s);
            let (user, txn) = (user.clone(), txn.clone());
            tokio::spawn(async move { s.challenges.resolve(&txn, summary(&user, &txn)).await })
        })
        .collect();
    let mut ok = 0;
    for h in handles {
        if h.await.unwrap().is_ok() {
            ok += 1;
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(s.summaries.list(&user).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn failed_challenge_stays_failed() {
    let s = stores().await;
    let user = unique("user");
    let txn = unique("tx");
    s.challenges.insert(&challenge(&txn, &user)).await.unwrap();

    assert!(s.challenges.mark_failed(&txn).await.unwrap());
    assert!(s.challenges.resolve(&txn, summary(&user, &txn)).await.is_err());
    assert!(s.summaries.latest(&user).await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn consent_upsert_converges() {
    let s = stores().await;
    let user = unique("user");
    let req = ConsentUpsert {
        source: "epfo".into(),
        scope: "passbook".into(),
        duration: "1y".into(),
        active: true,
    };
    let first = s.consents.upsert(&user, &req).await.unwrap();
    let second = s
        .consents
        .upsert(
            &user,
            &ConsentUpsert {
                scope: "full".into(),
                active: false,
                ..req.clone()
            },
        )
        .await
        .unwrap();
    assert_eq!(first.id, second.id);

    let stored = s.consents.get(&user, "epfo").await.unwrap().unwrap();
    assert_eq!(stored.scope, "full");
    assert!(!stored.active);
    assert!(s.consents.get(&user, "itr").await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn summaries_newest_first() {
    let s = stores().await;
    let user = unique("user");
    let mut ids = Vec::new();
    for _ in 0..3 {
        let txn = unique("tx");
        s.challenges.insert(&challenge(&txn, &user)).await.unwrap();
        ids.push(s.summaries.append(summary(&user, &txn)).await.unwrap().id);
    }
    let listed: Vec<Uuid> = s
        .summaries
        .list(&user)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    ids.reverse();
    assert_eq!(listed, ids);
    assert_eq!(s.summaries.latest(&user).await.unwrap().unwrap().id, ids[0]);
}

#[tokio::test]
#[ignore] // requires DATABASE_URL
async fn tax_records_round_trip_newest_first() {
    let s = stores().await;
    let user = unique("user");
    let record = |year: &str| NewTaxRecord {
        user_id: user.clone(),
        pan: "ABCDE1234F".into(),
        year: year.into(),
        pan_data: json!({"data": {"full_name": "Ravi Kumar"}}),
        ais_data: json!({"data": {"total_income": 1250000}}),
        normalized_payload: json!({"full_name": "Ravi Kumar", "total_income": 1250000}),
    };
    let older = s.tax_records.append(record("2022-23")).await.unwrap();
    let newer = s.tax_records.append(record("2023-24")).await.unwrap();

    let listed = s.tax_records.list(&user).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, newer.id);
    assert_eq!(listed[1].id, older.id);
    assert_eq!(listed[0].ais_data["data"]["total_income"], 1250000);
    assert!(s.tax_records.list(&unique("user")).await.unwrap().is_empty());
}
