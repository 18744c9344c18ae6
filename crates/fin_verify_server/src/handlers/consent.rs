use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::Query;
use axum::{Extension, Json};
use fin_verify_core::types::{ConsentGrant, ConsentUpsert, DEFAULT_SOURCE};
use fin_verify_core::{ChallengeOrchestrator, Principal};
use serde::Deserialize;
use serde_json::{json, Value};

use super::json_body;
use crate::error::AppError;

/// POST /consent/upsert
pub async fn upsert(
    Extension(orchestrator): Extension<Arc<ChallengeOrchestrator>>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<ConsentUpsert>, JsonRejection>,
) -> Result<Json<ConsentGrant>, AppError> {
    let req = json_body(payload)?;
    let grant = orchestrator
        .consent()
        .upsert(&principal.user_id, req)
        .await?;
    Ok(Json(grant))
}

#[derive(Debug, Deserialize)]
pub struct ConsentQuery {
    pub source: Option<String>,
}

/// GET /consent/check?source=epfo
pub async fn check(
    Extension(orchestrator): Extension<Arc<ChallengeOrchestrator>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ConsentQuery>,
) -> Result<Json<Value>, AppError> {
    let source = query.source.as_deref().unwrap_or(DEFAULT_SOURCE);
    let active = orchestrator
        .consent()
        .check(&principal.user_id, source)
        .await?;
    Ok(Json(json!({ "active": active })))
}

/// GET /rls/check
pub async fn rls_check(
    Extension(orchestrator): Extension<Arc<ChallengeOrchestrator>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let rls = orchestrator.rls_check(&principal).await?;
    Ok(Json(json!({ "rls": rls })))
}
