//! /tax/itr: PAN profile and AIS collection.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::{Extension, Json};
use fin_verify_core::types::{ItrRequest, TaxRecord};
use fin_verify_core::{ChallengeOrchestrator, Principal};

use super::json_body;
use crate::error::AppError;

/// POST /tax/itr/collect
pub async fn collect(
    Extension(orchestrator): Extension<Arc<ChallengeOrchestrator>>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<ItrRequest>, JsonRejection>,
) -> Result<Json<TaxRecord>, AppError> {
    let req = json_body(payload)?;
    Ok(Json(orchestrator.collect_itr(&principal, req).await?))
}

/// GET /tax/itr
pub async fn list(
    Extension(orchestrator): Extension<Arc<ChallengeOrchestrator>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<TaxRecord>>, AppError> {
    Ok(Json(orchestrator.list_tax_records(&principal).await?))
}
