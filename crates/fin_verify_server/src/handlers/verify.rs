//! /verify/*: OTP challenge, passbook lookup, and stored summaries.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::{Extension, Json};
use fin_verify_core::types::{
    InitiateChallenge, InitiatedChallenge, PassbookRequest, PassbookResult, ResolvedChallenge,
    VerificationSummary,
};
use fin_verify_core::{ChallengeOrchestrator, Principal, VerifyError};
use serde::Deserialize;

use super::json_body;
use crate::error::AppError;

/// POST /verify/generate-otp
pub async fn generate_otp(
    Extension(orchestrator): Extension<Arc<ChallengeOrchestrator>>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<InitiateChallenge>, JsonRejection>,
) -> Result<Json<InitiatedChallenge>, AppError> {
    let req = json_body(payload)?;
    let initiated = orchestrator.initiate_challenge(&principal, req).await?;
    Ok(Json(initiated))
}

#[derive(Debug, Deserialize)]
pub struct SubmitOtp {
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub otp: String,
}

/// POST /verify/submit-otp
///
/// Resolution runs on its own task: once the provider has consumed the OTP
/// the outcome is recorded even if the client disconnects.
pub async fn submit_otp(
    Extension(orchestrator): Extension<Arc<ChallengeOrchestrator>>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<SubmitOtp>, JsonRejection>,
) -> Result<Json<ResolvedChallenge>, AppError> {
    let req = json_body(payload)?;
    let task = tokio::spawn(async move {
        orchestrator
            .resolve_challenge(&principal, &req.transaction_id, &req.otp)
            .await
    });
    let resolved = task
        .await
        .map_err(|e| VerifyError::Internal(anyhow::anyhow!("resolve task failed: {e}")))??;
    Ok(Json(resolved))
}

/// POST /verify/passbook
pub async fn passbook(
    Extension(orchestrator): Extension<Arc<ChallengeOrchestrator>>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<PassbookRequest>, JsonRejection>,
) -> Result<Json<PassbookResult>, AppError> {
    let req = json_body(payload)?;
    Ok(Json(orchestrator.fetch_passbook(&principal, req).await?))
}

/// GET /verify/summaries
pub async fn summaries(
    Extension(orchestrator): Extension<Arc<ChallengeOrchestrator>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<VerificationSummary>>, AppError> {
    Ok(Json(orchestrator.list_summaries(&principal).await?))
}

/// GET /verify/latest
pub async fn latest(
    Extension(orchestrator): Extension<Arc<ChallengeOrchestrator>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Option<VerificationSummary>>, AppError> {
    Ok(Json(orchestrator.latest_summary(&principal).await?))
}
