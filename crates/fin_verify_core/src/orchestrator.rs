//! OTP Challenge Orchestrator.
//!
//! Drives the two-phase flow `initiate -> resolve` against the provider and
//! owns every challenge status transition:
//!
//! ```text
//! INITIATED ──provider ok + stored──▶ RESOLVED
//!     │
//!     └──────provider error─────────▶ FAILED
//! ```
//!
//! Also runs the direct (no OTP) pulls: the EPFO passbook lookup and the
//! tax (ITR) collection.
//!
//! Takes its collaborators as `Arc<dyn Trait>` so the same logic runs against
//! Postgres, the in-memory store, or test doubles.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, error, info, warn};

use crate::config::{ProviderRoutes, SourceRoutes};
use crate::consent::ConsentLedger;
use crate::error::{Result, VerifyError};
use crate::gateway::{extract_transaction_id, VerificationGateway};
use crate::inflight::InFlightRegistry;
use crate::memory::MemoryStore;
use crate::normalize::{normalize, normalize_itr, NormalizedSummary};
use crate::ports::{ChallengeStore, ConsentStore, SummaryStore, TaxRecordStore};
use crate::principal::Principal;
use crate::types::*;
use crate::validate;

pub struct ChallengeOrchestrator {
    gateway: Arc<dyn VerificationGateway>,
    routes: ProviderRoutes,
    challenges: Arc<dyn ChallengeStore>,
    summaries: Arc<dyn SummaryStore>,
    tax_records: Arc<dyn TaxRecordStore>,
    consent: ConsentLedger,
    inflight: InFlightRegistry,
}

impl ChallengeOrchestrator {
    pub fn new(
        gateway: Arc<dyn VerificationGateway>,
        challenges: Arc<dyn ChallengeStore>,
        consents: Arc<dyn ConsentStore>,
        summaries: Arc<dyn SummaryStore>,
        tax_records: Arc<dyn TaxRecordStore>,
    ) -> Self {
        Self {
            gateway,
            routes: ProviderRoutes::default(),
            challenges,
            summaries,
            tax_records,
            consent: ConsentLedger::new(consents),
            inflight: InFlightRegistry::new(),
        }
    }

    /// Every port backed by one [`MemoryStore`].
    pub fn in_memory(gateway: Arc<dyn VerificationGateway>, store: Arc<MemoryStore>) -> Self {
        Self::new(gateway, store.clone(), store.clone(), store.clone(), store)
    }

    pub fn with_routes(mut self, routes: ProviderRoutes) -> Self {
        self.routes = routes;
        self
    }

    pub fn consent(&self) -> &ConsentLedger {
        &self.consent
    }

    fn routes_for(&self, source: &str) -> Result<&SourceRoutes> {
        self.routes.get(source).ok_or_else(|| {
            VerifyError::validation(format!("unsupported source '{source}'"))
        })
    }

    async fn require_consent(&self, principal: &Principal, source: &str) -> Result<()> {
        if self.consent.check(&principal.user_id, source).await? {
            return Ok(());
        }
        debug!(user_id = %principal.user_id, source, "blocked on consent");
        Err(VerifyError::ConsentRequired {
            data_source: source.to_string(),
        })
    }

    // ── Initiate ──────────────────────────────────────────────

    /// Ask the provider to send an OTP and record the challenge as INITIATED.
    ///
    /// Nothing is persisted unless the provider accepted the request and
    /// returned a transaction id.
    pub async fn initiate_challenge(
        &self,
        principal: &Principal,
        req: InitiateChallenge,
    ) -> Result<InitiatedChallenge> {
        let source = match validate::non_blank(req.source.as_deref()) {
            Some(s) => validate::source(s)?,
            None => DEFAULT_SOURCE.to_string(),
        };
        let route = self.routes_for(&source)?;
        let subject = SubjectIdentifiers {
            mobile: validate::mobile(req.mobile.as_deref())?,
            pan: validate::non_blank(req.pan.as_deref())
                .map(validate::pan)
                .transpose()?,
            uan: validate::non_blank(req.uan.as_deref())
                .map(validate::uan)
                .transpose()?,
        };
        if subject.pan.is_none() && subject.uan.is_none() {
            return Err(VerifyError::validation(
                "at least one of pan or uan is required",
            ));
        }

        let reply = self
            .gateway
            .call(&route.generate, &generate_payload(&subject))
            .await
            .inspect_err(|e| {
                warn!(user_id = %principal.user_id, %source, error = %e, "otp generation failed");
            })?;

        let transaction_id = extract_transaction_id(&reply.body).ok_or_else(|| {
            warn!(
                user_id = %principal.user_id,
                %source,
                status = reply.status,
                "provider response carried no transaction id"
            );
            VerifyError::Upstream {
                status: reply.status,
                body: format!("no transaction id in response: {}", reply.body),
            }
        })?;

        let challenge = VerificationChallenge::initiated(
            transaction_id,
            principal.user_id.clone(),
            source,
            subject,
        );
        self.challenges.insert(&challenge).await.map_err(|e| {
            error!(
                transaction_id = %challenge.transaction_id,
                error = %e,
                "failed to record initiated challenge"
            );
            as_persistence(e)
        })?;

        info!(
            user_id = %principal.user_id,
            transaction_id = %challenge.transaction_id,
            source = %challenge.source,
            "challenge initiated"
        );
        Ok(InitiatedChallenge {
            transaction_id: challenge.transaction_id,
            status: challenge.status,
            created_at: challenge.created_at,
        })
    }

    // ── Resolve ───────────────────────────────────────────────

    /// Submit the OTP, normalize the provider payload, and record the result.
    ///
    /// At most one resolve per transaction reaches the provider; a concurrent
    /// second caller gets `InvalidState`. A terminal transaction answers
    /// `InvalidState` whatever OTP is sent. Consent is checked before the
    /// provider call.
    pub async fn resolve_challenge(
        &self,
        principal: &Principal,
        transaction_id: &str,
        otp: &str,
    ) -> Result<ResolvedChallenge> {
        let transaction_id = validate::transaction_id(transaction_id)?;

        let _claim = self.inflight.try_claim(&transaction_id).ok_or_else(|| {
            VerifyError::InvalidState("resolution already in progress".into())
        })?;

        let challenge = self
            .challenges
            .get(&transaction_id)
            .await?
            .filter(|c| c.user_id == principal.user_id)
            .ok_or_else(|| {
                VerifyError::InvalidState(format!("unknown transaction {transaction_id}"))
            })?;
        if challenge.status != ChallengeStatus::Initiated {
            return Err(VerifyError::InvalidState(format!(
                "transaction {transaction_id} is already {}",
                challenge.status
            )));
        }

        let otp = validate::otp(otp)?;
        self.require_consent(principal, &challenge.source).await?;

        let route = self.routes_for(&challenge.source)?;
        let payload = json!({ "transaction_id": transaction_id, "otp": otp });
        let raw = match self.gateway.call(&route.resolve, &payload).await {
            Ok(reply) => reply.body,
            Err(e) => {
                warn!(%transaction_id, error = %e, "otp resolution rejected by provider");
                self.mark_failed(&transaction_id).await;
                return Err(e);
            }
        };

        let normalized = normalize(&raw);
        let normalized_payload = match stored_form(&normalized) {
            Ok(doc) => doc,
            Err(e) => {
                self.mark_failed(&transaction_id).await;
                return Err(e);
            }
        };
        let summary = NewSummary {
            user_id: principal.user_id.clone(),
            transaction_id: transaction_id.clone(),
            raw_payload: raw.clone(),
            normalized_payload,
        };

        match self.challenges.resolve(&transaction_id, summary).await {
            Ok(record) => {
                info!(
                    user_id = %principal.user_id,
                    %transaction_id,
                    summary_id = %record.id,
                    "challenge resolved"
                );
            }
            Err(e @ VerifyError::InvalidState(_)) => {
                warn!(%transaction_id, "challenge left INITIATED before resolve completed");
                return Err(e);
            }
            Err(e) => {
                error!(
                    user_id = %principal.user_id,
                    %transaction_id,
                    error = %e,
                    "provider accepted otp but result could not be recorded"
                );
                self.mark_failed(&transaction_id).await;
                return Err(as_persistence(e));
            }
        }

        Ok(ResolvedChallenge {
            transaction_id,
            raw,
            normalized,
        })
    }

    /// Best-effort `INITIATED -> FAILED`. Never masks the caller's error.
    async fn mark_failed(&self, transaction_id: &str) {
        match self.challenges.mark_failed(transaction_id).await {
            Ok(true) => info!(%transaction_id, "challenge marked failed"),
            Ok(false) => debug!(%transaction_id, "challenge already terminal"),
            Err(e) => error!(%transaction_id, error = %e, "failed to mark challenge failed"),
        }
    }

    // ── Passbook ──────────────────────────────────────────────

    /// Direct passbook lookup by UAN and date of birth. Consent-gated on
    /// `epfo`; the result is returned but not stored.
    pub async fn fetch_passbook(
        &self,
        principal: &Principal,
        req: PassbookRequest,
    ) -> Result<PassbookResult> {
        let uan = validate::non_blank(req.uan.as_deref())
            .ok_or_else(|| VerifyError::validation("uan is required"))
            .and_then(validate::uan)?;
        let dob = validate::dob(req.dob.as_deref())?;
        let pan = validate::non_blank(req.pan.as_deref())
            .map(validate::pan)
            .transpose()?;

        self.require_consent(principal, DEFAULT_SOURCE).await?;
        let path = self
            .routes_for(DEFAULT_SOURCE)?
            .passbook
            .as_deref()
            .ok_or_else(|| VerifyError::validation("passbook lookup is not configured"))?;

        let mut payload = Map::new();
        payload.insert("uan".into(), Value::String(uan));
        payload.insert("dob".into(), Value::String(dob));
        if let Some(pan) = pan {
            payload.insert("pan".into(), Value::String(pan));
        }

        let raw = self
            .gateway
            .call(path, &Value::Object(payload))
            .await
            .inspect_err(|e| warn!(user_id = %principal.user_id, error = %e, "passbook fetch failed"))?
            .body;
        Ok(PassbookResult {
            normalized: normalize(&raw),
            raw,
        })
    }

    // ── Tax (ITR) ─────────────────────────────────────────────

    /// Pull the PAN profile and the annual information statement for one
    /// financial year, then store both with their canonical summary.
    ///
    /// Consent-gated on `itr`. Either provider call failing stores nothing.
    pub async fn collect_itr(&self, principal: &Principal, req: ItrRequest) -> Result<TaxRecord> {
        let pan = validate::non_blank(req.pan.as_deref())
            .ok_or_else(|| VerifyError::validation("pan is required"))
            .and_then(validate::pan)?;
        let year = validate::financial_year(req.year.as_deref())?;

        self.require_consent(principal, ITR_SOURCE).await?;
        let routes = self.routes.itr();

        let pan_data = self
            .gateway
            .call(&routes.pan_profile, &json!({ "pan": pan }))
            .await
            .inspect_err(|e| warn!(user_id = %principal.user_id, error = %e, "PAN profile fetch failed"))?
            .body;
        let ais_data = self
            .gateway
            .call(&routes.ais, &json!({ "pan": pan, "year": year }))
            .await
            .inspect_err(|e| warn!(user_id = %principal.user_id, %year, error = %e, "AIS fetch failed"))?
            .body;

        let normalized_payload = stored_form(&normalize_itr(&pan_data, &ais_data))?;
        let record = self
            .tax_records
            .append(NewTaxRecord {
                user_id: principal.user_id.clone(),
                pan,
                year,
                pan_data,
                ais_data,
                normalized_payload,
            })
            .await
            .map_err(|e| {
                error!(user_id = %principal.user_id, error = %e, "ITR data fetched but could not be recorded");
                as_persistence(e)
            })?;

        info!(
            user_id = %principal.user_id,
            record_id = %record.id,
            year = %record.year,
            "ITR data collected"
        );
        Ok(record)
    }

    // ── Queries ───────────────────────────────────────────────

    /// Whether the caller holds active `epfo` consent.
    pub async fn rls_check(&self, principal: &Principal) -> Result<bool> {
        self.consent.check(&principal.user_id, DEFAULT_SOURCE).await
    }

    pub async fn list_summaries(&self, principal: &Principal) -> Result<Vec<VerificationSummary>> {
        self.summaries.list(&principal.user_id).await
    }

    pub async fn latest_summary(
        &self,
        principal: &Principal,
    ) -> Result<Option<VerificationSummary>> {
        self.summaries.latest(&principal.user_id).await
    }

    pub async fn list_tax_records(&self, principal: &Principal) -> Result<Vec<TaxRecord>> {
        self.tax_records.list(&principal.user_id).await
    }
}

fn generate_payload(subject: &SubjectIdentifiers) -> Value {
    let mut body = Map::new();
    body.insert("mobile".into(), Value::String(subject.mobile.clone()));
    if let Some(pan) = &subject.pan {
        body.insert("pan".into(), Value::String(pan.clone()));
    }
    if let Some(uan) = &subject.uan {
        body.insert("uan".into(), Value::String(uan.clone()));
    }
    Value::Object(body)
}

/// The document stored for a summary: its serde form, identical to what the
/// caller receives.
fn stored_form(summary: &NormalizedSummary) -> Result<Value> {
    serde_json::to_value(summary)
        .map_err(|e| VerifyError::Internal(anyhow::anyhow!("failed to encode summary: {e}")))
}

fn as_persistence(err: VerifyError) -> VerifyError {
    match err {
        VerifyError::Persistence(_) => err,
        other => VerifyError::persistence(other),
    }
}
