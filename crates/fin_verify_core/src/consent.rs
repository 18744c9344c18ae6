//! Consent Ledger: per-user, per-source permission to fetch and store data.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::Result;
use crate::ports::ConsentStore;
use crate::types::{ConsentGrant, ConsentUpsert};
use crate::validate;

#[derive(Clone)]
pub struct ConsentLedger {
    store: Arc<dyn ConsentStore>,
}

impl ConsentLedger {
    pub fn new(store: Arc<dyn ConsentStore>) -> Self {
        Self { store }
    }

    /// Create or update the grant for `(user_id, source)`. Repeating the same
    /// call converges on one row holding the latest values.
    pub async fn upsert(&self, user_id: &str, req: ConsentUpsert) -> Result<ConsentGrant> {
        let req = ConsentUpsert {
            source: validate::source(&req.source)?,
            scope: validate::required_text("scope", &req.scope)?,
            duration: validate::required_text("duration", &req.duration)?,
            active: req.active,
        };
        let grant = self.store.upsert(user_id, &req).await?;
        info!(
            user_id,
            source = %grant.source,
            active = grant.active,
            "consent recorded"
        );
        Ok(grant)
    }

    /// True iff an active grant exists. A blank source is never consented.
    pub async fn check(&self, user_id: &str, source: &str) -> Result<bool> {
        let active = self
            .get(user_id, source)
            .await?
            .is_some_and(|grant| grant.active);
        debug!(user_id, source, active, "consent check");
        Ok(active)
    }

    pub async fn get(&self, user_id: &str, source: &str) -> Result<Option<ConsentGrant>> {
        let Ok(source) = validate::source(source) else {
            return Ok(None);
        };
        self.store.get(user_id, &source).await
    }
}
