//! Verification Gateway Client.
//!
//! The orchestrator talks to the provider only through [`VerificationGateway`],
//! so tests substitute a fake and production wires [`HttpGateway`].

mod http;

pub use http::HttpGateway;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Keys that may carry the provider's transaction id, in precedence order.
pub const TRANSACTION_ID_KEYS: &[&str] = &["transaction_id", "txn_id", "request_id"];

/// A successful provider response: its status and parsed JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReply {
    pub status: u16,
    pub body: Value,
}

impl ProviderReply {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }
}

/// One authenticated provider call per invocation. No retries; callers that
/// want retry or backoff layer it on top.
#[async_trait]
pub trait VerificationGateway: Send + Sync {
    /// POST `payload` to `path` and return the status and parsed JSON body.
    ///
    /// Fails with `Transport` on network error or timeout and with `Upstream`
    /// on a non-success status.
    async fn call(&self, path: &str, payload: &Value) -> Result<ProviderReply>;
}

/// Extract the transaction id from a `generate` response: first matching key
/// at the top level, then inside a `data` object. Strings must be non-blank;
/// numbers are stringified.
pub fn extract_transaction_id(response: &Value) -> Option<String> {
    let top = response.as_object()?;
    let scopes = std::iter::once(top).chain(top.get("data").and_then(Value::as_object));
    for scope in scopes {
        for key in TRANSACTION_ID_KEYS {
            let id = match scope.get(*key) {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            };
            if id.is_some() {
                return id;
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transaction_id_precedence() {
        let v = json!({"request_id": "r", "txn_id": "t", "transaction_id": "x"});
        assert_eq!(extract_transaction_id(&v).as_deref(), Some("x"));
        let v = json!({"request_id": "r", "txn_id": "t"});
        assert_eq!(extract_transaction_id(&v).as_deref(), Some("t"));
        let v = json!({"request_id": "r"});
        assert_eq!(extract_transaction_id(&v).as_deref(), Some("r"));
    }

    #[test]
    fn transaction_id_inside_data_envelope() {
        let v = json!({"status_code": 200, "data": {"txn_id": "tx-9"}});
        assert_eq!(extract_transaction_id(&v).as_deref(), Some("tx-9"));
    }

    #[test]
    fn top_level_beats_data_envelope() {
        let v = json!({"request_id": "top", "data": {"transaction_id": "inner"}});
        assert_eq!(extract_transaction_id(&v).as_deref(), Some("top"));
    }

    #[test]
    fn numeric_transaction_id_is_stringified() {
        let v = json!({"transaction_id": 12345});
        assert_eq!(extract_transaction_id(&v).as_deref(), Some("12345"));
    }

    #[test]
    fn missing_or_blank_transaction_id() {
        assert_eq!(extract_transaction_id(&json!({"status": "OTP_SENT"})), None);
        assert_eq!(extract_transaction_id(&json!({"transaction_id": " "})), None);
        assert_eq!(extract_transaction_id(&json!({"transaction_id": null})), None);
        assert_eq!(extract_transaction_id(&json!("tx-1")), None);
    }

    #[test]
    fn blank_key_falls_through_to_next() {
        let v = json!({"transaction_id": "", "txn_id": "t-2"});
        assert_eq!(extract_transaction_id(&v).as_deref(), Some("t-2"));
    }
}
