//! Response normalizer.
//!
//! Provider payloads arrive in several shapes: the interesting fields may sit
//! at the top level or inside a `passbook` / `data` envelope, and each field
//! has been seen under more than one name. Normalization is an ordered list of
//! [`FieldRule`]s; each rule is a precedence chain of [`Lookup`]s and the first
//! present value wins.
//!
//! `normalize` is total: any JSON input (including non-objects) yields a
//! [`NormalizedSummary`] with at least `normalized_at`. The stored document
//! is the summary's serde form, so what a caller receives and what is
//! persisted are the same JSON.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Envelope keys, in precedence order.
pub const ENVELOPE_KEYS: &[&str] = &["passbook", "data"];

/// Where a rule looks for a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Key inside the envelope (the top level when there is no envelope).
    Envelope(&'static str),
    /// Key on the top-level object, ignoring any envelope.
    TopLevel(&'static str),
    /// Length of a non-empty array inside the envelope.
    EnvelopeLen(&'static str),
}

/// One canonical field and the chain of places it may come from.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub chain: &'static [Lookup],
}

use Lookup::{Envelope, EnvelopeLen, TopLevel};

/// Canonical EPFO summary rules, in output order.
pub const EPFO_RULES: &[FieldRule] = &[
    FieldRule {
        field: "balance",
        chain: &[
            Envelope("balance"),
            Envelope("total_balance"),
            Envelope("current_balance"),
            TopLevel("balance"),
            TopLevel("total"),
            TopLevel("amount"),
        ],
    },
    FieldRule {
        field: "last_contribution",
        chain: &[
            Envelope("last_contribution_date"),
            Envelope("last_contribution"),
            Envelope("last_contribution_on"),
        ],
    },
    FieldRule {
        field: "employer",
        chain: &[
            Envelope("employer"),
            Envelope("employer_name"),
            Envelope("establishment"),
        ],
    },
    FieldRule {
        field: "member_name",
        chain: &[Envelope("member_name"), Envelope("name"), Envelope("member")],
    },
    FieldRule {
        field: "uan",
        chain: &[Envelope("uan"), TopLevel("uan"), Envelope("member_uan")],
    },
    FieldRule {
        field: "contributions_count",
        chain: &[
            Envelope("contributions_count"),
            EnvelopeLen("contributions"),
        ],
    },
];

/// PAN profile rules for the tax pull.
pub const PAN_RULES: &[FieldRule] = &[
    FieldRule {
        field: "pan",
        chain: &[Envelope("pan_number"), Envelope("pan"), TopLevel("pan")],
    },
    FieldRule {
        field: "full_name",
        chain: &[
            Envelope("full_name"),
            Envelope("name_on_pan"),
            Envelope("name"),
        ],
    },
    FieldRule {
        field: "date_of_birth",
        chain: &[Envelope("dob"), Envelope("date_of_birth")],
    },
    FieldRule {
        field: "aadhaar_linked",
        chain: &[Envelope("aadhaar_linked"), Envelope("aadhaar_seeding_status")],
    },
];

/// Annual information statement rules for the tax pull.
pub const AIS_RULES: &[FieldRule] = &[
    FieldRule {
        field: "financial_year",
        chain: &[
            Envelope("financial_year"),
            Envelope("year"),
            Envelope("assessment_year"),
        ],
    },
    FieldRule {
        field: "total_income",
        chain: &[
            Envelope("total_income"),
            Envelope("gross_total_income"),
            Envelope("income"),
        ],
    },
    FieldRule {
        field: "tax_paid",
        chain: &[
            Envelope("tax_paid"),
            Envelope("total_tax_paid"),
            Envelope("tds"),
        ],
    },
    FieldRule {
        field: "transactions_count",
        chain: &[
            Envelope("transactions_count"),
            EnvelopeLen("transactions"),
        ],
    },
];

/// Borrowed view of a raw payload with its envelope resolved once.
#[derive(Debug, Clone, Copy)]
pub struct PayloadView<'a> {
    top: Option<&'a Map<String, Value>>,
    envelope: Option<&'a Map<String, Value>>,
}

impl<'a> PayloadView<'a> {
    pub fn new(raw: &'a Value) -> Self {
        let top = raw.as_object();
        let envelope = top.and_then(|obj| {
            ENVELOPE_KEYS
                .iter()
                .filter_map(|k| obj.get(*k).and_then(Value::as_object))
                .find(|inner| !inner.is_empty())
                .or(Some(obj))
        });
        Self { top, envelope }
    }

    fn lookup(&self, lookup: Lookup) -> Option<Value> {
        match lookup {
            Envelope(key) => self.envelope.and_then(|m| m.get(key)).and_then(present),
            TopLevel(key) => self.top.and_then(|m| m.get(key)).and_then(present),
            EnvelopeLen(key) => self
                .envelope
                .and_then(|m| m.get(key))
                .and_then(Value::as_array)
                .filter(|items| !items.is_empty())
                .map(|items| Value::from(items.len() as u64)),
        }
    }
}

/// Null and blank strings count as absent.
fn present(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        other => Some(other.clone()),
    }
}

impl FieldRule {
    /// First present value along the chain.
    pub fn extract(&self, view: &PayloadView<'_>) -> Option<Value> {
        self.chain.iter().find_map(|lookup| view.lookup(*lookup))
    }
}

/// Canonical summary. Serializes flat: the extracted fields plus `normalized_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSummary {
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
    pub normalized_at: DateTime<Utc>,
}

impl NormalizedSummary {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn balance(&self) -> Option<&Value> {
        self.get("balance")
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Normalize with the EPFO rule set, stamped now.
pub fn normalize(raw: &Value) -> NormalizedSummary {
    normalize_at(raw, EPFO_RULES, Utc::now())
}

pub fn normalize_at(raw: &Value, rules: &[FieldRule], at: DateTime<Utc>) -> NormalizedSummary {
    let view = PayloadView::new(raw);
    let fields = rules
        .iter()
        .filter_map(|rule| rule.extract(&view).map(|v| (rule.field.to_string(), v)))
        .collect();
    NormalizedSummary {
        fields,
        normalized_at: at,
    }
}

/// Normalize a tax pull: PAN profile fields and AIS fields in one summary.
pub fn normalize_itr(pan_data: &Value, ais_data: &Value) -> NormalizedSummary {
    let at = Utc::now();
    let mut summary = normalize_at(pan_data, PAN_RULES, at);
    summary
        .fields
        .extend(normalize_at(ais_data, AIS_RULES, at).fields);
    summary
}
