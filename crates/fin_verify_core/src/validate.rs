//! Caller-input validation for subject identifiers.
//!
//! Every function returns the normalized value or a `VerifyError::Validation`
//! whose message tells the caller what to fix.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{Result, VerifyError};

static PAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").expect("valid PAN regex"));
static UAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{12}$").expect("valid UAN regex"));
static MOBILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10}$").expect("valid mobile regex"));
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<start>[0-9]{4})(?:-(?P<end>[0-9]{2}))?$").expect("valid year regex")
});

/// Treat missing and whitespace-only strings the same.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

pub fn mobile(value: Option<&str>) -> Result<String> {
    let raw = non_blank(value).ok_or_else(|| VerifyError::validation("mobile is required"))?;
    let digits: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    let digits = digits.strip_prefix("+91").unwrap_or(&digits).to_string();
    if !MOBILE_RE.is_match(&digits) {
        return Err(VerifyError::validation(
            "mobile must be a 10-digit number",
        ));
    }
    Ok(digits)
}

pub fn pan(value: &str) -> Result<String> {
    let pan = value.trim().to_ascii_uppercase();
    if !PAN_RE.is_match(&pan) {
        return Err(VerifyError::validation(
            "pan must be 5 letters, 4 digits and 1 letter (e.g. ABCDE1234F)",
        ));
    }
    Ok(pan)
}

pub fn uan(value: &str) -> Result<String> {
    let uan = value.trim();
    if !UAN_RE.is_match(uan) {
        return Err(VerifyError::validation("uan must be a 12-digit number"));
    }
    Ok(uan.to_string())
}

/// The provider decides whether an OTP is correct; only a blank one is
/// rejected here.
pub fn otp(value: &str) -> Result<String> {
    let otp = value.trim();
    if otp.is_empty() {
        return Err(VerifyError::validation("otp is required"));
    }
    Ok(otp.to_string())
}

/// Financial year as `YYYY-YY` (e.g. `2023-24`). A bare `YYYY` is taken as
/// the year the financial year starts in.
pub fn financial_year(value: Option<&str>) -> Result<String> {
    let invalid = || VerifyError::validation("year must be a financial year like 2023-24");
    let raw = non_blank(value).ok_or_else(|| VerifyError::validation("year is required"))?;
    let caps = YEAR_RE.captures(raw).ok_or_else(invalid)?;
    let start: u32 = caps["start"].parse().map_err(|_| invalid())?;
    let expected_end = format!("{:02}", (start + 1) % 100);
    match caps.name("end") {
        Some(end) if end.as_str() != expected_end => Err(invalid()),
        _ => Ok(format!("{start}-{expected_end}")),
    }
}

pub fn transaction_id(value: &str) -> Result<String> {
    let txn = value.trim();
    if txn.is_empty() {
        return Err(VerifyError::validation("transaction_id is required"));
    }
    Ok(txn.to_string())
}

/// Date of birth as `YYYY-MM-DD`.
pub fn dob(value: Option<&str>) -> Result<String> {
    let raw = non_blank(value).ok_or_else(|| VerifyError::validation("dob is required"))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| VerifyError::validation("dob must be a date in YYYY-MM-DD format"))?;
    Ok(raw.to_string())
}

/// Source identifiers are compared case-insensitively.
pub fn source(value: &str) -> Result<String> {
    let source = value.trim().to_ascii_lowercase();
    if source.is_empty() {
        return Err(VerifyError::validation("source is required"));
    }
    Ok(source)
}

pub fn required_text(field: &str, value: &str) -> Result<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(VerifyError::validation(format!("{field} is required")));
    }
    Ok(v.to_string())
}
