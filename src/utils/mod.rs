use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate, Utc};
use sha2::{Digest, Sha256};

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

pub fn sha256_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub fn format_decimal(value: f64) -> String {
    format!("{:.2}", value)
}

pub fn parse_decimal(value: &str) -> Result<f64> {
    value
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|e| anyhow!("Parse decimal: {}", e))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Normalize a user- or AI-supplied date string to ISO `YYYY-MM-DD`.
/// Unparseable input is passed through untouched so the user can fix it
/// in place.
pub fn normalize_date(value: Option<String>) -> Option<String> {
    let raw = value?.trim().to_string();
    if raw.is_empty() {
        return None;
    }

    parse_date(&raw).map_or(Some(raw), |date| Some(date.format("%Y-%m-%d").to_string()))
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let formats = ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%Y/%m/%d", "%Y.%m.%d"];
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw.trim(), fmt).ok())
}

/// First day of the given date's month, as ISO `YYYY-MM-DD`.
pub fn month_floor(date: NaiveDate) -> String {
    format!("{}-{:02}-01", date.year(), date.month())
}
