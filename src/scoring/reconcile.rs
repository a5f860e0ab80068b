//! Feature Reconciler
//!
//! Maps whatever the caller sent into the seven-field record the preprocessor
//! expects. Never fails: missing, extra or wrongly-typed attributes degrade to
//! defaults.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde_json::Value;

use crate::models::{
    CanonicalFeatureRecord, RawInputRecord, format_number,
    CARD4, CARD6, DEVICE_TYPE, PRODUCT_CD, TRANSACTION_AMT, UNKNOWN,
};

/// Build the canonical record from raw attributes and the current UTC time.
///
/// `hour` and `day_of_week` always come from `now`; caller-supplied values for
/// them are ignored. Attributes outside the layout are dropped.
pub fn reconcile(raw: &RawInputRecord, now: DateTime<Utc>) -> CanonicalFeatureRecord {
    CanonicalFeatureRecord {
        transaction_amt: raw.get(TRANSACTION_AMT).map(coerce_numeric).unwrap_or(0.0),
        product_cd: text_or_unknown(raw, PRODUCT_CD),
        card4: text_or_unknown(raw, CARD4),
        card6: text_or_unknown(raw, CARD6),
        device_type: text_or_unknown(raw, DEVICE_TYPE),
        hour: now.hour(),
        day_of_week: now.weekday().num_days_from_monday(),
    }
}

/// Numeric coercion: anything that does not parse to a real number becomes 0
pub fn coerce_numeric(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };

    match parsed {
        Some(n) if !n.is_nan() => n,
        _ => 0.0,
    }
}

fn text_or_unknown(raw: &RawInputRecord, name: &str) -> String {
    raw.get(name)
        .and_then(coerce_text)
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => n.as_f64().map(format_number),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
