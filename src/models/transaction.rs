//! Transaction models
//!
//! Raw attributes as the caller sends them, and the fixed-schema record the
//! preprocessor was fitted on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// CANONICAL LAYOUT
// ============================================================================

pub const TRANSACTION_AMT: &str = "TransactionAmt";
pub const PRODUCT_CD: &str = "ProductCD";
pub const CARD4: &str = "card4";
pub const CARD6: &str = "card6";
pub const DEVICE_TYPE: &str = "DeviceType";
pub const HOUR: &str = "hour";
pub const DAY_OF_WEEK: &str = "day_of_week";

/// Canonical fields in the exact order the preprocessor was fitted on
pub const CANONICAL_FIELDS: [&str; 7] = [
    TRANSACTION_AMT,
    PRODUCT_CD,
    CARD4,
    CARD6,
    DEVICE_TYPE,
    HOUR,
    DAY_OF_WEEK,
];

/// Default for text fields the caller did not supply
pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Numeric,
    Text,
}

/// Kind of a canonical field, `None` for anything outside the layout
pub fn field_kind(name: &str) -> Option<FieldKind> {
    match name {
        TRANSACTION_AMT | HOUR | DAY_OF_WEEK => Some(FieldKind::Numeric),
        PRODUCT_CD | CARD4 | CARD6 | DEVICE_TYPE => Some(FieldKind::Text),
        _ => None,
    }
}

// ============================================================================
// REQUEST
// ============================================================================

/// Unordered, loosely-typed attributes supplied per request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInputRecord(pub HashMap<String, Value>);

impl RawInputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Present and non-null attribute
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RawInputRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Body of `/predict` and `/explain`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub features: RawInputRecord,
}

// ============================================================================
// CANONICAL RECORD
// ============================================================================

/// Fixed-shape record handed to the preprocessor. Every field is always present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalFeatureRecord {
    #[serde(rename = "TransactionAmt")]
    pub transaction_amt: f64,
    #[serde(rename = "ProductCD")]
    pub product_cd: String,
    pub card4: String,
    pub card6: String,
    #[serde(rename = "DeviceType")]
    pub device_type: String,
    /// UTC hour, 0-23
    pub hour: u32,
    /// UTC weekday, Monday = 0
    pub day_of_week: u32,
}

/// Borrowed view of one canonical cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Number(f64),
    Text(&'a str),
}

impl Cell<'_> {
    /// Text form used when a numeric cell is matched against text categories
    pub fn to_text(&self) -> String {
        match self {
            Cell::Number(n) => format_number(*n),
            Cell::Text(s) => s.to_string(),
        }
    }
}

impl CanonicalFeatureRecord {
    /// Cell for a canonical column name, `None` outside the layout
    pub fn cell(&self, column: &str) -> Option<Cell<'_>> {
        let cell = match column {
            TRANSACTION_AMT => Cell::Number(self.transaction_amt),
            PRODUCT_CD => Cell::Text(&self.product_cd),
            CARD4 => Cell::Text(&self.card4),
            CARD6 => Cell::Text(&self.card6),
            DEVICE_TYPE => Cell::Text(&self.device_type),
            HOUR => Cell::Number(f64::from(self.hour)),
            DAY_OF_WEEK => Cell::Number(f64::from(self.day_of_week)),
            _ => return None,
        };
        Some(cell)
    }

    /// Cells in canonical order
    pub fn cells(&self) -> impl Iterator<Item = (&'static str, Cell<'_>)> + '_ {
        CANONICAL_FIELDS
            .iter()
            .filter_map(move |name| self.cell(name).map(|c| (*name, c)))
    }
}

/// Integral values print without a fractional part (`5.0` -> `"5"`)
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
