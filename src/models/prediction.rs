//! Prediction models

use serde::{ser::SerializeMap, Serialize, Serializer};

// ============================================================================
// RISK TIER
// ============================================================================

/// Discrete risk band derived from the fraud probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn risk_level(&self) -> &'static str {
        match self {
            RiskTier::High => "High Risk",
            RiskTier::Medium => "Medium Risk",
            RiskTier::Low => "Low Risk",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::High => "Fraud",
            RiskTier::Medium => "Manual Review",
            RiskTier::Low => "Legitimate",
        }
    }

    /// Binary fraud flag: only the high tier counts as a positive prediction
    pub fn prediction_flag(&self) -> u8 {
        match self {
            RiskTier::High => 1,
            RiskTier::Medium | RiskTier::Low => 0,
        }
    }
}

// ============================================================================
// ATTRIBUTION
// ============================================================================

/// Signed contribution of one encoded feature
#[derive(Debug, Clone, PartialEq)]
pub struct Attribution {
    pub feature: String,
    pub value: f64,
}

/// Per-feature contributions in the preprocessor's output order, bias excluded.
///
/// Serializes as a JSON object keyed by feature name, keeping that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributionVector(pub Vec<Attribution>);

impl AttributionVector {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribution> {
        self.0.iter()
    }

    pub fn get(&self, feature: &str) -> Option<f64> {
        self.0.iter().find(|a| a.feature == feature).map(|a| a.value)
    }
}

impl Serialize for AttributionVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for attribution in &self.0 {
            map.serialize_entry(&attribution.feature, &attribution.value)?;
        }
        map.end()
    }
}

// ============================================================================
// RESULT
// ============================================================================

/// Response payload of `/predict`
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    /// Rounded to 4 decimals for display
    pub fraud_probability: f64,
    pub fraud_prediction: u8,
    pub risk_level: &'static str,
    pub label: &'static str,
    pub shap_values: AttributionVector,

    /// Unrounded probability the tier was derived from
    #[serde(skip)]
    pub raw_probability: f64,
    #[serde(skip)]
    pub tier: RiskTier,
}

impl PredictionResult {
    pub fn new(probability: f64, tier: RiskTier, shap_values: AttributionVector) -> Self {
        Self {
            fraud_probability: round_to(probability, 4),
            fraud_prediction: tier.prediction_flag(),
            risk_level: tier.risk_level(),
            label: tier.label(),
            shap_values,
            raw_probability: probability,
            tier,
        }
    }
}

/// Round half away from zero to `digits` decimals
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_fields_are_consistent() {
        assert_eq!(RiskTier::High.prediction_flag(), 1);
        assert_eq!(RiskTier::High.label(), "Fraud");
        assert_eq!(RiskTier::Medium.risk_level(), "Medium Risk");
        assert_eq!(RiskTier::Medium.prediction_flag(), 0);
        assert_eq!(RiskTier::Low.label(), "Legitimate");
    }

    #[test]
    fn test_attributions_serialize_in_order() {
        let shap = AttributionVector(vec![
            Attribution { feature: "num__TransactionAmt".into(), value: 0.5 },
            Attribution { feature: "cat__ProductCD_C".into(), value: -0.25 },
            Attribution { feature: "cat__ProductCD_W".into(), value: 0.0 },
        ]);
        let json = serde_json::to_string(&shap).unwrap();
        assert_eq!(
            json,
            r#"{"num__TransactionAmt":0.5,"cat__ProductCD_C":-0.25,"cat__ProductCD_W":0.0}"#
        );
        assert_eq!(shap.get("cat__ProductCD_C"), Some(-0.25));
    }

    #[test]
    fn test_result_rounds_for_display_only() {
        let result = PredictionResult::new(0.123456, RiskTier::Low, AttributionVector::default());
        assert_eq!(result.fraud_probability, 0.1235);
        assert_eq!(result.raw_probability, 0.123456);

        let value = serde_json::to_value(&result).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 5);
        assert!(value.get("raw_probability").is_none());
        assert_eq!(value["risk_level"], "Low Risk");
    }
}
