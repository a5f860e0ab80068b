//! Plain-language explanation of a prediction
//!
//! Picks the strongest attributions on each side and phrases them for an
//! analyst reading the decision.

use serde::Serialize;

use crate::models::{
    Attribution, PredictionResult, CANONICAL_FIELDS, CARD4, CARD6, DEVICE_TYPE, PRODUCT_CD,
    TRANSACTION_AMT,
};

/// How many drivers are named on each side
const TOP_FACTORS: usize = 2;

#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    #[serde(flatten)]
    pub prediction: PredictionResult,
    pub top_risk_factors: Vec<String>,
    pub mitigating_factors: Vec<String>,
    pub narrative: String,
}

/// Display label for an encoded feature, via the canonical column it came from
pub fn display_label(feature: &str) -> String {
    let source = CANONICAL_FIELDS
        .iter()
        .filter(|column| feature_matches(feature, column))
        .max_by_key(|column| column.len());

    let label = match source.copied() {
        Some(TRANSACTION_AMT) => "Transaction Amount",
        Some(PRODUCT_CD) => "Product Type",
        Some(CARD4) => "Card Network",
        Some(CARD6) => "Card Type",
        Some(DEVICE_TYPE) => "Device Used",
        _ => return feature.to_string(),
    };
    label.to_string()
}

/// `num__TransactionAmt`, `cat__card4_visa` and plain `card4_visa` all map back to their column
fn feature_matches(feature: &str, column: &str) -> bool {
    let bare = feature.rsplit_once("__").map(|(_, rest)| rest).unwrap_or(feature);
    bare == column || bare.starts_with(&format!("{}_", column))
}

pub fn explain(prediction: PredictionResult) -> Explanation {
    let mut ranked: Vec<&Attribution> = prediction.shap_values.iter().collect();
    ranked.sort_by(|a, b| b.value.abs().total_cmp(&a.value.abs()));

    let pick = |positive: bool| -> Vec<String> {
        ranked
            .iter()
            .filter(|a| if positive { a.value > 0.0 } else { a.value < 0.0 })
            .take(TOP_FACTORS)
            .map(|a| display_label(&a.feature))
            .collect()
    };
    let top_risk_factors = pick(true);
    let mitigating_factors = pick(false);

    let mut narrative = format!(
        "The model has determined this transaction is {} with a {:.2}% probability. ",
        prediction.label,
        prediction.fraud_probability * 100.0
    );
    if !top_risk_factors.is_empty() {
        narrative.push_str(&format!(
            "Key indicators of concern include {}, which significantly increased the risk profile. ",
            top_risk_factors.join(" and ")
        ));
    }
    if !mitigating_factors.is_empty() {
        narrative.push_str(&format!(
            "Conversely, the transaction's {} acted as mitigating factors.",
            mitigating_factors.join(" and ")
        ));
    }

    Explanation {
        narrative: narrative.trim_end().to_string(),
        top_risk_factors,
        mitigating_factors,
        prediction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttributionVector, RiskTier};

    fn prediction(probability: f64, tier: RiskTier, values: &[(&str, f64)]) -> PredictionResult {
        let shap = AttributionVector(
            values
                .iter()
                .map(|(f, v)| Attribution { feature: f.to_string(), value: *v })
                .collect(),
        );
        PredictionResult::new(probability, tier, shap)
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(display_label("num__TransactionAmt"), "Transaction Amount");
        assert_eq!(display_label("cat__card4_visa"), "Card Network");
        assert_eq!(display_label("card6_debit"), "Card Type");
        assert_eq!(display_label("cat__DeviceType_mobile"), "Device Used");
        assert_eq!(display_label("num__hour"), "num__hour");
        assert_eq!(display_label("cat__day_of_week_3"), "cat__day_of_week_3");
    }

    #[test]
    fn test_narrative_names_both_sides() {
        let explanation = explain(prediction(
            0.8123,
            RiskTier::High,
            &[
                ("num__TransactionAmt", 1.2),
                ("cat__ProductCD_W", -0.1),
                ("cat__card6_credit", 0.4),
                ("cat__DeviceType_mobile", 0.05),
                ("cat__card4_visa", -0.3),
            ],
        ));

        assert_eq!(explanation.top_risk_factors, vec!["Transaction Amount", "Card Type"]);
        assert_eq!(explanation.mitigating_factors, vec!["Card Network", "Product Type"]);
        assert_eq!(
            explanation.narrative,
            "The model has determined this transaction is Fraud with a 81.23% probability. \
             Key indicators of concern include Transaction Amount and Card Type, which significantly increased the risk profile. \
             Conversely, the transaction's Card Network and Product Type acted as mitigating factors."
        );
    }

    #[test]
    fn test_narrative_without_drivers() {
        let explanation = explain(prediction(0.05, RiskTier::Low, &[("num__TransactionAmt", 0.0)]));
        assert!(explanation.top_risk_factors.is_empty());
        assert!(explanation.mitigating_factors.is_empty());
        assert_eq!(
            explanation.narrative,
            "The model has determined this transaction is Legitimate with a 5.00% probability."
        );
    }

    #[test]
    fn test_explanation_keeps_prediction_fields() {
        let explanation = explain(prediction(0.4, RiskTier::Medium, &[("num__hour", -0.2)]));
        let value = serde_json::to_value(&explanation).unwrap();
        assert_eq!(value["risk_level"], "Medium Risk");
        assert_eq!(value["label"], "Manual Review");
        assert_eq!(value["shap_values"]["num__hour"], -0.2);
        assert_eq!(value["mitigating_factors"][0], "num__hour");
    }
}
