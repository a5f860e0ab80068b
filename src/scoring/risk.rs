//! Risk tier thresholds
//!
//! Splits [0, 1] into three half-open bands. Each lower bound is inclusive.

use crate::models::RiskTier;

/// Lower bound of the high-risk band
pub const HIGH_RISK_MIN: f64 = 0.7557;

/// Lower bound of the manual-review band
pub const MEDIUM_RISK_MIN: f64 = 0.30;

/// Threshold Configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskThresholds {
    /// probability >= high => High Risk
    pub high: f64,

    /// medium <= probability < high => Medium Risk
    pub medium: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high: HIGH_RISK_MIN,
            medium: MEDIUM_RISK_MIN,
        }
    }
}

impl RiskThresholds {
    /// Compare against the unrounded probability
    pub fn classify(&self, probability: f64) -> RiskTier {
        if probability >= self.high {
            RiskTier::High
        } else if probability >= self.medium {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }
}

/// Classify with the fixed production thresholds
pub fn classify(probability: f64) -> RiskTier {
    RiskThresholds::default().classify(probability)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_boundary_is_inclusive() {
        assert_eq!(classify(0.7557), RiskTier::High);
        assert_eq!(classify(0.7557).prediction_flag(), 1);
        assert_eq!(classify(0.755_699_999), RiskTier::Medium);
        assert_eq!(classify(1.0), RiskTier::High);
    }

    #[test]
    fn test_medium_boundary_is_inclusive() {
        assert_eq!(classify(0.30), RiskTier::Medium);
        assert_eq!(classify(0.299_999_9), RiskTier::Low);
        assert_eq!(classify(0.0), RiskTier::Low);
    }

    #[test]
    fn test_uses_unrounded_value() {
        // rounds to 0.7557 for display but sits below the threshold
        let p = 0.755_66;
        assert_eq!(crate::models::round_to(p, 4), 0.7557);
        assert_eq!(classify(p), RiskTier::Medium);
    }

    #[test]
    fn test_partition_has_no_gaps() {
        let mut previous = RiskTier::Low;
        for i in 0..=10_000 {
            let tier = classify(i as f64 / 10_000.0);
            let order = |t: RiskTier| match t {
                RiskTier::Low => 0,
                RiskTier::Medium => 1,
                RiskTier::High => 2,
            };
            assert!(order(tier) >= order(previous));
            previous = tier;
        }
        assert_eq!(previous, RiskTier::High);
    }
}
