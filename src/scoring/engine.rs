//! Inference & Attribution Engine

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::reconcile::reconcile;
use super::risk::RiskThresholds;
use crate::artifacts::{LoadedArtifacts, Preprocessor, Scorer};
use crate::error::{AppResult, ArtifactError};
use crate::models::{Attribution, AttributionVector, CanonicalFeatureRecord, PredictionResult, RawInputRecord};

/// Read-only scoring pipeline shared by all requests
#[derive(Clone)]
pub struct ScoringEngine {
    preprocessor: Arc<dyn Preprocessor>,
    scorer: Arc<dyn Scorer>,
    thresholds: RiskThresholds,
}

impl ScoringEngine {
    pub fn new(preprocessor: Arc<dyn Preprocessor>, scorer: Arc<dyn Scorer>) -> Self {
        Self {
            preprocessor,
            scorer,
            thresholds: RiskThresholds::default(),
        }
    }

    pub fn from_artifacts(artifacts: &LoadedArtifacts) -> Self {
        Self::new(artifacts.preprocessor.clone(), artifacts.scorer.clone())
    }

    pub fn feature_names(&self) -> &[String] {
        self.preprocessor.feature_names()
    }

    /// Reconcile raw attributes at `now`, then score
    pub fn predict(&self, raw: &RawInputRecord, now: DateTime<Utc>) -> AppResult<PredictionResult> {
        let record = reconcile(raw, now);
        tracing::debug!(?record, "Reconciled features");
        Ok(self.infer(&record)?)
    }

    /// Transform, score, attribute and classify one canonical record
    pub fn infer(&self, record: &CanonicalFeatureRecord) -> Result<PredictionResult, ArtifactError> {
        let row = self.preprocessor.transform(record)?;

        let probability = self.scorer.predict_proba(&row)?;
        let contributions = self.scorer.predict_contributions(&row)?;
        let shap_values = attribute(self.preprocessor.feature_names(), &contributions)?;

        let tier = self.thresholds.classify(probability);
        tracing::debug!(probability, risk_level = tier.risk_level(), "Scored transaction");

        Ok(PredictionResult::new(probability, tier, shap_values))
    }
}

/// Pair contributions with feature names by position, dropping the trailing bias
fn attribute(names: &[String], contributions: &[f64]) -> Result<AttributionVector, ArtifactError> {
    let per_feature = contributions.split_last().map(|(_, rest)| rest).unwrap_or(&[]);

    if per_feature.len() < names.len() {
        return Err(ArtifactError::Scoring(format!(
            "index {} is out of bounds for axis 0 with size {}",
            per_feature.len(),
            per_feature.len()
        )));
    }

    Ok(AttributionVector(
        names
            .iter()
            .zip(per_feature)
            .map(|(name, value)| Attribution { feature: name.clone(), value: *value })
            .collect(),
    ))
}
