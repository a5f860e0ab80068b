//! Artifacts - the fitted preprocessor and the trained tree ensemble
//!
//! Both are loaded once at startup and only read afterwards. The scoring
//! engine sees them through [`Preprocessor`] and [`Scorer`], so the file
//! formats stay an adapter detail.

pub mod booster;
pub mod preprocessor;
pub mod tree_shap;

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::error::ArtifactError;
use crate::models::CanonicalFeatureRecord;

pub use booster::Booster;
pub use preprocessor::ColumnTransformer;

// ============================================================================
// CONTRACTS
// ============================================================================

/// Deterministic feature encoder fitted alongside the model
pub trait Preprocessor: Send + Sync {
    /// Encoded output names, in output order
    fn feature_names(&self) -> &[String];

    /// Encode one record into a single numeric row
    fn transform(&self, record: &CanonicalFeatureRecord) -> Result<Vec<f32>, ArtifactError>;
}

/// Trained scorer consuming the preprocessor's rows
pub trait Scorer: Send + Sync {
    /// Fraud probability, not thresholded
    fn predict_proba(&self, row: &[f32]) -> Result<f64, ArtifactError>;

    /// One contribution per input column followed by the bias term
    fn predict_contributions(&self, row: &[f32]) -> Result<Vec<f64>, ArtifactError>;
}

// ============================================================================
// LOADING
// ============================================================================

/// Summary reported by `/health`
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactInfo {
    pub feature_count: usize,
    pub tree_count: usize,
    pub preprocessor_sha256: String,
    pub model_sha256: String,
}

/// Immutable artifact bundle shared by every request
#[derive(Clone)]
pub struct LoadedArtifacts {
    pub preprocessor: Arc<dyn Preprocessor>,
    pub scorer: Arc<dyn Scorer>,
    pub info: ArtifactInfo,
}

/// Load both artifacts named in the configuration
pub fn load(config: &Config) -> Result<LoadedArtifacts, ArtifactError> {
    let (preprocessor_bytes, preprocessor_sha256) = read_fingerprinted(&config.preprocessor_path)?;
    let preprocessor = ColumnTransformer::from_slice(&preprocessor_bytes, &config.preprocessor_path)?;

    tracing::info!(
        path = %config.preprocessor_path,
        sha256 = %preprocessor_sha256,
        features = preprocessor.feature_names().len(),
        "Preprocessor loaded"
    );

    let (model_bytes, model_sha256) = read_fingerprinted(&config.model_path)?;
    let booster = Booster::from_slice(&model_bytes, &config.model_path)?;

    tracing::info!(
        path = %config.model_path,
        sha256 = %model_sha256,
        trees = booster.tree_count(),
        num_feature = booster.num_feature(),
        "Model loaded"
    );

    if booster.num_feature() != preprocessor.feature_names().len() {
        tracing::warn!(
            "Model expects {} features but preprocessor emits {}; attributions may be misaligned",
            booster.num_feature(),
            preprocessor.feature_names().len()
        );
    }

    let info = ArtifactInfo {
        feature_count: preprocessor.feature_names().len(),
        tree_count: booster.tree_count(),
        preprocessor_sha256,
        model_sha256,
    };

    Ok(LoadedArtifacts {
        preprocessor: Arc::new(preprocessor),
        scorer: Arc::new(booster),
        info,
    })
}

/// Read a file and compute its SHA-256 (hex)
fn read_fingerprinted(path: &str) -> Result<(Vec<u8>, String), ArtifactError> {
    let bytes = std::fs::read(Path::new(path)).map_err(|source| ArtifactError::Io {
        path: path.to_string(),
        source,
    })?;
    let digest = hex::encode(Sha256::digest(&bytes));
    Ok((bytes, digest))
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Small, hand-checked artifacts shared by tests across the crate.

    use serde_json::{json, Value};

    /// num__TransactionAmt, num__hour, cat__ProductCD_C, cat__ProductCD_W, cat__card6_credit, cat__card6_debit
    pub fn preprocessor_json() -> Value {
        json!({
            "transformers": [
                {
                    "name": "num",
                    "kind": "standard_scaler",
                    "columns": ["TransactionAmt", "hour"],
                    "mean": [100.0, 12.0],
                    "scale": [100.0, 6.0]
                },
                {
                    "name": "cat",
                    "kind": "one_hot",
                    "columns": ["ProductCD", "card6"],
                    "categories": [["C", "W"], ["credit", "debit"]],
                    "handle_unknown": "ignore"
                }
            ]
        })
    }

    /// Two trees over the six columns above.
    ///
    /// Tree 0 splits on scaled amount (col 0) then on ProductCD_W (col 3).
    /// Tree 1 splits on card6_credit (col 4).
    pub fn model_json(base_score: &str) -> Value {
        json!({
            "learner": {
                "attributes": {},
                "feature_names": [],
                "feature_types": [],
                "gradient_booster": {
                    "model": {
                        "gbtree_model_param": { "num_parallel_tree": "1", "num_trees": "2" },
                        "tree_info": [0, 0],
                        "trees": [
                            {
                                "id": 0,
                                "tree_param": { "num_deleted": "0", "num_feature": "6", "num_nodes": "5", "size_leaf_vector": "1" },
                                "left_children": [1, -1, 3, -1, -1],
                                "right_children": [2, -1, 4, -1, -1],
                                "parents": [2147483647, 0, 0, 2, 2],
                                "split_indices": [0, 0, 3, 0, 0],
                                "split_conditions": [1.0, -0.4, 0.5, 0.2, 0.9],
                                "split_type": [0, 0, 0, 0, 0],
                                "default_left": [1, 0, 1, 0, 0],
                                "sum_hessian": [100.0, 60.0, 40.0, 10.0, 30.0],
                                "base_weights": [0.0, -0.4, 0.5, 0.2, 0.9],
                                "loss_changes": [1.0, 0.0, 0.5, 0.0, 0.0],
                                "categories": [],
                                "categories_nodes": [],
                                "categories_segments": [],
                                "categories_sizes": []
                            },
                            {
                                "id": 1,
                                "tree_param": { "num_deleted": "0", "num_feature": "6", "num_nodes": "3", "size_leaf_vector": "1" },
                                "left_children": [1, -1, -1],
                                "right_children": [2, -1, -1],
                                "parents": [2147483647, 0, 0],
                                "split_indices": [4, 0, 0],
                                "split_conditions": [0.5, -0.1, 0.3],
                                "split_type": [0, 0, 0],
                                "default_left": [true, false, false],
                                "sum_hessian": [100.0, 50.0, 50.0],
                                "base_weights": [0.0, -0.1, 0.3],
                                "loss_changes": [0.3, 0.0, 0.0],
                                "categories": [],
                                "categories_nodes": [],
                                "categories_segments": [],
                                "categories_sizes": []
                            }
                        ]
                    },
                    "name": "gbtree"
                },
                "learner_model_param": {
                    "base_score": base_score,
                    "boost_from_average": "1",
                    "num_class": "0",
                    "num_feature": "6",
                    "num_target": "1"
                },
                "objective": {
                    "name": "binary:logistic",
                    "reg_loss_param": { "scale_pos_weight": "1" }
                }
            },
            "version": [2, 0, 3]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_artifacts(dir: &TempDir) -> Config {
        let pre = dir.path().join("preprocessor.json");
        let model = dir.path().join("xgboost_model.json");
        fs::write(&pre, fixtures::preprocessor_json().to_string()).unwrap();
        fs::write(&model, fixtures::model_json("5E-1").to_string()).unwrap();

        Config {
            preprocessor_path: pre.to_string_lossy().into_owned(),
            model_path: model.to_string_lossy().into_owned(),
            ..Config::default()
        }
    }

    #[test]
    fn test_load_from_disk() {
        let dir = TempDir::new().unwrap();
        let config = write_artifacts(&dir);

        let artifacts = load(&config).unwrap();
        assert_eq!(artifacts.info.feature_count, 6);
        assert_eq!(artifacts.info.tree_count, 2);
        assert_eq!(artifacts.info.model_sha256.len(), 64);
        assert_ne!(artifacts.info.model_sha256, artifacts.info.preprocessor_sha256);
    }

    #[test]
    fn test_missing_artifact_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut config = write_artifacts(&dir);
        config.model_path = dir.path().join("absent.json").to_string_lossy().into_owned();

        let err = load(&config).err().unwrap();
        assert!(matches!(err, ArtifactError::Io { .. }));
    }

    #[test]
    fn test_corrupt_artifact_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = write_artifacts(&dir);
        fs::write(&config.preprocessor_path, b"\x80\x04\x95 not json").unwrap();

        let err = load(&config).err().unwrap();
        assert!(matches!(err, ArtifactError::Parse { .. }));
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.bin");
        fs::write(&path, b"abc").unwrap();
        let (_, digest) = read_fingerprinted(path.to_str().unwrap()).unwrap();
        assert_eq!(digest, "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
    }
}
