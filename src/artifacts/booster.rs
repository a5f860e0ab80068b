//! Gradient-boosted tree ensemble
//!
//! Reads the JSON model format written by `Booster.save_model("*.json")` and
//! scores rows natively. Only binary logistic objectives with plain numeric
//! splits are accepted; anything else is refused at load time.

use serde::Deserialize;

use super::tree_shap;
use super::Scorer;
use crate::error::ArtifactError;

// ============================================================================
// MODEL FILE SCHEMA
// ============================================================================

#[derive(Debug, Deserialize)]
struct ModelFile {
    learner: LearnerSpec,
}

#[derive(Debug, Deserialize)]
struct LearnerSpec {
    gradient_booster: GradientBoosterSpec,
    learner_model_param: LearnerModelParam,
    objective: ObjectiveSpec,
}

#[derive(Debug, Deserialize)]
struct GradientBoosterSpec {
    name: String,
    #[serde(default)]
    model: Option<TreeModelSpec>,
}

#[derive(Debug, Deserialize)]
struct TreeModelSpec {
    trees: Vec<TreeSpec>,
}

#[derive(Debug, Deserialize)]
struct LearnerModelParam {
    base_score: String,
    num_feature: String,
    #[serde(default)]
    num_class: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectiveSpec {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TreeSpec {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<u32>,
    split_conditions: Vec<f32>,
    default_left: Vec<Flag>,
    sum_hessian: Vec<f64>,
    #[serde(default)]
    split_type: Vec<u8>,
}

/// Older writers emit `default_left` as 0/1, newer ones as booleans
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(u8),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

// ============================================================================
// TREES
// ============================================================================

/// Node of a regression tree. Leaves carry `value`; splits carry the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub children: Option<(usize, usize)>,
    pub feature: usize,
    pub threshold: f32,
    pub default_left: bool,
    pub value: f64,
    /// Training hessian mass that reached this node
    pub cover: f64,
}

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    expected_value: f64,
}

impl Tree {
    /// Build a tree whose children always sit after their parent
    pub fn new(nodes: Vec<Node>) -> Result<Self, ArtifactError> {
        if nodes.is_empty() {
            return Err(ArtifactError::Invalid("tree has no nodes".into()));
        }

        for (i, node) in nodes.iter().enumerate() {
            if let Some((left, right)) = node.children {
                if left <= i || right <= i || left >= nodes.len() || right >= nodes.len() {
                    return Err(ArtifactError::Invalid(format!(
                        "node {} has out-of-order children ({}, {})",
                        i, left, right
                    )));
                }
                if node.cover <= 0.0 {
                    return Err(ArtifactError::Invalid(format!("split node {} has no cover", i)));
                }
            }
        }

        // children follow parents, so a reverse sweep sees children first
        let mut means = vec![0.0; nodes.len()];
        for i in (0..nodes.len()).rev() {
            means[i] = match nodes[i].children {
                None => nodes[i].value,
                Some((l, r)) => {
                    (means[l] * nodes[l].cover + means[r] * nodes[r].cover) / nodes[i].cover
                }
            };
        }

        Ok(Self { expected_value: means[0], nodes })
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    /// Cover-weighted mean leaf value
    pub fn expected_value(&self) -> f64 {
        self.expected_value
    }

    /// Child taken by `row` at split node `index`. NaN or absent values follow the default branch.
    pub fn next(&self, index: usize, row: &[f32]) -> Option<usize> {
        let node = &self.nodes[index];
        let (left, right) = node.children?;
        let x = row.get(node.feature).copied().unwrap_or(f32::NAN);

        let go_left = if x.is_nan() { node.default_left } else { x < node.threshold };
        Some(if go_left { left } else { right })
    }

    pub fn leaf_value(&self, row: &[f32]) -> f64 {
        let mut index = 0;
        while let Some(child) = self.next(index, row) {
            index = child;
        }
        self.nodes[index].value
    }

    fn from_spec(spec: TreeSpec, id: usize, num_feature: usize) -> Result<Self, ArtifactError> {
        let n = spec.left_children.len();
        let lengths = [
            spec.right_children.len(),
            spec.split_indices.len(),
            spec.split_conditions.len(),
            spec.default_left.len(),
            spec.sum_hessian.len(),
        ];
        if lengths.iter().any(|&len| len != n) {
            return Err(ArtifactError::Invalid(format!("tree {} has ragged node arrays", id)));
        }
        if spec.split_type.iter().any(|&t| t != 0) {
            return Err(ArtifactError::Invalid(format!(
                "tree {} uses categorical splits, which are not supported",
                id
            )));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let children = match (spec.left_children[i], spec.right_children[i]) {
                (-1, _) => None,
                (l, r) if l >= 0 && r >= 0 => Some((l as usize, r as usize)),
                (l, r) => {
                    return Err(ArtifactError::Invalid(format!(
                        "tree {} node {} has invalid children ({}, {})",
                        id, i, l, r
                    )))
                }
            };

            let feature = spec.split_indices[i] as usize;
            if children.is_some() && feature >= num_feature {
                return Err(ArtifactError::Invalid(format!(
                    "tree {} node {} splits on feature {} but the model has {}",
                    id, i, feature, num_feature
                )));
            }

            nodes.push(Node {
                children,
                feature,
                threshold: spec.split_conditions[i],
                default_left: spec.default_left[i].is_set(),
                value: f64::from(spec.split_conditions[i]),
                cover: spec.sum_hessian[i],
            });
        }

        Tree::new(nodes).map_err(|e| match e {
            ArtifactError::Invalid(msg) => ArtifactError::Invalid(format!("tree {}: {}", id, msg)),
            other => other,
        })
    }
}

// ============================================================================
// BOOSTER
// ============================================================================

#[derive(Debug, Clone)]
pub struct Booster {
    trees: Vec<Tree>,
    num_feature: usize,
    /// `base_score` mapped into margin space
    base_margin: f64,
}

impl Booster {
    pub fn new(trees: Vec<Tree>, num_feature: usize, base_score: f64) -> Result<Self, ArtifactError> {
        if !(base_score > 0.0 && base_score < 1.0) {
            return Err(ArtifactError::Invalid(format!(
                "base_score {} is not a probability in (0, 1)",
                base_score
            )));
        }
        Ok(Self {
            trees,
            num_feature,
            base_margin: logit(base_score),
        })
    }

    /// Parse a JSON model. `origin` is only used in errors.
    pub fn from_slice(bytes: &[u8], origin: &str) -> Result<Self, ArtifactError> {
        let file: ModelFile = serde_json::from_slice(bytes).map_err(|source| ArtifactError::Parse {
            path: origin.to_string(),
            source,
        })?;
        let learner = file.learner;

        match learner.objective.name.as_str() {
            "binary:logistic" | "reg:logistic" => {}
            other => {
                return Err(ArtifactError::Invalid(format!("objective '{}' is not supported", other)))
            }
        }

        if learner.gradient_booster.name != "gbtree" {
            return Err(ArtifactError::Invalid(format!(
                "booster '{}' is not supported",
                learner.gradient_booster.name
            )));
        }

        let num_class = match &learner.learner_model_param.num_class {
            Some(raw) => parse_param::<usize>("num_class", raw)?,
            None => 0,
        };
        if num_class > 1 {
            return Err(ArtifactError::Invalid(format!("{} classes; only binary models are supported", num_class)));
        }

        let num_feature = parse_param::<usize>("num_feature", &learner.learner_model_param.num_feature)?;
        let base_score = parse_param::<f64>("base_score", &learner.learner_model_param.base_score)?;

        let specs = learner
            .gradient_booster
            .model
            .ok_or_else(|| ArtifactError::Invalid("gbtree model section is missing".into()))?
            .trees;

        let trees = specs
            .into_iter()
            .enumerate()
            .map(|(id, spec)| Tree::from_spec(spec, id, num_feature))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(trees, num_feature, base_score)
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    pub fn num_feature(&self) -> usize {
        self.num_feature
    }

    /// Raw score before the logistic link
    pub fn predict_margin(&self, row: &[f32]) -> Result<f64, ArtifactError> {
        self.check_width(row)?;
        Ok(self.base_margin + self.trees.iter().map(|t| t.leaf_value(row)).sum::<f64>())
    }

    fn check_width(&self, row: &[f32]) -> Result<(), ArtifactError> {
        if row.len() != self.num_feature {
            return Err(ArtifactError::Scoring(format!(
                "Feature shape mismatch, expected: {}, got {}",
                self.num_feature,
                row.len()
            )));
        }
        Ok(())
    }
}

impl Scorer for Booster {
    fn predict_proba(&self, row: &[f32]) -> Result<f64, ArtifactError> {
        self.predict_margin(row).map(sigmoid)
    }

    fn predict_contributions(&self, row: &[f32]) -> Result<Vec<f64>, ArtifactError> {
        self.check_width(row)?;

        let mut phi = vec![0.0; self.num_feature + 1];
        let (features, bias) = phi.split_at_mut(self.num_feature);
        bias[0] = self.base_margin;

        for tree in &self.trees {
            tree_shap::tree_shap(tree, row, features);
            bias[0] += tree.expected_value();
        }

        Ok(phi)
    }
}

/// `base_score` is written as `"5E-1"` or, by newer writers, `"[5E-1]"`
fn parse_param<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ArtifactError> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim()
        .parse()
        .map_err(|_| ArtifactError::Invalid(format!("{} '{}' is not a number", name, raw)))
}

fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}
