//! Column-transformer preprocessor
//!
//! JSON export of a fitted column transformer: an ordered list of steps, each
//! applied to a subset of the canonical columns. Outputs are concatenated in
//! step order. Columns no step mentions are dropped.
//!
//! ```json
//! {
//!   "transformers": [
//!     {"name": "num", "kind": "standard_scaler", "columns": ["TransactionAmt"], "mean": [135.0], "scale": [239.1]},
//!     {"name": "cat", "kind": "one_hot", "columns": ["ProductCD"], "categories": [["C", "H", "R", "S", "W"]]}
//!   ]
//! }
//! ```

use serde::Deserialize;

use super::Preprocessor;
use crate::error::ArtifactError;
use crate::models::{field_kind, format_number, CanonicalFeatureRecord, Cell};

// ============================================================================
// ARTIFACT SCHEMA
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct ColumnTransformerSpec {
    transformers: Vec<Transformer>,
    #[serde(default = "default_true")]
    verbose_feature_names_out: bool,
}

fn default_true() -> bool {
    true
}

/// One fitted step and the columns it consumes
#[derive(Debug, Clone, Deserialize)]
pub struct Transformer {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(flatten)]
    pub step: Step,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    Passthrough,
    StandardScaler {
        mean: Vec<f64>,
        scale: Vec<f64>,
    },
    OneHot {
        categories: Vec<Vec<Category>>,
        #[serde(default)]
        handle_unknown: HandleUnknown,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    #[default]
    Ignore,
    Error,
}

/// Fitted category; exports keep numbers as numbers
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Category {
    Number(f64),
    Text(String),
}

impl Category {
    fn matches(&self, cell: &Cell<'_>) -> bool {
        match (self, cell) {
            (Category::Number(c), Cell::Number(n)) => c == n,
            (Category::Text(c), Cell::Text(s)) => c == s,
            (Category::Text(c), Cell::Number(_)) => *c == cell.to_text(),
            (Category::Number(c), Cell::Text(s)) => format_number(*c) == *s,
        }
    }

    fn display(&self) -> String {
        match self {
            Category::Number(n) => format_number(*n),
            Category::Text(s) => s.clone(),
        }
    }
}

// ============================================================================
// COLUMN TRANSFORMER
// ============================================================================

/// Loaded preprocessor
#[derive(Debug, Clone)]
pub struct ColumnTransformer {
    transformers: Vec<Transformer>,
    feature_names: Vec<String>,
}

impl ColumnTransformer {
    /// Parse and validate an exported preprocessor. `origin` is only used in errors.
    pub fn from_slice(bytes: &[u8], origin: &str) -> Result<Self, ArtifactError> {
        let spec: ColumnTransformerSpec =
            serde_json::from_slice(bytes).map_err(|source| ArtifactError::Parse {
                path: origin.to_string(),
                source,
            })?;
        Self::new(spec.transformers, spec.verbose_feature_names_out)
    }

    pub fn new(transformers: Vec<Transformer>, verbose_names: bool) -> Result<Self, ArtifactError> {
        if transformers.is_empty() {
            return Err(ArtifactError::Invalid("preprocessor has no transformers".into()));
        }

        for t in &transformers {
            validate(t)?;
        }

        let feature_names = output_names(&transformers, verbose_names);
        Ok(Self { transformers, feature_names })
    }
}

fn validate(t: &Transformer) -> Result<(), ArtifactError> {
    if let Some(column) = t.columns.iter().find(|c| field_kind(c).is_none()) {
        return Err(ArtifactError::Invalid(format!(
            "transformer '{}' references unknown column '{}'",
            t.name, column
        )));
    }

    let width = t.columns.len();
    let consistent = match &t.step {
        Step::Passthrough => true,
        Step::StandardScaler { mean, scale } => mean.len() == width && scale.len() == width,
        Step::OneHot { categories, .. } => categories.len() == width,
    };

    if !consistent {
        return Err(ArtifactError::Invalid(format!(
            "transformer '{}' has parameters for a different number of columns than its {} column(s)",
            t.name, width
        )));
    }
    Ok(())
}

fn output_names(transformers: &[Transformer], verbose: bool) -> Vec<String> {
    let prefix = |t: &Transformer, name: String| {
        if verbose {
            format!("{}__{}", t.name, name)
        } else {
            name
        }
    };

    let mut names = Vec::new();
    for t in transformers {
        match &t.step {
            Step::Passthrough | Step::StandardScaler { .. } => {
                names.extend(t.columns.iter().map(|c| prefix(t, c.clone())));
            }
            Step::OneHot { categories, .. } => {
                for (column, cats) in t.columns.iter().zip(categories) {
                    names.extend(cats.iter().map(|cat| prefix(t, format!("{}_{}", column, cat.display()))));
                }
            }
        }
    }
    names
}

fn numeric_cell(cell: Cell<'_>) -> Result<f64, ArtifactError> {
    match cell {
        Cell::Number(n) => Ok(n),
        Cell::Text(s) => Err(ArtifactError::Transform(format!(
            "could not convert string to float: '{}'",
            s
        ))),
    }
}

impl Preprocessor for ColumnTransformer {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn transform(&self, record: &CanonicalFeatureRecord) -> Result<Vec<f32>, ArtifactError> {
        let mut row = Vec::with_capacity(self.feature_names.len());

        for t in &self.transformers {
            for (i, column) in t.columns.iter().enumerate() {
                let cell = record.cell(column).ok_or_else(|| {
                    ArtifactError::Transform(format!("column '{}' is not in the record", column))
                })?;

                match &t.step {
                    Step::Passthrough => row.push(numeric_cell(cell)? as f32),
                    Step::StandardScaler { mean, scale } => {
                        let s = if scale[i] == 0.0 { 1.0 } else { scale[i] };
                        row.push(((numeric_cell(cell)? - mean[i]) / s) as f32);
                    }
                    Step::OneHot { categories, handle_unknown } => {
                        let cats = &categories[i];
                        let hit = cats.iter().position(|c| c.matches(&cell));
                        if hit.is_none() && *handle_unknown == HandleUnknown::Error {
                            return Err(ArtifactError::Transform(format!(
                                "Found unknown categories ['{}'] in column {} during transform",
                                cell.to_text(),
                                i
                            )));
                        }
                        row.extend((0..cats.len()).map(|k| if Some(k) == hit { 1.0 } else { 0.0 }));
                    }
                }
            }
        }

        Ok(row)
    }
}
