//! Fitted preprocessing transform
//!
//! Standard scaling for numeric fields followed by one-hot encoding for
//! categorical fields. The parameters come from the artifact bundle and are
//! never refitted here.

use faer::Mat;
use serde::{Deserialize, Serialize};

use crate::pipeline::error::{PipelineError, PipelineResult, Stage};
use crate::pipeline::features::{FeatureBatch, FeatureValue};

/// Turns a projected feature batch into the numeric matrix the models consume
pub trait Preprocessor: Send + Sync {
    /// Number of columns in the transformed matrix
    fn output_width(&self) -> usize;

    /// Input fields the transform reads
    fn input_fields(&self) -> Vec<String>;

    fn transform(&self, batch: &FeatureBatch) -> PipelineResult<Mat<f64>>;
}

/// What to do with a category that was not seen at fit time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCategoryPolicy {
    /// Reject the whole batch with a `TransformError`
    #[default]
    Error,
    /// Encode the value as an all-zero one-hot block
    Ignore,
}

impl std::str::FromStr for UnknownCategoryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(UnknownCategoryPolicy::Error),
            "ignore" => Ok(UnknownCategoryPolicy::Ignore),
            other => Err(format!(
                "Invalid unknown-category policy: '{}'. Valid options: error, ignore",
                other
            )),
        }
    }
}

/// `(x - mean) / scale` for one numeric field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericScaler {
    pub field: String,
    pub mean: f64,
    pub scale: f64,
}

impl NumericScaler {
    fn apply(&self, x: f64) -> f64 {
        // A zero scale comes from a constant column at fit time.
        let scale = if self.scale == 0.0 { 1.0 } else { self.scale };
        (x - self.mean) / scale
    }
}

/// One-hot encoder for one categorical field, in fitted category order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub field: String,
    pub categories: Vec<String>,
}

/// Scaling + one-hot parameters exported alongside the models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTransform {
    #[serde(default)]
    pub numeric: Vec<NumericScaler>,
    #[serde(default)]
    pub categorical: Vec<OneHotEncoder>,
    #[serde(default)]
    pub handle_unknown: UnknownCategoryPolicy,
}

impl FittedTransform {
    pub fn with_unknown_policy(mut self, policy: UnknownCategoryPolicy) -> Self {
        self.handle_unknown = policy;
        self
    }

    fn resolve(&self, batch: &FeatureBatch) -> PipelineResult<(Vec<usize>, Vec<usize>)> {
        let mut missing = Vec::new();
        let mut lookup = |field: &str| -> usize {
            batch.field_index(field).unwrap_or_else(|| {
                missing.push(field.to_string());
                usize::MAX
            })
        };

        let numeric: Vec<usize> = self.numeric.iter().map(|s| lookup(&s.field)).collect();
        let categorical: Vec<usize> = self.categorical.iter().map(|e| lookup(&e.field)).collect();

        if !missing.is_empty() {
            return Err(PipelineError::SchemaMismatch {
                stage: Stage::Scoring,
                fields: missing,
                records: batch.len(),
            });
        }

        Ok((numeric, categorical))
    }
}

impl Preprocessor for FittedTransform {
    fn output_width(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|e| e.categories.len())
                .sum::<usize>()
    }

    fn input_fields(&self) -> Vec<String> {
        self.numeric
            .iter()
            .map(|s| s.field.clone())
            .chain(self.categorical.iter().map(|e| e.field.clone()))
            .collect()
    }

    fn transform(&self, batch: &FeatureBatch) -> PipelineResult<Mat<f64>> {
        let (numeric_idx, categorical_idx) = self.resolve(batch)?;
        let n_rows = batch.len();
        let mut out = Mat::<f64>::zeros(n_rows, self.output_width());
        let mut unknown = 0usize;

        let transform_error = |field: &str, value: &FeatureValue, row: usize, message: &str| {
            PipelineError::TransformError {
                field: field.to_string(),
                value: value.to_string(),
                row,
                message: message.to_string(),
                records: n_rows,
            }
        };

        for (i, row) in batch.rows.iter().enumerate() {
            let source_row = batch.source_rows.get(i).copied().unwrap_or(i);

            for (col, (scaler, &idx)) in self.numeric.iter().zip(&numeric_idx).enumerate() {
                let value = &row[idx];
                let x = value.as_number().ok_or_else(|| {
                    transform_error(&scaler.field, value, source_row, "expected a numeric value")
                })?;
                if !x.is_finite() {
                    return Err(transform_error(
                        &scaler.field,
                        value,
                        source_row,
                        "numeric value is not finite",
                    ));
                }
                out[(i, col)] = scaler.apply(x);
            }

            let mut offset = self.numeric.len();
            for (encoder, &idx) in self.categorical.iter().zip(&categorical_idx) {
                let value = &row[idx];
                let label = value.to_string();
                match encoder.categories.iter().position(|c| *c == label) {
                    Some(pos) => out[(i, offset + pos)] = 1.0,
                    None => match self.handle_unknown {
                        UnknownCategoryPolicy::Error => {
                            return Err(transform_error(
                                &encoder.field,
                                value,
                                source_row,
                                "category not seen at fit time",
                            ))
                        }
                        UnknownCategoryPolicy::Ignore => unknown += 1,
                    },
                }
                offset += encoder.categories.len();
            }
        }

        if unknown > 0 {
            tracing::warn!(
                count = unknown,
                "unseen categories encoded into the unknown bucket"
            );
        }

        Ok(out)
    }
}
