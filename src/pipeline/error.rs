//! Error types for the reconciliation and scoring pipeline.
//!
//! Every variant carries enough context (stage, field, row, affected record
//! count) for an operator to act on it. All failures are terminal for the
//! current pipeline run; nothing is retried.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Pipeline stage in which an error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Reconcile,
    Normalize,
    FeatureSelection,
    Scoring,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::Reconcile => "reconcile",
            Stage::Normalize => "normalize",
            Stage::FeatureSelection => "feature selection",
            Stage::Scoring => "scoring",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while running the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The dataset file is missing or cannot be read.
    ///
    /// The pipeline halts without producing partial output.
    #[error("Dataset unavailable at {}: {reason}", path.display())]
    DatasetUnavailable {
        /// Path that was requested
        path: PathBuf,
        /// Why the file could not be used
        reason: String,
    },

    /// The model artifact bundle is missing, unreadable or internally inconsistent.
    ///
    /// Reported separately from [`PipelineError::DatasetUnavailable`]; the cleaning
    /// stages can still run on their own.
    #[error("Model artifacts unavailable at {}: {reason}", path.display())]
    ArtifactUnavailable {
        /// Path of the bundle
        path: PathBuf,
        /// Why the bundle could not be used
        reason: String,
    },

    /// Required fields are absent. The whole record set is rejected.
    #[error(
        "Schema mismatch during {stage}: missing field(s) [{}] ({records} record(s) affected)",
        fields.join(", ")
    )]
    SchemaMismatch {
        stage: Stage,
        /// Names of the absent fields
        fields: Vec<String>,
        /// Number of records in the rejected batch
        records: usize,
    },

    /// Preprocessing hit an unseen category or a malformed numeric value.
    #[error(
        "Transform error on field '{field}' at row {row}: {message} (value: '{value}', {records} record(s) in batch)"
    )]
    TransformError {
        field: String,
        value: String,
        /// Source row of the offending record
        row: usize,
        message: String,
        /// Number of records in the rejected batch
        records: usize,
    },

    /// A raw value could not be interpreted while loading the dataset.
    #[error("Malformed value in column '{column}' at row {row}: {message}")]
    MalformedRecord {
        column: String,
        /// Zero-based data row in the source file
        row: usize,
        message: String,
    },

    /// A model returned output that violates its contract.
    #[error("Inference error in {model}: {message}")]
    Inference {
        model: &'static str,
        message: String,
    },
}

impl PipelineError {
    /// True for the two "input not available" conditions, which callers treat
    /// as recoverable rather than as bugs in the data.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            PipelineError::DatasetUnavailable { .. } | PipelineError::ArtifactUnavailable { .. }
        )
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
