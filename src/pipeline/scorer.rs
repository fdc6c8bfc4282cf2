//! Payment-probability and anomaly scoring, plus ranking

use rayon::prelude::*;

use super::error::{PipelineError, PipelineResult};
use super::features::project;
use super::model::{reconstruction_error, row_values, ModelBundle};
use super::record::{CanonicalRecord, ScoredRecord};

/// Clamp a classifier output into [0, 1]. NaN maps to 0.
pub fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

/// Score records against a model bundle.
///
/// Output is in input order. Any projection or transform failure rejects the
/// whole batch.
pub fn score(records: &[CanonicalRecord], bundle: &ModelBundle) -> PipelineResult<Vec<ScoredRecord>> {
    if records.is_empty() {
        return Ok(Vec::new());
    }

    let batch = project(records, &bundle.feature_names)?;
    let inputs = bundle.preprocessor().transform(&batch)?;

    if inputs.nrows() != records.len() {
        return Err(PipelineError::Inference {
            model: "preprocessor",
            message: format!(
                "transform returned {} rows for {} records",
                inputs.nrows(),
                records.len()
            ),
        });
    }

    let classifier = bundle.classifier();
    let probabilities: Vec<f64> = (0..inputs.nrows())
        .into_par_iter()
        .map(|i| clamp_probability(classifier.predict_probability(&row_values(&inputs, i))))
        .collect();

    let reconstructions = bundle.autoencoder().reconstruct_batch(&inputs);
    if reconstructions.len() != inputs.nrows() {
        return Err(PipelineError::Inference {
            model: "autoencoder",
            message: format!(
                "reconstructed {} rows, expected {}",
                reconstructions.len(),
                inputs.nrows()
            ),
        });
    }

    let width = inputs.ncols();
    let mut scored = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let reconstruction = &reconstructions[i];
        if reconstruction.len() != width {
            return Err(PipelineError::Inference {
                model: "autoencoder",
                message: format!(
                    "row {} reconstructed with {} features, expected {}",
                    record.source_row(),
                    reconstruction.len(),
                    width
                ),
            });
        }

        let anomaly_score = reconstruction_error(&row_values(&inputs, i), reconstruction);
        scored.push(ScoredRecord {
            record: record.clone(),
            payment_probability: probabilities[i],
            anomaly_score,
            anomaly_flag: anomaly_score > bundle.threshold,
        });
    }

    let flagged = scored.iter().filter(|s| s.anomaly_flag).count();
    tracing::info!(records = scored.len(), flagged, "scoring complete");

    Ok(scored)
}

/// Sort by payment probability, highest first. Ties keep their input order.
pub fn rank_by_probability(mut scored: Vec<ScoredRecord>) -> Vec<ScoredRecord> {
    scored.sort_by(|a, b| b.payment_probability.total_cmp(&a.payment_probability));
    scored
}

/// Scored records ranked for the collections team
#[derive(Debug, Clone, Default)]
pub struct PriorityList {
    records: Vec<ScoredRecord>,
    threshold: f64,
}

impl PriorityList {
    /// Rank `scored` and wrap it
    pub fn new(scored: Vec<ScoredRecord>, threshold: f64) -> Self {
        Self {
            records: rank_by_probability(scored),
            threshold,
        }
    }

    /// Anomaly threshold the flags were computed with
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn records(&self) -> &[ScoredRecord] {
        &self.records
    }

    /// The `n` highest-probability records
    pub fn top(&self, n: usize) -> &[ScoredRecord] {
        &self.records[..n.min(self.records.len())]
    }

    /// Records flagged for manual review, in rank order
    pub fn flagged(&self) -> impl Iterator<Item = &ScoredRecord> {
        self.records.iter().filter(|r| r.anomaly_flag)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScoredRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<ScoredRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a PriorityList {
    type Item = &'a ScoredRecord;
    type IntoIter = std::slice::Iter<'a, ScoredRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
