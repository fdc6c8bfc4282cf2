//! Ranked list, cleaned dataset and run summary exports

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use polars::prelude::*;
use serde::Serialize;

use super::summary::RunSummary;
use crate::pipeline::record::columns;
use crate::pipeline::{CanonicalRecord, PipelineConfig, PriorityList};

pub const RANK: &str = "rank";
pub const PAYMENT_PROBABILITY: &str = "payment_probability";
pub const ANOMALY_SCORE: &str = "anomaly_score";
pub const ANOMALY_FLAG: &str = "anomaly_flag";

/// Canonical records as a DataFrame with the dataset's column names
pub fn canonical_frame(records: &[CanonicalRecord]) -> PolarsResult<DataFrame> {
    let text = |f: fn(&CanonicalRecord) -> Option<String>| -> Vec<Option<String>> {
        records.iter().map(f).collect()
    };
    let int = |f: fn(&CanonicalRecord) -> i64| -> Vec<i64> { records.iter().map(f).collect() };
    let float = |f: fn(&CanonicalRecord) -> f64| -> Vec<f64> { records.iter().map(f).collect() };

    DataFrame::new(vec![
        Column::new(
            columns::DOCUMENT_TYPE.into(),
            text(|r| Some(r.record.document_type.code().to_string())),
        ),
        Column::new(
            columns::CLIENT_ID.into(),
            text(|r| Some(r.record.client_id.clone())),
        ),
        Column::new(columns::GENDER.into(), text(|r| r.record.gender.clone())),
        Column::new(
            columns::AGE_BRACKET.into(),
            text(|r| r.record.age_bracket.clone()),
        ),
        Column::new(columns::REGION.into(), text(|r| r.record.region.clone())),
        Column::new(
            columns::STATEMENT_MONTH.into(),
            text(|r| r.record.statement_month.clone()),
        ),
        Column::new(
            columns::PRINCIPAL_BALANCE.into(),
            float(|r| r.record.principal_balance),
        ),
        Column::new(columns::DAYS_PAST_DUE.into(), int(|r| r.record.days_past_due)),
        Column::new(
            columns::ORIGINATING_BANK.into(),
            text(|r| Some(r.record.originating_bank.clone())),
        ),
        Column::new(
            columns::ORIGINATION_DATE.into(),
            text(|r| {
                r.record
                    .debt_origination_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
            }),
        ),
        Column::new(
            columns::PAID_LAST_MONTH.into(),
            int(|r| r.record.paid_last_month as i64),
        ),
        Column::new(
            columns::MONTHS_SINCE_LAST_PAYMENT.into(),
            records
                .iter()
                .map(|r| r.record.months_since_last_payment)
                .collect::<Vec<Option<i64>>>(),
        ),
        Column::new(
            columns::NEVER_PAID_BEFORE.into(),
            int(|r| r.record.never_paid_before as i64),
        ),
        Column::new(
            columns::CONTACT_CURRENT_MONTH.into(),
            int(|r| r.record.contact_current_month),
        ),
        Column::new(
            columns::CONTACT_PREVIOUS_MONTH.into(),
            int(|r| r.record.contact_previous_month),
        ),
        Column::new(
            columns::CONTACT_LAST_6_MONTHS.into(),
            int(|r| r.record.contact_last_6_months),
        ),
        Column::new(
            columns::CALL_DURATION_LAST_6_MONTHS.into(),
            float(|r| r.record.call_duration_last_6_months),
        ),
        Column::new(columns::PAID.into(), int(|r| r.record.paid as i64)),
    ])
}

/// Ranked list as a DataFrame: rank, key debt fields, then the model outputs
pub fn priority_frame(ranked: &PriorityList) -> PolarsResult<DataFrame> {
    let records = ranked.records();

    DataFrame::new(vec![
        Column::new(
            RANK.into(),
            (1..=records.len() as u64).collect::<Vec<u64>>(),
        ),
        Column::new(
            columns::CLIENT_ID.into(),
            records
                .iter()
                .map(|r| r.client_id().to_string())
                .collect::<Vec<String>>(),
        ),
        Column::new(
            columns::DOCUMENT_TYPE.into(),
            records
                .iter()
                .map(|r| r.record.record.document_type.code().to_string())
                .collect::<Vec<String>>(),
        ),
        Column::new(
            columns::PRINCIPAL_BALANCE.into(),
            records
                .iter()
                .map(|r| r.principal_balance())
                .collect::<Vec<f64>>(),
        ),
        Column::new(
            columns::DAYS_PAST_DUE.into(),
            records
                .iter()
                .map(|r| r.days_past_due())
                .collect::<Vec<i64>>(),
        ),
        Column::new(
            columns::ORIGINATING_BANK.into(),
            records
                .iter()
                .map(|r| r.record.record.originating_bank.clone())
                .collect::<Vec<String>>(),
        ),
        Column::new(
            columns::REGION.into(),
            records
                .iter()
                .map(|r| r.record.record.region.clone())
                .collect::<Vec<Option<String>>>(),
        ),
        Column::new(
            PAYMENT_PROBABILITY.into(),
            records
                .iter()
                .map(|r| r.payment_probability)
                .collect::<Vec<f64>>(),
        ),
        Column::new(
            ANOMALY_SCORE.into(),
            records
                .iter()
                .map(|r| r.anomaly_score)
                .collect::<Vec<f64>>(),
        ),
        Column::new(
            ANOMALY_FLAG.into(),
            records
                .iter()
                .map(|r| r.anomaly_flag)
                .collect::<Vec<bool>>(),
        ),
    ])
}

/// Write a DataFrame as CSV or Parquet, chosen by the path's extension
pub fn save_frame(df: &mut DataFrame, path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "csv" => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            CsvWriter::new(&mut file)
                .finish(df)
                .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
        }
        "parquet" => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            ParquetWriter::new(file)
                .finish(df)
                .with_context(|| format!("Failed to write Parquet file: {}", path.display()))?;
        }
        _ => anyhow::bail!(
            "Unsupported output format: {}. Supported formats: csv, parquet",
            extension
        ),
    }

    Ok(())
}

/// Export the ranked list
pub fn export_priority_list(ranked: &PriorityList, path: &Path) -> Result<()> {
    let mut df = priority_frame(ranked).context("Failed to build ranked output table")?;
    save_frame(&mut df, path)
}

/// Export cleaned canonical records
pub fn export_clean_records(records: &[CanonicalRecord], path: &Path) -> Result<()> {
    let mut df = canonical_frame(records).context("Failed to build cleaned output table")?;
    save_frame(&mut df, path)
}

/// Metadata about the run
#[derive(Debug, Serialize)]
pub struct RunMetadata {
    /// Timestamp of the run (RFC 3339)
    pub timestamp: String,
    /// Collectrank version
    pub collectrank_version: String,
    pub input_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_file: Option<String>,
    pub max_days_past_due: i64,
    pub min_principal_balance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly_threshold: Option<f64>,
}

/// Stage counts as written to JSON
#[derive(Debug, Serialize)]
pub struct StageCounts {
    pub loaded: usize,
    pub duplicates_removed: usize,
    pub canonical: usize,
    pub gender_rewritten: usize,
    pub age_bracket_rewritten: usize,
    pub region_filled: usize,
    pub excluded_stale: usize,
    pub excluded_residual: usize,
    pub selected: usize,
    pub scored: usize,
    pub flagged: usize,
}

impl From<&RunSummary> for StageCounts {
    fn from(s: &RunSummary) -> Self {
        Self {
            loaded: s.loaded,
            duplicates_removed: s.duplicates_removed,
            canonical: s.canonical,
            gender_rewritten: s.gender_rewritten,
            age_bracket_rewritten: s.age_bracket_rewritten,
            region_filled: s.region_filled,
            excluded_stale: s.excluded_stale,
            excluded_residual: s.excluded_residual,
            selected: s.selected,
            scored: s.scored,
            flagged: s.flagged,
        }
    }
}

/// Complete run summary export
#[derive(Debug, Serialize)]
pub struct RunSummaryExport {
    pub metadata: RunMetadata,
    pub counts: StageCounts,
}

/// Parameters for the run summary export
pub struct SummaryParams<'a> {
    pub input_file: &'a Path,
    pub model_file: Option<&'a Path>,
    pub config: &'a PipelineConfig,
    pub anomaly_threshold: Option<f64>,
}

/// Write the run summary as pretty-printed JSON
pub fn export_run_summary(
    summary: &RunSummary,
    output_path: &Path,
    params: &SummaryParams,
) -> Result<()> {
    let export = RunSummaryExport {
        metadata: RunMetadata {
            timestamp: Utc::now().to_rfc3339(),
            collectrank_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: params.input_file.display().to_string(),
            model_file: params.model_file.map(|p| p.display().to_string()),
            max_days_past_due: params.config.selection.max_days_past_due,
            min_principal_balance: params.config.selection.min_principal_balance,
            anomaly_threshold: params.anomaly_threshold,
        },
        counts: StageCounts::from(summary),
    };

    let json =
        serde_json::to_string_pretty(&export).context("Failed to serialize run summary to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write run summary: {}", output_path.display()))?;

    Ok(())
}
