//! Command-line argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::pipeline::model::UnknownCategoryPolicy;

/// Collectrank - Rank debtors by payment probability and flag anomalous records
#[derive(Parser, Debug)]
#[command(name = "collectrank")]
#[command(author, version, about, long_about = None)]
#[command(subcommand_negates_reqs = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Input dataset path (CSV, Parquet or Excel)
    #[arg(short, long, required = true)]
    pub input: Option<PathBuf>,

    /// Model artifact bundle (JSON)
    #[arg(short, long, required = true)]
    pub model: Option<PathBuf>,

    /// Output file path for the ranked list (CSV or Parquet, determined by extension).
    /// Defaults to input directory with '_priority' suffix (e.g., data.csv → data_priority.csv).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Records with at least this many days past due are excluded as legally stale
    #[arg(long, default_value = "3650", value_parser = validate_max_days_past_due)]
    pub max_days_past_due: i64,

    /// Records with principal balance at or below this amount are excluded as residual
    #[arg(long, default_value = "1000", value_parser = validate_min_balance)]
    pub min_balance: f64,

    /// Handling of categories unseen at fit time: "error" or "ignore".
    /// Defaults to the policy stored in the model bundle.
    #[arg(long)]
    pub unknown_category: Option<UnknownCategoryPolicy>,

    /// JSON file overriding the built-in gender and age-bracket mappings
    #[arg(long)]
    pub mappings: Option<PathBuf>,

    /// Number of top-ranked debtors to print
    #[arg(long, default_value = "10")]
    pub top: usize,

    /// Write a JSON run summary to this path
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Skip interactive confirmation prompts
    #[arg(long, default_value = "false")]
    pub no_confirm: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile and normalize a dataset without scoring it
    Clean {
        /// Input file path (CSV, Parquet or Excel)
        input: PathBuf,

        /// Output file path (optional, defaults to input with '_clean' suffix)
        output: Option<PathBuf>,

        /// JSON file overriding the built-in gender and age-bracket mappings
        #[arg(long)]
        mappings: Option<PathBuf>,

        /// Skip interactive confirmation prompts
        #[arg(long, default_value = "false")]
        no_confirm: bool,
    },
}

impl Cli {
    /// Get the ranked list output path, deriving from input if not explicitly provided.
    pub fn output_path(&self) -> Option<PathBuf> {
        let input = self.input.as_ref()?;
        Some(
            self.output
                .clone()
                .unwrap_or_else(|| derived_path(input, "priority")),
        )
    }
}

/// Output path for the `clean` subcommand
pub fn clean_output_path(input: &Path, output: Option<&Path>) -> PathBuf {
    output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| derived_path(input, "clean"))
}

/// `<dir>/<stem>_<suffix>.<ext>` next to the input
fn derived_path(input: &Path, suffix: &str) -> PathBuf {
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let extension = input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("csv");
    parent.join(format!("{}_{}.{}", stem, suffix, extension))
}

/// Validator for max_days_past_due parameter
fn validate_max_days_past_due(s: &str) -> Result<i64, String> {
    let value: i64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid whole number", s))?;

    if value <= 0 {
        Err(format!(
            "max_days_past_due must be greater than 0, got {}",
            value
        ))
    } else {
        Ok(value)
    }
}

/// Validator for min_balance parameter
fn validate_min_balance(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !value.is_finite() || value < 0.0 {
        Err(format!(
            "min_balance must be a non-negative number, got {}",
            value
        ))
    } else {
        Ok(value)
    }
}
