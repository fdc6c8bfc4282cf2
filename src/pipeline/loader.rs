//! Dataset loader for CSV, Parquet and Excel files
//!
//! Reads the raw portfolio export into typed [`DebtRecord`]s. A missing file is
//! the well-defined "absent" result (`Ok(None)`), not an error.
//!
//! CSV and Excel cells are read as text and typed by the row parsers below, so
//! a stray value anywhere in the file is judged by the column's own policy
//! instead of by a schema guessed from the first rows.

use std::path::Path;

use calamine::{open_workbook_auto, Data, DataType as _, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;

use super::error::{PipelineError, PipelineResult, Stage};
use super::record::{columns, DebtRecord, DocumentType};
use super::target::{coerce_target_column, column_to_string_vec};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Load a dataset from a file (CSV, Parquet or Excel based on extension).
///
/// Returns `Ok(None)` when the file does not exist.
pub fn load_dataset(path: &Path) -> PipelineResult<Option<Vec<DebtRecord>>> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "dataset file not found");
        return Ok(None);
    }

    let df = read_frame(path)?;
    let records = records_from_frame(&df)?;
    tracing::info!(
        path = %path.display(),
        rows = records.len(),
        "dataset loaded"
    );
    Ok(Some(records))
}

/// Read the raw file into a DataFrame
pub fn read_frame(path: &Path) -> PipelineResult<DataFrame> {
    let unavailable = |reason: String| PipelineError::DatasetUnavailable {
        path: path.to_path_buf(),
        reason,
    };

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let lf = match extension.as_str() {
        // Schema length 0 reads every column as String
        "csv" => LazyCsvReader::new(path)
            .with_infer_schema_length(Some(0))
            .finish()
            .map_err(|e| unavailable(format!("failed to read CSV file: {}", e)))?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .map_err(|e| unavailable(format!("failed to read Parquet file: {}", e)))?,
        "xlsx" | "xlsm" | "xls" => {
            return read_excel(path)
                .map_err(|e| unavailable(format!("failed to read Excel workbook: {}", e)))
        }
        _ => {
            return Err(unavailable(format!(
                "unsupported file format '{}'. Supported formats: csv, parquet, xlsx, xls",
                extension
            )))
        }
    };

    lf.collect()
        .map_err(|e| unavailable(format!("failed to collect dataset: {}", e)))
}

/// Read the first worksheet into String columns. The first row is the header.
fn read_excel(path: &Path) -> Result<DataFrame, String> {
    let mut workbook = open_workbook_auto(path).map_err(|e| e.to_string())?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| "workbook has no worksheets".to_string())?
        .map_err(|e| e.to_string())?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(DataFrame::empty());
    };
    let names: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(idx, cell)| cell_text(cell).unwrap_or_else(|| format!("column_{}", idx + 1)))
        .collect();

    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
    for row in rows {
        for (idx, column) in values.iter_mut().enumerate() {
            column.push(row.get(idx).and_then(cell_text));
        }
    }

    let columns: Vec<Column> = names
        .iter()
        .zip(values)
        .map(|(name, column)| Column::new(name.as_str().into(), column))
        .collect();
    DataFrame::new(columns).map_err(|e| e.to_string())
}

/// Render a worksheet cell the way the CSV reader would see it
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => Some(s.clone()),
        Data::Int(n) => Some(n.to_string()),
        Data::Float(f) => Some(format!("{}", f)),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(_) => cell
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
    }
}

/// Convert a raw DataFrame into typed records.
///
/// Fails with `SchemaMismatch` listing every required column that is absent.
pub fn records_from_frame(df: &DataFrame) -> PipelineResult<Vec<DebtRecord>> {
    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let missing: Vec<String> = columns::REQUIRED
        .iter()
        .filter(|name| !present.iter().any(|p| p == *name))
        .map(|name| name.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(PipelineError::SchemaMismatch {
            stage: Stage::Load,
            fields: missing,
            records: df.height(),
        });
    }

    let height = df.height();
    let text = |name: &str| -> PipelineResult<Vec<Option<String>>> {
        match df.column(name) {
            Ok(col) => column_to_string_vec(col).map_err(|e| PipelineError::MalformedRecord {
                column: name.to_string(),
                row: 0,
                message: e.to_string(),
            }),
            Err(_) => Ok(vec![None; height]),
        }
    };

    let document_type = text(columns::DOCUMENT_TYPE)?;
    let client_id = text(columns::CLIENT_ID)?;
    let gender = text(columns::GENDER)?;
    let age_bracket = text(columns::AGE_BRACKET)?;
    let region = text(columns::REGION)?;
    let statement_month = text(columns::STATEMENT_MONTH)?;
    let principal_balance = text(columns::PRINCIPAL_BALANCE)?;
    let days_past_due = text(columns::DAYS_PAST_DUE)?;
    let originating_bank = text(columns::ORIGINATING_BANK)?;
    let origination_date = text(columns::ORIGINATION_DATE)?;
    let paid_last_month = text(columns::PAID_LAST_MONTH)?;
    let months_since = text(columns::MONTHS_SINCE_LAST_PAYMENT)?;
    let never_paid = text(columns::NEVER_PAID_BEFORE)?;
    let contact_current = text(columns::CONTACT_CURRENT_MONTH)?;
    let contact_previous = text(columns::CONTACT_PREVIOUS_MONTH)?;
    let contact_six = text(columns::CONTACT_LAST_6_MONTHS)?;
    let call_duration = text(columns::CALL_DURATION_LAST_6_MONTHS)?;

    let paid = match df.column(columns::PAID) {
        Ok(col) => coerce_target_column(col).map_err(|e| PipelineError::MalformedRecord {
            column: columns::PAID.to_string(),
            row: 0,
            message: e.to_string(),
        })?,
        Err(_) => {
            tracing::warn!("target column '{}' absent; every record reads as 0", columns::PAID);
            vec![0; height]
        }
    };

    let mut unparsed_dates = 0usize;
    let mut records = Vec::with_capacity(height);

    for row in 0..height {
        let debt_origination_date = match non_blank(&origination_date[row]) {
            Some(raw) => {
                let parsed = parse_date(raw);
                if parsed.is_none() {
                    unparsed_dates += 1;
                }
                parsed
            }
            None => None,
        };

        let document_raw = required_text(&document_type[row], columns::DOCUMENT_TYPE, row)?;
        let document_type = document_raw
            .parse::<DocumentType>()
            .map_err(|message| malformed(columns::DOCUMENT_TYPE, row, message))?;

        records.push(DebtRecord {
            source_row: row,
            document_type,
            client_id: required_text(&client_id[row], columns::CLIENT_ID, row)?.to_string(),
            gender: gender[row].clone(),
            age_bracket: age_bracket[row].clone(),
            region: region[row].clone(),
            statement_month: statement_month[row].clone(),
            principal_balance: parse_amount(&principal_balance[row], columns::PRINCIPAL_BALANCE, row)?,
            days_past_due: parse_count(&days_past_due[row], columns::DAYS_PAST_DUE, row)?,
            originating_bank: required_text(&originating_bank[row], columns::ORIGINATING_BANK, row)?
                .to_string(),
            debt_origination_date,
            paid_last_month: parse_flag(&paid_last_month[row], columns::PAID_LAST_MONTH, row)?,
            months_since_last_payment: match non_blank(&months_since[row]) {
                Some(_) => Some(parse_count(&months_since[row], columns::MONTHS_SINCE_LAST_PAYMENT, row)?),
                None => None,
            },
            never_paid_before: parse_flag(&never_paid[row], columns::NEVER_PAID_BEFORE, row)?,
            contact_current_month: parse_count(&contact_current[row], columns::CONTACT_CURRENT_MONTH, row)?,
            contact_previous_month: parse_count(&contact_previous[row], columns::CONTACT_PREVIOUS_MONTH, row)?,
            contact_last_6_months: parse_count(&contact_six[row], columns::CONTACT_LAST_6_MONTHS, row)?,
            call_duration_last_6_months: parse_amount(
                &call_duration[row],
                columns::CALL_DURATION_LAST_6_MONTHS,
                row,
            )?,
            paid: paid[row],
        });
    }

    if unparsed_dates > 0 {
        tracing::warn!(
            count = unparsed_dates,
            "origination dates could not be parsed and were treated as unknown"
        );
    }

    Ok(records)
}

/// Parse an origination date in any of the accepted layouts
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn malformed(column: &str, row: usize, message: impl Into<String>) -> PipelineError {
    PipelineError::MalformedRecord {
        column: column.to_string(),
        row,
        message: message.into(),
    }
}

fn required_text<'a>(value: &'a Option<String>, column: &str, row: usize) -> PipelineResult<&'a str> {
    non_blank(value).ok_or_else(|| malformed(column, row, "value is missing"))
}

fn parse_number(value: &Option<String>, column: &str, row: usize) -> PipelineResult<f64> {
    let raw = required_text(value, column, row)?;
    let number: f64 = raw
        .parse()
        .map_err(|_| malformed(column, row, format!("'{}' is not a number", raw)))?;
    if !number.is_finite() {
        return Err(malformed(column, row, format!("'{}' is not finite", raw)));
    }
    if number < 0.0 {
        return Err(malformed(column, row, format!("'{}' is negative", raw)));
    }
    Ok(number)
}

fn parse_amount(value: &Option<String>, column: &str, row: usize) -> PipelineResult<f64> {
    parse_number(value, column, row)
}

fn parse_count(value: &Option<String>, column: &str, row: usize) -> PipelineResult<i64> {
    let number = parse_number(value, column, row)?;
    if number.fract() != 0.0 {
        return Err(malformed(column, row, format!("{} is not a whole number", number)));
    }
    Ok(number as i64)
}

fn parse_flag(value: &Option<String>, column: &str, row: usize) -> PipelineResult<bool> {
    let raw = required_text(value, column, row)?;
    match raw.to_lowercase().as_str() {
        "1" | "1.0" | "true" => Ok(true),
        "0" | "0.0" | "false" => Ok(false),
        other => Err(malformed(column, row, format!("'{}' is not a 0/1 flag", other))),
    }
}
