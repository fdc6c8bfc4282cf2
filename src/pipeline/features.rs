//! Business exclusions and projection onto the model input schema

use serde::{Deserialize, Serialize};

use super::error::{PipelineError, PipelineResult, Stage};
use super::record::{columns, CanonicalRecord};

/// Sentinel for "never paid" in `meses_desde_ultimo_pago`
pub const NEVER_PAID_SENTINEL: f64 = -1.0;

/// Ordered input fields the fitted transform expects
pub const MODEL_INPUT_FIELDS: [&str; 13] = [
    columns::DOCUMENT_TYPE,
    columns::GENDER,
    columns::AGE_BRACKET,
    columns::REGION,
    columns::PRINCIPAL_BALANCE,
    columns::DAYS_PAST_DUE,
    columns::PAID_LAST_MONTH,
    columns::MONTHS_SINCE_LAST_PAYMENT,
    columns::NEVER_PAID_BEFORE,
    columns::CONTACT_CURRENT_MONTH,
    columns::CONTACT_PREVIOUS_MONTH,
    columns::CONTACT_LAST_6_MONTHS,
    columns::CALL_DURATION_LAST_6_MONTHS,
];

/// Exclusion thresholds applied before scoring
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionPolicy {
    /// Records with `days_past_due >= max_days_past_due` are legally stale
    pub max_days_past_due: i64,
    /// Records with `principal_balance <= min_principal_balance` are residual noise
    pub min_principal_balance: f64,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            max_days_past_due: 3650,
            min_principal_balance: 1000.0,
        }
    }
}

impl SelectionPolicy {
    pub fn is_stale(&self, record: &CanonicalRecord) -> bool {
        record.record.days_past_due >= self.max_days_past_due
    }

    pub fn is_residual(&self, record: &CanonicalRecord) -> bool {
        record.record.principal_balance <= self.min_principal_balance
    }
}

/// Records that passed the exclusion filters, with per-reason counts
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub kept: Vec<CanonicalRecord>,
    /// Excluded for arrears age (counted first when both reasons apply)
    pub excluded_stale: usize,
    pub excluded_residual: usize,
}

/// Drop out-of-policy records
pub fn apply_exclusions(records: &[CanonicalRecord], policy: &SelectionPolicy) -> Selection {
    let mut selection = Selection::default();

    for record in records {
        if policy.is_stale(record) {
            selection.excluded_stale += 1;
        } else if policy.is_residual(record) {
            selection.excluded_residual += 1;
        } else {
            selection.kept.push(record.clone());
        }
    }

    tracing::debug!(
        kept = selection.kept.len(),
        stale = selection.excluded_stale,
        residual = selection.excluded_residual,
        "exclusions applied"
    );

    selection
}

/// A single model input value
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Number(f64),
    Category(String),
}

impl FeatureValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(v) => Some(*v),
            FeatureValue::Category(_) => None,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            FeatureValue::Category(s) => Some(s),
            FeatureValue::Number(_) => None,
        }
    }
}

impl std::fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureValue::Number(v) => write!(f, "{}", v),
            FeatureValue::Category(s) => f.write_str(s),
        }
    }
}

/// Records projected onto an ordered list of model input fields
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBatch {
    pub fields: Vec<String>,
    pub rows: Vec<Vec<FeatureValue>>,
    /// Source row of each projected record
    pub source_rows: Vec<usize>,
}

impl FeatureBatch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }
}

/// Value of a model input field for one record, or `None` if the record has no such field
pub fn feature_value(record: &CanonicalRecord, field: &str) -> Option<FeatureValue> {
    let r = &record.record;
    let category = |v: &Option<String>| FeatureValue::Category(v.clone().unwrap_or_default());
    let flag = |b: bool| FeatureValue::Number(if b { 1.0 } else { 0.0 });

    let value = match field {
        columns::DOCUMENT_TYPE => FeatureValue::Category(r.document_type.code().to_string()),
        columns::GENDER => category(&r.gender),
        columns::AGE_BRACKET => category(&r.age_bracket),
        columns::REGION => category(&r.region),
        columns::PRINCIPAL_BALANCE => FeatureValue::Number(r.principal_balance),
        columns::DAYS_PAST_DUE => FeatureValue::Number(r.days_past_due as f64),
        columns::PAID_LAST_MONTH => flag(r.paid_last_month),
        columns::MONTHS_SINCE_LAST_PAYMENT => FeatureValue::Number(
            r.months_since_last_payment
                .map(|m| m as f64)
                .unwrap_or(NEVER_PAID_SENTINEL),
        ),
        columns::NEVER_PAID_BEFORE => flag(r.never_paid_before),
        columns::CONTACT_CURRENT_MONTH => FeatureValue::Number(r.contact_current_month as f64),
        columns::CONTACT_PREVIOUS_MONTH => FeatureValue::Number(r.contact_previous_month as f64),
        columns::CONTACT_LAST_6_MONTHS => FeatureValue::Number(r.contact_last_6_months as f64),
        columns::CALL_DURATION_LAST_6_MONTHS => {
            FeatureValue::Number(r.call_duration_last_6_months)
        }
        _ => return None,
    };

    Some(value)
}

/// Project records onto `expected_fields`, in that order.
///
/// Fails the whole batch with `SchemaMismatch` if any expected field cannot be
/// supplied by a canonical record.
pub fn project(
    records: &[CanonicalRecord],
    expected_fields: &[String],
) -> PipelineResult<FeatureBatch> {
    let missing: Vec<String> = expected_fields
        .iter()
        .filter(|f| !MODEL_INPUT_FIELDS.contains(&f.as_str()))
        .cloned()
        .collect();

    if !missing.is_empty() {
        return Err(PipelineError::SchemaMismatch {
            stage: Stage::FeatureSelection,
            fields: missing,
            records: records.len(),
        });
    }

    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        let row = expected_fields
            .iter()
            .map(|field| {
                feature_value(record, field).ok_or_else(|| PipelineError::SchemaMismatch {
                    stage: Stage::FeatureSelection,
                    fields: vec![field.clone()],
                    records: records.len(),
                })
            })
            .collect::<PipelineResult<Vec<_>>>()?;
        rows.push(row);
    }

    Ok(FeatureBatch {
        fields: expected_fields.to_vec(),
        rows,
        source_rows: records.iter().map(|r| r.source_row()).collect(),
    })
}

/// The fixed model input field list as owned strings
pub fn model_input_fields() -> Vec<String> {
    MODEL_INPUT_FIELDS.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::record::DebtRecord;

    fn canonical(dpd: i64, balance: f64) -> CanonicalRecord {
        CanonicalRecord::new(DebtRecord {
            days_past_due: dpd,
            principal_balance: balance,
            ..Default::default()
        })
    }

    #[test]
    fn test_both_reasons_counted_as_stale() {
        let records = vec![canonical(4000, 10.0)];
        let selection = apply_exclusions(&records, &SelectionPolicy::default());
        assert_eq!(selection.excluded_stale, 1);
        assert_eq!(selection.excluded_residual, 0);
        assert!(selection.kept.is_empty());
    }

    #[test]
    fn test_months_sentinel() {
        let record = canonical(10, 5000.0);
        let value = feature_value(&record, columns::MONTHS_SINCE_LAST_PAYMENT).unwrap();
        assert_eq!(value, FeatureValue::Number(NEVER_PAID_SENTINEL));
    }

    #[test]
    fn test_unknown_field_has_no_value() {
        let record = canonical(10, 5000.0);
        assert!(feature_value(&record, columns::ORIGINATION_DATE).is_none());
        assert!(feature_value(&record, columns::PAID).is_none());
    }

    #[test]
    fn test_project_reorders_to_expected() {
        let record = canonical(10, 5000.0);
        let expected = vec![
            columns::DAYS_PAST_DUE.to_string(),
            columns::PRINCIPAL_BALANCE.to_string(),
        ];
        let batch = project(&[record], &expected).unwrap();
        assert_eq!(
            batch.rows[0],
            vec![FeatureValue::Number(10.0), FeatureValue::Number(5000.0)]
        );
    }
}
