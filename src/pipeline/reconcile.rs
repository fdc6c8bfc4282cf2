//! Duplicate reconciliation
//!
//! The same debt is often exported several times, once per statement month,
//! and only some copies carry an origination date. Records are grouped by an
//! identity key that leaves out `statement_month` and `debt_origination_date`,
//! and one survivor is kept per group.
//!
//! The survivor is chosen by a stable sort on origination date with nulls
//! last followed by keep-first: a dated copy always wins over undated ones,
//! and among undated copies the earliest in file order wins.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::NaiveDate;

use super::record::{CanonicalRecord, DebtRecord, DocumentType};

/// Identity of a debt state. Two records with equal keys describe the same debt.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    document_type: DocumentType,
    client_id: String,
    gender: Option<String>,
    age_bracket: Option<String>,
    region: Option<String>,
    principal_balance: u64,
    days_past_due: i64,
    originating_bank: String,
    paid_last_month: bool,
    months_since_last_payment: Option<i64>,
    never_paid_before: bool,
    contact_current_month: i64,
    contact_previous_month: i64,
    contact_last_6_months: i64,
    call_duration_last_6_months: u64,
    paid: u8,
}

impl DedupKey {
    pub fn of(record: &DebtRecord) -> Self {
        Self {
            document_type: record.document_type,
            client_id: record.client_id.clone(),
            gender: record.gender.clone(),
            age_bracket: record.age_bracket.clone(),
            region: record.region.clone(),
            principal_balance: float_key(record.principal_balance),
            days_past_due: record.days_past_due,
            originating_bank: record.originating_bank.clone(),
            paid_last_month: record.paid_last_month,
            months_since_last_payment: record.months_since_last_payment,
            never_paid_before: record.never_paid_before,
            contact_current_month: record.contact_current_month,
            contact_previous_month: record.contact_previous_month,
            contact_last_6_months: record.contact_last_6_months,
            call_duration_last_6_months: float_key(record.call_duration_last_6_months),
            paid: record.paid,
        }
    }
}

/// Counts produced by a reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub input_records: usize,
    pub canonical_records: usize,
    pub duplicates_removed: usize,
}

/// Collapse duplicate observations into one canonical record per debt state.
///
/// Survivors are returned in input order.
pub fn reconcile(records: &[DebtRecord]) -> Vec<CanonicalRecord> {
    let mut order: Vec<usize> = (0..records.len()).collect();
    // Vec::sort_by is stable: equal dates keep their input order.
    order.sort_by(|&a, &b| {
        compare_nulls_last(
            records[a].debt_origination_date,
            records[b].debt_origination_date,
        )
    });

    let mut seen: HashSet<DedupKey> = HashSet::with_capacity(records.len());
    let mut survivors: Vec<usize> = order
        .into_iter()
        .filter(|&idx| seen.insert(DedupKey::of(&records[idx])))
        .collect();

    survivors.sort_unstable();

    let canonical: Vec<CanonicalRecord> = survivors
        .into_iter()
        .map(|idx| CanonicalRecord::new(records[idx].clone()))
        .collect();

    tracing::debug!(
        input = records.len(),
        canonical = canonical.len(),
        "reconciliation complete"
    );

    canonical
}

/// Re-run reconciliation over records that are already canonical.
pub fn reconcile_canonical(records: &[CanonicalRecord]) -> Vec<CanonicalRecord> {
    let raw: Vec<DebtRecord> = records.iter().map(|c| c.record.clone()).collect();
    reconcile(&raw)
}

/// Summarize a reconciliation pass
pub fn summarize(input: usize, canonical: &[CanonicalRecord]) -> ReconcileSummary {
    ReconcileSummary {
        input_records: input,
        canonical_records: canonical.len(),
        duplicates_removed: input.saturating_sub(canonical.len()),
    }
}

fn compare_nulls_last(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Bit pattern of a float for hashing; -0.0 and 0.0 compare equal.
fn float_key(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}
