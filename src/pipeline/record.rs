//! Record types flowing through the pipeline
//!
//! `DebtRecord` is one raw row, `CanonicalRecord` the survivor of a duplicate
//! group, `ScoredRecord` a canonical record with model outputs attached.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Dataset column names, as they appear in the source file header.
pub mod columns {
    pub const DOCUMENT_TYPE: &str = "tipo_documento";
    pub const CLIENT_ID: &str = "identificacion";
    pub const GENDER: &str = "genero";
    pub const AGE_BRACKET: &str = "rango_edad_probable";
    pub const REGION: &str = "departamento";
    pub const STATEMENT_MONTH: &str = "mes";
    pub const PRINCIPAL_BALANCE: &str = "saldo_capital";
    pub const DAYS_PAST_DUE: &str = "dias_mora";
    pub const ORIGINATING_BANK: &str = "banco";
    pub const ORIGINATION_DATE: &str = "antiguedad_deuda";
    pub const PAID_LAST_MONTH: &str = "pago_mes_anterior";
    pub const MONTHS_SINCE_LAST_PAYMENT: &str = "meses_desde_ultimo_pago";
    pub const NEVER_PAID_BEFORE: &str = "sin_pago_previo";
    pub const CONTACT_CURRENT_MONTH: &str = "contacto_mes_actual";
    pub const CONTACT_PREVIOUS_MONTH: &str = "contacto_mes_anterior";
    pub const CONTACT_LAST_6_MONTHS: &str = "contacto_ultimos_6meses";
    pub const CALL_DURATION_LAST_6_MONTHS: &str = "duracion_llamadas_ultimos_6meses";
    pub const PAID: &str = "pago";

    /// Columns that must be present in every dataset file.
    pub const REQUIRED: [&str; 15] = [
        DOCUMENT_TYPE,
        CLIENT_ID,
        GENDER,
        AGE_BRACKET,
        REGION,
        PRINCIPAL_BALANCE,
        DAYS_PAST_DUE,
        ORIGINATING_BANK,
        PAID_LAST_MONTH,
        MONTHS_SINCE_LAST_PAYMENT,
        NEVER_PAID_BEFORE,
        CONTACT_CURRENT_MONTH,
        CONTACT_PREVIOUS_MONTH,
        CONTACT_LAST_6_MONTHS,
        CALL_DURATION_LAST_6_MONTHS,
    ];
}

/// Identity document kind of the debtor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    #[default]
    CitizenId,
    ForeignId,
    MinorId,
    Passport,
}

impl DocumentType {
    /// Single-letter code used in the source data (and seen by the fitted transform).
    pub fn code(&self) -> &'static str {
        match self {
            DocumentType::CitizenId => "C",
            DocumentType::ForeignId => "E",
            DocumentType::MinorId => "T",
            DocumentType::Passport => "P",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "c" | "cc" | "citizen_id" => Ok(DocumentType::CitizenId),
            "e" | "ce" | "foreign_id" => Ok(DocumentType::ForeignId),
            "t" | "ti" | "minor_id" => Ok(DocumentType::MinorId),
            "p" | "passport" => Ok(DocumentType::Passport),
            other => Err(format!("unknown document type '{}'", other)),
        }
    }
}

/// One row of the raw dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebtRecord {
    /// Zero-based position of the row in the source file
    pub source_row: usize,
    pub document_type: DocumentType,
    /// Not unique: a client may hold several debts
    pub client_id: String,
    pub gender: Option<String>,
    pub age_bracket: Option<String>,
    pub region: Option<String>,
    /// Cut-off month; unreliable, never part of the identity key
    pub statement_month: Option<String>,
    pub principal_balance: f64,
    pub days_past_due: i64,
    pub originating_bank: String,
    /// Sparse (most rows are null)
    pub debt_origination_date: Option<NaiveDate>,
    pub paid_last_month: bool,
    /// `None` means the client never paid
    pub months_since_last_payment: Option<i64>,
    pub never_paid_before: bool,
    pub contact_current_month: i64,
    pub contact_previous_month: i64,
    pub contact_last_6_months: i64,
    /// Seconds
    pub call_duration_last_6_months: f64,
    /// Target, always 0 or 1 after loading
    pub paid: u8,
}

/// The surviving representative of a duplicate-record group.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub record: DebtRecord,
}

impl CanonicalRecord {
    pub fn new(record: DebtRecord) -> Self {
        Self { record }
    }

    pub fn source_row(&self) -> usize {
        self.record.source_row
    }

    pub fn client_id(&self) -> &str {
        &self.record.client_id
    }
}

impl From<DebtRecord> for CanonicalRecord {
    fn from(record: DebtRecord) -> Self {
        Self::new(record)
    }
}

/// A canonical record with model outputs attached. Never persisted by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub record: CanonicalRecord,
    /// Positive-class probability, in [0, 1]
    pub payment_probability: f64,
    /// Autoencoder reconstruction error (MSE)
    pub anomaly_score: f64,
    pub anomaly_flag: bool,
}

impl ScoredRecord {
    pub fn client_id(&self) -> &str {
        self.record.client_id()
    }

    pub fn principal_balance(&self) -> f64 {
        self.record.record.principal_balance
    }

    pub fn days_past_due(&self) -> i64 {
        self.record.record.days_past_due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_codes() {
        assert_eq!("C".parse::<DocumentType>().unwrap(), DocumentType::CitizenId);
        assert_eq!("e".parse::<DocumentType>().unwrap(), DocumentType::ForeignId);
        assert_eq!(" T ".parse::<DocumentType>().unwrap(), DocumentType::MinorId);
        assert_eq!("passport".parse::<DocumentType>().unwrap(), DocumentType::Passport);
        assert_eq!(DocumentType::Passport.code(), "P");
    }

    #[test]
    fn test_document_type_unknown() {
        let err = "NIT".parse::<DocumentType>().unwrap_err();
        assert!(err.contains("nit"));
    }

    #[test]
    fn test_required_columns_exclude_optional() {
        assert!(!columns::REQUIRED.contains(&columns::STATEMENT_MONTH));
        assert!(!columns::REQUIRED.contains(&columns::ORIGINATION_DATE));
        assert!(!columns::REQUIRED.contains(&columns::PAID));
    }
}
