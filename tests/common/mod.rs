//! Shared test utilities and fixture generators

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use collectrank::pipeline::model::{
    FittedTransform, LogisticClassifier, NumericScaler, OneHotEncoder, PaymentClassifier,
    Reconstructor, UnknownCategoryPolicy,
};
use collectrank::pipeline::{
    model_input_fields, CanonicalRecord, DebtRecord, DocumentType, ModelBundle,
};
use polars::prelude::*;
use tempfile::TempDir;

/// A well-formed record that passes the default exclusion filters
pub fn debt(row: usize, client_id: &str) -> DebtRecord {
    DebtRecord {
        source_row: row,
        document_type: DocumentType::CitizenId,
        client_id: client_id.to_string(),
        gender: Some("MUJER".to_string()),
        age_bracket: Some("26-35".to_string()),
        region: Some("ANTIOQUIA".to_string()),
        statement_month: Some("2024-01".to_string()),
        principal_balance: 5000.0,
        days_past_due: 120,
        originating_bank: "BANCO A".to_string(),
        debt_origination_date: None,
        paid_last_month: false,
        months_since_last_payment: Some(3),
        never_paid_before: false,
        contact_current_month: 1,
        contact_previous_month: 2,
        contact_last_6_months: 5,
        call_duration_last_6_months: 320.0,
        paid: 0,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

pub fn canonical(record: DebtRecord) -> CanonicalRecord {
    CanonicalRecord::new(record)
}

/// Raw portfolio extract with one duplicate pair (rows 0 and 2) and one
/// record of each exclusion kind (rows 3 and 4)
pub fn create_portfolio_dataframe() -> DataFrame {
    df! {
        "tipo_documento" => ["C", "E", "C", "C", "T", "P"],
        "identificacion" => ["1001", "1002", "1001", "1003", "1004", "1005"],
        "genero" => [Some("F"), Some("M"), Some("F"), None, Some("NO APLICA"), Some(" ")],
        "rango_edad_probable" => [Some("30-33"), Some("36-45"), Some("30-33"), Some("66+"), None, Some("raro")],
        "departamento" => [Some("ANTIOQUIA"), None, Some("ANTIOQUIA"), Some("CUNDINAMARCA"), Some("VALLE"), Some("")],
        "mes" => ["2024-01", "2024-01", "2024-01", "2024-01", "2024-01", "2024-01"],
        "saldo_capital" => [5000.0f64, 12000.0, 5000.0, 3000.0, 800.0, 2500.0],
        "dias_mora" => [120i64, 45, 120, 4000, 30, 60],
        "banco" => ["BANCO A", "BANCO B", "BANCO A", "BANCO A", "BANCO C", "BANCO B"],
        "antiguedad_deuda" => [Some("2020-05-01"), Some("2019-01-15"), Some("2018-03-10"), None, Some("2021-07-07"), Some("not a date")],
        "pago_mes_anterior" => [0i64, 1, 0, 0, 0, 1],
        "meses_desde_ultimo_pago" => [Some(3i64), Some(1), Some(3), None, None, Some(0)],
        "sin_pago_previo" => [0i64, 0, 0, 1, 1, 0],
        "contacto_mes_actual" => [1i64, 3, 1, 0, 0, 2],
        "contacto_mes_anterior" => [2i64, 1, 2, 0, 1, 2],
        "contacto_ultimos_6meses" => [5i64, 8, 5, 0, 1, 6],
        "duracion_llamadas_ultimos_6meses" => [320.0f64, 610.5, 320.0, 0.0, 12.0, 400.0],
        "pago" => [Some("1"), Some("0"), Some("1"), Some("abc"), None, Some("2.7")],
    }
    .unwrap()
}

/// Write a DataFrame to `<dir>/<name>` as CSV or Parquet by extension
pub fn write_frame(df: &mut DataFrame, dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let file = std::fs::File::create(&path).unwrap();
    if name.ends_with(".parquet") {
        ParquetWriter::new(file).finish(df).unwrap();
    } else {
        let mut file = file;
        CsvWriter::new(&mut file).finish(df).unwrap();
    }
    path
}

/// Create a temporary directory with the portfolio CSV
pub fn create_temp_portfolio_csv() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let mut df = create_portfolio_dataframe();
    let path = write_frame(&mut df, temp_dir.path(), "cartera.csv");
    (temp_dir, path)
}

const XLSX_CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const XLSX_ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const XLSX_WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Hoja1" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const XLSX_WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

fn xlsx_column(mut idx: usize) -> String {
    let mut name = String::new();
    loop {
        name.insert(0, (b'A' + (idx % 26) as u8) as char);
        if idx < 26 {
            return name;
        }
        idx = idx / 26 - 1;
    }
}

/// Write a single-sheet workbook. Cells that parse as numbers are stored as
/// numbers, blanks are left out, everything else is an inline string.
pub fn write_xlsx(dir: &Path, name: &str, rows: &[Vec<&str>]) -> PathBuf {
    use std::io::Write;
    use ::zip::write::SimpleFileOptions;
    use ::zip::ZipWriter;

    let mut sheet = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, row) in rows.iter().enumerate() {
        sheet.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in row.iter().enumerate() {
            let cell = format!("{}{}", xlsx_column(c), r + 1);
            if value.is_empty() {
                continue;
            } else if value.parse::<f64>().is_ok() {
                sheet.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, cell, value));
            } else {
                sheet.push_str(&format!(
                    r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    cell, value
                ));
            }
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");

    let path = dir.join(name);
    let file = std::fs::File::create(&path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(::zip::CompressionMethod::Deflated);
    for (entry, content) in [
        ("[Content_Types].xml", XLSX_CONTENT_TYPES),
        ("_rels/.rels", XLSX_ROOT_RELS),
        ("xl/workbook.xml", XLSX_WORKBOOK),
        ("xl/_rels/workbook.xml.rels", XLSX_WORKBOOK_RELS),
        ("xl/worksheets/sheet1.xml", sheet.as_str()),
    ] {
        zip.start_file(entry, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    path
}

/// Fitted transform over every model input field, with the categories the
/// portfolio fixture produces after normalization
pub fn fitted_transform() -> FittedTransform {
    let numeric_fields = [
        "saldo_capital",
        "dias_mora",
        "pago_mes_anterior",
        "meses_desde_ultimo_pago",
        "sin_pago_previo",
        "contacto_mes_actual",
        "contacto_mes_anterior",
        "contacto_ultimos_6meses",
        "duracion_llamadas_ultimos_6meses",
    ];
    let categorical = |field: &str, categories: &[&str]| OneHotEncoder {
        field: field.to_string(),
        categories: categories.iter().map(|c| c.to_string()).collect(),
    };

    FittedTransform {
        numeric: numeric_fields
            .iter()
            .map(|f| NumericScaler {
                field: f.to_string(),
                mean: 1.0,
                scale: 100.0,
            })
            .collect(),
        categorical: vec![
            categorical("tipo_documento", &["C", "E", "T", "P"]),
            categorical("genero", &["HOMBRE", "MUJER", "No especificado"]),
            categorical(
                "rango_edad_probable",
                &["18-25", "26-35", "36-45", "46-55", "56-65", "Mayor a 65", "No especificado"],
            ),
            categorical("departamento", &["ANTIOQUIA", "CUNDINAMARCA", "VALLE", "No especificado"]),
        ],
        handle_unknown: UnknownCategoryPolicy::Error,
    }
}

/// Identity autoencoder JSON layers for a given width
fn identity_layers(width: usize) -> serde_json::Value {
    let weights: Vec<Vec<f64>> = (0..width)
        .map(|i| (0..width).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();
    serde_json::json!([{ "weights": weights, "bias": vec![0.0; width], "activation": "linear" }])
}

/// A valid bundle JSON document over the full model input schema
pub fn bundle_json() -> serde_json::Value {
    use collectrank::pipeline::model::Preprocessor;

    let transform = fitted_transform();
    let width = transform.output_width();
    let coefficients: Vec<f64> = (0..width).map(|i| 0.05 * (i as f64 + 1.0)).collect();

    serde_json::json!({
        "feature_names": model_input_fields(),
        "threshold": 0.25,
        "preprocessor": transform,
        "classifier": { "kind": "logistic", "coefficients": coefficients, "intercept": -0.5 },
        "autoencoder": { "layers": identity_layers(width) },
    })
}

/// Write a bundle document to `<dir>/<name>`
pub fn write_bundle(value: &serde_json::Value, dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

/// Classifier returning one fixed probability
pub struct ConstantClassifier(pub f64);

impl PaymentClassifier for ConstantClassifier {
    fn predict_probability(&self, _features: &[f64]) -> f64 {
        self.0
    }
}

/// Classifier whose probability is the first transformed feature
pub struct FirstFeatureClassifier;

impl PaymentClassifier for FirstFeatureClassifier {
    fn predict_probability(&self, features: &[f64]) -> f64 {
        features.first().copied().unwrap_or(0.0)
    }
}

/// Reconstructor that adds a constant offset to every feature
pub struct OffsetReconstructor(pub f64);

impl Reconstructor for OffsetReconstructor {
    fn reconstruct(&self, features: &[f64]) -> Vec<f64> {
        features.iter().map(|x| x + self.0).collect()
    }
}

/// Reconstructor that drops the last feature
pub struct TruncatingReconstructor;

impl Reconstructor for TruncatingReconstructor {
    fn reconstruct(&self, features: &[f64]) -> Vec<f64> {
        features[..features.len().saturating_sub(1)].to_vec()
    }
}

/// Bundle built from the fixture transform and arbitrary model stubs
pub fn stub_bundle(
    classifier: Arc<dyn PaymentClassifier>,
    reconstructor: Arc<dyn Reconstructor>,
    threshold: f64,
) -> ModelBundle {
    ModelBundle::from_parts(
        model_input_fields(),
        threshold,
        Arc::new(fitted_transform()),
        classifier,
        reconstructor,
    )
}

/// Logistic model over the fixture transform
pub fn logistic_bundle() -> ModelBundle {
    use collectrank::pipeline::model::DenseAutoencoder;
    use collectrank::pipeline::model::{DenseLayerSpec, Preprocessor};

    let transform = fitted_transform();
    let width = transform.output_width();
    let layers: Vec<DenseLayerSpec> = serde_json::from_value(identity_layers(width)).unwrap();
    ModelBundle::from_parts(
        model_input_fields(),
        0.25,
        Arc::new(transform),
        Arc::new(LogisticClassifier::new(vec![0.1; width], 0.0)),
        Arc::new(DenseAutoencoder::from_specs(&layers).unwrap()),
    )
}
