//! Benchmarks for reconciliation and scoring throughput
//!
//! Run with: cargo bench --bench pipeline_benchmark

use std::sync::Arc;

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use rand::SeedableRng;

use collectrank::pipeline::model::{
    Activation, DenseAutoencoder, DenseLayerSpec, FittedTransform, LogisticClassifier,
    NumericScaler, OneHotEncoder, Preprocessor, UnknownCategoryPolicy,
};
use collectrank::pipeline::{
    model_input_fields, normalize, reconcile, score, CategoryMappings, DebtRecord, DocumentType,
    ModelBundle, AGE_BRACKET_MAP, CANONICAL_AGE_BRACKETS,
};

const REGIONS: [&str; 4] = ["ANTIOQUIA", "CUNDINAMARCA", "VALLE", "ATLANTICO"];
const BANKS: [&str; 3] = ["BANCO A", "BANCO B", "BANCO C"];

/// Generate raw records where roughly `dup_ratio` of rows repeat an earlier debt
fn generate_records(n_rows: usize, dup_ratio: f64, seed: u64) -> Vec<DebtRecord> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut records: Vec<DebtRecord> = Vec::with_capacity(n_rows);

    for row in 0..n_rows {
        if row > 0 && rng.gen::<f64>() < dup_ratio {
            let mut copy = records[rng.gen_range(0..row)].clone();
            copy.source_row = row;
            copy.debt_origination_date = None;
            records.push(copy);
            continue;
        }

        let documents = [
            DocumentType::CitizenId,
            DocumentType::ForeignId,
            DocumentType::MinorId,
            DocumentType::Passport,
        ];
        let never_paid = rng.gen::<f64>() < 0.3;
        records.push(DebtRecord {
            source_row: row,
            document_type: documents[rng.gen_range(0..documents.len())],
            client_id: format!("{}", rng.gen_range(1_000_000..9_999_999)),
            gender: Some(if rng.gen::<bool>() { "M" } else { "F" }.to_string()),
            age_bracket: Some(AGE_BRACKET_MAP[rng.gen_range(0..AGE_BRACKET_MAP.len())].0.to_string()),
            region: Some(REGIONS[rng.gen_range(0..REGIONS.len())].to_string()),
            statement_month: Some("2024-01".to_string()),
            principal_balance: 1_000.0 + rng.gen::<f64>() * 2_000_000.0,
            days_past_due: rng.gen_range(0..5_000),
            originating_bank: BANKS[rng.gen_range(0..BANKS.len())].to_string(),
            debt_origination_date: if rng.gen::<f64>() < 0.4 {
                NaiveDate::from_ymd_opt(2010 + rng.gen_range(0..14), rng.gen_range(1..13), 1)
            } else {
                None
            },
            paid_last_month: rng.gen::<f64>() < 0.1,
            months_since_last_payment: if never_paid {
                None
            } else {
                Some(rng.gen_range(0..36))
            },
            never_paid_before: never_paid,
            contact_current_month: rng.gen_range(0..5),
            contact_previous_month: rng.gen_range(0..5),
            contact_last_6_months: rng.gen_range(0..20),
            call_duration_last_6_months: rng.gen::<f64>() * 1_800.0,
            paid: rng.gen_range(0..2),
        });
    }

    records
}

/// A bundle of realistic width with a small bottleneck autoencoder
fn bench_bundle(seed: u64) -> ModelBundle {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let numeric = [
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
    let encoder = |field: &str, categories: &[&str]| OneHotEncoder {
        field: field.to_string(),
        categories: categories.iter().map(|c| c.to_string()).collect(),
    };

    let transform = FittedTransform {
        numeric: numeric
            .iter()
            .map(|f| NumericScaler {
                field: f.to_string(),
                mean: 0.0,
                scale: 1_000.0,
            })
            .collect(),
        categorical: vec![
            encoder("tipo_documento", &["C", "E", "T", "P"]),
            encoder("genero", &["HOMBRE", "MUJER", "No especificado"]),
            encoder("rango_edad_probable", &CANONICAL_AGE_BRACKETS),
            encoder("departamento", &REGIONS),
        ],
        handle_unknown: UnknownCategoryPolicy::Ignore,
    };

    let width = transform.output_width();
    let hidden = 8;
    let mut layer = |n_in: usize, n_out: usize, activation: Activation| DenseLayerSpec {
        weights: (0..n_in)
            .map(|_| (0..n_out).map(|_| rng.gen::<f64>() - 0.5).collect())
            .collect(),
        bias: vec![0.0; n_out],
        activation,
    };
    let layers = vec![
        layer(width, hidden, Activation::Relu),
        layer(hidden, width, Activation::Linear),
    ];
    let coefficients: Vec<f64> = (0..width).map(|i| (i as f64 - 10.0) * 0.01).collect();

    ModelBundle::from_parts(
        model_input_fields(),
        0.5,
        Arc::new(transform),
        Arc::new(LogisticClassifier::new(coefficients, -0.2)),
        Arc::new(DenseAutoencoder::from_specs(&layers).expect("valid layer shapes")),
    )
}

/// Benchmark reconciliation for varying row counts
fn benchmark_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_by_rows");
    group.sample_size(20);

    for n_rows in [1_000, 10_000, 100_000] {
        let records = generate_records(n_rows, 0.3, 42);
        group.throughput(Throughput::Elements(n_rows as u64));

        group.bench_with_input(BenchmarkId::new("reconcile", n_rows), &records, |b, records| {
            b.iter(|| reconcile(black_box(records)));
        });
    }

    group.finish();
}

/// Benchmark scoring (projection, transform, inference) for varying row counts
fn benchmark_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_by_rows");
    group.sample_size(20);

    let bundle = bench_bundle(7);
    let mappings = CategoryMappings::builtin();

    for n_rows in [1_000, 10_000, 50_000] {
        let canonical = reconcile(&generate_records(n_rows, 0.0, 42));
        let (normalized, _) = normalize(&canonical, &mappings);
        group.throughput(Throughput::Elements(normalized.len() as u64));

        group.bench_with_input(
            BenchmarkId::new("score", n_rows),
            &normalized,
            |b, records| {
                b.iter(|| {
                    let _ = score(black_box(records), black_box(&bundle));
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_reconcile, benchmark_score);
criterion_main!(benches);
