//! Collectrank: debt-collection prioritization CLI
//!
//! Cleans a monthly portfolio extract, scores it with a pre-trained model
//! bundle and writes the ranked call list.

use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

use collectrank::cli::{clean_output_path, confirm_overwrite, Cli, Commands};
use collectrank::pipeline::{CategoryMappings, CleanedDataset, Pipeline, PipelineConfig, PipelineError};
use collectrank::report::{
    display_call_list, export_clean_records, export_priority_list, export_run_summary,
    RunSummary, SummaryParams,
};
use collectrank::utils::{
    create_spinner, finish_with_error, finish_with_success, print_banner, print_completion,
    print_config, print_count, print_info, print_step_header, print_step_time, print_success,
    print_warning, ConfigCard,
};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Some(Commands::Clean {
            input,
            output,
            mappings,
            no_confirm,
        }) => run_clean(input, output.as_deref(), mappings.as_deref(), *no_confirm),
        None => run_score(&cli),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", style("error:").red().bold(), err);
            let unavailable = err
                .downcast_ref::<PipelineError>()
                .is_some_and(PipelineError::is_unavailable);
            if unavailable {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn build_config(mappings: Option<&Path>) -> Result<PipelineConfig> {
    let mappings = match mappings {
        Some(path) => CategoryMappings::from_json_file(path)?,
        None => CategoryMappings::builtin(),
    };
    Ok(PipelineConfig {
        mappings,
        ..Default::default()
    })
}

/// Load, reconcile and normalize, reporting each stage
fn clean_step(pipeline: &Pipeline, input: &Path) -> Result<CleanedDataset> {
    print_step_header(1, "Clean Dataset");

    let step_start = Instant::now();
    let spinner = create_spinner("Loading and reconciling records...");
    let cleaned = match pipeline.clean(input) {
        Ok(cleaned) => cleaned,
        Err(err) => {
            finish_with_error(&spinner, "Cleaning failed");
            return Err(err.into());
        }
    };
    finish_with_success(&spinner, "Dataset cleaned");

    print_count("record(s) loaded", cleaned.loaded(), None);
    if cleaned.reconcile.duplicates_removed > 0 {
        print_count(
            "duplicate observation(s) collapsed",
            cleaned.reconcile.duplicates_removed,
            None,
        );
    }
    print_step_time(step_start.elapsed());

    Ok(cleaned)
}

fn run_clean(
    input: &Path,
    output: Option<&Path>,
    mappings: Option<&Path>,
    no_confirm: bool,
) -> Result<()> {
    let output_path = clean_output_path(input, output);
    let config = build_config(mappings)?;

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&ConfigCard {
        input,
        model: None,
        output: &output_path,
        selection: None,
    });

    let pipeline = Pipeline::new(config);
    let cleaned = clean_step(&pipeline, input)?;

    print_step_header(2, "Save Results");
    if !confirm_overwrite(&output_path, no_confirm)? {
        print_info("Output not written");
        return Ok(());
    }
    let spinner = create_spinner("Writing cleaned records...");
    export_clean_records(&cleaned.canonical, &output_path)?;
    finish_with_success(&spinner, &format!("Saved to {}", output_path.display()));

    RunSummary::without_selection(&cleaned).display();
    print_completion();
    Ok(())
}

fn run_score(cli: &Cli) -> Result<()> {
    let input = cli
        .input
        .as_deref()
        .context("Input file is required. Use -i/--input to specify a file.")?;
    let model = cli
        .model
        .as_deref()
        .context("Model bundle is required. Use -m/--model to specify a file.")?;
    let output_path = cli
        .output_path()
        .context("Cannot derive an output path without an input file")?;

    let mut config = build_config(cli.mappings.as_deref())?;
    config.selection.max_days_past_due = cli.max_days_past_due;
    config.selection.min_principal_balance = cli.min_balance;
    config.unknown_category = cli.unknown_category;

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&ConfigCard {
        input,
        model: Some(model),
        output: &output_path,
        selection: Some(&config.selection),
    });

    let pipeline = Pipeline::new(config);
    let cleaned = clean_step(&pipeline, input)?;
    print_count(
        "record(s) excluded from scoring",
        cleaned.excluded_stale + cleaned.excluded_residual,
        Some(&format!(
            "({} stale, {} residual)",
            cleaned.excluded_stale, cleaned.excluded_residual
        )),
    );

    print_step_header(2, "Score Records");
    let step_start = Instant::now();
    let spinner = create_spinner("Loading model bundle...");
    let bundle = match pipeline.load_bundle(model) {
        Ok(bundle) => bundle,
        Err(err) => {
            finish_with_error(&spinner, "Model bundle unavailable");
            return Err(err.into());
        }
    };
    spinner.set_message("Scoring records...");
    let ranked = match pipeline.score(&cleaned, &bundle) {
        Ok(ranked) => ranked,
        Err(err) => {
            finish_with_error(&spinner, "Scoring failed");
            return Err(err.into());
        }
    };
    finish_with_success(&spinner, "Scoring complete");

    let flagged = ranked.flagged().count();
    if flagged > 0 {
        print_warning(&format!(
            "{} record(s) flagged for manual review (anomaly score > {})",
            flagged, bundle.threshold
        ));
    }
    print_step_time(step_start.elapsed());

    print_step_header(3, "Save Results");
    if confirm_overwrite(&output_path, cli.no_confirm)? {
        let spinner = create_spinner("Writing ranked list...");
        export_priority_list(&ranked, &output_path)?;
        finish_with_success(&spinner, &format!("Saved to {}", output_path.display()));
    } else {
        print_info("Ranked list not written");
    }

    let summary = RunSummary::from_cleaned(&cleaned).with_scores(&ranked);
    if let Some(summary_path) = &cli.summary_json {
        export_run_summary(
            &summary,
            summary_path,
            &SummaryParams {
                input_file: input,
                model_file: Some(model),
                config: pipeline.config(),
                anomaly_threshold: Some(bundle.threshold),
            },
        )?;
        print_success(&format!("Run summary written to {}", summary_path.display()));
    }

    summary.display();
    display_call_list(&ranked, cli.top);
    print_completion();
    Ok(())
}
