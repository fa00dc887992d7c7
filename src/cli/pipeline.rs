// src/cli/pipeline.rs — Full sweep: run → prep → eval → summarize per mode

use std::path::{Path, PathBuf};

use crate::eval::report::{load_report, summarize, write_summary};
use crate::eval::{flatten_attempts, run_evaluator};
use crate::infra::config::Config;
use crate::refine::FeedbackMode;

const RUN_OUTPUT_STEM: &str = "refine_run";
const ATTEMPTS_FILE: &str = "output.attempt_codes";
const REPORT_FILE: &str = "perf_report.jsonl";
const SUMMARY_FILE: &str = "result_summary.json";

/// Run the whole benchmark for each feedback mode, one result tree per mode
/// under `<results_dir>/<engine>/<timestamp>/`.
pub async fn run_pipeline(
    config: &Config,
    dataset: &Path,
    results_dir: &Path,
    modes: &[FeedbackMode],
) -> anyhow::Result<()> {
    let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M").to_string();
    let root = results_dir.join(&config.model.engine).join(timestamp);
    std::fs::create_dir_all(&root)?;
    tracing::info!(dir = %root.display(), "Created results directory");

    dump_args(&root, config, dataset, modes)?;

    for mode in modes {
        tracing::info!(%mode, "Starting sweep for feedback mode");
        run_mode(config, dataset, &root, *mode).await?;
        tracing::info!(%mode, "Completed sweep for feedback mode");
    }

    tracing::info!("All sweeps completed");
    Ok(())
}

async fn run_mode(
    config: &Config,
    dataset: &Path,
    root: &Path,
    mode: FeedbackMode,
) -> anyhow::Result<()> {
    let mode_dir = root.join(mode.to_string());
    std::fs::create_dir_all(&mode_dir)?;

    // 1. Refinement batch
    let run_output = super::run::run_batch(
        config,
        dataset,
        &mode_dir.join(RUN_OUTPUT_STEM),
        mode,
        None,
    )
    .await?;

    // 2. Flatten final attempts for the evaluator
    let attempts_file = mode_dir.join(ATTEMPTS_FILE);
    let flattened = flatten_attempts(&run_output, &attempts_file)?;
    tracing::info!(
        attempts = flattened,
        file = %attempts_file.display(),
        "Flattened final attempts"
    );

    // 3. External evaluation
    let report_file = mode_dir.join(REPORT_FILE);
    run_evaluator(&config.eval, &attempts_file, &report_file).await?;

    // 4. Summary
    let report = load_report(&report_file)?;
    let summary = summarize(&report)?;
    let summary_path = mode_dir.join(SUMMARY_FILE);
    write_summary(&summary_path, &summary)?;

    tracing::info!(summary = %summary_path.display(), "Result summary saved");
    print_summary(mode, &summary);

    Ok(())
}

fn print_summary(mode: FeedbackMode, summary: &crate::eval::report::RunSummary) {
    println!("── {} ──", mode);
    println!("  programs:             {}", summary.total_programs);
    println!(
        "  accurate:             {} ({:.1}%)",
        summary.total_programs_accurate, summary.accuracy_rate
    );
    println!(
        "  improved vs reference: {} ({:.1}%)",
        summary.improved_vs_reference, summary.improvement_rate_vs_reference
    );
    println!(
        "  improved vs input:     {} ({:.1}%)",
        summary.improved_vs_input, summary.improvement_rate_vs_input
    );
}

/// Record the invocation next to its results so a run stays reproducible.
fn dump_args(
    root: &Path,
    config: &Config,
    dataset: &Path,
    modes: &[FeedbackMode],
) -> anyhow::Result<PathBuf> {
    let path = root.join("args_dump.txt");
    let modes: Vec<String> = modes.iter().map(|m| m.to_string()).collect();
    let body = format!(
        "engine: {}\ndataset: {}\nmax_attempts: {}\ntemperature: {}\nfeedback_modes: {}\n",
        config.model.engine,
        dataset.display(),
        config.refine.max_attempts,
        config.model.temperature,
        modes.join(","),
    );
    std::fs::write(&path, body)?;
    tracing::info!(args = %path.display(), "Arguments saved");
    Ok(path)
}
