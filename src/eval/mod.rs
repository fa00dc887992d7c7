// src/eval/mod.rs — Bridge to the external performance evaluator

pub mod report;

use std::path::Path;

use crate::batch::load_run_records;
use crate::infra::config::EvalConfig;
use crate::infra::errors::QuickenError;

/// Flatten a run output into one JSON-encoded code string per line,
/// order-aligned with the run records, for the evaluator to consume.
/// Records whose session produced no attempt flatten to an empty string so
/// alignment is preserved.
pub fn flatten_attempts(run_output: &Path, outfile: &Path) -> Result<usize, QuickenError> {
    let records = load_run_records(run_output)?;

    let mut out = String::new();
    for record in &records {
        let final_text = record.final_attempt().unwrap_or("");
        out.push_str(&serde_json::to_string(final_text)?);
        out.push('\n');
    }

    std::fs::write(outfile, out).map_err(|source| QuickenError::Persistence {
        path: outfile.to_path_buf(),
        source,
    })?;

    Ok(records.len())
}

/// Rewrite the evaluator's base YAML run-config with this run's input/output
/// paths, dump it to a temp file, and spawn the evaluator on it.
pub async fn run_evaluator(
    cfg: &EvalConfig,
    attempts_file: &Path,
    report_file: &Path,
) -> Result<(), QuickenError> {
    let raw = std::fs::read_to_string(&cfg.config_path).map_err(|e| {
        QuickenError::Config(format!("evaluator config {} unreadable: {}", cfg.config_path, e))
    })?;
    let mut doc: serde_yml::Value = serde_yml::from_str(&raw)
        .map_err(|e| QuickenError::Config(format!("invalid evaluator config: {}", e)))?;

    let mapping = doc.as_mapping_mut().ok_or_else(|| {
        QuickenError::Config("evaluator config is not a YAML mapping".into())
    })?;
    mapping.insert(
        "model_generated_outputs_path".into(),
        attempts_file.to_string_lossy().to_string().into(),
    );
    mapping.insert(
        "output_report_file_path".into(),
        report_file.to_string_lossy().to_string().into(),
    );

    let rendered = serde_yml::to_string(&doc)
        .map_err(|e| QuickenError::Config(format!("cannot render evaluator config: {}", e)))?;
    let temp_path =
        std::env::temp_dir().join(format!("quicken-eval-{}.yaml", uuid::Uuid::new_v4()));
    std::fs::write(&temp_path, rendered).map_err(|source| QuickenError::Persistence {
        path: temp_path.clone(),
        source,
    })?;

    tracing::info!(config = %temp_path.display(), "Starting evaluator");

    let status = tokio::process::Command::new(&cfg.command)
        .args(&cfg.args)
        .arg("--eval_config")
        .arg(&temp_path)
        .envs(&cfg.env)
        .status()
        .await?;

    let _ = std::fs::remove_file(&temp_path);

    if !status.success() {
        return Err(QuickenError::Evaluator {
            command: cfg.command.clone(),
            status: status.to_string(),
        });
    }

    tracing::info!(report = %report_file.display(), "Evaluator finished");
    Ok(())
}
