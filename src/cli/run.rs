// src/cli/run.rs — Run a refinement batch

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::batch::driver::BatchDriver;
use crate::batch::{output_path, versioned};
use crate::infra::config::Config;
use crate::provider::openai::OpenAIProvider;
use crate::provider::retry::RetryProvider;
use crate::provider::ModelProvider;
use crate::refine::session::{RefineSession, SessionRetry};
use crate::refine::FeedbackMode;

/// Assemble the provider stack from config + environment.
pub fn build_provider(config: &Config) -> anyhow::Result<Arc<dyn ModelProvider>> {
    let openai = OpenAIProvider::from_env(config.model.base_url.as_deref())?;
    Ok(Arc::new(RetryProvider::new(Arc::new(openai))))
}

/// Execute one batch and return the path the results were written to.
pub async fn run_batch(
    config: &Config,
    dataset: &Path,
    outfile_stem: &Path,
    mode: FeedbackMode,
    checkpoint: Option<&Path>,
) -> anyhow::Result<PathBuf> {
    let provider = build_provider(config)?;

    let session = RefineSession::new(
        provider,
        config.model.clone(),
        &config.refine,
        Path::new(&config.prompts.dir),
    )?;
    let retry = SessionRetry::new(config.refine.session_retries);
    let driver = BatchDriver::new(session, retry, mode, config.batch.checkpoint_every);

    let outfile = versioned(output_path(
        outfile_stem,
        &mode.to_string(),
        config.model.temperature,
        &config.model.engine,
    ));

    let results = driver.run(dataset, &outfile, checkpoint).await?;

    eprintln!(
        "wrote {} record(s) to {}",
        results.len(),
        outfile.display()
    );

    Ok(outfile)
}
