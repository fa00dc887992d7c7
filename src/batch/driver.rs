// src/batch/driver.rs — Checkpointed batch over a slow-program dataset

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::{load_dataset, load_run_records, write_run_records, RunRecord};
use crate::infra::errors::QuickenError;
use crate::refine::session::{RefineSession, SessionRetry};
use crate::refine::FeedbackMode;

/// Drives one refinement session per dataset record, strictly in dataset
/// order. One failing record never aborts the batch; it is logged and
/// skipped, and a re-run with the partial output as checkpoint picks it up.
pub struct BatchDriver {
    session: RefineSession,
    retry: SessionRetry,
    mode: FeedbackMode,
    checkpoint_every: usize,
}

impl BatchDriver {
    pub fn new(
        session: RefineSession,
        retry: SessionRetry,
        mode: FeedbackMode,
        checkpoint_every: usize,
    ) -> Self {
        Self {
            session,
            retry,
            mode,
            checkpoint_every: checkpoint_every.max(1),
        }
    }

    /// Process every record of `dataset_path` not already present in the
    /// checkpoint, then write the accumulated results to `outfile`.
    ///
    /// The final output is a superset (by id) of the checkpoint, each id
    /// appearing exactly once. Returns the written records.
    pub async fn run(
        &self,
        dataset_path: &Path,
        outfile: &Path,
        checkpoint: Option<&Path>,
    ) -> Result<Vec<RunRecord>, QuickenError> {
        let dataset = load_dataset(dataset_path)?;

        let (mut results, mut processed) = match checkpoint {
            Some(path) => {
                let records = load_run_records(path)?;
                let ids: HashSet<String> = records
                    .iter()
                    .filter_map(|r| r.record.key())
                    .map(String::from)
                    .collect();
                tracing::info!(
                    checkpoint = %path.display(),
                    resumed = records.len(),
                    "Resuming from checkpoint"
                );
                (records, ids)
            }
            None => (Vec::new(), HashSet::new()),
        };

        let total = dataset.len();
        let mut processed_count = 0usize;

        for (index, record) in dataset.into_iter().enumerate() {
            let Some(key) = record.key().map(String::from) else {
                tracing::error!(index, "Record has no id, skipping");
                continue;
            };
            if processed.contains(&key) {
                continue;
            }

            tracing::info!(index, total, id = %key, "Processing record");

            match self.retry.run(&self.session, &record.input, self.mode).await {
                Ok(outcome) => {
                    tracing::debug!(
                        id = %key,
                        attempts = outcome.log.len(),
                        state = ?outcome.state,
                        "Record finished"
                    );
                    results.push(RunRecord {
                        record,
                        run_logs: outcome.log,
                    });
                    processed.insert(key);
                    processed_count += 1;

                    if processed_count % self.checkpoint_every == 0 {
                        let path = checkpoint_path(outfile, index);
                        write_run_records(&path, &results)?;
                        tracing::info!(
                            checkpoint = %path.display(),
                            records = results.len(),
                            "Flushed checkpoint"
                        );
                    }
                }
                Err(e) => {
                    tracing::error!(index, id = %key, "Error processing record: {}", e);
                }
            }
        }

        write_run_records(outfile, &results)?;
        tracing::info!(
            outfile = %outfile.display(),
            records = results.len(),
            "Batch complete"
        );

        Ok(results)
    }
}

/// Auxiliary recovery file tagged with the dataset index of the most recent
/// record.
fn checkpoint_path(outfile: &Path, index: usize) -> PathBuf {
    PathBuf::from(format!("{}.{}.jsonl", outfile.display(), index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_path_tagging() {
        let p = checkpoint_path(Path::new("out/run.jsonl"), 39);
        assert_eq!(p, PathBuf::from("out/run.jsonl.39.jsonl"));
    }
}
