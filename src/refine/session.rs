// src/refine/session.rs — Refinement session state machine
//
// INIT → ITERATING → {CONVERGED, EXHAUSTED}. The "good enough" decision is
// delegated to model-generated critique text, so the stop check is a textual
// predicate; callers must treat EXHAUSTED as a normal outcome.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::feedback::FeedbackGenerator;
use super::init::TaskInit;
use super::iterate::TaskIterate;
use super::FeedbackMode;
use crate::infra::config::{ModelConfig, RefineConfig};
use crate::infra::errors::QuickenError;
use crate::provider::ModelProvider;

/// One loop iteration's record, append-only within a session.
///
/// `feedback` holds the candidate produced at this attempt;
/// `feedback_on_feedback` the critique it received; `prev_feedback` the
/// candidate it revised (absent at attempt 0).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptLog {
    pub attempt: u32,
    pub feedback: String,
    pub feedback_on_feedback: Option<String>,
    pub prev_feedback: Option<String>,
}

/// Terminal session states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// The critique contained the convergence marker.
    Converged,
    /// The attempt budget ran out first.
    Exhausted,
}

/// Decides, from the critique text, whether the session should stop.
/// Swappable so the marker-phrase check can be replaced by a stricter
/// classifier without touching the loop's control flow.
pub trait StopPredicate: Send + Sync {
    fn should_stop(&self, meta_feedback: &str) -> bool;
}

/// Case-insensitive substring match on a fixed marker phrase.
pub struct MarkerStop {
    marker: String,
}

impl MarkerStop {
    pub fn new(marker: &str) -> Self {
        Self {
            marker: marker.to_lowercase(),
        }
    }
}

impl StopPredicate for MarkerStop {
    fn should_stop(&self, meta_feedback: &str) -> bool {
        meta_feedback.to_lowercase().contains(&self.marker)
    }
}

#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// The most recent attempt's text.
    pub final_text: String,
    pub state: SessionState,
    pub log: Vec<AttemptLog>,
}

/// Bounded refine/critique loop over one slow program.
pub struct RefineSession {
    init: TaskInit,
    iterate: TaskIterate,
    feedback: FeedbackGenerator,
    stop: Box<dyn StopPredicate>,
    max_attempts: u32,
}

impl RefineSession {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        model: ModelConfig,
        refine: &RefineConfig,
        prompts_dir: &Path,
    ) -> Result<Self, QuickenError> {
        Ok(Self::from_parts(
            TaskInit::new(provider.clone(), model.clone(), prompts_dir)?,
            TaskIterate::new(provider.clone(), model.clone(), prompts_dir)?,
            FeedbackGenerator::new(provider, model, prompts_dir)?,
            refine,
        ))
    }

    pub fn from_parts(
        init: TaskInit,
        iterate: TaskIterate,
        feedback: FeedbackGenerator,
        refine: &RefineConfig,
    ) -> Self {
        Self {
            init,
            iterate,
            feedback,
            stop: Box::new(MarkerStop::new(&refine.convergence_marker)),
            max_attempts: refine.max_attempts,
        }
    }

    /// Swap the convergence check.
    pub fn with_stop_predicate(mut self, stop: impl StopPredicate + 'static) -> Self {
        self.stop = Box::new(stop);
        self
    }

    pub async fn run(
        &self,
        slow_code: &str,
        mode: FeedbackMode,
    ) -> Result<SessionOutcome, QuickenError> {
        match mode {
            FeedbackMode::SelfRefine => self.run_refine(slow_code).await,
            FeedbackMode::None => self.run_single(slow_code).await,
        }
    }

    /// Unsteered mode: one initial attempt, no critique calls. The single
    /// attempt exhausts the budget by definition.
    async fn run_single(&self, slow_code: &str) -> Result<SessionOutcome, QuickenError> {
        let candidate = self.init.run(slow_code).await?;
        let log = vec![AttemptLog {
            attempt: 0,
            feedback: candidate.clone(),
            feedback_on_feedback: None,
            prev_feedback: None,
        }];
        Ok(SessionOutcome {
            final_text: candidate,
            state: SessionState::Exhausted,
            log,
        })
    }

    async fn run_refine(&self, slow_code: &str) -> Result<SessionOutcome, QuickenError> {
        let mut log: Vec<AttemptLog> = Vec::new();
        let mut attempts: u32 = 0;
        let mut candidate = String::new();
        let mut critique = String::new();
        let mut converged = false;

        while attempts < self.max_attempts {
            let prev = (attempts > 0).then(|| candidate.clone());

            candidate = if attempts == 0 {
                self.init.run(slow_code).await?
            } else {
                self.iterate.run(slow_code, &candidate, &critique).await?
            };

            critique = self.feedback.run(slow_code, &candidate).await?;

            log.push(AttemptLog {
                attempt: attempts,
                feedback: candidate.clone(),
                feedback_on_feedback: Some(critique.clone()),
                prev_feedback: prev,
            });

            if self.stop.should_stop(&critique) {
                converged = true;
                break;
            }

            attempts += 1;
        }

        tracing::debug!(
            attempts = log.len(),
            converged,
            "Refinement session finished"
        );

        Ok(SessionOutcome {
            final_text: candidate,
            state: if converged {
                SessionState::Converged
            } else {
                SessionState::Exhausted
            },
            log,
        })
    }
}

/// Whole-session retry policy: re-runs the session from scratch on retriable
/// model-call failures, up to a fixed attempt count, then surfaces the error.
pub struct SessionRetry {
    max_retries: u32,
    backoff: Duration,
}

impl SessionRetry {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Duration::from_secs(1),
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub async fn run(
        &self,
        session: &RefineSession,
        slow_code: &str,
        mode: FeedbackMode,
    ) -> Result<SessionOutcome, QuickenError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match session.run(slow_code, mode).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => {
                    if !e.is_retriable() || attempt == self.max_retries {
                        return Err(e);
                    }

                    let delay = self.backoff * 2u32.saturating_pow(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Session failed, retrying: {}",
                        e
                    );

                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(QuickenError::Provider {
            provider: "session".into(),
            message: "All retries exhausted".into(),
            retriable: false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_stop_case_insensitive() {
        let stop = MarkerStop::new("Looks Good");
        assert!(stop.should_stop("the revised version LOOKS GOOD to me"));
        assert!(stop.should_stop("looks good"));
        assert!(!stop.should_stop("needs more work"));
    }

    #[test]
    fn test_marker_stop_substring_match() {
        let stop = MarkerStop::new("looks good");
        assert!(stop.should_stop("overall this looks good, ship it"));
        assert!(!stop.should_stop("looks god"));
    }

    #[test]
    fn test_attempt_log_serialization_shape() {
        let entry = AttemptLog {
            attempt: 0,
            feedback: "use a formula".into(),
            feedback_on_feedback: None,
            prev_feedback: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["attempt"], 0);
        assert_eq!(json["feedback"], "use a formula");
        assert!(json["feedback_on_feedback"].is_null());
        assert!(json["prev_feedback"].is_null());
    }
}
