// src/refine/mod.rs — The refine/feedback loop

pub mod feedback;
pub mod init;
pub mod iterate;
pub mod prompt;
pub mod session;

use std::str::FromStr;

use crate::infra::config::ModelConfig;
use crate::infra::errors::QuickenError;
use crate::provider::{truncate_at_stop, CompletionRequest, ModelProvider};

/// Instruction that asks for a speedup suggestion for the program above it.
pub(crate) const CANDIDATE_QUESTION: &str =
    "# Why is the program above slow, and how should it be rewritten to run faster?";

/// Instruction that asks for a critique of the suggestion above it.
pub(crate) const CRITIQUE_QUESTION: &str =
    "# Is the suggestion above correct, and is it enough to make the program faster?";

/// Instruction that asks for a revision given the critique above it.
pub(crate) const REVISE_QUESTION: &str =
    "# Rewrite the suggestion, taking the critique above into account.";

/// How attempts are steered between iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackMode {
    /// Full loop: attempt, critique, revise until convergence or budget.
    SelfRefine,
    /// Single initial attempt, no feedback calls.
    None,
}

impl FromStr for FeedbackMode {
    type Err = QuickenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "self-refine" | "self-refine-feedback" => Ok(FeedbackMode::SelfRefine),
            "none" => Ok(FeedbackMode::None),
            other => Err(QuickenError::Config(format!(
                "unknown feedback mode '{}' (expected 'self-refine' or 'none')",
                other
            ))),
        }
    }
}

impl std::fmt::Display for FeedbackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedbackMode::SelfRefine => write!(f, "self-refine"),
            FeedbackMode::None => write!(f, "none"),
        }
    }
}

/// One render/call/truncate exchange, shared by all three tasks.
pub(crate) async fn complete_truncated(
    provider: &dyn ModelProvider,
    model: &ModelConfig,
    prompt: String,
) -> Result<String, QuickenError> {
    let response = provider
        .complete(CompletionRequest {
            model: model.engine.clone(),
            prompt,
            max_tokens: model.max_tokens,
            temperature: model.temperature,
            stop: Some(model.stop_token.clone()),
        })
        .await?;

    let text = response.first().ok_or_else(|| QuickenError::EmptyCompletion {
        provider: provider.id().to_string(),
    })?;

    Ok(truncate_at_stop(text, &model.stop_token).to_string())
}
