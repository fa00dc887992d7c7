// src/refine/feedback.rs — Critique of the latest attempt

use std::path::Path;
use std::sync::Arc;

use super::prompt::{join_sections, PromptTemplate};
use super::{complete_truncated, CANDIDATE_QUESTION, CRITIQUE_QUESTION};
use crate::infra::config::ModelConfig;
use crate::infra::errors::QuickenError;
use crate::provider::ModelProvider;

/// Produces commentary on the latest attempt. The output steers the next
/// iteration and doubles as the session's stopping signal.
pub struct FeedbackGenerator {
    provider: Arc<dyn ModelProvider>,
    model: ModelConfig,
    template: PromptTemplate,
}

impl FeedbackGenerator {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        model: ModelConfig,
        prompts_dir: &Path,
    ) -> Result<Self, QuickenError> {
        let template = PromptTemplate::from_examples_file(&prompts_dir.join("feedback.txt"))?;
        Ok(Self::with_template(provider, model, template))
    }

    pub fn with_template(
        provider: Arc<dyn ModelProvider>,
        model: ModelConfig,
        template: PromptTemplate,
    ) -> Self {
        Self {
            provider,
            model,
            template,
        }
    }

    pub async fn run(&self, slow_code: &str, attempt: &str) -> Result<String, QuickenError> {
        let query = join_sections(&[slow_code, CANDIDATE_QUESTION, attempt, CRITIQUE_QUESTION]);
        let prompt = self.template.render(&query);
        complete_truncated(&*self.provider, &self.model, prompt).await
    }
}
