// src/refine/iterate.rs — Refined attempt from prior attempt + critique

use std::path::Path;
use std::sync::Arc;

use super::prompt::{join_sections, PromptTemplate};
use super::{complete_truncated, CANDIDATE_QUESTION, CRITIQUE_QUESTION, REVISE_QUESTION};
use crate::infra::config::ModelConfig;
use crate::infra::errors::QuickenError;
use crate::provider::ModelProvider;

/// Produces a revised suggestion given the previous attempt and the critique
/// it received. Invoked for every attempt after the first.
pub struct TaskIterate {
    provider: Arc<dyn ModelProvider>,
    model: ModelConfig,
    template: PromptTemplate,
}

impl TaskIterate {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        model: ModelConfig,
        prompts_dir: &Path,
    ) -> Result<Self, QuickenError> {
        let template = PromptTemplate::from_examples_file(&prompts_dir.join("iterate.txt"))?;
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

    pub async fn run(
        &self,
        slow_code: &str,
        feedback: &str,
        feedback_on_feedback: &str,
    ) -> Result<String, QuickenError> {
        let query = join_sections(&[
            slow_code,
            CANDIDATE_QUESTION,
            feedback,
            CRITIQUE_QUESTION,
            feedback_on_feedback,
            REVISE_QUESTION,
        ]);
        let prompt = self.template.render(&query);
        complete_truncated(&*self.provider, &self.model, prompt).await
    }
}
