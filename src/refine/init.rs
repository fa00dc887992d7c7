// src/refine/init.rs — First attempt (attempt 0)

use std::path::Path;
use std::sync::Arc;

use super::prompt::{join_sections, PromptTemplate};
use super::{complete_truncated, CANDIDATE_QUESTION};
use crate::infra::config::ModelConfig;
use crate::infra::errors::QuickenError;
use crate::provider::ModelProvider;

/// Produces the initial speedup suggestion for a slow program.
/// Invoked exactly once per refinement session.
pub struct TaskInit {
    provider: Arc<dyn ModelProvider>,
    model: ModelConfig,
    template: PromptTemplate,
}

impl TaskInit {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        model: ModelConfig,
        prompts_dir: &Path,
    ) -> Result<Self, QuickenError> {
        let template = PromptTemplate::from_examples_file(&prompts_dir.join("init.txt"))?;
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

    pub async fn run(&self, slow_code: &str) -> Result<String, QuickenError> {
        let query = join_sections(&[slow_code, CANDIDATE_QUESTION]);
        let prompt = self.template.render(&query);
        complete_truncated(&*self.provider, &self.model, prompt).await
    }
}
