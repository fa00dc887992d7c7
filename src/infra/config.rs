// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::infra::errors::QuickenError;

/// Default config file looked up next to the data, not in a home directory:
/// runs are repo-local research artifacts.
const CONFIG_FILE: &str = "quicken.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub refine: RefineConfig,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub prompts: PromptsConfig,

    #[serde(default)]
    pub eval: EvalConfig,
}

/// Generation parameters for the model backend. Passed by value into the
/// session and driver constructors; there is no module-level engine state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub engine: String,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stop_token: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            engine: "gpt-4.1-mini".into(),
            base_url: None,
            max_tokens: 300,
            temperature: 0.0,
            stop_token: "### END".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineConfig {
    pub max_attempts: u32,
    /// Phrase whose presence in meta-feedback ends the session.
    pub convergence_marker: String,
    /// Whole-session retries on retriable model-call failures.
    pub session_retries: u32,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            convergence_marker: "looks good".into(),
            session_retries: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Flush a recovery checkpoint every N processed records.
    pub checkpoint_every: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            checkpoint_every: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptsConfig {
    /// Directory holding the few-shot example files (init.txt, iterate.txt,
    /// feedback.txt).
    pub dir: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            dir: "prompts".into(),
        }
    }
}

/// External performance evaluator invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Command to spawn.
    pub command: String,
    /// Arguments placed before `--eval_config <path>`.
    #[serde(default)]
    pub args: Vec<String>,
    /// Base YAML run-config; the harness rewrites the input/output paths into
    /// a temp copy per invocation.
    pub config_path: String,
    /// Extra environment for the subprocess.
    #[serde(default)]
    pub env: std::collections::HashMap<String, String>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            command: "run-eval".into(),
            args: vec![],
            config_path: "perf_run_config.yaml".into(),
            env: std::collections::HashMap::new(),
        }
    }
}

impl Config {
    /// Load from the default location, falling back to defaults when no
    /// config file exists.
    pub fn load() -> Result<Self, QuickenError> {
        let path = Path::new(CONFIG_FILE);
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, QuickenError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            QuickenError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        toml::from_str(&raw)
            .map_err(|e| QuickenError::Config(format!("invalid {}: {}", path.display(), e)))
    }
}
