// src/cli/mod.rs — CLI definition (clap derive)

pub mod pipeline;
pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "quicken",
    about = "Benchmark LLM-driven iterative code speedups",
    version
)]
pub struct Cli {
    /// Config file path (defaults to ./quicken.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Engine identifier override (e.g. gpt-4.1-mini)
    #[arg(short, long)]
    pub engine: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Refine a dataset of slow programs, writing one result per record
    Run {
        /// Line-delimited JSON dataset of slow programs
        #[arg(long)]
        dataset: PathBuf,
        /// Output stem; the run suffix and .jsonl extension are appended
        #[arg(long)]
        outfile: PathBuf,
        /// Feedback mode: self-refine or none
        #[arg(long, default_value = "self-refine")]
        feedback: String,
        /// Attempt budget per record
        #[arg(long)]
        max_attempts: Option<u32>,
        /// Sampling temperature
        #[arg(long)]
        temperature: Option<f32>,
        /// Prior output to resume from
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },
    /// Flatten a run output's final attempts for the external evaluator
    Prep {
        /// Run output (line-delimited JSON with run_logs)
        #[arg(long)]
        run_output: PathBuf,
        /// Flattened attempts file to write
        #[arg(long)]
        outfile: PathBuf,
    },
    /// Run the external evaluator on a flattened attempts file
    Eval {
        /// Flattened attempts file
        #[arg(long)]
        attempts: PathBuf,
        /// Report file the evaluator should produce
        #[arg(long)]
        report: PathBuf,
    },
    /// Summarize a performance report
    Summarize {
        /// Evaluator report (line-delimited JSON)
        #[arg(long)]
        report: PathBuf,
        /// Write the summary JSON here instead of stdout only
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Full sweep: run, prep, eval, summarize per feedback mode
    Pipeline {
        /// Line-delimited JSON dataset of slow programs
        #[arg(long)]
        dataset: PathBuf,
        /// Root directory for result trees
        #[arg(long, default_value = "run_results")]
        results_dir: PathBuf,
        /// Feedback modes to sweep
        #[arg(long, value_delimiter = ',', default_values_t = ["self-refine".to_string(), "none".to_string()])]
        feedback: Vec<String>,
        /// Attempt budget per record
        #[arg(long)]
        max_attempts: Option<u32>,
    },
}
