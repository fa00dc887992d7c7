// src/main.rs — quicken entry point

use clap::Parser;

use quicken::cli::{Cli, Commands};
use quicken::eval;
use quicken::infra::config::Config;
use quicken::infra::logger;
use quicken::refine::FeedbackMode;

#[tokio::main]
async fn main() {
    // Respects RUST_LOG
    logger::init_logging("info");

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = if let Some(ref path) = cli.config {
        Config::load_from(path)?
    } else {
        Config::load()?
    };

    if let Some(engine) = cli.engine {
        config.model.engine = engine;
    }

    match cli.command {
        Commands::Run {
            dataset,
            outfile,
            feedback,
            max_attempts,
            temperature,
            checkpoint,
        } => {
            let mode: FeedbackMode = feedback.parse()?;
            if let Some(n) = max_attempts {
                config.refine.max_attempts = n;
            }
            if let Some(t) = temperature {
                config.model.temperature = t;
            }
            quicken::cli::run::run_batch(&config, &dataset, &outfile, mode, checkpoint.as_deref())
                .await?;
            Ok(())
        }
        Commands::Prep { run_output, outfile } => {
            let n = eval::flatten_attempts(&run_output, &outfile)?;
            eprintln!("flattened {} attempt(s) to {}", n, outfile.display());
            Ok(())
        }
        Commands::Eval { attempts, report } => {
            eval::run_evaluator(&config.eval, &attempts, &report).await?;
            Ok(())
        }
        Commands::Summarize { report, out } => {
            let records = eval::report::load_report(&report)?;
            let summary = eval::report::summarize(&records)?;
            if let Some(path) = out {
                eval::report::write_summary(&path, &summary)?;
            }
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Commands::Pipeline {
            dataset,
            results_dir,
            feedback,
            max_attempts,
        } => {
            if let Some(n) = max_attempts {
                config.refine.max_attempts = n;
            }
            let modes = feedback
                .iter()
                .map(|s| s.parse::<FeedbackMode>())
                .collect::<Result<Vec<_>, _>>()?;
            quicken::cli::pipeline::run_pipeline(&config, &dataset, &results_dir, &modes).await
        }
    }
}
