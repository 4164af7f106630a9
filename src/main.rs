//! Loan Approval Analysis - command line entry point.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use loan_approval::{Pipeline, PipelineConfig};

#[derive(Parser)]
#[command(name = "loan_approval")]
#[command(about = "Clean the loan approval dataset and evaluate two classifiers")]
#[command(version)]
struct Cli {
    /// Path to the input CSV file
    #[arg(long)]
    data: Option<PathBuf>,

    /// Directory for charts and metrics.json
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// JSON config file; command line flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// RNG seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Skip chart rendering
    #[arg(long)]
    no_plots: bool,

    /// Open the rendered charts with the system viewer
    #[arg(long)]
    show: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Enable verbose (debug-level) logging
    #[arg(long, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output except errors
    #[arg(long)]
    quiet: bool,
}

impl Cli {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(data) = &self.data {
            config.data_path = data.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.no_plots {
            config.render_plots = false;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    let config = cli.pipeline_config().context("failed to load configuration")?;
    let summary = Pipeline::new(config)?.run()?;

    if cli.show {
        for path in &summary.chart_paths {
            if let Err(e) = open::that(path) {
                warn!(path = %path.display(), error = %e, "failed to open chart");
            }
        }
    }

    Ok(())
}
