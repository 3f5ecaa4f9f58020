//! DSA CLI - Command Line Operations for Stochastic Debt Sustainability Analysis
//!
//! # Commands
//!
//! - `dsa simulate` - Simulate debt paths and report risk probabilities
//! - `dsa calibrate` - Calibrate the primary balance against risk criteria
//! - `dsa fanchart` - Write percentile bands of a simulated variable
//! - `dsa deficit` - Probability of an excessive deficit per adjustment year
//!
//! Every command reads a TOML run configuration (`--config`). The seed and
//! path count can be overridden through `DSA_SEED` / `DSA_PATHS` or the
//! matching flags; flags win.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod data;
mod error;
mod projector;

pub use error::{CliError, Result};

use config::{build_config, CliArgs};

/// Stochastic debt sustainability analysis CLI
#[derive(Parser)]
#[command(name = "dsa")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "dsa.toml")]
    config: PathBuf,

    /// Random seed override
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Number of simulated paths override
    #[arg(short = 'n', long, global = true)]
    paths: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate debt paths and report risk probabilities
    Simulate {
        /// Output file (JSON); stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Calibrate the end-of-adjustment primary balance
    Calibrate {
        /// Output file (JSON); stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write every objective evaluation to this CSV file
        #[arg(long)]
        trace: Option<PathBuf>,

        /// Also evaluate the objective on this many evenly spaced points
        #[arg(long)]
        profile: Option<usize>,
    },

    /// Write fan-chart percentiles of a simulated variable
    Fanchart {
        /// Variable to chart (debt, growth, primary_balance, ...)
        #[arg(short = 'V', long, default_value = "debt")]
        variable: String,

        /// Adjust the baseline to this primary balance first
        #[arg(long, allow_hyphen_values = true)]
        policy: Option<f64>,

        /// Output file (CSV); stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Probability of an excessive deficit in each adjustment year
    Deficit {
        /// Output file (JSON); stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = build_config(&CliArgs {
        config_file: cli.config.clone(),
        seed: cli.seed,
        n_paths: cli.paths,
        verbose: cli.verbose,
    })?;

    // Initialise tracing; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_filter_str()));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    if cli.verbose {
        info!("Verbose mode enabled");
    }
    debug!(config = %cli.config.display(), seed = ?config.seed, "Loaded configuration");

    match cli.command {
        Commands::Simulate { output } => commands::simulate::run(&config, output.as_deref())?,
        Commands::Calibrate {
            output,
            trace,
            profile,
        } => commands::calibrate::run(&config, output.as_deref(), trace.as_deref(), profile)?,
        Commands::Fanchart {
            variable,
            policy,
            output,
        } => commands::fanchart::run(&config, &variable, policy, output.as_deref())?,
        Commands::Deficit { output } => commands::deficit::run(&config, output.as_deref())?,
    }
    Ok(())
}
