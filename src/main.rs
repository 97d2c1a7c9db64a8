use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use typed_floats::tf64::StrictlyPositiveFinite;

mod closures;
mod config;
mod conflation;
mod error;
mod flags;
mod permits;
mod projection;
mod sidewalks;
mod utils;

use config::Config;
use conflation::Ambiguity;

#[derive(Debug, Parser)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    sidewalks: Option<PathBuf>,
    #[arg(long, global = true)]
    output: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    Fetch,
    Conflate {
        #[arg(long)]
        refresh: bool,
        // metres
        #[arg(long)]
        max_line_length: Option<f64>,
        #[arg(long, value_enum)]
        ambiguity: Option<Ambiguity>,
    },
    Flag {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(x) = cli.sidewalks {
        config.sidewalks = x;
    }
    if let Some(x) = cli.output {
        config.output = x;
    }

    match cli.command {
        Command::Fetch => permits::main(&config.feeds),
        Command::Conflate {
            refresh,
            max_line_length,
            ambiguity,
        } => {
            if let Some(x) = max_line_length {
                config.max_line_length = StrictlyPositiveFinite::new(x)
                    .map_err(|_| anyhow!("--max-line-length must be positive, got {x}"))?;
            }
            if let Some(x) = ambiguity {
                config.ambiguity = x;
            }
            conflation::main(&config, refresh)
        }
        Command::Flag { date } => flags::main(&config, date),
    }
}
