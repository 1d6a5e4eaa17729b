//! Topolayout CLI - run incremental force-directed layouts over network
//! topology documents.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

mod commands;
mod config;
mod topology;

use commands::{config as config_cmd, run::OutputFormat};
use config::Config;

/// Topolayout CLI - lay out physical and logical network graphs.
///
/// Each frame requests one budgeted layout pass on a background thread and
/// applies its result before the next frame, as an interactive view would.
#[derive(Parser, Debug)]
#[command(
    name = "tl",
    author,
    version,
    about = "Topolayout: incremental force-directed layout for network topologies",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Lay out a topology document and print the final positions.
    Run {
        /// Path to the topology document (JSON).
        topology: PathBuf,

        /// Number of frames to run (defaults to the configured value).
        #[arg(short = 'n', long)]
        frames: Option<usize>,

        /// Write the result to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: json or table.
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Seed initial velocities for a reproducible run.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Manage layout configuration.
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Configuration commands.
#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the effective configuration.
    Show {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Write the default configuration to the config file.
    Init {
        /// Overwrite an existing config file.
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            topology,
            frames,
            output,
            format,
            seed,
        } => {
            let format: OutputFormat = format.parse()?;
            let config = Config::load()?;
            let frames = frames.unwrap_or(config.frames);
            let config = config.with_seed(seed);
            commands::run::execute(&config, &topology, frames, output, format)?;
        }
        Commands::Config(ConfigCommands::Show { json }) => {
            let config = Config::load()?;
            config_cmd::show(&config, json)?;
        }
        Commands::Config(ConfigCommands::Init { force }) => {
            // Does not load the existing file, so a broken one can be replaced.
            config_cmd::init(force)?;
        }
    }

    Ok(())
}
