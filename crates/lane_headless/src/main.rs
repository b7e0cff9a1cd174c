//! Headless lane battle runner.
//!
//! # Usage
//!
//! ```bash
//! # Single match, metrics as JSON on stdout
//! cargo run -p lane_headless -- run --seed 42
//!
//! # Batch balance run
//! cargo run -p lane_headless -- batch --count 1000 --output results/batch.json
//!
//! # Determinism check
//! cargo run -p lane_headless -- verify --seed 42 --runs 4
//! ```
//!
//! Logs go to stderr; filter them with `RUST_LOG` (e.g. `RUST_LOG=lane_core=debug`).

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lane_core::data::StrategyKind;
use lane_headless::{
    batch::{run_batch, BatchConfig},
    config_loader::{catalog_or_default, config_or_default, write_json, Result},
    runner::{replay_hashes, run_match, RunLimits},
};

#[derive(Parser)]
#[command(name = "lane_headless")]
#[command(about = "Headless lane battle runner for AI-vs-AI balance testing")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Game config file (RON); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Unit catalog file (RON); the built-in roster applies when omitted
    #[arg(long, global = true)]
    units: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Limits shared by every subcommand.
#[derive(Args, Clone, Copy)]
struct LimitArgs {
    /// Stop after this many rounds
    #[arg(long, default_value = "50")]
    max_rounds: u32,

    /// Stop after this many game minutes
    #[arg(long, default_value = "60")]
    max_minutes: u64,

    /// Frame delta in milliseconds
    #[arg(long, default_value = "16")]
    frame_ms: u64,

    /// Game speed multiplier
    #[arg(long, default_value = "1")]
    speed: u32,
}

impl From<LimitArgs> for RunLimits {
    fn from(args: LimitArgs) -> Self {
        RunLimits {
            max_rounds: args.max_rounds,
            max_game_ms: args.max_minutes * 60 * 1000,
            frame_ms: args.frame_ms,
            speed: args.speed,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single AI-vs-AI match
    Run {
        /// Random seed (overrides the config file)
        #[arg(long)]
        seed: Option<u64>,

        /// Player-side strategy
        #[arg(long, default_value = "balanced")]
        player: StrategyKind,

        /// AI-side strategy
        #[arg(long, default_value = "balanced")]
        ai: StrategyKind,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        limits: LimitArgs,
    },

    /// Run a batch of matches for balance testing
    Batch {
        /// Number of matches
        #[arg(short = 'n', long, default_value = "100")]
        count: u32,

        /// Seed of the first match
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Maximum parallel matches (0 = one per core)
        #[arg(short, long, default_value = "0")]
        parallel: usize,

        /// Player-side strategy
        #[arg(long, default_value = "balanced")]
        player: StrategyKind,

        /// AI-side strategy
        #[arg(long, default_value = "balanced")]
        ai: StrategyKind,

        /// Results file
        #[arg(short, long, default_value = "results/batch_results.json")]
        output: PathBuf,

        #[command(flatten)]
        limits: LimitArgs,
    },

    /// Verify determinism by replaying one seed
    Verify {
        /// Seed to replay
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Number of runs to compare
        #[arg(long, default_value = "3")]
        runs: usize,

        /// Player-side strategy
        #[arg(long, default_value = "random")]
        player: StrategyKind,

        /// AI-side strategy
        #[arg(long, default_value = "scripted")]
        ai: StrategyKind,

        #[command(flatten)]
        limits: LimitArgs,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries reports.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match execute(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("FATAL: {e}");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli) -> Result<ExitCode> {
    let base = config_or_default(cli.config.as_deref())?;
    let catalog = catalog_or_default(cli.units.as_deref())?;

    match cli.command {
        Commands::Run {
            seed,
            player,
            ai,
            output,
            limits,
        } => {
            let seed = seed.unwrap_or(base.seed);
            let config = base.with_seed(seed).ai_vs_ai(player, ai);
            let metrics = run_match(config, catalog, &limits.into());
            emit(output.as_deref(), &metrics)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Batch {
            count,
            seed,
            parallel,
            player,
            ai,
            output,
            limits,
        } => {
            let config = BatchConfig {
                parallel,
                ..BatchConfig::new(count, player, ai)
                    .with_seed(seed)
                    .with_limits(limits.into())
            };
            let results = run_batch(config, &base, &catalog)?;
            results.save(&output)?;

            let summary = &results.summary;
            eprintln!("\n{}", "=".repeat(50));
            eprintln!("BATCH COMPLETE");
            eprintln!("{}", "=".repeat(50));
            eprintln!("Matches played: {}", summary.matches);
            eprintln!(
                "Player wins: {}  AI wins: {}  Draws: {}  Unfinished: {}",
                summary.player_wins, summary.ai_wins, summary.draws, summary.unfinished
            );
            eprintln!("Player win rate: {:.1}%", summary.player_win_rate * 100.0);
            eprintln!("Average rounds: {:.1}", summary.avg_rounds);
            eprintln!("Results saved to: {}", output.display());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Verify {
            seed,
            runs,
            player,
            ai,
            limits,
        } => {
            tracing::info!(seed, runs, "Verifying determinism");
            let config = base.with_seed(seed).ai_vs_ai(player, ai);
            let hashes = replay_hashes(&config, &catalog, &limits.into(), runs.max(2));
            if hashes.windows(2).all(|w| w[0] == w[1]) {
                eprintln!("PASS: All {} runs produced identical results", hashes.len());
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!("FAIL: Non-determinism detected!");
                for (i, hash) in hashes.iter().enumerate() {
                    eprintln!("  run {i}: {hash:016x}");
                }
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

fn emit<T: serde::Serialize>(output: Option<&Path>, value: &T) -> Result<()> {
    match output {
        Some(path) => write_json(path, value),
        None => {
            println!("{}", serde_json::to_string_pretty(value)?);
            Ok(())
        }
    }
}
