//! Headless match runner for AI-vs-AI balance testing.
//!
//! Runs [`lane_core`] matches without graphics or input, with both sides
//! driven by the built-in purchasing AI:
//!
//! - **Single matches**: play one seeded match and report its metrics
//! - **Batch runs**: play many seeds in parallel and summarize win rates
//! - **Determinism checks**: replay a seed and compare final state hashes
//!
//! Reports are written as JSON on stdout or to a file; logs go to stderr.
//!
//! # Example
//!
//! ```bash
//! # One match with a custom config
//! cargo run -p lane_headless -- run --config match.ron --seed 7
//!
//! # 500 matches, Aggressive vs Scripted
//! cargo run -p lane_headless -- batch --count 500 --player aggressive --ai scripted
//!
//! # Replay seed 3 five times
//! cargo run -p lane_headless -- verify --seed 3 --runs 5
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod batch;
pub mod config_loader;
pub mod metrics;
pub mod runner;

pub use batch::{run_batch, BatchConfig, BatchResults};
pub use config_loader::{load_catalog, load_config, HeadlessError};
pub use metrics::{BatchSummary, EndReason, MatchMetrics, MetricsCollector, SideMetrics};
pub use runner::{run_match, RunLimits};
