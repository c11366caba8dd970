//! CLI parse: clap types for prefuel. No behavior; definitions only.

use crate::pipeline::{PipelineMode, Preset};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Prefuel CLI - what to eat (and skip) before an activity
#[derive(Parser, Debug)]
#[command(name = "prefuel")]
#[command(about = "Pre-activity food recommendations assembled from staged LLM generations")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root; `config/` under it is searched for config files
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (replaces global and workspace config files)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, short = 'q', conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stderr, stdout, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (when output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Recommend foods to eat and avoid before an activity
    Recommend(RecommendArgs),
    /// List suggested activities
    Activities,
    /// Show the resolved configuration
    Config,
}

#[derive(Args, Debug, Clone)]
pub struct RecommendArgs {
    /// Activity name, e.g. "running"
    #[arg(long)]
    pub activity: String,

    /// Hours until the activity starts
    #[arg(long, allow_hyphen_values = true)]
    pub hours: f64,

    /// Named plan (one-shot, one-shot-explained, chained, chained-shared)
    #[arg(long)]
    pub preset: Option<Preset>,

    /// Pipeline mode (one-shot, chained); picks that mode's default plan
    #[arg(long, conflicts_with = "preset")]
    pub mode: Option<PipelineMode>,

    /// Sampling temperature in [0, 2]
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Generate candidate pools concurrently (chained plans)
    #[arg(long)]
    pub parallel: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
