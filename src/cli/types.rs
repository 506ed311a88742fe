//! CLI type definitions
//!
//! Top-level clap structures. Per-command arguments live beside each command.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::classify::ClassifyArgs;
use super::commands::config::ConfigArgs;
use super::commands::run::RunArgs;
use super::commands::simulate::SimulateArgs;

#[derive(Parser, Debug)]
#[command(name = "converge")]
#[command(about = "Drive a migration target until no pending items remain", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from this YAML file instead of .converge/
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Converge the configured HTTP target
    Run(RunArgs),

    /// Converge an in-process scripted target
    Simulate(SimulateArgs),

    /// Show which outcome kind a signal maps to
    Classify(ClassifyArgs),

    /// Configuration commands
    Config(ConfigArgs),
}
