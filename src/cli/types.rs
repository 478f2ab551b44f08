//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::check_config::CheckConfigArgs;
use super::commands::evaluate::EvaluateArgs;

#[derive(Parser, Debug)]
#[command(name = "tribunal")]
#[command(about = "Tribunal - governed decisions over critic panels", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .tribunal/config.yaml and .tribunal/local.yaml)
    #[arg(short, long, global = true, env = "TRIBUNAL_CONFIG_FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a critic panel against a case and print the decision
    Evaluate(EvaluateArgs),

    /// Validate configuration and list the effective policy rules
    CheckConfig(CheckConfigArgs),
}
