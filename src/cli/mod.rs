//! Command-line interface
//!
//! A thin replay surface over the governance engine: configuration is loaded
//! once in `main`, then handed to the selected command.

pub mod commands;
pub mod output;
pub mod types;

use anyhow::Result;
use std::path::Path;

pub use types::{Cli, Commands};

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

/// Load configuration from an explicit file or the default hierarchy.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Print a command failure and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err:#}", console::style("Error:").red().bold());
    }
    std::process::exit(1);
}
