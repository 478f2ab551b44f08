//! Tribunal CLI entry point.

use clap::Parser;

use tribunal::cli::{commands, handle_error, load_config, Cli, Commands};
use tribunal::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    let _logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Evaluate(args) => commands::evaluate::execute(args, config, cli.json).await,
        Commands::CheckConfig(args) => commands::check_config::execute(args, config, cli.json).await,
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
