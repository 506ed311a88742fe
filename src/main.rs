//! `converge` CLI entry point.

use anyhow::Result;
use clap::Parser;

use migrate_converge::cli::{handle_error, Cli, Commands};
use migrate_converge::domain::models::Config;
use migrate_converge::infrastructure::config::ConfigLoader;
use migrate_converge::infrastructure::logging::LoggerImpl;

fn load_config(cli: &Cli) -> Result<Config> {
    match cli.config {
        Some(ref path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    // Dropping the logger flushes buffered file output.
    let logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Run(args) => {
            migrate_converge::cli::commands::run::execute(args, config, cli.json).await
        }
        Commands::Simulate(args) => {
            migrate_converge::cli::commands::simulate::execute(args, config, cli.json).await
        }
        Commands::Classify(args) => {
            migrate_converge::cli::commands::classify::execute(args, config, cli.json).await
        }
        Commands::Config(args) => {
            migrate_converge::cli::commands::config::execute(args, config, cli.json).await
        }
    };

    if let Err(err) = result {
        drop(logger);
        handle_error(err, cli.json);
    }
}
