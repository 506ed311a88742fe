//! `converge config`: inspect the effective configuration.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration (secrets omitted)
    Show,
    /// Check that the configuration is usable for `converge run`
    Validate,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct ConfigShowOutput {
    pub config: Config,
}

impl CommandOutput for ConfigShowOutput {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config)
            .unwrap_or_else(|err| format!("<unable to render configuration: {err}>"))
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigValidateOutput {
    pub valid: bool,
    pub base_url: String,
}

impl CommandOutput for ConfigValidateOutput {
    fn to_human(&self) -> String {
        format!(
            "{} configuration is valid (target {})",
            console::style("\u{2713}").green().bold(),
            self.base_url
        )
    }
}

#[allow(clippy::unused_async)]
pub async fn execute(args: ConfigArgs, config: Config, json_mode: bool) -> Result<()> {
    match args.command {
        ConfigCommands::Show => output(&ConfigShowOutput { config }, json_mode),
        ConfigCommands::Validate => {
            ConfigLoader::validate(&config)?;
            ConfigLoader::validate_target(&config).context("Configuration is not runnable")?;
            output(
                &ConfigValidateOutput {
                    valid: true,
                    base_url: config.target.base_url,
                },
                json_mode,
            );
        }
    }
    Ok(())
}
