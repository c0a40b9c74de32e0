//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use kbhub_core::error::AppError;
use kbhub_database::connection::mask_password;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Validate the configuration file
    Validate,
    /// Write the default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config/generated.toml")]
        output: String,
    },
}

/// Execute config commands
pub async fn execute(
    args: &ConfigArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let mut config = super::load_config(config_path)?;
            config.database.url = mask_password(&config.database.url);
            output::print_item(&config, format);
        }
        ConfigCommand::Validate => {
            let config = match super::load_config(config_path) {
                Ok(config) => config,
                Err(e) => {
                    output::print_error(&format!("Configuration invalid: {e}"));
                    return Err(e);
                }
            };
            if config.folders.max_depth == 0 {
                return Err(AppError::configuration("folders.max_depth must be positive"));
            }
            output::print_success(&format!("Configuration '{config_path}' is valid"));
            output::print_kv("Server", &config.server.bind_addr());
            output::print_kv("Store backend", config.database.backend.as_str());
            output::print_kv("Database", &mask_password(&config.database.url));
            output::print_kv("Cache", config.cache.provider.as_str());
            output::print_kv("Max folder depth", &config.folders.max_depth.to_string());
        }
        ConfigCommand::Generate { output: out_path } => {
            let default_config = include_str!("../../../../config/default.toml");

            if let Some(parent) = std::path::Path::new(out_path).parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(out_path, default_config).await?;

            output::print_success(&format!("Default config written to '{out_path}'"));
        }
    }

    Ok(())
}
