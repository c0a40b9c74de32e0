//! CLI command definitions and dispatch.

pub mod config;
pub mod folder;
pub mod migrate;
pub mod source;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use kbhub_api::AppState;
use kbhub_cache::CacheManager;
use kbhub_core::config::AppConfig;
use kbhub_core::error::AppError;
use kbhub_core::types::FolderId;
use kbhub_database::Stores;

use crate::output::OutputFormat;

/// KBHub: knowledge-base folder administration
#[derive(Debug, Parser)]
#[command(name = "kbhub", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Folder management
    Folder(folder::FolderArgs),
    /// Source placement
    Source(source::SourceArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &self.config, self.format).await,
            Commands::Folder(args) => folder::execute(args, &self.config, self.format).await,
            Commands::Source(args) => source::execute(args, &self.config, self.format).await,
            Commands::Config(args) => config::execute(args, &self.config, self.format).await,
        }
    }
}

/// Helper: load configuration, overlaying `config/{KBHUB_ENV}.toml`.
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    let env = std::env::var("KBHUB_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(config_path, &env)
}

/// Helper: connect the configured stores and cache and build the services.
pub async fn connect(config_path: &str) -> Result<AppState, AppError> {
    let config = load_config(config_path)?;
    tracing::debug!(
        config = config_path,
        backend = config.database.backend.as_str(),
        "Connecting stores"
    );
    let stores = Stores::connect(&config.database).await?;
    let cache = Arc::new(CacheManager::new(&config.cache).await?);
    Ok(kbhub_api::build_state(config, stores, cache))
}

/// Helper: parse a folder ID argument.
pub fn parse_folder_id(raw: &str) -> Result<FolderId, AppError> {
    raw.parse()
        .map_err(|_| AppError::validation(format!("Invalid folder ID: {raw}")))
}
