//! Database migration management commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use kbhub_core::config::StoreBackend;
use kbhub_core::error::AppError;
use kbhub_database::DatabasePool;
use kbhub_database::migration;

use crate::output::{self, OutputFormat};

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Run all pending migrations
    Run,
    /// Show migration status
    Status,
}

#[derive(Debug, Serialize, Tabled)]
struct MigrationRow {
    version: i64,
    description: String,
    applied: bool,
}

/// Execute migration commands
pub async fn execute(
    args: &MigrateArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    if config.database.backend != StoreBackend::Postgres {
        return Err(AppError::configuration(
            "Migrations only apply to the postgres backend",
        ));
    }
    let pool = DatabasePool::connect(&config.database).await?;

    match &args.command {
        MigrateCommand::Run => {
            println!("Running database migrations...");
            migration::run_migrations(pool.pool()).await?;
            output::print_success("All migrations applied successfully.");
        }
        MigrateCommand::Status => {
            let rows: Vec<MigrationRow> = migration::migration_status(pool.pool())
                .await?
                .into_iter()
                .map(|m| MigrationRow {
                    version: m.version,
                    description: m.description,
                    applied: m.applied,
                })
                .collect();
            output::print_list(&rows, format);
        }
    }

    pool.close().await;
    Ok(())
}
