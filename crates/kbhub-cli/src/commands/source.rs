//! Source placement CLI commands.

use clap::{Args, Subcommand};

use kbhub_core::error::AppError;

use super::parse_folder_id;
use crate::output::{self, OutputFormat};

/// Arguments for source commands
#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Source subcommand
    #[command(subcommand)]
    pub command: SourceCommand,
}

/// Source subcommands
#[derive(Debug, Subcommand)]
pub enum SourceCommand {
    /// Move one or more sources into a folder
    Move {
        /// Source IDs
        #[arg(required = true)]
        ids: Vec<String>,
        /// Target folder ID (omit for root)
        #[arg(long)]
        folder: Option<String>,
    },
}

/// Execute source commands
pub async fn execute(
    args: &SourceArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let state = super::connect(config_path).await?;

    let result = match &args.command {
        SourceCommand::Move { ids, folder } => {
            match folder.as_deref().map(parse_folder_id).transpose() {
                Ok(folder_id) => {
                    let moved = if let [id] = ids.as_slice() {
                        state.source_service.move_source(id, folder_id).await
                    } else {
                        state.source_service.batch_move_sources(ids, folder_id).await
                    };
                    moved.map(|result| {
                        output::print_success(&result.message);
                        output::print_item(&result, format);
                    })
                }
                Err(e) => Err(e),
            }
        }
    };

    state.stores.close().await;
    result
}
