//! Folder management CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use kbhub_core::error::AppError;
use kbhub_entity::folder::{FolderTreeNode, FolderView};
use kbhub_service::folder::{CreateFolderInput, UpdateFolderInput};

use super::parse_folder_id;
use crate::output::{self, OutputFormat};

/// Arguments for folder commands
#[derive(Debug, Args)]
pub struct FolderArgs {
    /// Folder subcommand
    #[command(subcommand)]
    pub command: FolderCommand,
}

/// Folder subcommands
#[derive(Debug, Subcommand)]
pub enum FolderCommand {
    /// List folders under a parent (root folders by default)
    List {
        /// Parent folder ID
        #[arg(long)]
        parent: Option<String>,
    },
    /// Print the folder hierarchy
    Tree {
        /// Include the sources in each folder
        #[arg(long)]
        sources: bool,
    },
    /// Show a folder with its subfolders and sources
    Show {
        /// Folder ID
        id: String,
    },
    /// Print the name path from the root to a folder
    Path {
        /// Folder ID
        id: String,
    },
    /// Create a folder
    Create {
        /// Folder name
        name: String,
        /// Parent folder ID
        #[arg(long)]
        parent: Option<String>,
        /// Description
        #[arg(long)]
        description: Option<String>,
        /// Hex color, e.g. #3b82f6
        #[arg(long)]
        color: Option<String>,
        /// Icon name
        #[arg(long)]
        icon: Option<String>,
        /// Sort position among siblings
        #[arg(long)]
        position: Option<i32>,
    },
    /// Update folder attributes
    Update {
        /// Folder ID
        id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// New hex color
        #[arg(long)]
        color: Option<String>,
        /// New icon name
        #[arg(long)]
        icon: Option<String>,
        /// New sort position
        #[arg(long)]
        position: Option<i32>,
    },
    /// Move a folder under a new parent
    Move {
        /// Folder ID
        id: String,
        /// New parent folder ID (omit for root)
        #[arg(long)]
        parent: Option<String>,
    },
    /// Delete a folder
    Delete {
        /// Folder ID
        id: String,
        /// Delete subfolders and sources instead of moving them to the parent
        #[arg(long)]
        recursive: bool,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct FolderRow {
    id: String,
    name: String,
    parent: String,
    position: i32,
    sources: i64,
    subfolders: i64,
    total_sources: i64,
}

impl From<&FolderView> for FolderRow {
    fn from(view: &FolderView) -> Self {
        Self {
            id: view.id().to_string(),
            name: view.folder.name.clone(),
            parent: view
                .parent_id()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
            position: view.folder.position,
            sources: view.stats.source_count,
            subfolders: view.stats.subfolder_count,
            total_sources: view.stats.total_sources,
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct SourceRow {
    source_id: String,
    title: String,
    knowledge_type: String,
}

/// Execute folder commands
pub async fn execute(
    args: &FolderArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let state = super::connect(config_path).await?;
    let folders = &state.folder_service;

    let result = async {
        match &args.command {
            FolderCommand::List { parent } => {
                let parent = parent.as_deref().map(parse_folder_id).transpose()?;
                let views = folders.list_folders(parent, true).await?;
                let rows: Vec<FolderRow> = views.iter().map(FolderRow::from).collect();
                output::print_list(&rows, format);
            }
            FolderCommand::Tree { sources } => {
                let tree = state.tree_service.get_tree(*sources).await?;
                match format {
                    OutputFormat::Json => output::print_json(&tree),
                    OutputFormat::Table => {
                        if tree.tree.is_empty() {
                            println!("No folders.");
                        }
                        for node in &tree.tree {
                            print_node(node, 0);
                        }
                        println!(
                            "\n{} folders, {} sources",
                            tree.total_folders, tree.total_sources
                        );
                    }
                }
            }
            FolderCommand::Show { id } => {
                let id = parse_folder_id(id)?;
                let contents = folders.get_folder_contents(id, true, true).await?;
                match format {
                    OutputFormat::Json => output::print_json(&contents),
                    OutputFormat::Table => {
                        output::print_kv("Folder", &contents.view.folder.name);
                        output::print_kv("Path", &contents.path.join(" / "));
                        println!("\nSubfolders:");
                        let rows: Vec<FolderRow> =
                            contents.subfolders.iter().map(FolderRow::from).collect();
                        output::print_list(&rows, format);
                        println!("\nSources:");
                        let rows: Vec<SourceRow> = contents
                            .sources
                            .iter()
                            .map(|s| SourceRow {
                                source_id: s.source_id.clone(),
                                title: s.title.clone().unwrap_or_default(),
                                knowledge_type: s.knowledge_type.clone().unwrap_or_default(),
                            })
                            .collect();
                        output::print_list(&rows, format);
                    }
                }
            }
            FolderCommand::Path { id } => {
                let id = parse_folder_id(id)?;
                let path = state.tree_service.get_path(id).await?;
                match format {
                    OutputFormat::Json => output::print_json(&path),
                    OutputFormat::Table => println!("{}", path.join(" / ")),
                }
            }
            FolderCommand::Create {
                name,
                parent,
                description,
                color,
                icon,
                position,
            } => {
                let parent_id = parent.as_deref().map(parse_folder_id).transpose()?;
                let view = folders
                    .create_folder(CreateFolderInput {
                        name: name.clone(),
                        description: description.clone(),
                        color: color.clone(),
                        icon: icon.clone(),
                        parent_id,
                        position: *position,
                        metadata: None,
                    })
                    .await?;
                output::print_success(&format!("Folder '{}' created", view.folder.name));
                output::print_item(&FolderRow::from(&view), format);
            }
            FolderCommand::Update {
                id,
                name,
                description,
                color,
                icon,
                position,
            } => {
                let id = parse_folder_id(id)?;
                let view = folders
                    .update_folder(
                        id,
                        UpdateFolderInput {
                            name: name.clone(),
                            description: description.clone(),
                            color: color.clone(),
                            icon: icon.clone(),
                            position: *position,
                            parent_id: None,
                            metadata: None,
                        },
                    )
                    .await?;
                output::print_success(&format!("Folder '{}' updated", view.folder.name));
                output::print_item(&FolderRow::from(&view), format);
            }
            FolderCommand::Move { id, parent } => {
                let id = parse_folder_id(id)?;
                let parent_id = parent.as_deref().map(parse_folder_id).transpose()?;
                let view = folders.move_folder(id, parent_id).await?;
                output::print_success(&format!("Folder '{}' moved", view.folder.name));
            }
            FolderCommand::Delete { id, recursive } => {
                let id = parse_folder_id(id)?;
                let outcome = folders.delete_folder(id, !recursive).await?;
                output::print_success(&outcome.message);
                output::print_item(&outcome, format);
            }
        }
        Ok::<(), AppError>(())
    }
    .await;

    state.stores.close().await;
    result
}

fn print_node(node: &FolderTreeNode, depth: usize) {
    let indent = "  ".repeat(depth);
    println!(
        "{indent}{} ({} sources)",
        node.view.folder.name, node.view.stats.total_sources
    );
    for source in &node.sources {
        let label = source.title.as_deref().unwrap_or(&source.source_id);
        println!("{indent}  - {label}");
    }
    for child in &node.children {
        print_node(child, depth + 1);
    }
}
