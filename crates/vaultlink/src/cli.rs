//! Argument parsing, configuration assembly and command dispatch

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;
use vaultlink_core::{ConfigProfile, EditOperation, NotePath, ServerConfig, VaultConfig};
use vaultlink_tools::{VaultOperation, VaultService};

/// Vault access for agents: REST API first, vault directory as fallback
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the vault directory
    #[arg(short, long, env = "OBSIDIAN_VAULT_PATH")]
    pub vault_path: Option<PathBuf>,

    /// Bearer token for the REST API
    #[arg(long, env = "OBSIDIAN_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// REST API port
    #[arg(long, env = "OBSIDIAN_API_PORT")]
    pub api_port: Option<u16>,

    /// REST API host
    #[arg(long, env = "OBSIDIAN_API_HOST")]
    pub api_host: Option<String>,

    /// YAML configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Configuration profile (development, production, offline)
    #[arg(short, long, default_value = "development")]
    pub profile: ConfigProfile,

    /// Never contact the REST API
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub offline: bool,

    /// Print results as JSON, tagged with the backend that served them
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List notes, optionally under a folder
    List { folder: Option<String> },

    /// Print a note
    Read { path: String },

    /// Read several notes; unreadable paths are reported inline
    ReadMany {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Create (or overwrite) a note; content is read from stdin when omitted
    Create { path: String, content: Option<String> },

    /// Replace an existing note; content is read from stdin when omitted
    Update { path: String, content: Option<String> },

    /// Apply text replacements to a note
    Edit {
        path: String,

        /// Text to replace (single edit)
        #[arg(long, requires = "new", conflicts_with = "edits", allow_hyphen_values = true)]
        old: Option<String>,

        /// Replacement text (single edit)
        #[arg(long, requires = "old", allow_hyphen_values = true)]
        new: Option<String>,

        /// JSON file holding `[{"oldText": ..., "newText": ...}, ...]`
        #[arg(long)]
        edits: Option<PathBuf>,

        /// Show a unified diff instead of writing
        #[arg(long, action = clap::ArgAction::SetTrue)]
        dry_run: bool,

        /// Refuse to edit unless the note's current hash matches
        #[arg(long)]
        expected_hash: Option<String>,
    },

    /// Case-insensitive search over note content
    Search { query: String },

    /// Delete a note
    Delete { path: String },

    /// Move a note
    Move { source: String, destination: String },

    /// Folder operations
    Folder {
        #[command(subcommand)]
        action: FolderCommand,
    },

    /// Run one operation given as JSON (read from stdin when omitted)
    Exec { operation: Option<String> },
}

#[derive(Subcommand, Debug)]
pub enum FolderCommand {
    Create { path: String },
    Rename { path: String, new_path: String },
    Move { path: String, new_path: String },
    Delete { path: String },
}

impl Command {
    /// Translate the command into a vault operation
    pub async fn into_operation(self) -> anyhow::Result<VaultOperation> {
        let op = match self {
            Self::List { folder } => VaultOperation::ListNotes {
                folder: match folder {
                    Some(raw) => NotePath::parse_folder(&raw)?,
                    None => None,
                },
            },
            Self::Read { path } => VaultOperation::ReadNote { path: parse(&path)? },
            Self::ReadMany { paths } => VaultOperation::ReadMultipleNotes {
                paths: paths
                    .iter()
                    .map(|p| parse(p))
                    .collect::<anyhow::Result<_>>()?,
            },
            Self::Create { path, content } => VaultOperation::CreateNote {
                path: parse(&path)?,
                content: content_or_stdin(content).await?,
            },
            Self::Update { path, content } => VaultOperation::UpdateNote {
                path: parse(&path)?,
                content: content_or_stdin(content).await?,
            },
            Self::Edit {
                path,
                old,
                new,
                edits,
                dry_run,
                expected_hash,
            } => {
                let edits = match (old, new, edits) {
                    (Some(old), Some(new), None) => vec![EditOperation::new(old, new)],
                    (None, None, Some(file)) => {
                        let raw = tokio::fs::read_to_string(&file)
                            .await
                            .with_context(|| format!("Failed to read {}", file.display()))?;
                        serde_json::from_str(&raw)
                            .with_context(|| format!("Invalid edit list in {}", file.display()))?
                    }
                    _ => bail!("Provide either --old and --new, or --edits <file>"),
                };
                VaultOperation::EditNote {
                    path: parse(&path)?,
                    edits,
                    dry_run,
                    expected_hash,
                }
            }
            Self::Search { query } => VaultOperation::SearchVault { query },
            Self::Delete { path } => VaultOperation::DeleteNote { path: parse(&path)? },
            Self::Move {
                source,
                destination,
            } => VaultOperation::MoveNote {
                source: parse(&source)?,
                destination: parse(&destination)?,
            },
            Self::Folder { action } => match action {
                FolderCommand::Create { path } => VaultOperation::CreateFolder { path: parse(&path)? },
                FolderCommand::Rename { path, new_path } => VaultOperation::RenameFolder {
                    path: parse(&path)?,
                    new_path: parse(&new_path)?,
                },
                FolderCommand::Move { path, new_path } => VaultOperation::MoveFolder {
                    path: parse(&path)?,
                    new_path: parse(&new_path)?,
                },
                FolderCommand::Delete { path } => VaultOperation::DeleteFolder { path: parse(&path)? },
            },
            Self::Exec { operation } => {
                let raw = content_or_stdin(operation).await?;
                VaultOperation::from_json(&raw)?
            }
        };
        Ok(op)
    }
}

fn parse(raw: &str) -> anyhow::Result<NotePath> {
    NotePath::parse(raw).with_context(|| format!("Invalid note path {:?}", raw))
}

async fn content_or_stdin(content: Option<String>) -> anyhow::Result<String> {
    match content {
        Some(content) => Ok(content),
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

/// Assemble the server configuration from file, profile, flags and environment
pub async fn build_config(args: &Args) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)
            .await
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => {
            let vault_path = args
                .vault_path
                .clone()
                .unwrap_or_else(|| PathBuf::from("./vault"));
            let vault = VaultConfig::builder(&vault_path)
                .build()
                .with_context(|| format!("Invalid vault path {}", vault_path.display()))?;
            args.profile.create_config(vault)
        }
    };

    if args.config.is_some()
        && let Some(vault_path) = &args.vault_path
    {
        config.vault.path = VaultConfig::builder(vault_path).build()?.path;
    }
    if let Some(token) = &args.api_token {
        config.api.token = token.clone();
    }
    if let Some(port) = args.api_port {
        config.api.port = port;
    }
    if let Some(host) = &args.api_host {
        config.api.host = host.clone();
    }
    if args.offline {
        config.api.enabled = false;
    }

    config.validate()?;
    Ok(config)
}

/// Log filter from `RUST_LOG`, falling back to the configured level
pub fn log_filter(config: &ServerConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    })
}

/// Build the configuration and run the parsed command
pub async fn run(args: Args) -> anyhow::Result<String> {
    let config = build_config(&args).await?;
    execute(args, &config).await
}

/// Run the parsed command against `config`; returns the text to print on stdout
#[tracing::instrument(skip_all, name = "vaultlink_run")]
pub async fn execute(args: Args, config: &ServerConfig) -> anyhow::Result<String> {
    let service = VaultService::new(config)?;
    let json_output = args.json;

    let op = args.command.into_operation().await?;
    log::info!("Running {}", op);

    let outcome = service.execute(op).await?;
    log::info!("Served by {}", outcome.backend());

    if json_output {
        let backend = outcome.backend();
        let body = json!({
            "backend": backend,
            "output": outcome.into_inner(),
        });
        Ok(serde_json::to_string_pretty(&body)?)
    } else {
        Ok(outcome.into_inner().render()?)
    }
}
