//! # chapter-merge CLI (`chm`)
//!
//! ## Usage
//!
//! ```bash
//! chm --config ./config/chm.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `chm init` | Create the SQLite database and run schema migrations |
//! | `chm merge --title T` | Merge one chapter (text from `--file` or stdin) |
//! | `chm ingest [PATH]` | Apply a JSON-lines stream of events |
//! | `chm checklist import\|show\|clear` | Manage a folder's expected chapters |
//! | `chm docs list\|show\|delete` | Inspect assembled documents |
//! | `chm log show\|clear` | Read a folder's event log |
//! | `chm folders list\|create\|delete` | Manage folders |
//! | `chm export archive\|dir` | Write documents to a ZIP or a directory |
//! | `chm busy` | Show whether a merge drain is in progress |
//! | `chm serve` | Start the HTTP event endpoint |
//!
//! Diagnostics go to stderr (`RUST_LOG`, default `info`); command output
//! goes to stdout.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use chapter_merge::{
    checklist_cmd, config, db, docs, export, folders, ingest, log_cmd, migrate, server,
};
use chapter_merge_core::models::ROOT_COLLECTION;
use chapter_merge_core::store::{Store, BUSY_FLAG};

/// chapter-merge: consolidate chapter submissions into ordered DOCX documents.
#[derive(Parser)]
#[command(name = "chm", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/chm.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Merge a single chapter submission.
    Merge {
        /// Chapter title, e.g. "Chapter 12.1: The Road".
        #[arg(long)]
        title: String,

        /// Read content from this file instead of stdin.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Target folder id.
        #[arg(long, default_value = ROOT_COLLECTION)]
        folder: String,

        /// Do not group by integer chapter, regardless of folder setting.
        #[arg(long)]
        no_group: bool,
    },

    /// Apply a JSON-lines stream of MERGE / CHECKLIST events.
    Ingest {
        /// Events file; `-` or omitted reads stdin.
        path: Option<PathBuf>,

        /// Target folder id.
        #[arg(long, default_value = ROOT_COLLECTION)]
        folder: String,
    },

    /// Manage a folder's checklist of expected chapters.
    Checklist {
        #[command(subcommand)]
        action: ChecklistAction,
    },

    /// Inspect and delete assembled documents.
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },

    /// Read or clear a folder's event log.
    Log {
        #[command(subcommand)]
        action: LogAction,
    },

    /// Manage folders.
    Folders {
        #[command(subcommand)]
        action: FolderAction,
    },

    /// Export documents.
    Export {
        #[command(subcommand)]
        action: ExportAction,
    },

    /// Print whether a merge drain is in progress.
    Busy,

    /// Start the HTTP event endpoint on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum ChecklistAction {
    /// Import items from a JSON array or CHECKLIST event.
    Import {
        /// Input file; `-` or omitted reads stdin.
        path: Option<PathBuf>,
        #[arg(long, default_value = ROOT_COLLECTION)]
        folder: String,
    },
    /// Show items with their completion and the overall progress.
    Show {
        #[arg(long, default_value = ROOT_COLLECTION)]
        folder: String,
        /// Only items not yet merged.
        #[arg(long)]
        pending: bool,
    },
    /// Remove the folder's checklist.
    Clear {
        #[arg(long, default_value = ROOT_COLLECTION)]
        folder: String,
    },
}

#[derive(Subcommand)]
enum DocsAction {
    /// List documents in chapter order.
    List {
        #[arg(long, default_value = ROOT_COLLECTION)]
        folder: String,
        /// Only names containing this text (case-insensitive).
        #[arg(long)]
        filter: Option<String>,
    },
    /// Show a document's segments, digest, and text.
    Show { id: String },
    /// Delete documents by id.
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Subcommand)]
enum LogAction {
    /// Show entries, newest first.
    Show {
        #[arg(long, default_value = ROOT_COLLECTION)]
        folder: String,
        /// info, success, warn, or error.
        #[arg(long)]
        category: Option<String>,
        /// Only messages containing this text (case-insensitive).
        #[arg(long)]
        filter: Option<String>,
    },
    /// Remove all entries of a folder.
    Clear {
        #[arg(long, default_value = ROOT_COLLECTION)]
        folder: String,
    },
}

#[derive(Subcommand)]
enum FolderAction {
    List,
    Create {
        name: String,
        /// Grouping for this folder; defaults to `[naming].grouping`.
        #[arg(long)]
        grouping: Option<bool>,
    },
    /// Delete a folder with its documents, checklist, and log.
    Delete { id: String },
}

#[derive(Subcommand)]
enum ExportAction {
    /// Write documents into one ZIP archive.
    Archive {
        #[arg(long, default_value = ROOT_COLLECTION)]
        folder: String,
        /// Archive path; defaults to `Batch_<unix-millis>.zip`.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Document ids; all documents of the folder when omitted.
        ids: Vec<String>,
    },
    /// Write each document as its own file.
    Dir {
        #[arg(long, default_value = ROOT_COLLECTION)]
        folder: String,
        #[arg(long)]
        output: PathBuf,
        ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Merge {
            title,
            file,
            folder,
            no_group,
        } => {
            ingest::run_merge(&cfg, &title, file.as_deref(), &folder, no_group).await?;
        }
        Commands::Ingest { path, folder } => {
            ingest::run_ingest(&cfg, path.as_deref(), &folder).await?;
        }
        Commands::Checklist { action } => match action {
            ChecklistAction::Import { path, folder } => {
                checklist_cmd::run_checklist_import(&cfg, path.as_deref(), &folder).await?;
            }
            ChecklistAction::Show { folder, pending } => {
                checklist_cmd::run_checklist_show(&cfg, &folder, pending).await?;
            }
            ChecklistAction::Clear { folder } => {
                checklist_cmd::run_checklist_clear(&cfg, &folder).await?;
            }
        },
        Commands::Docs { action } => match action {
            DocsAction::List { folder, filter } => {
                docs::run_docs_list(&cfg, &folder, filter.as_deref()).await?;
            }
            DocsAction::Show { id } => {
                docs::run_docs_show(&cfg, &id).await?;
            }
            DocsAction::Delete { ids } => {
                docs::run_docs_delete(&cfg, &ids).await?;
            }
        },
        Commands::Log { action } => match action {
            LogAction::Show {
                folder,
                category,
                filter,
            } => {
                log_cmd::run_log_show(&cfg, &folder, category.as_deref(), filter.as_deref())
                    .await?;
            }
            LogAction::Clear { folder } => {
                log_cmd::run_log_clear(&cfg, &folder).await?;
            }
        },
        Commands::Folders { action } => match action {
            FolderAction::List => folders::run_folders_list(&cfg).await?,
            FolderAction::Create { name, grouping } => {
                folders::run_folders_create(&cfg, &name, grouping).await?;
            }
            FolderAction::Delete { id } => folders::run_folders_delete(&cfg, &id).await?,
        },
        Commands::Export { action } => match action {
            ExportAction::Archive {
                folder,
                output,
                ids,
            } => {
                export::run_export_archive(&cfg, &folder, &ids, output.as_deref()).await?;
            }
            ExportAction::Dir {
                folder,
                output,
                ids,
            } => {
                export::run_export_dir(&cfg, &folder, &ids, &output).await?;
            }
        },
        Commands::Busy => {
            let library = db::open_library(&cfg).await?;
            let busy = library.store().get_flag(BUSY_FLAG).await?.unwrap_or(false);
            println!("{}", if busy { "busy" } else { "idle" });
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
