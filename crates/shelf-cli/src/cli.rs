use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "shelf")]
#[command(about = "Keep a personal game library in step with the disk", long_about = None)]
pub struct Cli {
    /// Configuration file (default: config.toml in the data directory)
    #[arg(long, global = true, env = "SHELF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the library store
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List registered library folders
    Folders,
    /// Register a library folder and scan it
    Add { root: String },
    /// Unregister a library folder and drop its games
    Remove { root: String },
    /// Re-scan every folder, incrementally where possible
    Sync,
    /// Fully re-walk every folder
    Rescan,
    /// Move a library folder, rewriting every stored path beneath it
    Migrate { old_root: String, new_root: String },
    /// List games
    Games {
        /// Include uninstalled and hidden games
        #[arg(long)]
        all: bool,
    },
    /// Remove a game and everything recorded about it
    Delete { path: String },
    /// Mark a game as uninstalled, keeping its data
    Uninstall { path: String },
    /// Mark an uninstalled game as installed again
    Restore { path: String },
}
