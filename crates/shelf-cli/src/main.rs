//! Shelf command line
//!
//! Thin front end over the library: loads configuration, opens the store in
//! the data directory and runs one operation per invocation.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use shelf_config::{CONFIG_FILE_NAME, ShelfConfig};
use shelf_library::{
    BlobStore, FsScanner, LibraryError, SqliteStore, SyncCoordinator, SyncOptions, SyncReport,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    let store_path = config.store_path();
    let store: Arc<dyn BlobStore> = Arc::new(
        SqliteStore::open(&store_path)
            .with_context(|| format!("Failed to open library store {}", store_path.display()))?,
    );
    let coord = SyncCoordinator::open(
        FsScanner::new(&config.scanner),
        store,
        SyncOptions::from(&config),
    )
    .context("Failed to load library")?;

    run(&coord, cli.command).await
}

/// Setup logging
fn setup_logging() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn load_config(cli: &Cli) -> Result<ShelfConfig> {
    let mut config = match &cli.config {
        Some(path) => ShelfConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => match &cli.data_dir {
            Some(dir) if dir.join(CONFIG_FILE_NAME).exists() => {
                ShelfConfig::load(&dir.join(CONFIG_FILE_NAME))?
            }
            _ => ShelfConfig::load_default().context("Failed to load config")?,
        },
    };

    if let Some(dir) = &cli.data_dir {
        config.library.data_dir = Some(dir.clone());
    }
    info!("Using data directory {}", config.data_dir().display());
    Ok(config)
}

async fn run(coord: &SyncCoordinator<FsScanner>, command: Commands) -> Result<()> {
    match command {
        Commands::Folders => {
            for folder in coord.list_folders() {
                println!("{}", folder.root_path);
            }
        }
        Commands::Add { root } => {
            let report = coord
                .add_folder(&root)
                .await
                .with_context(|| format!("Failed to add {}", root))?;
            print_report(&report);
        }
        Commands::Remove { root } => {
            let removed = coord
                .remove_folder(&root)
                .with_context(|| format!("Failed to remove {}", root))?;
            println!("removed {} game(s)", removed.len());
        }
        Commands::Sync => print_report(&coord.sync().await.context("Sync failed")?),
        Commands::Rescan => print_report(&coord.rescan_all().await.context("Rescan failed")?),
        Commands::Migrate { old_root, new_root } => match coord.migrate(&old_root, &new_root) {
            Ok(report) if report.moved_games == 0 => println!("no games matched"),
            Ok(report) => {
                println!("moved {} game(s)", report.moved_games);
                println!("moved {} folder(s)", report.moved_folders);
                println!("rewrote {} table entr(ies)", report.rewritten_entries);
                if report.dropped_entries > 0 {
                    println!("dropped {} colliding entr(ies)", report.dropped_entries);
                }
            }
            Err(LibraryError::InvalidMigration(issue)) => println!("{}", issue),
            Err(e) => return Err(e).context("Migration failed"),
        },
        Commands::Games { all } => {
            let state = coord.snapshot();
            let games: Vec<_> = if all {
                state.games.iter().collect()
            } else {
                state.visible_games().collect()
            };
            for game in games {
                let name = state.display_name(&game.path).unwrap_or_else(|| game.name.clone());
                let marker = if game.installed { "" } else { " (uninstalled)" };
                println!("{}\t{}{}", name, game.path, marker);
            }
        }
        Commands::Delete { path } => {
            let removed = coord
                .delete_game(&path)
                .with_context(|| format!("Failed to delete {}", path))?;
            println!("deleted {}", removed.name);
        }
        Commands::Uninstall { path } => {
            coord
                .set_installed(&path, false)
                .with_context(|| format!("Failed to uninstall {}", path))?;
        }
        Commands::Restore { path } => {
            coord
                .set_installed(&path, true)
                .with_context(|| format!("Failed to restore {}", path))?;
        }
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    println!("scanned {} folder(s)", report.roots);
    println!("added {} game(s)", report.added);
    println!("marked {} game(s) uninstalled", report.soft_deleted);
    println!("dropped {} game(s)", report.dropped);
    if report.fallbacks > 0 {
        println!("fell back to full scan for {} folder(s)", report.fallbacks);
    }
    for root in &report.failed_roots {
        println!("could not scan {}", root);
    }
}
