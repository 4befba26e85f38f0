//! Barback CLI - Runs archive migrations, scraped recipe imports and image
//! metadata updates against a local data directory.
//!
//! Reports are printed to stdout as JSON; logs go to stderr.

use anyhow::{Context, Result};
use barback_core::config::ImportConfig;
use barback_core::models::ImageMetadataUpdate;
use barback_core::{
    ArchiveMigrator, BarbackPaths, CancellationToken, HttpImageFetcher, ImageIngestor, LocalDisk,
    ScrapedRecipe, ScrapedRecipeImporter, SqliteStore,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "barback")]
#[command(about = "Bulk migration and image pipeline for a cocktail recipe backend")]
struct Args {
    /// Data directory holding the database and storage disks
    #[arg(long, global = true, env = "BARBACK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Owner recorded on created recipes and images
    #[arg(long, global = true, default_value_t = ImportConfig::DEFAULT_OWNER_ID)]
    owner_id: i64,

    /// Catalog scope used for name resolution
    #[arg(long, global = true, default_value_t = ImportConfig::DEFAULT_SCOPE_ID)]
    scope: i64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replace the whole dataset with the contents of a migration archive
    ImportArchive {
        /// Path to the zip archive
        archive: PathBuf,
    },
    /// Create a recipe from a scraper JSON payload
    ImportScraped {
        /// Path to the JSON payload
        payload: PathBuf,
    },
    /// Change copyright and/or sort of a stored image
    UpdateImage {
        id: i64,
        #[arg(long)]
        copyright: Option<String>,
        #[arg(long)]
        sort: Option<i64>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let paths = BarbackPaths::new(resolve_data_dir(args.data_dir));
    info!("Data directory: {}", paths.data_dir.display());
    std::fs::create_dir_all(&paths.data_dir)
        .with_context(|| format!("Failed to create {}", paths.data_dir.display()))?;

    let store = Arc::new(SqliteStore::open(paths.database())?);
    let durable = Arc::new(LocalDisk::new(paths.storage()));

    match args.command {
        Command::ImportArchive { archive } => {
            let token = CancellationToken::new();
            let handler_token = token.clone();
            ctrlc::set_handler(move || {
                warn!("Interrupt received, stopping at the next entry, row or file");
                handler_token.cancel();
            })
            .context("Failed to install Ctrl-C handler")?;

            let migrator =
                ArchiveMigrator::new(store, durable, Arc::new(LocalDisk::new(paths.scratch())))
                    .with_cancellation(token);
            let report = migrator.import_archive(&archive)?;
            if !report.is_clean() {
                warn!(
                    failures = report.failures.len(),
                    cancelled = report.cancelled,
                    "Archive import finished with skipped items"
                );
            }
            print_json(&report)?;
        }
        Command::ImportScraped { payload } => {
            let recipe = read_payload(&payload)?;
            let ingestor = Arc::new(ImageIngestor::new(durable, store.clone()));
            let importer = ScrapedRecipeImporter::new(
                store.clone(),
                store,
                ingestor,
                Arc::new(HttpImageFetcher::new()?),
            )
            .with_owner(args.owner_id, args.scope);

            let outcome = importer.import_scraped(&recipe)?;
            print_json(&outcome)?;
        }
        Command::UpdateImage {
            id,
            copyright,
            sort,
        } => {
            let ingestor = ImageIngestor::new(durable, store);
            let image = ingestor.update_metadata(id, &ImageMetadataUpdate { copyright, sort })?;
            print_json(&image)?;
        }
    }

    Ok(())
}

/// `--data-dir` / `BARBACK_DATA_DIR`, else the platform data directory.
fn resolve_data_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| dirs::data_dir().map(|dir| dir.join("barback")))
        .unwrap_or_else(|| PathBuf::from(".barback"))
}

fn read_payload(path: &Path) -> Result<ScrapedRecipe> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid payload in {}", path.display()))
}

// Intentional stdout: reports are the command output.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
