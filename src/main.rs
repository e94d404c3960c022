//! midnam-catalog - device catalog CLI
//!
//! Command-line front end over the catalog core: scan a tree of MIDI name
//! documents into a device catalog, merge patch documents, validate a
//! document, or drop the persisted cache. The HTTP layer of the editor
//! calls the same library entry points.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use midnam_catalog::cache::{CatalogCache, FileCacheStore, SystemClock};
use midnam_catalog::config::Config;
use midnam_catalog::service::CatalogService;
use midnam_catalog::validate::validate_text;

#[derive(Parser)]
#[command(name = "midnam-catalog", version, about = "MIDI name document catalog")]
struct Cli {
    /// Root of the MIDI name document tree
    #[arg(long, global = true, env = "MIDNAM_CATALOG_ROOT")]
    root: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build (or serve from cache) the device catalog and print it as JSON
    Scan {
        /// Rebuild even when the cache is fresh
        #[arg(long)]
        force: bool,
    },
    /// Merge patch documents; the first path is the base
    Merge {
        /// Documents to merge, base first
        #[arg(required = true, num_args = 2..)]
        paths: Vec<PathBuf>,
        /// Write the merged document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a patch document and print the report as JSON
    Validate {
        path: PathBuf,
    },
    /// Discard the persisted catalog cache
    Invalidate,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let config = Config::resolve(cli.root.as_deref())?;
    let cache = CatalogCache::new(
        Box::new(SystemClock),
        Box::new(FileCacheStore::new(&config.cache_file)),
        config.freshness_secs,
    );
    let service = CatalogService::with_cache(&config.root_folder, cache);

    match cli.command {
        Command::Scan { force } => {
            let result = service.get_catalog(force)?;
            info!(
                "{} devices ({}, {} diagnostics)",
                result.catalog.len(),
                if result.from_cache { "cached" } else { "rebuilt" },
                result.diagnostics.len()
            );
            for diagnostic in &result.diagnostics {
                tracing::warn!("{}: {}", diagnostic.path.display(), diagnostic.message);
            }
            println!("{}", serde_json::to_string_pretty(&result.catalog)?);
        }
        Command::Merge { paths, output } => {
            let merged = service.merge_documents(&paths)?;
            info!(
                "Merge complete: +{} banks, +{} patches, {} shadowed",
                merged.report.banks_appended,
                merged.report.patches_appended,
                merged.report.patches_shadowed
            );
            match output {
                Some(path) => {
                    std::fs::write(&path, &merged.xml)?;
                    info!("Wrote merged document to {}", path.display());
                }
                None => println!("{}", merged.xml),
            }
        }
        Command::Validate { path } => {
            let contents = std::fs::read_to_string(&path)?;
            let report = validate_text(&contents);
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.valid {
                std::process::exit(1);
            }
        }
        Command::Invalidate => {
            service.invalidate_catalog()?;
            info!("Catalog cache invalidated");
        }
    }

    Ok(())
}
