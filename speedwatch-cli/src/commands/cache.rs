//! Geo cache management CLI commands.

use std::sync::Arc;

use clap::Subcommand;
use speedwatch::config::ConfigFile;
use speedwatch::geocache::{FileStore, GeoCacheStore};

use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show geo cache statistics
    Stats,
    /// Remove every cached speed limit
    Clear,
    /// Drop expired entries and trim to capacity
    Cleanup {
        /// Trim to half capacity instead of full capacity
        #[arg(long)]
        aggressive: bool,
    },
}

/// Open the geo cache described by the config.
pub fn open_geo_cache(config: &ConfigFile) -> GeoCacheStore {
    let store = FileStore::new(config.cache.directory.clone());
    GeoCacheStore::new(Arc::new(store), config.geo_cache_config())
}

/// Run a cache subcommand.
pub async fn run(config: &ConfigFile, action: CacheAction) -> Result<(), CliError> {
    let cache_dir = &config.cache.directory;
    let geo_cache = open_geo_cache(config);

    match action {
        CacheAction::Stats => {
            let stats = geo_cache.stats().await;
            println!("Geo cache: {}", cache_dir.display());
            println!(
                "  Entries:      {} / {} ({:.0}%)",
                stats.entries,
                stats.max_entries,
                stats.utilization * 100.0
            );
            println!("  Oldest:       {}", format_time(stats.oldest));
            println!("  Newest:       {}", format_time(stats.newest));
            println!("  Last cleanup: {}", format_time(stats.last_cleanup));
            Ok(())
        }
        CacheAction::Clear => {
            let entries = geo_cache.len().await;
            println!("Clearing geo cache at: {}", cache_dir.display());
            geo_cache.clear().await?;
            println!("Removed {} entries", entries);
            Ok(())
        }
        CacheAction::Cleanup { aggressive } => {
            let removed = geo_cache.cleanup(aggressive).await;
            println!(
                "Removed {} entries, {} remaining",
                removed,
                geo_cache.len().await
            );
            Ok(())
        }
    }
}

fn format_time(time: Option<chrono::DateTime<chrono::Utc>>) -> String {
    time.map_or_else(
        || "never".to_string(),
        |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}
