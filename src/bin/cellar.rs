//! Cellar CLI
//!
//! Command-line interface over a filesystem collection.

use std::path::PathBuf;

use cellar::{BootstrapPolicy, Collection, Config, FsRecordStore, SyncStrategy};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// Cellar CLI
#[derive(Parser, Debug)]
#[command(name = "cellar")]
#[command(about = "Embeddable one-record-per-key store")]
#[command(version)]
struct Args {
    /// Data directory of the root collection
    #[arg(short, long, default_value = "./cellar_data")]
    data_dir: PathBuf,

    /// Sub-collection path below the data directory (e.g. "tenants/acme")
    #[arg(short, long)]
    collection: Option<String>,

    /// Skip undecodable records when rebuilding the catalog
    #[arg(long)]
    skip_corrupt: bool,

    /// Let the OS flush writes instead of fsyncing each one
    #[arg(long)]
    no_sync: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,

        /// Keep the value in the in-memory cache
        #[arg(long)]
        cache: bool,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// List all keys
    Keys,

    /// Delete every key in the collection
    Truncate,

    /// Rebuild the catalog by scanning every record
    Reindex,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cellar=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> cellar::Result<()> {
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .sync_strategy(if args.no_sync {
            SyncStrategy::OsBuffered
        } else {
            SyncStrategy::EveryWrite
        })
        .bootstrap_policy(if args.skip_corrupt {
            BootstrapPolicy::SkipCorrupt
        } else {
            BootstrapPolicy::FailFast
        })
        .build();

    tracing::debug!("Data directory: {}", config.data_dir.display());

    let root = Collection::open_fs(config)?;
    let mut collection: Collection<FsRecordStore> = match &args.collection {
        Some(name) => root.collection(name)?,
        None => root,
    };

    match args.command {
        Commands::Get { key } => {
            let value = collection.get(&key)?;
            println!("{}", String::from_utf8_lossy(&value));
        }
        Commands::Put { key, value, cache } => {
            collection.put(&key, value.as_bytes(), cache)?;
            println!("OK");
        }
        Commands::Del { key } => {
            collection.delete(&key)?;
            println!("OK");
        }
        Commands::Keys => {
            let mut keys: Vec<&str> = collection.keys().collect();
            keys.sort_unstable();
            for key in keys {
                println!("{}", key);
            }
        }
        Commands::Truncate => {
            collection.truncate()?;
            println!("OK");
        }
        Commands::Reindex => {
            let stats = collection.reindex()?;
            println!(
                "indexed={} skipped={} duplicates={}",
                stats.records_indexed, stats.records_skipped, stats.duplicate_keys
            );
        }
    }

    Ok(())
}
