//! lrustore CLI
//!
//! Inspect and maintain store files from the command line.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lrustore::{Clock, LruStore, Result, SystemClock};
use tracing_subscriber::{fmt, EnvFilter};

/// lrustore CLI
#[derive(Parser, Debug)]
#[command(name = "lrustore-cli")]
#[command(about = "Inspect and maintain lrustore cache files")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty store file (overwrites an existing one)
    Create {
        path: PathBuf,

        /// Bytes per value
        #[arg(short, long)]
        value_size: usize,

        /// Maximum number of entries
        #[arg(short, long)]
        capacity: usize,

        /// Fingerprint seed
        #[arg(short, long, default_value = "0")]
        seed: u32,
    },

    /// Print header parameters and usage
    Info { path: PathBuf },

    /// Get a value by key
    Get { path: PathBuf, key: String },

    /// Set a key-value pair
    Put {
        path: PathBuf,
        key: String,
        value: String,
    },

    /// Refresh a key's access time
    Touch { path: PathBuf, key: String },

    /// Delete a key
    Del { path: PathBuf, key: String },

    /// Print all entries, most recently used first
    Dump { path: PathBuf },

    /// Delete stale entries (default: untouched for 62 days)
    Prune {
        path: PathBuf,

        /// Delete entries last accessed before this Unix timestamp
        #[arg(short, long)]
        before: Option<u32>,
    },

    /// Merge another store file into this one
    Merge { path: PathBuf, source: PathBuf },

    /// Remove every entry
    Clear { path: PathBuf },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lrustore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args.command) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Create {
            path,
            value_size,
            capacity,
            seed,
        } => LruStore::create_storage_file(&path, value_size, capacity, seed),

        Commands::Info { path } => {
            let store = LruStore::create(&path)?;
            println!("file:       {}", store.filename().display());
            println!("value_size: {}", store.value_size());
            println!("item_size:  {}", store.item_size());
            println!("capacity:   {}", store.size());
            println!("used:       {}", store.used_size());
            println!("seed:       {}", store.seed());
            Ok(())
        }

        Commands::Get { path, key } => {
            let store = LruStore::create(&path)?;
            match store.lookup_with_time(&key) {
                Some((value, atime)) => {
                    println!("{}\t{}", String::from_utf8_lossy(value).trim_end_matches('\0'), atime)
                }
                None => println!("(nil)"),
            }
            Ok(())
        }

        Commands::Put { path, key, value } => {
            let mut store = LruStore::create(&path)?;
            store.insert(&key, value.as_bytes())?;
            println!("OK");
            Ok(())
        }

        Commands::Touch { path, key } => {
            let mut store = LruStore::create(&path)?;
            println!("{}", if store.touch(&key)? { "OK" } else { "(nil)" });
            Ok(())
        }

        Commands::Del { path, key } => {
            let mut store = LruStore::create(&path)?;
            println!("(deleted {})", u8::from(store.delete(&key)?));
            Ok(())
        }

        Commands::Dump { path } => {
            let store = LruStore::create(&path)?;
            for record in store.entries() {
                println!(
                    "{:016x}\t{}\t{}",
                    record.fingerprint,
                    record.last_access_time,
                    String::from_utf8_lossy(&record.value).trim_end_matches('\0')
                );
            }
            Ok(())
        }

        Commands::Prune { path, before } => {
            let mut store = LruStore::create(&path)?;
            let removed = match before {
                Some(threshold) => store.delete_elements_before(threshold)?,
                None => store.delete_elements_untouched_for_62_days()?,
            };
            println!("removed {} entries (now={})", removed, SystemClock.now());
            Ok(())
        }

        Commands::Merge { path, source } => {
            let mut store = LruStore::create(&path)?;
            store.merge_file(&source)?;
            println!("used {} of {}", store.used_size(), store.size());
            Ok(())
        }

        Commands::Clear { path } => {
            let mut store = LruStore::create(&path)?;
            store.clear()
        }
    }
}
