//! burrowkv CLI
//!
//! Opens an engine on a data directory and runs a single command against it.
//! Writes land in the WAL and are replayed by the next invocation, so a
//! sequence of `burrow set` calls behaves like one long-lived process.

use std::path::PathBuf;
use std::process::ExitCode;

use burrowkv::config::WalSyncStrategy;
use burrowkv::{Config, Engine};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// burrowkv CLI
#[derive(Parser, Debug)]
#[command(name = "burrow")]
#[command(about = "Embedded LSM key-value store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./burrow_data")]
    data_dir: PathBuf,

    /// Index entries that trigger a flush
    #[arg(short, long, default_value = "500")]
    flush_threshold: usize,

    /// SSTable count that triggers compaction
    #[arg(short, long, default_value = "4")]
    compaction_threshold: usize,

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
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Flush the in-memory index to a new SSTable
    Flush,

    /// Merge SSTables pairwise
    Compact,

    /// Show index size and SSTable files
    Stats,

    /// List the in-memory index in key order
    Dump,
}

fn main() -> ExitCode {
    // Logs go to stderr so command output stays clean
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,burrowkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .flush_threshold(args.flush_threshold)
        .compaction_threshold(args.compaction_threshold)
        .build();

    let engine = match Engine::open(config) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&engine, args.command) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(engine: &Engine, command: Commands) -> burrowkv::Result<ExitCode> {
    match command {
        Commands::Get { key } => match engine.get(key.as_bytes())? {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => {
                println!("(not found)");
                return Ok(ExitCode::from(2));
            }
        },
        Commands::Set { key, value } => {
            engine.set(key.as_bytes(), value.as_bytes())?;
            println!("OK");
        }
        Commands::Del { key } => match engine.delete(key.as_bytes()) {
            Ok(()) => println!("OK"),
            Err(burrowkv::BurrowError::KeyNotFound) => {
                println!("(not found)");
                return Ok(ExitCode::from(2));
            }
            Err(e) => return Err(e),
        },
        Commands::Flush => {
            engine.flush()?;
            println!("OK ({} SSTables)", engine.sstable_count());
        }
        Commands::Compact => {
            let remaining = engine.compact()?;
            println!("OK ({} SSTables)", remaining);
        }
        Commands::Stats => {
            println!("burrowkv {}", burrowkv::VERSION);
            println!("data dir:        {}", engine.data_dir().display());
            println!("index entries:   {}", engine.memtable_len());
            println!("wal bytes:       {}", engine.wal().len()?);
            println!("sstables:        {}", engine.sstable_count());
            for table in engine.storage().tables() {
                println!(
                    "  {}  {} entries  [{} .. {}]",
                    table.path.display(),
                    table.entry_count,
                    String::from_utf8_lossy(&table.smallest_key),
                    String::from_utf8_lossy(&table.largest_key)
                );
            }
        }
        Commands::Dump => {
            for entry in engine.dump() {
                let key = String::from_utf8_lossy(entry.key());
                if entry.is_live() {
                    println!("{} = {}", key, String::from_utf8_lossy(entry.value()));
                } else {
                    println!("{} (deleted)", key);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
