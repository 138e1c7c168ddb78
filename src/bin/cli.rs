//! dedupstore CLI
//!
//! Command-line interface for a file-backed deduplication store.

use std::io::Write;

use clap::{Parser, Subcommand};
use dedupstore::{Catalog, Config, DedupError};
use tracing_subscriber::{fmt, EnvFilter};

/// dedupstore CLI
#[derive(Parser, Debug)]
#[command(name = "dedupstore")]
#[command(about = "Content-addressed deduplication store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./dedupstore_data")]
    data_dir: String,

    /// Catalog to open (a new one is created if omitted)
    #[arg(short, long)]
    store: Option<String>,

    /// Block capacity in bytes (new stores only)
    #[arg(short, long, default_value = "8")]
    block_capacity: usize,

    /// Container capacity in blocks (new stores only)
    #[arg(short, long, default_value = "8")]
    container_capacity: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bind a key to a value
    Put {
        /// The key to bind
        key: String,

        /// The value to store
        value: String,
    },

    /// Get the value bound to a key
    Get {
        /// The key to look up
        key: String,
    },

    /// Show key, block and container counts
    Stats,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,dedupstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        let code = if e.is_not_found() { 2 } else { 1 };
        std::process::exit(code);
    }
}

fn run(args: Args) -> Result<(), DedupError> {
    let mut builder = Config::builder()
        .data_dir(&args.data_dir)
        .block_capacity(args.block_capacity)
        .container_capacity(args.container_capacity);
    if let Some(name) = &args.store {
        builder = builder.store_name(name);
    }

    let mut catalog = Catalog::open(builder.build())?;
    tracing::info!("dedupstore v{} store={}", dedupstore::VERSION, catalog.store_name());

    match args.command {
        Commands::Put { key, value } => {
            let outcome = catalog.put_block(&key, value.as_bytes())?;
            println!(
                "{} {:?} hash={} container={}{}",
                catalog.store_name(),
                outcome.kind,
                outcome.content_hash,
                outcome.container,
                if outcome.truncated { " (truncated)" } else { "" }
            );
        }
        Commands::Get { key } => {
            let data = catalog.get_block(&key)?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&data)?;
            stdout.flush()?;
        }
        Commands::Stats => {
            let stats = catalog.stats();
            println!(
                "{} keys={} blocks={} containers={}",
                catalog.store_name(),
                stats.keys,
                stats.units,
                stats.containers
            );
        }
    }

    Ok(())
}
