//! AssortDB CLI
//!
//! Offline inspection of an assortment table.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use assortdb::{AssortmentStore, Config, TermHash};
use tracing_subscriber::{fmt, EnvFilter};

/// AssortDB CLI
#[derive(Parser, Debug)]
#[command(name = "assortdb-cli")]
#[command(about = "Inspect AssortDB assortment tables")]
#[command(version)]
struct Args {
    /// Storage root directory
    #[arg(short, long, default_value = "./assortdb_data")]
    root: PathBuf,

    /// Assortment capacity (references per term)
    #[arg(short, long)]
    capacity: usize,

    /// Row cache size in KB
    #[arg(short, long, default_value = "1024")]
    buffer_kb: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print entry count and cache statistics
    Stat,

    /// List term hashes
    Keys {
        /// Term hash to start from
        #[arg(short, long)]
        start: Option<String>,

        /// Walk in descending order
        #[arg(short, long)]
        descending: bool,

        /// Wrap around past the last key
        #[arg(short, long)]
        wrap: bool,
    },

    /// Print every record
    Dump,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,assortdb=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .storage_root(&args.root)
        .capacity(args.capacity)
        .buffer_kb(args.buffer_kb)
        .build();

    let store = match AssortmentStore::open(config) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to open assortment: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run(&store, args.command) {
        tracing::error!("{}", e);
        store.close();
        process::exit(1);
    }

    store.close();
}

fn run(store: &AssortmentStore, command: Commands) -> assortdb::Result<()> {
    match command {
        Commands::Stat => {
            let stats = store.cache_stats();
            println!("file:      {}", store.path().display());
            println!("capacity:  {}", store.capacity());
            println!("row width: {} bytes", store.layout().row_width());
            println!("entries:   {}", store.size());
            println!(
                "cache:     {} rows, {}/{} bytes, {} hits, {} misses",
                stats.rows, stats.used_bytes, stats.capacity_bytes, stats.hits, stats.misses
            );
        }
        Commands::Keys {
            start,
            descending,
            wrap,
        } => {
            let start = start.as_deref().map(TermHash::try_from).transpose()?;
            for term in store.keys(start.as_ref(), !descending, wrap)? {
                println!("{}", term);
            }
        }
        Commands::Dump => {
            for row in store.records()? {
                let container = store.decode(&row?)?;
                let refs: Vec<String> = container
                    .iter()
                    .map(|r| format!("{}:{}", r.doc_hash(), String::from_utf8_lossy(r.attributes())))
                    .collect();
                println!(
                    "{} @{} [{}]",
                    container.term_hash(),
                    container.updated(),
                    refs.join(", ")
                );
            }
        }
    }
    Ok(())
}
