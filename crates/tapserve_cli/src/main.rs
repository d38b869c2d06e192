//! Tapserve sync CLI
//!
//! Command-line tool for inspecting and driving the offline expense store.
//!
//! # Commands
//!
//! - `stats` - Display store counters and the last sync time
//! - `list` / `queue` - Show stored expenses and pending mutations
//! - `add` / `edit` / `delete` - Record local changes
//! - `sync` / `retry` / `clear-errors` - Talk to the expenses API
//! - `compact` / `reset` - Journal maintenance

mod commands;

use clap::{Parser, Subcommand};
use commands::edit::{AddArgs, EditArgs};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tapserve_offline::{OfflineStore, StoreConfig};
use tapserve_sync_engine::{HttpExpenseApi, SyncConfig, SyncEngine, DEFAULT_BASE_URL};
use tracing_subscriber::EnvFilter;

/// Offline expense store and sync tools.
#[derive(Parser)]
#[command(name = "tapserve-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the offline store journal
    #[arg(
        global = true,
        short,
        long,
        env = "TAPSERVE_STORE",
        default_value = "tapserve-offline.journal"
    )]
    store: PathBuf,

    /// Base URL of the expenses API
    #[arg(global = true, long, env = "TAPSERVE_API_URL", default_value = DEFAULT_BASE_URL)]
    api_url: String,

    /// Request timeout in seconds
    #[arg(global = true, long, default_value = "30")]
    timeout: u64,

    /// Output format (text, json)
    #[arg(global = true, short, long, default_value = "text")]
    format: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display store counters and the last sync time
    Stats,

    /// List stored expenses
    List {
        /// Only this tenant
        #[arg(long)]
        tenant: Option<String>,

        /// Only this outlet
        #[arg(long)]
        outlet: Option<String>,

        /// Only records not yet accepted by the server
        #[arg(short, long)]
        unsynced: bool,
    },

    /// Show pending mutations
    Queue {
        /// Show evicted mutations instead
        #[arg(long)]
        failed: bool,
    },

    /// Record a new expense
    Add(AddArgs),

    /// Change fields of a stored expense
    Edit(EditArgs),

    /// Delete a stored expense
    Delete {
        /// Expense id
        id: String,
    },

    /// Run one sync cycle against the API
    Sync,

    /// Push the mutation for one expense now, reviving it if evicted
    Retry {
        /// Expense id
        id: String,
    },

    /// Reset attempts and errors on all mutations
    ClearErrors,

    /// Rewrite the journal so it holds only live entries
    Compact,

    /// Delete all expenses, mutations and metadata
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Show version information
    Version,
}

fn build_engine(
    api_url: &str,
    timeout: Duration,
    store: Arc<OfflineStore>,
) -> Result<Arc<SyncEngine>, Box<dyn std::error::Error>> {
    let config = SyncConfig::new(api_url).with_timeout(timeout);
    let api = HttpExpenseApi::with_reqwest(config.base_url.clone(), config.timeout)?;
    Ok(SyncEngine::new(store, Arc::new(api), config))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let store = Arc::new(OfflineStore::open_file(
        &cli.store,
        StoreConfig::default().with_sync_on_write(true),
    ));
    let format = cli.format.as_str();

    match cli.command {
        Commands::Stats => commands::inspect::stats(&store, format).await?,
        Commands::List {
            tenant,
            outlet,
            unsynced,
        } => {
            commands::inspect::list(&store, tenant.as_deref(), outlet.as_deref(), unsynced, format)
                .await?
        }
        Commands::Queue { failed } => commands::inspect::queue(&store, failed, format).await?,
        Commands::Add(args) => commands::edit::add(&store, args, format).await?,
        Commands::Edit(args) => commands::edit::edit(&store, args, format).await?,
        Commands::Delete { id } => commands::edit::delete(&store, &id).await?,
        Commands::Sync => {
            let engine = build_engine(&cli.api_url, Duration::from_secs(cli.timeout), store)?;
            let result = commands::sync::sync(&engine, format).await;
            engine.destroy();
            result?;
        }
        Commands::Retry { id } => {
            let engine = build_engine(&cli.api_url, Duration::from_secs(cli.timeout), store)?;
            let result = commands::sync::retry(&engine, &id).await;
            engine.destroy();
            result?;
        }
        Commands::ClearErrors => commands::sync::clear_errors(&store).await?,
        Commands::Compact => commands::compact::compact(&store).await?,
        Commands::Reset { yes } => commands::compact::reset(&store, yes).await?,
        Commands::Version => {
            println!("tapserve-sync v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
