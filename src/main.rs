// rustyclint-cache maintenance tool.
// Inspects, purges, and clears the persistent cache and checks the offline app shell.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rustyclint_cache::cache::{self, ExpiringStore, spawn_sweeper};
use rustyclint_cache::network::{HttpFetcher, MemoryCacheStorage, NetworkCacheController};
use rustyclint_cache::{Config, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rustyclint-cache")]
#[command(about = "Maintain the rustyclint editor cache")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count live and expired entries
    Stats,
    /// Print a cached value as JSON
    Get {
        /// Full cache key, e.g. editor:tabs:v2
        key: String,
    },
    /// Delete expired entries
    Purge,
    /// Delete every entry
    Clear,
    /// Purge expired entries periodically until interrupted
    Sweep,
    /// Install the network cache against the configured origin
    CheckShell,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rustyclint_cache=info"));

    // JSON lines when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

async fn run(command: Command) -> Result<ExitCode> {
    let config = Config::from_env()?;
    let store = cache::init(ExpiringStore::from_config(&config));

    match command {
        Command::Stats => {
            let stats = store.stats().await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Get { key } => match store.get::<serde_json::Value>(&key).await {
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None => {
                info!(key = %key, "Not cached");
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Purge => {
            let purged = store.purge_expired().await;
            info!(purged, "Purged expired cache entries");
        }
        Command::Clear => store.clear().await,
        Command::Sweep => {
            info!(interval_secs = config.sweep_interval.as_secs(), "Starting cache sweeper");
            let sweeper = spawn_sweeper(store.clone(), config.sweep_interval);
            tokio::signal::ctrl_c().await?;
            sweeper.abort();
            info!("Cache sweeper stopped");
        }
        Command::CheckShell => {
            let fetcher = HttpFetcher::new(config.origin.clone())?;
            let controller =
                NetworkCacheController::from_config(&config, MemoryCacheStorage::new(), fetcher);

            let installed = controller.install().await?;
            let activated = controller.activate().await?;
            info!(
                origin = %config.origin,
                bucket = %installed.bucket,
                precached = installed.precached,
                evicted = activated.deleted.len(),
                "Application shell is cacheable"
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}
