//! slotcache - inspect and manage the subscriber data cache
//!
//! Operates on the same file-backed cache directory the app's data loaders use.

use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use slotcache::cache::{FileStore, SlotId, TtlCache};
use slotcache::cli::{parse_json_arg, CacheConfig, Cli, Command};

/// Installs a stderr log subscriber so stdout only carries command output
fn init_logging(config: &CacheConfig) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_filter().into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Runs a single command against the cache
async fn run(cache: &TtlCache, command: Command) -> Result<ExitCode, Box<dyn Error>> {
    match command {
        Command::Get { slot } => match cache.read_raw(slot).await {
            Some(value) => {
                println!("{}", serde_json::to_string_pretty(&value)?);
                Ok(ExitCode::SUCCESS)
            }
            None => Ok(ExitCode::from(1)),
        },
        Command::Set { slot, value } => {
            let value = parse_json_arg(&value)?;
            cache.write_raw(slot, value).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Clear { slot } => {
            cache.clear(slot).await;
            Ok(ExitCode::SUCCESS)
        }
        Command::ClearAll => {
            cache.clear_all().await;
            Ok(ExitCode::SUCCESS)
        }
        Command::Status => {
            for slot in SlotId::ALL {
                let status = cache.inspect(slot).await;
                println!("{:<10} ttl={:>4}s  {}", slot.key(), slot.ttl().as_secs(), status);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match CacheConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        }
    };
    init_logging(&config);

    tracing::debug!(dir = %config.cache_dir.display(), "using cache directory");
    let cache = TtlCache::new(Arc::new(FileStore::with_dir(config.cache_dir.clone())));

    match run(&cache, cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(2)
        }
    }
}
