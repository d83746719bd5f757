//! Command-line interface parsing for slotcache
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! a `CacheConfig` describing where the cache lives and how loudly to log.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;
use thiserror::Error;

use crate::cache::{FileStore, SlotId};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// The specified slot name is not recognized
    #[error("Invalid slot: '{0}'. Valid slots: userData, plansData, authData")]
    InvalidSlot(String),

    /// The value given to `set` is not JSON
    #[error("Invalid JSON value: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// No --cache-dir was given and no XDG cache directory exists
    #[error("Could not determine a cache directory; pass --cache-dir")]
    NoCacheDirectory,
}

/// slotcache - inspect and manage the subscriber data cache
#[derive(Parser, Debug)]
#[command(name = "slotcache")]
#[command(about = "Inspect and manage the subscriber data cache")]
#[command(version)]
pub struct Cli {
    /// Directory holding cache entries (defaults to the XDG cache directory)
    #[arg(long, value_name = "DIR", env = "SLOTCACHE_DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Cache operations exposed on the command line
///
/// Valid slots: userData (user), plansData (plans), authData (auth)
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print a slot's value if it is fresh; stale entries are evicted
    Get {
        #[arg(value_parser = parse_slot_arg)]
        slot: SlotId,
    },
    /// Store a JSON value in a slot
    Set {
        #[arg(value_parser = parse_slot_arg)]
        slot: SlotId,
        /// JSON payload, e.g. '{"username":"alice"}'
        value: String,
    },
    /// Remove a slot's entry
    Clear {
        #[arg(value_parser = parse_slot_arg)]
        slot: SlotId,
    },
    /// Remove every slot's entry
    ClearAll,
    /// Show the state of every slot without modifying anything
    Status,
}

/// Configuration derived from CLI arguments for startup
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Directory the file store writes to
    pub cache_dir: PathBuf,
    /// Whether debug logging is enabled
    pub verbose: bool,
}

/// Parses a slot argument into a `SlotId`.
///
/// # Returns
/// * `Ok(SlotId)` if the string names a slot
/// * `Err(CliError::InvalidSlot)` otherwise
pub fn parse_slot_arg(s: &str) -> Result<SlotId, CliError> {
    SlotId::from_name(s).ok_or_else(|| CliError::InvalidSlot(s.to_string()))
}

/// Parses the payload of `set`
pub fn parse_json_arg(s: &str) -> Result<Value, CliError> {
    Ok(serde_json::from_str(s)?)
}

impl CacheConfig {
    /// Creates a CacheConfig from parsed CLI arguments.
    ///
    /// Falls back to the XDG cache directory when no directory is given.
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let cache_dir = match &cli.cache_dir {
            Some(dir) => dir.clone(),
            None => FileStore::new()
                .map(|store| store.dir().to_path_buf())
                .ok_or(CliError::NoCacheDirectory)?,
        };

        Ok(CacheConfig {
            cache_dir,
            verbose: cli.verbose,
        })
    }

    /// Default `tracing` filter when `RUST_LOG` is not set
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "slotcache=debug,info"
        } else {
            "slotcache=warn"
        }
    }
}
