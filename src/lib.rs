//! slotcache library
//!
//! Slot-based TTL cache for subscriber self-service data, plus the loader
//! helpers and CLI parsing used by the `slotcache` binary.

pub mod cache;
pub mod cli;
pub mod data;
pub mod loader;
