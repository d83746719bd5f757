//! Slot-based TTL cache for subscriber data
//!
//! Values are stored as JSON entries `{"timestamp", "data"}` in a pluggable
//! async key-value store. Each slot has a fixed TTL; reads serve fresh entries
//! and evict stale ones. The cache never returns storage errors to callers; a
//! failure degrades to a miss and is reported to the configured observer.

mod clock;
mod entry;
mod manager;
mod observer;
mod slot;
mod store;

pub use clock::{is_fresh_at, Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use manager::{CacheError, SlotStatus, TtlCache};
pub use observer::{CacheEvent, CacheObserver, CacheOp, RecordingObserver, TracingObserver};
pub use slot::{AuthDataSlot, PlansDataSlot, Slot, SlotId, UnknownSlot, UserDataSlot};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError, StoreResult};
