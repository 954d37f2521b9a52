//! Bounded in-memory cache with per-entry expiry
//!
//! This module provides an expiring key-value store that caps redundant
//! network calls. Entries carry their own time-to-live, the store holds at
//! most a fixed number of entries (evicting the oldest-inserted first),
//! and a background task periodically sweeps out entries that expired
//! without being read again.

mod store;

pub use store::{CacheStats, CleanupHandle, ExpiringCache, DEFAULT_CLEANUP_PERIOD, DEFAULT_MAX_ENTRIES};
