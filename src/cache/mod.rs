//! Generic in-memory query cache.
//!
//! This module is agnostic of the PokeAPI. It provides:
//! - One entry per canonical query key, shared by every consumer
//! - At most one in-flight load per key; concurrent callers join it
//! - Retention-based eviction that never touches entries with live subscribers
//! - Explicit subscribe/unsubscribe so views can observe state changes

mod store;
mod subscription;
mod traits;

pub use store::{CacheConfig, CacheStats, QueryCache};
pub use subscription::Subscription;
pub use traits::{CacheResult, CacheSource, Cancelled, QueryKey, QueryStatus};
