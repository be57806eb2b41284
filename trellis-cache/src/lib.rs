//! # trellis-cache
//!
//! Bounded, thread-safe template cache with least-recently-used eviction and
//! per-entry access timestamps (TLRU).
//!
//! The [`Cache`] trait is the contract the renderer depends on; [`TlruCache`]
//! is the in-memory implementation.
//!
//! ```rust
//! use trellis_cache::{Cache, TlruCache};
//!
//! let cache = TlruCache::new(1);
//! cache.add("x", 1);
//! cache.add("y", 2);
//! assert_eq!(cache.get("x"), None);
//! assert_eq!(cache.get("y"), Some(2));
//! ```

mod recency;
pub mod tlru;

pub use tlru::{CacheStats, TlruCache};

/// A key → value store for composed templates.
///
/// Implementations must be safe to share between threads. The enable flag is
/// advisory: the store behaves the same whether it is on or off, and callers
/// decide whether to consult it.
pub trait Cache<V>: Send + Sync {
    /// Insert or replace `key`, marking it most recently used.
    fn add(&self, key: &str, value: V);

    /// Look up `key`, marking it most recently used on a hit.
    fn get(&self, key: &str) -> Option<V>;

    /// Delete `key` if present.
    fn remove(&self, key: &str);

    /// Delete every entry.
    fn clear(&self);

    /// Whether callers should use this cache.
    fn on(&self) -> bool;

    /// Flip the advisory enable flag.
    fn set_caching(&self, on: bool);
}
