//! Cache abstraction layer for Quill.
//!
//! This crate provides generic caching traits that decouple cache consumers
//! (the metadata resolver, the Bluesky handle resolver) from the storage
//! mechanism. Two traits form the core API:
//!
//! - [`Cache`]: Factory for named cache buckets
//! - [`CacheBucket`]: Key-value store for raw bytes
//!
//! # Implementations
//!
//! - [`NullCache`] / [`NullCacheBucket`]: No-op implementations (always miss)
//! - [`MemoryCache`]: Bounded in-process cache with per-bucket time-to-live
//!
//! # Example
//!
//! ```
//! use quill_cache::{Cache, NullCache};
//!
//! let cache = NullCache;
//! let bucket = cache.bucket("metadata");
//! bucket.set("https://example.com/", b"{}");
//! assert_eq!(bucket.get("https://example.com/"), None); // NullCache always misses
//! ```

mod ext;
mod memory;

pub use ext::CacheBucketExt;
pub use memory::{BucketPolicy, MemoryCache};

/// A named partition within a [`Cache`].
///
/// Entries are never invalidated explicitly. Implementations may drop them
/// at any time (capacity pressure, expiry), so a miss is always a valid answer.
pub trait CacheBucket: Send + Sync {
    /// Retrieve a cached value.
    ///
    /// Returns `None` on cache miss or when the entry has expired.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store a value in the cache.
    ///
    /// Overwrites any existing entry for the same key. Concurrent writers to
    /// the same key are resolved last-writer-wins.
    fn set(&self, key: &str, value: &[u8]);
}

/// Factory for named cache [`CacheBucket`]s.
///
/// A `Cache` produces buckets that are logically isolated from each other.
pub trait Cache: Send + Sync {
    /// Open or create a named bucket.
    ///
    /// Calling `bucket` multiple times with the same name may return
    /// independent handles that share the same underlying storage.
    ///
    /// # Arguments
    ///
    /// * `name` - Bucket name (e.g., "metadata", "handles")
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket>;
}

/// No-op [`CacheBucket`] that never stores or retrieves data.
pub struct NullCacheBucket;

impl CacheBucket for NullCacheBucket {
    fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    fn set(&self, _key: &str, _value: &[u8]) {}
}

/// No-op [`Cache`] that always returns [`NullCacheBucket`]s.
///
/// Use when caching is disabled, and in tests that must observe every
/// upstream request.
pub struct NullCache;

impl Cache for NullCache {
    fn bucket(&self, _name: &str) -> Box<dyn CacheBucket> {
        Box::new(NullCacheBucket)
    }
}
