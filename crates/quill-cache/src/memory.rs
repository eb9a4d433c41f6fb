//! In-process cache backed by `mini-moka`.
//!
//! [`MemoryCache`] keeps each bucket in its own bounded concurrent map.
//! Buckets evict by capacity and, when the bucket's [`BucketPolicy`] has a
//! time-to-live, by age. Reads are lock-free; concurrent writes to the same
//! key are last-writer-wins.
//!
//! ```text
//! MemoryCache
//! +-- "metadata"   capacity 1024, ttl 1h
//! +-- "handles"    capacity 4096, no ttl
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use mini_moka::sync::Cache as MokaCache;

use crate::{Cache, CacheBucket};

const DEFAULT_CAPACITY: u64 = 1024;

/// Eviction policy for one bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BucketPolicy {
    /// Maximum number of entries kept.
    pub capacity: u64,
    /// Entry lifetime, `None` keeps entries until evicted by capacity.
    pub ttl: Option<Duration>,
}

impl BucketPolicy {
    /// Policy with a capacity bound and no expiry.
    #[must_use]
    pub fn bounded(capacity: u64) -> Self {
        Self {
            capacity,
            ttl: None,
        }
    }

    /// Set the entry time-to-live.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    fn build(self) -> MokaCache<String, Arc<[u8]>> {
        let mut builder = MokaCache::builder().max_capacity(self.capacity);
        if let Some(ttl) = self.ttl {
            builder = builder.time_to_live(ttl);
        }
        builder.build()
    }
}

impl Default for BucketPolicy {
    fn default() -> Self {
        Self::bounded(DEFAULT_CAPACITY)
    }
}

/// Bounded in-memory [`Cache`].
///
/// Buckets are created lazily on first use. Handles returned for the same
/// bucket name share storage.
pub struct MemoryCache {
    default_policy: BucketPolicy,
    policies: HashMap<String, BucketPolicy>,
    buckets: Mutex<HashMap<String, MokaCache<String, Arc<[u8]>>>>,
}

impl MemoryCache {
    /// Create a cache whose buckets use `default_policy` unless overridden.
    #[must_use]
    pub fn new(default_policy: BucketPolicy) -> Self {
        Self {
            default_policy,
            policies: HashMap::new(),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Override the policy of a named bucket.
    ///
    /// Must be called before the bucket is first opened.
    #[must_use]
    pub fn with_bucket(mut self, name: impl Into<String>, policy: BucketPolicy) -> Self {
        self.policies.insert(name.into(), policy);
        self
    }

    fn policy_for(&self, name: &str) -> BucketPolicy {
        self.policies
            .get(name)
            .copied()
            .unwrap_or(self.default_policy)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(BucketPolicy::default())
    }
}

impl Cache for MemoryCache {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket> {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        let entries = buckets
            .entry(name.to_owned())
            .or_insert_with(|| {
                let policy = self.policy_for(name);
                tracing::debug!(
                    bucket = name,
                    capacity = policy.capacity,
                    ttl = ?policy.ttl,
                    "Creating memory cache bucket"
                );
                policy.build()
            })
            .clone();

        Box::new(MemoryCacheBucket { entries })
    }
}

/// A single bucket backed by a `mini-moka` cache.
struct MemoryCacheBucket {
    entries: MokaCache<String, Arc<[u8]>>,
}

impl CacheBucket for MemoryCacheBucket {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries
            .get(&key.to_owned())
            .map(|value| value.to_vec())
    }

    fn set(&self, key: &str, value: &[u8]) {
        self.entries.insert(key.to_owned(), Arc::from(value));
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_set_then_get() {
        let cache = MemoryCache::default();
        let bucket = cache.bucket("metadata");

        bucket.set("https://example.com/", b"cached");

        assert_eq!(bucket.get("https://example.com/"), Some(b"cached".to_vec()));
    }

    #[test]
    fn test_overwrite_is_last_writer_wins() {
        let cache = MemoryCache::default();
        let bucket = cache.bucket("handles");

        bucket.set("alice.test", b"did:plc:old");
        bucket.set("alice.test", b"did:plc:new");

        assert_eq!(bucket.get("alice.test"), Some(b"did:plc:new".to_vec()));
    }

    #[test]
    fn test_same_name_shares_storage() {
        let cache = MemoryCache::default();
        cache.bucket("metadata").set("k", b"v");

        assert_eq!(cache.bucket("metadata").get("k"), Some(b"v".to_vec()));
    }

    #[test]
    fn test_buckets_are_isolated() {
        let cache = MemoryCache::default();
        cache.bucket("metadata").set("k", b"v");

        assert_eq!(cache.bucket("handles").get("k"), None);
    }

    #[test]
    fn test_ttl_expires_entries() {
        let cache = MemoryCache::default().with_bucket(
            "metadata",
            BucketPolicy::bounded(16).with_ttl(Duration::from_millis(50)),
        );
        let bucket = cache.bucket("metadata");
        bucket.set("k", b"v");
        assert_eq!(bucket.get("k"), Some(b"v".to_vec()));

        thread::sleep(Duration::from_millis(150));

        assert_eq!(bucket.get("k"), None);
    }

    #[test]
    fn test_policy_lookup() {
        let cache = MemoryCache::new(BucketPolicy::bounded(8))
            .with_bucket("handles", BucketPolicy::bounded(4096));

        assert_eq!(cache.policy_for("handles"), BucketPolicy::bounded(4096));
        assert_eq!(cache.policy_for("other"), BucketPolicy::bounded(8));
    }

    #[test]
    fn test_concurrent_writers() {
        let cache = Arc::new(MemoryCache::default());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    let bucket = cache.bucket("metadata");
                    bucket.set(&format!("key-{i}"), b"value");
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let bucket = cache.bucket("metadata");
        for i in 0..4 {
            assert_eq!(bucket.get(&format!("key-{i}")), Some(b"value".to_vec()));
        }
    }
}
