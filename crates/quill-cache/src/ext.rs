//! Extension trait for [`CacheBucket`] with typed convenience methods.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::CacheBucket;

/// Typed convenience methods for [`CacheBucket`].
///
/// [`CacheBucket`] stays object-safe and byte-oriented; callers get
/// `get_json`/`set_json` and `get_string`/`set_string` through a blanket impl.
///
/// # Example
///
/// ```
/// use quill_cache::{Cache, CacheBucketExt, MemoryCache};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize, PartialEq, Debug)]
/// struct Summary { title: String }
///
/// let cache = MemoryCache::default();
/// let bucket = cache.bucket("metadata");
///
/// bucket.set_json("https://example.com/", &Summary { title: "Example".into() });
/// let hit: Option<Summary> = bucket.get_json("https://example.com/");
/// assert_eq!(hit.map(|s| s.title), Some("Example".to_owned()));
/// ```
pub trait CacheBucketExt: CacheBucket {
    /// Retrieve a JSON-deserialized value from the cache.
    ///
    /// Returns `None` on cache miss or deserialization failure.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = self.get(key)?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Store a value as JSON in the cache.
    ///
    /// Silently does nothing if serialization fails.
    fn set_json<T: Serialize>(&self, key: &str, value: &T) {
        if let Ok(bytes) = serde_json::to_vec(value) {
            self.set(key, &bytes);
        }
    }

    /// Retrieve a cached UTF-8 string.
    fn get_string(&self, key: &str) -> Option<String> {
        let bytes = self.get(key)?;
        String::from_utf8(bytes).ok()
    }

    /// Store a string value in the cache.
    fn set_string(&self, key: &str, value: &str) {
        self.set(key, value.as_bytes());
    }
}

impl<B: CacheBucket + ?Sized> CacheBucketExt for B {}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    use super::*;
    use crate::{Cache, MemoryCache};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Entry {
        did: String,
        hits: u32,
    }

    #[test]
    fn test_json_roundtrip_through_memory_bucket() {
        let cache = MemoryCache::default();
        let bucket = cache.bucket("handles");
        let entry = Entry {
            did: "did:plc:abc".to_owned(),
            hits: 3,
        };

        bucket.set_json("alice.test", &entry);

        assert_eq!(bucket.get_json::<Entry>("alice.test"), Some(entry));
    }

    #[test]
    fn test_get_json_wrong_shape_is_miss() {
        let cache = MemoryCache::default();
        let bucket = cache.bucket("handles");
        bucket.set_string("alice.test", "not json");

        assert_eq!(bucket.get_json::<Entry>("alice.test"), None);
        assert_eq!(bucket.get_string("alice.test").as_deref(), Some("not json"));
    }

    #[test]
    fn test_get_string_invalid_utf8_is_miss() {
        let cache = MemoryCache::default();
        let bucket = cache.bucket("raw");
        bucket.set("bytes", &[0xff, 0xfe]);

        assert_eq!(bucket.get_string("bytes"), None);
    }
}
