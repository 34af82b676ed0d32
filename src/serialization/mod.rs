//! Postcard-based cache serialization with versioned, key-stamped envelopes.
//!
//! Every cache entry follows this format:
//! ```text
//! ┌─────────────────┬─────────────────┬──────────────┬──────────────────────────┐
//! │  MAGIC (4 bytes)│VERSION (4 bytes)│ KEY (string) │POSTCARD PAYLOAD (N bytes)│
//! └─────────────────┴─────────────────┴──────────────┴──────────────────────────┘
//!   "DKIT"              u32               full cache key   postcard::to_allocvec(T)
//! ```
//!
//! The key stamp lets a reader prove that the bytes it got back were written
//! for the key it asked for. A mismatch is reported as
//! [`Error::InvalidCacheEntry`] and the cache layer treats it as a miss.
//!
//! # Example
//!
//! ```rust
//! use delivery_kit::serialization::{serialize_for_cache, deserialize_from_cache};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Customer {
//!     id: u64,
//!     name: String,
//! }
//!
//! # fn main() -> delivery_kit::Result<()> {
//! let customer = Customer { id: 1, name: "Alice".to_string() };
//!
//! let bytes = serialize_for_cache("customers:1", &customer)?;
//! let back: Customer = deserialize_from_cache("customers:1", &bytes)?;
//! assert_eq!(customer, back);
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Magic header for delivery-kit entries: b"DKIT"
pub const CACHE_MAGIC: [u8; 4] = *b"DKIT";

/// Current schema version.
///
/// **CRITICAL:** Increment this constant when making breaking changes to any
/// cached projection (`CustomerView`, `ProductView` and their lists):
/// - Adding/removing struct fields
/// - Changing field types
/// - Reordering fields
///
/// Old entries are then evicted and recomputed instead of misread.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Versioned envelope for cache entries.
///
/// ```rust
/// use delivery_kit::serialization::CacheEnvelope;
///
/// let envelope = CacheEnvelope::new("products:all", "data");
/// assert_eq!(envelope.magic, *b"DKIT");
/// assert_eq!(envelope.key, "products:all");
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CacheEnvelope<T> {
    /// Magic header: must be b"DKIT"
    pub magic: [u8; 4],
    /// Schema version: must match CURRENT_SCHEMA_VERSION
    pub version: u32,
    /// Full cache key the payload was written under
    pub key: String,
    /// The actual cached data
    pub payload: T,
}

impl<T> CacheEnvelope<T> {
    /// Create a new envelope with current magic and version.
    pub fn new(key: impl Into<String>, payload: T) -> Self {
        Self {
            magic: CACHE_MAGIC,
            version: CURRENT_SCHEMA_VERSION,
            key: key.into(),
            payload,
        }
    }
}

/// Serialize a value with envelope for cache storage under `key`.
///
/// # Errors
///
/// Returns `Error::SerializationError` if Postcard serialization fails.
pub fn serialize_for_cache<T: Serialize>(key: &str, value: &T) -> Result<Vec<u8>> {
    let envelope = CacheEnvelope::new(key, value);
    postcard::to_allocvec(&envelope).map_err(|e| {
        log::error!("Cache serialization failed for {}: {}", key, e);
        Error::SerializationError(e.to_string())
    })
}

/// Deserialize a value read from `key`, validating the envelope.
///
/// Checks, in order: postcard decoding, magic header, schema version, and
/// finally that the stamped key equals `key`.
///
/// # Errors
///
/// - `Error::DeserializationError`: Corrupted Postcard payload
/// - `Error::InvalidCacheEntry`: Invalid magic header or foreign key stamp
/// - `Error::VersionMismatch`: Schema version mismatch
pub fn deserialize_from_cache<T>(key: &str, bytes: &[u8]) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let envelope: CacheEnvelope<T> = postcard::from_bytes(bytes).map_err(|e| {
        log::error!("Cache deserialization failed for {}: {}", key, e);
        Error::DeserializationError(e.to_string())
    })?;

    if envelope.magic != CACHE_MAGIC {
        log::warn!(
            "Invalid cache entry: expected magic {:?}, got {:?}",
            CACHE_MAGIC,
            envelope.magic
        );
        return Err(Error::InvalidCacheEntry(format!(
            "Invalid magic: expected {:?}, got {:?}",
            CACHE_MAGIC, envelope.magic
        )));
    }

    if envelope.version != CURRENT_SCHEMA_VERSION {
        log::warn!(
            "Cache version mismatch: expected {}, got {}",
            CURRENT_SCHEMA_VERSION,
            envelope.version
        );
        return Err(Error::VersionMismatch {
            expected: CURRENT_SCHEMA_VERSION,
            found: envelope.version,
        });
    }

    if envelope.key != key {
        log::warn!(
            "Cache entry key stamp mismatch: read {} but entry belongs to {}",
            key,
            envelope.key
        );
        return Err(Error::InvalidCacheEntry(format!(
            "Entry stamped for {} read under {}",
            envelope.key, key
        )));
    }

    Ok(envelope.payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
    struct TestData {
        id: u64,
        name: String,
        #[serde(with = "rust_decimal::serde::str")]
        price: Decimal,
    }

    fn sample() -> TestData {
        TestData {
            id: 123,
            name: "test".to_string(),
            price: Decimal::new(2999, 2),
        }
    }

    #[test]
    fn test_roundtrip_keeps_exact_decimal() {
        let data = sample();

        let bytes = serialize_for_cache("products:123", &data).unwrap();
        let deserialized: TestData = deserialize_from_cache("products:123", &bytes).unwrap();

        assert_eq!(data, deserialized);
        assert_eq!(deserialized.price.to_string(), "29.99");
    }

    #[test]
    fn test_envelope_structure() {
        let data = sample();
        let bytes = serialize_for_cache("products:123", &data).unwrap();

        let envelope: CacheEnvelope<TestData> = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(envelope.magic, CACHE_MAGIC);
        assert_eq!(envelope.version, CURRENT_SCHEMA_VERSION);
        assert_eq!(envelope.key, "products:123");
        assert_eq!(envelope.payload, data);
    }

    #[test]
    fn test_invalid_magic_rejected() {
        let mut envelope = CacheEnvelope::new("k", sample());
        envelope.magic = *b"XXXX";
        let bytes = postcard::to_allocvec(&envelope).unwrap();

        let result: Result<TestData> = deserialize_from_cache("k", &bytes);
        match result.unwrap_err() {
            Error::InvalidCacheEntry(_) => {}
            e => panic!("Expected InvalidCacheEntry, got {:?}", e),
        }
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut envelope = CacheEnvelope::new("k", sample());
        envelope.version = 999;
        let bytes = postcard::to_allocvec(&envelope).unwrap();

        let result: Result<TestData> = deserialize_from_cache("k", &bytes);
        match result.unwrap_err() {
            Error::VersionMismatch { expected, found } => {
                assert_eq!(expected, CURRENT_SCHEMA_VERSION);
                assert_eq!(found, 999);
            }
            e => panic!("Expected VersionMismatch, got {:?}", e),
        }
    }

    #[test]
    fn test_foreign_key_stamp_rejected() {
        let bytes = serialize_for_cache("customers:a", &sample()).unwrap();

        let result: Result<TestData> = deserialize_from_cache("customers:b", &bytes);
        match result.unwrap_err() {
            Error::InvalidCacheEntry(msg) => assert!(msg.contains("customers:a")),
            e => panic!("Expected InvalidCacheEntry, got {:?}", e),
        }
    }

    #[test]
    fn test_corrupted_payload_rejected() {
        let mut bytes = serialize_for_cache("k", &sample()).unwrap();
        let original_len = bytes.len();
        bytes.truncate(original_len / 2);

        let result: Result<TestData> = deserialize_from_cache("k", &bytes);
        match result.unwrap_err() {
            Error::DeserializationError(_) => {}
            e => panic!("Expected DeserializationError, got {:?}", e),
        }
    }

    #[test]
    fn test_deterministic_serialization() {
        let bytes1 = serialize_for_cache("k", &sample()).unwrap();
        let bytes2 = serialize_for_cache("k", &sample()).unwrap();
        assert_eq!(bytes1, bytes2);
    }
}
