//! Observability hooks and time-to-live policies for the cache layer.
//!
//! - **Metrics (`CacheMetrics`)**: hits, misses, populates, evictions, errors
//! - **TTL Policies (`TtlPolicy`)**: how long entries stay servable
//!
//! The default metrics sink is [`LogMetrics`], which writes through the `log`
//! crate. Plug in your own to feed a monitoring system:
//!
//! ```ignore
//! use delivery_kit::observability::CacheMetrics;
//! use std::time::Duration;
//!
//! struct PrometheusMetrics;
//!
//! impl CacheMetrics for PrometheusMetrics {
//!     fn record_hit(&self, _key: &str, _duration: Duration) {
//!         // counter!("cache_hits").inc();
//!     }
//! }
//!
//! let cache = CacheLayer::new(backend).with_metrics(Box::new(PrometheusMetrics));
//! ```
//!
//! TTL policies:
//!
//! ```
//! use delivery_kit::observability::TtlPolicy;
//! use std::time::Duration;
//!
//! // Ten minutes for everything (the default)
//! let _policy = TtlPolicy::default();
//!
//! // Lists expire faster than single entities
//! let _policy = TtlPolicy::PerNamespace(|namespace| {
//!     if namespace.ends_with(":list") {
//!         Duration::from_secs(60)
//!     } else {
//!         Duration::from_secs(600)
//!     }
//! });
//! ```

use std::time::Duration;

/// Default entry lifetime: 10 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Trait for cache metrics collection.
pub trait CacheMetrics: Send + Sync {
    /// Record a cache hit.
    fn record_hit(&self, key: &str, duration: Duration) {
        debug!("Cache HIT: {} took {:?}", key, duration);
    }

    /// Record a cache miss (the value was recomputed).
    fn record_miss(&self, key: &str, duration: Duration) {
        debug!("Cache MISS: {} took {:?}", key, duration);
    }

    /// Record a cache populate.
    fn record_set(&self, key: &str, duration: Duration) {
        debug!("Cache SET: {} took {:?}", key, duration);
    }

    /// Record a namespace eviction and how many keys it dropped.
    fn record_evict(&self, namespace: &str, keys: usize) {
        debug!("Cache EVICT: {} ({} keys)", namespace, keys);
    }

    /// Record an error.
    fn record_error(&self, key: &str, error: &str) {
        warn!("Cache ERROR for {}: {}", key, error);
    }
}

/// Metrics sink that only logs (uses the trait's default methods).
#[derive(Clone, Default)]
pub struct LogMetrics;

impl CacheMetrics for LogMetrics {}

/// Metrics sink that discards everything.
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {
    fn record_hit(&self, _key: &str, _duration: Duration) {}
    fn record_miss(&self, _key: &str, _duration: Duration) {}
    fn record_set(&self, _key: &str, _duration: Duration) {}
    fn record_evict(&self, _namespace: &str, _keys: usize) {}
    fn record_error(&self, _key: &str, _error: &str) {}
}

/// TTL (Time-to-Live) policy for cache entries.
#[derive(Clone, Debug)]
pub enum TtlPolicy {
    /// Fixed duration for all entries
    Fixed(Duration),

    /// No TTL (entries live until evicted)
    Infinite,

    /// Custom per-namespace policy
    PerNamespace(fn(&str) -> Duration),
}

impl Default for TtlPolicy {
    fn default() -> Self {
        TtlPolicy::Fixed(DEFAULT_TTL)
    }
}

impl TtlPolicy {
    /// Get TTL for a namespace.
    pub fn get_ttl(&self, namespace: &str) -> Option<Duration> {
        match self {
            TtlPolicy::Fixed(d) => Some(*d),
            TtlPolicy::Infinite => None,
            TtlPolicy::PerNamespace(f) => Some(f(namespace)),
        }
    }
}
