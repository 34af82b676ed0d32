//! Cache layer - read-through lookups, namespace indexing and eviction.
//!
//! Writers never push fresh values into the cache. They evict the affected
//! namespaces and let the next reader repopulate from the store.

use crate::backend::CacheBackend;
use crate::error::Result;
use crate::key::{CacheKeyBuilder, Namespace};
use crate::observability::{CacheMetrics, LogMetrics, TtlPolicy};
use crate::serialization::{deserialize_from_cache, serialize_for_cache};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Keys currently stored under one namespace, plus its eviction epoch.
#[derive(Default)]
struct NamespaceIndex {
    epoch: u64,
    keys: HashSet<String>,
}

/// Shared, cloneable cache layer used by every entity service.
///
/// Clones share the backend, the namespace index and the metrics sink.
///
/// # Example
///
/// ```ignore
/// use delivery_kit::{CacheLayer, backend::InMemoryBackend, key::Namespace};
///
/// let cache = CacheLayer::new(InMemoryBackend::new());
///
/// let customers: Vec<CustomerView> = cache
///     .get_or_compute(Namespace::CUSTOMERS_LIST, &"all", None, || async {
///         load_customers_from_store().await
///     })
///     .await?;
///
/// // after a write
/// cache.evict_namespace(&[Namespace::CUSTOMERS, Namespace::CUSTOMERS_LIST]).await?;
/// ```
pub struct CacheLayer<B: CacheBackend> {
    backend: B,
    metrics: Arc<dyn CacheMetrics>,
    ttl_policy: TtlPolicy,
    index: Arc<DashMap<Namespace, NamespaceIndex>>,
}

impl<B: CacheBackend> Clone for CacheLayer<B> {
    fn clone(&self) -> Self {
        CacheLayer {
            backend: self.backend.clone(),
            metrics: Arc::clone(&self.metrics),
            ttl_policy: self.ttl_policy.clone(),
            index: Arc::clone(&self.index),
        }
    }
}

impl<B: CacheBackend> CacheLayer<B> {
    /// Create a cache layer with the default 10 minute TTL and log-based metrics.
    pub fn new(backend: B) -> Self {
        CacheLayer {
            backend,
            metrics: Arc::new(LogMetrics),
            ttl_policy: TtlPolicy::default(),
            index: Arc::new(DashMap::new()),
        }
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Box<dyn CacheMetrics>) -> Self {
        self.metrics = Arc::from(metrics);
        self
    }

    /// Set custom TTL policy.
    pub fn with_ttl_policy(mut self, policy: TtlPolicy) -> Self {
        self.ttl_policy = policy;
        self
    }

    /// TTL applied to entries of `namespace` when no override is given.
    pub fn ttl_for(&self, namespace: Namespace) -> Option<Duration> {
        self.ttl_policy.get_ttl(namespace.as_str())
    }

    /// Return the cached value for `key` in `namespace`, computing and
    /// storing it on a miss.
    ///
    /// `ttl` overrides the policy for this entry; `None` uses the policy.
    ///
    /// An entry that cannot be decoded (corrupt, old schema, stamped for a
    /// different key) is evicted and treated as a miss. A result computed
    /// while its namespace was being evicted is returned but not stored.
    ///
    /// # Errors
    ///
    /// - whatever `compute` returns; nothing is cached in that case
    /// - `Error::BackendError` if the backend read fails
    /// - `Error::SerializationError` if the computed value cannot be encoded
    pub async fn get_or_compute<T, K, F, Fut>(
        &self,
        namespace: Namespace,
        key: &K,
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<T>
    where
        T: Serialize + for<'de> Deserialize<'de>,
        K: Display + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let timer = Instant::now();
        let cache_key = CacheKeyBuilder::build(namespace, &key);

        match self.backend.get(&cache_key).await {
            Ok(Some(bytes)) => match deserialize_from_cache::<T>(&cache_key, &bytes) {
                Ok(value) => {
                    self.metrics.record_hit(&cache_key, timer.elapsed());
                    return Ok(value);
                }
                Err(e) if e.is_corrupt_entry() => {
                    warn!("Evicting undecodable cache entry {}: {}", cache_key, e);
                    self.metrics.record_error(&cache_key, &e.to_string());
                    if let Err(e) = self.backend.delete(&cache_key).await {
                        warn!("Failed to evict {}: {}", cache_key, e);
                    }
                }
                Err(e) => {
                    self.metrics.record_error(&cache_key, &e.to_string());
                    return Err(e);
                }
            },
            Ok(None) => {}
            Err(e) => {
                self.metrics.record_error(&cache_key, &e.to_string());
                return Err(e);
            }
        }

        debug!("Cache miss for {}, computing", cache_key);
        let epoch = self.epoch(namespace);
        let value = compute().await?;

        let bytes = serialize_for_cache(&cache_key, &value)?;
        self.store_if_current(namespace, &cache_key, epoch, bytes, ttl)
            .await;

        self.metrics.record_miss(&cache_key, timer.elapsed());
        Ok(value)
    }

    /// Store a value the caller already holds under `key` and record it for
    /// bulk invalidation of `namespace`.
    ///
    /// For warming the cache. The services populate single entities and
    /// list results through [`get_or_compute`](Self::get_or_compute), which
    /// indexes keys the same way and additionally drops a populate that
    /// raced an eviction.
    ///
    /// # Errors
    ///
    /// - `Error::SerializationError` if the value cannot be encoded
    /// - `Error::BackendError` if the backend write fails
    pub async fn put_and_index<T, K>(
        &self,
        namespace: Namespace,
        key: &K,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()>
    where
        T: Serialize,
        K: Display + ?Sized,
    {
        let timer = Instant::now();
        let cache_key = CacheKeyBuilder::build(namespace, &key);
        let bytes = serialize_for_cache(&cache_key, value)?;

        self.index
            .entry(namespace)
            .or_default()
            .keys
            .insert(cache_key.clone());

        let ttl = ttl.or_else(|| self.ttl_for(namespace));
        self.backend.set(&cache_key, bytes, ttl).await?;
        self.metrics.record_set(&cache_key, timer.elapsed());
        Ok(())
    }

    /// Remove every entry of each namespace immediately.
    ///
    /// Also advances each namespace's epoch so that reads which started
    /// before this call cannot store what they computed.
    ///
    /// # Errors
    ///
    /// Returns `Error::BackendError` if the backend delete fails.
    pub async fn evict_namespace(&self, namespaces: &[Namespace]) -> Result<()> {
        for namespace in namespaces {
            let keys: Vec<String> = {
                let mut index = self.index.entry(*namespace).or_default();
                index.epoch += 1;
                index.keys.drain().collect()
            };

            let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
            if let Err(e) = self.backend.mdelete(&refs).await {
                self.metrics.record_error(namespace.as_str(), &e.to_string());
                return Err(e);
            }

            self.metrics.record_evict(namespace.as_str(), keys.len());
            debug!("✓ Evicted namespace {} ({} keys)", namespace, keys.len());
        }
        Ok(())
    }

    /// Number of keys currently indexed under `namespace`.
    pub fn indexed_len(&self, namespace: Namespace) -> usize {
        self.index
            .get(&namespace)
            .map(|index| index.keys.len())
            .unwrap_or(0)
    }

    /// Get backend reference.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn epoch(&self, namespace: Namespace) -> u64 {
        self.index.entry(namespace).or_default().epoch
    }

    /// Populate after a miss, unless the namespace was evicted since
    /// `epoch` was read. Backend write failures are logged, not returned.
    async fn store_if_current(
        &self,
        namespace: Namespace,
        cache_key: &str,
        epoch: u64,
        bytes: Vec<u8>,
        ttl: Option<Duration>,
    ) {
        {
            let mut index = self.index.entry(namespace).or_default();
            if index.epoch != epoch {
                debug!("Namespace {} evicted during compute, not caching {}", namespace, cache_key);
                return;
            }
            index.keys.insert(cache_key.to_string());
        }

        let ttl = ttl.or_else(|| self.ttl_for(namespace));
        let timer = Instant::now();
        if let Err(e) = self.backend.set(cache_key, bytes, ttl).await {
            warn!("Failed to populate cache for {}: {}", cache_key, e);
            self.metrics.record_error(cache_key, &e.to_string());
            return;
        }
        self.metrics.record_set(cache_key, timer.elapsed());

        // An eviction that ran while the write above was in flight may have
        // deleted the key before it landed.
        if self.epoch(namespace) != epoch {
            if let Err(e) = self.backend.delete(cache_key).await {
                warn!("Failed to drop stale populate {}: {}", cache_key, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const NS: Namespace = Namespace::new("test");
    const NS_LIST: Namespace = Namespace::new("test:list");

    fn counting(counter: &AtomicUsize, value: &str) -> Result<String> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(value.to_string())
    }

    #[tokio::test]
    async fn test_get_or_compute_populates_then_hits() {
        let cache = CacheLayer::new(InMemoryBackend::new());
        let calls = AtomicUsize::new(0);

        let first: String = cache
            .get_or_compute(NS, "1", None, || async { counting(&calls, "db_data") })
            .await
            .expect("first read");
        let second: String = cache
            .get_or_compute(NS, "1", None, || async { counting(&calls, "other") })
            .await
            .expect("second read");

        assert_eq!(first, "db_data");
        assert_eq!(second, "db_data");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.indexed_len(NS), 1);
    }

    #[tokio::test]
    async fn test_compute_error_is_propagated_and_not_cached() {
        let cache = CacheLayer::new(InMemoryBackend::new());

        let result: Result<String> = cache
            .get_or_compute(NS, "missing", None, || async {
                Err(Error::not_found("Customer"))
            })
            .await;

        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(cache.indexed_len(NS), 0);
        assert!(cache.backend().is_empty());
    }

    #[tokio::test]
    async fn test_evict_namespace_forces_recompute() {
        let cache = CacheLayer::new(InMemoryBackend::new());
        let calls = AtomicUsize::new(0);

        for id in ["1", "2"] {
            let _: String = cache
                .get_or_compute(NS, id, None, || async { counting(&calls, "v1") })
                .await
                .expect("populate");
        }
        let _: Vec<String> = cache
            .get_or_compute(NS_LIST, "all", None, || async {
                Ok(vec!["v1".to_string()])
            })
            .await
            .expect("populate list");

        cache
            .evict_namespace(&[NS, NS_LIST])
            .await
            .expect("evict");

        assert_eq!(cache.indexed_len(NS), 0);
        assert_eq!(cache.indexed_len(NS_LIST), 0);
        assert!(cache.backend().is_empty());

        let fresh: String = cache
            .get_or_compute(NS, "1", None, || async { counting(&calls, "v2") })
            .await
            .expect("recompute");
        assert_eq!(fresh, "v2");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_evict_leaves_other_namespaces_alone() {
        let cache = CacheLayer::new(InMemoryBackend::new());

        cache
            .put_and_index(NS, "1", &"a".to_string(), None)
            .await
            .expect("put");
        cache
            .put_and_index(Namespace::PRODUCTS, "1", &"b".to_string(), None)
            .await
            .expect("put");

        cache.evict_namespace(&[NS]).await.expect("evict");

        assert_eq!(cache.indexed_len(Namespace::PRODUCTS), 1);
        assert!(cache
            .backend()
            .exists("products:1")
            .await
            .expect("exists"));
    }

    #[tokio::test]
    async fn test_put_and_index_is_served_by_get_or_compute() {
        let cache = CacheLayer::new(InMemoryBackend::new());
        cache
            .put_and_index(NS_LIST, "all", &vec![1u32, 2, 3], None)
            .await
            .expect("put");

        let listed: Vec<u32> = cache
            .get_or_compute(NS_LIST, "all", None, || async {
                Err(Error::Other("should be served from cache".to_string()))
            })
            .await
            .expect("read");
        assert_eq!(listed, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_ttl_expiry_is_treated_as_absent() {
        let cache = CacheLayer::new(InMemoryBackend::new());
        let calls = AtomicUsize::new(0);
        let ttl = Some(Duration::from_millis(50));

        let _: String = cache
            .get_or_compute(NS, "1", ttl, || async { counting(&calls, "old") })
            .await
            .expect("populate");

        tokio::time::sleep(Duration::from_millis(80)).await;

        let value: String = cache
            .get_or_compute(NS, "1", ttl, || async { counting(&calls, "new") })
            .await
            .expect("recompute");
        assert_eq!(value, "new");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_recomputed() {
        let cache = CacheLayer::new(InMemoryBackend::new());
        cache
            .backend()
            .set("test:1", b"garbage".to_vec(), None)
            .await
            .expect("set");

        let value: String = cache
            .get_or_compute(NS, "1", None, || async { Ok("recomputed".to_string()) })
            .await
            .expect("read");
        assert_eq!(value, "recomputed");
    }

    #[tokio::test]
    async fn test_entry_under_foreign_key_is_never_served() {
        let cache = CacheLayer::new(InMemoryBackend::new());
        cache
            .put_and_index(NS, "a", &"value-for-a".to_string(), None)
            .await
            .expect("put");

        // Copy a's bytes under b's key behind the cache layer's back.
        let bytes = cache
            .backend()
            .get("test:a")
            .await
            .expect("get")
            .expect("present");
        cache
            .backend()
            .set("test:b", bytes, None)
            .await
            .expect("set");

        let value: String = cache
            .get_or_compute(NS, "b", None, || async { Ok("value-for-b".to_string()) })
            .await
            .expect("read");
        assert_eq!(value, "value-for-b");
    }

    #[tokio::test]
    async fn test_eviction_during_compute_skips_populate() {
        let cache = CacheLayer::new(InMemoryBackend::new());
        let evicting = cache.clone();

        let value: String = cache
            .get_or_compute(NS, "1", None, || async move {
                evicting.evict_namespace(&[NS]).await.expect("evict");
                Ok("computed-before-write".to_string())
            })
            .await
            .expect("read");

        assert_eq!(value, "computed-before-write");
        assert!(!cache.backend().exists("test:1").await.expect("exists"));
        assert_eq!(cache.indexed_len(NS), 0);
    }

    #[tokio::test]
    async fn test_custom_metrics_see_hits_misses_and_evictions() {
        #[derive(Clone, Default)]
        struct TestMetrics {
            events: Arc<Mutex<Vec<String>>>,
        }

        impl CacheMetrics for TestMetrics {
            fn record_hit(&self, key: &str, _duration: Duration) {
                self.events.lock().unwrap().push(format!("hit {}", key));
            }
            fn record_miss(&self, key: &str, _duration: Duration) {
                self.events.lock().unwrap().push(format!("miss {}", key));
            }
            fn record_evict(&self, namespace: &str, keys: usize) {
                self.events
                    .lock()
                    .unwrap()
                    .push(format!("evict {} {}", namespace, keys));
            }
        }

        let metrics = TestMetrics::default();
        let cache =
            CacheLayer::new(InMemoryBackend::new()).with_metrics(Box::new(metrics.clone()));

        for _ in 0..2 {
            let _: String = cache
                .get_or_compute(NS, "1", None, || async { Ok("v".to_string()) })
                .await
                .expect("read");
        }
        cache.evict_namespace(&[NS]).await.expect("evict");

        let events = metrics.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "miss test:1".to_string(),
                "hit test:1".to_string(),
                "evict test 1".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_ttl_policy_is_applied() {
        let cache = CacheLayer::new(InMemoryBackend::new())
            .with_ttl_policy(TtlPolicy::PerNamespace(|ns| match ns {
                "test:list" => Duration::from_secs(60),
                _ => Duration::from_secs(600),
            }));

        assert_eq!(cache.ttl_for(NS_LIST), Some(Duration::from_secs(60)));
        assert_eq!(cache.ttl_for(NS), Some(Duration::from_secs(600)));
    }

    #[tokio::test]
    async fn test_concurrent_readers_and_evictors() {
        let cache = CacheLayer::new(InMemoryBackend::new());
        let mut handles = vec![];

        for i in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                for round in 0..20 {
                    let key = format!("{}", i % 4);
                    let expected = format!("value-{}", key);
                    let value: String = cache
                        .get_or_compute(NS, key.as_str(), None, || async {
                            Ok(expected.clone())
                        })
                        .await
                        .expect("read");
                    // Never a value that belongs to another key.
                    assert_eq!(value, expected);
                    if round % 5 == 0 {
                        cache.evict_namespace(&[NS]).await.expect("evict");
                    }
                }
            }));
        }

        for handle in handles {
            handle.await.expect("Task failed");
        }
    }
}
