//! RATCHET Resolver - dual-source record resolution
//!
//! Resolves a batch of keys against two sources at once: a persistent
//! record store (batched lookup) and a per-key default provider (the
//! static/bundled fallback). Results from both sources are concatenated
//! without deduplication, so a key present in both yields two entries.
//!
//! Defaults are fetched per key rather than batched, which lets callers
//! back different keys with different provider objects without demanding a
//! uniform batch API from that side.
//!
//! The resolver owns no state between calls; each resolution is a stateless
//! fan-out over the injected collaborators. The returned future delivers
//! the merged list exactly once, only after every issued fetch has
//! completed, and delivers nothing at all if dropped first.

use async_trait::async_trait;
use futures_util::future;
use ratchet_core::{new_request_id, ResolvedRecord};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

// ============================================================================
// COLLABORATOR TRAITS
// ============================================================================

/// Store-backed batched lookup.
///
/// A failed fetch is the implementer's concern: return an empty map (or
/// omit the failed keys) to degrade to "absent", or wrap the store with
/// stricter semantics at the boundary before handing it to the resolver.
#[async_trait]
pub trait RecordStore<K, R>: Send + Sync {
    /// Fetch whichever of `keys` the store holds.
    async fn get_batch(&self, keys: &[K]) -> HashMap<K, R>;
}

/// Per-key fallback lookup, independent for each key.
#[async_trait]
pub trait DefaultProvider<K, R>: Send + Sync {
    /// The bundled default for `key`, or `None` when no default exists
    /// (or the fetch failed - absent and failed are deliberately not
    /// distinguished here).
    async fn get_default(&self, key: &K) -> Option<R>;
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Stateless dual-source resolver.
#[derive(Debug, Default, Clone, Copy)]
pub struct DualSourceResolver;

impl DualSourceResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve `keys` against both sources and return the merged list.
    ///
    /// The store batch call and the per-key default lookups are issued
    /// together and joined; the result is built only after every branch has
    /// completed - there is no partial delivery. Store-sourced entries come
    /// first, then default-sourced entries, each preserving the input key
    /// order. Keys found in neither source are omitted.
    ///
    /// Dropping the returned future cancels the resolution silently.
    pub async fn resolve_all<K, R>(
        &self,
        keys: &[K],
        store: &dyn RecordStore<K, R>,
        defaults: &dyn DefaultProvider<K, R>,
    ) -> Vec<ResolvedRecord<K, R>>
    where
        K: Clone + Eq + Hash + Send + Sync,
        R: Send,
    {
        let request_id = new_request_id();
        debug!(%request_id, keys = keys.len(), "starting dual-source resolution");

        let store_branch = store.get_batch(keys);
        let defaults_branch = async {
            // Per-key walk: providers may differ per key, and a provider
            // with no default for a key answers None.
            let mut hits = Vec::new();
            for key in keys {
                if let Some(record) = defaults.get_default(key).await {
                    hits.push((key.clone(), record));
                }
            }
            hits
        };

        // Join semantics: nothing is delivered until both branches finish.
        let (mut store_hits, default_hits) = future::join(store_branch, defaults_branch).await;

        let mut merged = Vec::with_capacity(store_hits.len() + default_hits.len());
        for key in keys {
            if let Some(record) = store_hits.remove(key) {
                merged.push(ResolvedRecord::from_store(key.clone(), record));
            }
        }
        for (key, record) in default_hits {
            merged.push(ResolvedRecord::from_default(key, record));
        }

        debug!(%request_id, records = merged.len(), "dual-source resolution complete");
        merged
    }
}

// ============================================================================
// RESOLUTION HANDLE
// ============================================================================

/// A spawned resolution with a single-delivery, no-delivery-after-drop
/// contract.
///
/// For callers that hand the fan-out to the runtime instead of awaiting it
/// inline: the result is delivered at most once via [`ResolutionHandle::join`],
/// and dropping the handle aborts the underlying task, so no delivery can
/// occur after the owner is gone.
pub struct ResolutionHandle<K, R> {
    rx: oneshot::Receiver<Vec<ResolvedRecord<K, R>>>,
    task: tokio::task::JoinHandle<()>,
}

impl<K, R> ResolutionHandle<K, R>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    R: Send + 'static,
{
    /// Spawn a resolution onto the current tokio runtime.
    pub fn spawn(
        keys: Vec<K>,
        store: Arc<dyn RecordStore<K, R>>,
        defaults: Arc<dyn DefaultProvider<K, R>>,
    ) -> Self {
        let (tx, rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let records = DualSourceResolver::new()
                .resolve_all(&keys, store.as_ref(), defaults.as_ref())
                .await;
            // The receiver may already be gone; that is the silent
            // cancellation path.
            let _ = tx.send(records);
        });
        Self { rx, task }
    }

    /// Wait for the merged list. Returns `None` if the resolution was
    /// cancelled before completing.
    pub async fn join(mut self) -> Option<Vec<ResolvedRecord<K, R>>> {
        (&mut self.rx).await.ok()
    }
}

impl<K, R> Drop for ResolutionHandle<K, R> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Store backed by a fixed map.
    struct MapStore {
        records: HashMap<String, String>,
    }

    impl MapStore {
        fn new(pairs: &[(&str, &str)]) -> Self {
            Self {
                records: pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl RecordStore<String, String> for MapStore {
        async fn get_batch(&self, keys: &[String]) -> HashMap<String, String> {
            keys.iter()
                .filter_map(|k| self.records.get(k).map(|v| (k.clone(), v.clone())))
                .collect()
        }
    }

    /// Default provider backed by a fixed map.
    struct MapDefaults {
        records: HashMap<String, String>,
        calls: AtomicUsize,
    }

    impl MapDefaults {
        fn new(pairs: &[(&str, &str)]) -> Self {
            Self {
                records: pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DefaultProvider<String, String> for MapDefaults {
        async fn get_default(&self, key: &String) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.records.get(key).cloned()
        }
    }

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_each_source_contributes_its_matches() {
        let store = MapStore::new(&[("a", "store-a")]);
        let defaults = MapDefaults::new(&[("b", "default-b")]);
        let resolver = DualSourceResolver::new();

        let records = resolver
            .resolve_all(&keys(&["a", "b"]), &store, &defaults)
            .await;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, "a");
        assert_eq!(records[0].from_store.as_deref(), Some("store-a"));
        assert!(records[0].from_default.is_none());

        assert_eq!(records[1].key, "b");
        assert_eq!(records[1].from_default.as_deref(), Some("default-b"));
        assert!(records[1].from_store.is_none());
    }

    #[tokio::test]
    async fn test_key_in_both_sources_yields_two_entries() {
        let store = MapStore::new(&[("a", "store-a")]);
        let defaults = MapDefaults::new(&[("a", "default-a")]);
        let resolver = DualSourceResolver::new();

        let records = resolver.resolve_all(&keys(&["a"]), &store, &defaults).await;

        assert_eq!(records.len(), 2);
        assert!(records[0].is_store_sourced());
        assert_eq!(records[0].from_store.as_deref(), Some("store-a"));
        assert!(!records[1].is_store_sourced());
        assert_eq!(records[1].from_default.as_deref(), Some("default-a"));
    }

    #[tokio::test]
    async fn test_key_in_neither_source_is_omitted() {
        let store = MapStore::new(&[("a", "store-a")]);
        let defaults = MapDefaults::new(&[]);
        let resolver = DualSourceResolver::new();

        let records = resolver
            .resolve_all(&keys(&["a", "ghost"]), &store, &defaults)
            .await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "a");
    }

    #[tokio::test]
    async fn test_every_key_is_offered_to_the_default_provider() {
        let store = MapStore::new(&[("a", "store-a"), ("b", "store-b")]);
        let defaults = MapDefaults::new(&[]);
        let resolver = DualSourceResolver::new();

        let _ = resolver
            .resolve_all(&keys(&["a", "b", "c"]), &store, &defaults)
            .await;

        // Store hits do not short-circuit the default lookup for a key.
        assert_eq!(defaults.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_input_order_preserved_within_each_source() {
        let store = MapStore::new(&[("c", "s-c"), ("a", "s-a")]);
        let defaults = MapDefaults::new(&[("d", "d-d"), ("b", "d-b")]);
        let resolver = DualSourceResolver::new();

        let records = resolver
            .resolve_all(&keys(&["c", "b", "a", "d"]), &store, &defaults)
            .await;

        let store_keys: Vec<&str> = records
            .iter()
            .filter(|r| r.is_store_sourced())
            .map(|r| r.key.as_str())
            .collect();
        let default_keys: Vec<&str> = records
            .iter()
            .filter(|r| !r.is_store_sourced())
            .map(|r| r.key.as_str())
            .collect();

        assert_eq!(store_keys, vec!["c", "a"]);
        assert_eq!(default_keys, vec!["b", "d"]);
    }

    #[tokio::test]
    async fn test_empty_key_list_resolves_to_empty() {
        let store = MapStore::new(&[("a", "store-a")]);
        let defaults = MapDefaults::new(&[("a", "default-a")]);
        let resolver = DualSourceResolver::new();

        let records = resolver.resolve_all(&keys(&[]), &store, &defaults).await;
        assert!(records.is_empty());
    }

    /// Default provider that blocks each lookup until released.
    struct GatedDefaults {
        gate: Arc<Notify>,
        answered: AtomicBool,
    }

    #[async_trait]
    impl DefaultProvider<String, String> for GatedDefaults {
        async fn get_default(&self, key: &String) -> Option<String> {
            self.gate.notified().await;
            self.answered.store(true, Ordering::SeqCst);
            Some(format!("default-{key}"))
        }
    }

    #[tokio::test]
    async fn test_result_not_delivered_before_slow_default_completes() {
        let store = MapStore::new(&[("a", "store-a")]);
        let gate = Arc::new(Notify::new());
        let defaults = GatedDefaults {
            gate: gate.clone(),
            answered: AtomicBool::new(false),
        };
        let resolver = DualSourceResolver::new();

        let key_list = keys(&["a"]);
        let mut resolution = Box::pin(resolver.resolve_all(&key_list, &store, &defaults));

        // The store branch alone must not complete the resolution.
        assert!(
            (&mut resolution).now_or_never().is_none(),
            "resolution delivered before the default lookup finished"
        );

        gate.notify_one();
        let records = resolution.await;
        assert_eq!(records.len(), 2);
        assert!(defaults.answered.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_handle_joins_to_merged_result() {
        let store: Arc<dyn RecordStore<String, String>> =
            Arc::new(MapStore::new(&[("a", "store-a")]));
        let defaults: Arc<dyn DefaultProvider<String, String>> =
            Arc::new(MapDefaults::new(&[("b", "default-b")]));

        let handle = ResolutionHandle::spawn(keys(&["a", "b"]), store, defaults);
        let records = handle.join().await.expect("resolution should complete");
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_dropped_handle_never_delivers() {
        let store: Arc<dyn RecordStore<String, String>> = Arc::new(MapStore::new(&[]));
        let gate = Arc::new(Notify::new());
        let gated = Arc::new(GatedDefaults {
            gate: gate.clone(),
            answered: AtomicBool::new(false),
        });
        let defaults: Arc<dyn DefaultProvider<String, String>> = gated.clone();

        let handle = ResolutionHandle::spawn(keys(&["a"]), store, defaults);
        drop(handle);

        // Release the gate after the owner is gone; the aborted task must
        // never observe it.
        gate.notify_one();
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert!(
            !gated.answered.load(Ordering::SeqCst),
            "aborted resolution still ran past its await point"
        );
    }
}
