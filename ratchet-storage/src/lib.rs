//! RATCHET Storage - Storage Trait and Mock Implementation
//!
//! Defines the storage abstraction layer for strike entities. Stores are
//! namespaced by a domain tag so multiple ledger domains can share one
//! backing store without colliding. The durable LMDB implementation lives
//! in `lmdb_store`.

pub mod domain_key;
pub mod lmdb_store;

pub use domain_key::DomainScopedKey;
pub use lmdb_store::{LmdbStoreError, LmdbStrikeStore};

use ratchet_core::{RatchetResult, StorageError, StrikeEntity};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Durable key-value store for strike entities.
///
/// All operations are namespaced by a `domain` tag (e.g.
/// `"VirtualCardEnrollment"`). Implementations provide best-effort
/// persistence; the ledger treats any error as "entity not found" and moves
/// on.
pub trait StrikeStore: Send + Sync {
    /// Get an entity by id within a domain.
    fn get(&self, domain: &str, id: &str) -> RatchetResult<Option<StrikeEntity>>;

    /// Insert or overwrite an entity within a domain.
    fn put(&self, domain: &str, entity: &StrikeEntity) -> RatchetResult<()>;

    /// Delete an entity within a domain. Deleting an absent id is not an
    /// error.
    fn delete(&self, domain: &str, id: &str) -> RatchetResult<()>;

    /// List all entity ids tracked within a domain.
    fn list_ids(&self, domain: &str) -> RatchetResult<Vec<String>>;
}

// ============================================================================
// MOCK STORE
// ============================================================================

/// In-memory mock store for testing.
#[derive(Debug, Default, Clone)]
pub struct MockStrikeStore {
    entries: Arc<RwLock<HashMap<Vec<u8>, StrikeEntity>>>,
}

impl MockStrikeStore {
    /// Create a new mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored data across every domain.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    /// Total entry count across every domain.
    pub fn entry_count(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }
}

impl StrikeStore for MockStrikeStore {
    fn get(&self, domain: &str, id: &str) -> RatchetResult<Option<StrikeEntity>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(entries.get(&DomainScopedKey::new(domain, id).encode()).cloned())
    }

    fn put(&self, domain: &str, entity: &StrikeEntity) -> RatchetResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        let key = DomainScopedKey::new(domain, entity.id.as_str()).encode();
        entries.insert(key, entity.clone());
        Ok(())
    }

    fn delete(&self, domain: &str, id: &str) -> RatchetResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        entries.remove(&DomainScopedKey::new(domain, id).encode());
        Ok(())
    }

    fn list_ids(&self, domain: &str) -> RatchetResult<Vec<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        let prefix = DomainScopedKey::domain_prefix(domain);
        let mut ids: Vec<String> = entries
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .filter_map(|k| DomainScopedKey::decode(k))
            .map(|k| k.id().to_string())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

// ============================================================================
// TESTS
// ============================================================================
