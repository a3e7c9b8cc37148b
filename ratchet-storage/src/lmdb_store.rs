//! LMDB-backed strike store with domain isolation.
//!
//! Uses the heed crate (Rust bindings for LMDB) to provide a memory-mapped,
//! durable key-value store for strike entities. All keys are encoded via
//! `DomainScopedKey`, so one domain's listing or deletion can never touch
//! another domain's entries.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The store uses read transactions for
//! `get`/`list_ids` and a write transaction per mutation.

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use ratchet_core::{RatchetResult, StrikeEntity};

use crate::domain_key::DomainScopedKey;
use crate::StrikeStore;

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbStoreError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convert LmdbStoreError to RatchetError.
impl From<LmdbStoreError> for ratchet_core::RatchetError {
    fn from(e: LmdbStoreError) -> Self {
        ratchet_core::RatchetError::Storage(ratchet_core::StorageError::TransactionFailed {
            reason: e.to_string(),
        })
    }
}

/// LMDB-backed durable store for strike entities.
///
/// Values are JSON-serialized `StrikeEntity` payloads; keys are
/// `DomainScopedKey` encodings.
pub struct LmdbStrikeStore {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
}

impl LmdbStrikeStore {
    /// Create a new LMDB strike store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, the LMDB
    /// environment cannot be opened, or the database cannot be created.
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbStoreError> {
        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbStoreError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbStoreError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(Self { env, db })
    }

    /// Iterate over keys matching a prefix and collect them.
    fn collect_keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, LmdbStoreError> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        let mut keys = Vec::new();
        let iter = self
            .db
            .iter(&rtxn)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        for result in iter {
            match result {
                Ok((key, _)) => {
                    if key.len() >= prefix.len() && &key[0..prefix.len()] == prefix {
                        keys.push(key.to_vec());
                    }
                }
                Err(_) => continue,
            }
        }

        Ok(keys)
    }
}

impl StrikeStore for LmdbStrikeStore {
    fn get(&self, domain: &str, id: &str) -> RatchetResult<Option<StrikeEntity>> {
        let encoded_key = DomainScopedKey::new(domain, id).encode();

        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        match self.db.get(&rtxn, &encoded_key) {
            Ok(Some(bytes)) => {
                let entity: StrikeEntity = serde_json::from_slice(bytes)
                    .map_err(|e| LmdbStoreError::Deserialization(e.to_string()))?;
                Ok(Some(entity))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(LmdbStoreError::Transaction(e.to_string()).into()),
        }
    }

    fn put(&self, domain: &str, entity: &StrikeEntity) -> RatchetResult<()> {
        let encoded_key = DomainScopedKey::new(domain, entity.id.as_str()).encode();

        let value_bytes = serde_json::to_vec(entity)
            .map_err(|e| LmdbStoreError::Serialization(e.to_string()))?;

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        self.db
            .put(&mut wtxn, &encoded_key, &value_bytes)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(())
    }

    fn delete(&self, domain: &str, id: &str) -> RatchetResult<()> {
        let encoded_key = DomainScopedKey::new(domain, id).encode();

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        self.db
            .delete(&mut wtxn, &encoded_key)
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbStoreError::Transaction(e.to_string()))?;

        Ok(())
    }

    fn list_ids(&self, domain: &str) -> RatchetResult<Vec<String>> {
        let prefix = DomainScopedKey::domain_prefix(domain);
        let keys = self.collect_keys_with_prefix(&prefix)?;

        let mut ids = Vec::with_capacity(keys.len());
        for key in &keys {
            match DomainScopedKey::decode(key) {
                Some(decoded) => ids.push(decoded.id().to_string()),
                None => {
                    tracing::warn!(domain = %domain, "skipping undecodable strike store key");
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}
