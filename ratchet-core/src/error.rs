//! Error types for RATCHET operations

use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found in domain {domain}: {id}")]
    NotFound { domain: String, id: String },

    #[error("Failed to open storage environment: {reason}")]
    EnvOpen { reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Serialization failed for {id}: {reason}")]
    Serialization { id: String, reason: String },

    #[error("Deserialization failed: {reason}")]
    Deserialization { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Domain already registered: {domain}")]
    DomainAlreadyRegistered { domain: String },
}

/// Resolution errors.
///
/// The resolver itself treats failed collaborator fetches as "absent" and
/// never fails a batch; this type exists for callers that wrap their
/// collaborators with stricter semantics at the boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Store batch fetch failed: {reason}")]
    StoreFetchFailed { reason: String },

    #[error("Default provider failed for key {key}: {reason}")]
    DefaultFetchFailed { key: String, reason: String },
}

/// Master error type for all RATCHET errors.
#[derive(Debug, Clone, Error)]
pub enum RatchetError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),
}

/// Result type alias for RATCHET operations.
pub type RatchetResult<T> = Result<T, RatchetError>;

// =============================================================================
// TESTS
// =============================================================================
