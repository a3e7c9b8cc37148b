//! RATCHET Core - Entity Types
//!
//! Shared data types, configuration, and the error tree. All other crates
//! depend on this. Behavior here is limited to what the types themselves
//! own (strike arithmetic, expiry checks); policy lives in the ledger crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

pub mod config;
pub mod error;

pub use config::LedgerConfig;
pub use error::{ConfigError, RatchetError, RatchetResult, ResolveError, StorageError};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Opaque identifier for a throttled subject (e.g. a payment instrument).
/// Ids are caller-supplied strings; the ledger never interprets them beyond
/// equality and domain-prefix namespacing.
pub type EntityId = String;

/// Generate a new UUIDv7 request id (timestamp-sortable).
/// Used to correlate log lines for a single resolution fan-out.
pub fn new_request_id() -> Uuid {
    Uuid::now_v7()
}

// ============================================================================
// STRIKE ENTITY
// ============================================================================

/// A tracked subject with its accumulated strikes.
///
/// Created on the first recorded strike, mutated on each subsequent strike,
/// deleted when cleanup evicts it or when its strikes expire. The data model
/// carries only the most recent strike timestamp; an entity's strikes expire
/// together once the last strike ages past the configured expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrikeEntity {
    /// Opaque unique key identifying the throttled subject.
    pub id: EntityId,
    /// Number of recorded infractions. Invariant: non-negative.
    pub strike_count: i32,
    /// Timestamp of the most recent strike, used for expiry and eviction order.
    pub last_strike_at: Timestamp,
}

impl StrikeEntity {
    /// Create an entity with a single strike recorded at `now`.
    pub fn first_strike(id: impl Into<EntityId>, now: Timestamp) -> Self {
        Self {
            id: id.into(),
            strike_count: 1,
            last_strike_at: now,
        }
    }

    /// Record one more strike at `now`.
    pub fn record_strike(&mut self, now: Timestamp) -> i32 {
        self.strike_count = self.strike_count.saturating_add(1);
        self.last_strike_at = now;
        self.strike_count
    }

    /// Whether every strike on this entity has aged past `expiry`.
    pub fn is_expired(&self, now: Timestamp, expiry: Duration) -> bool {
        let age = now - self.last_strike_at;
        match age.to_std() {
            Ok(age) => age >= expiry,
            // `now` is before the last strike (clock skew); nothing expired.
            Err(_) => false,
        }
    }
}

// ============================================================================
// RESOLVED RECORD
// ============================================================================

/// One entry in a dual-source resolution result.
///
/// Exactly one of `from_store` / `from_default` is populated: each entry
/// represents a match from a single source. A key present in both sources
/// yields two entries in the output list, and callers that need a single
/// merged view reconcile by key themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRecord<K, R> {
    /// The requested key.
    pub key: K,
    /// Record found in persistent storage, if this entry came from the store.
    pub from_store: Option<R>,
    /// Record produced by the default provider, if this entry came from defaults.
    pub from_default: Option<R>,
}

impl<K, R> ResolvedRecord<K, R> {
    /// Build an entry representing a store match.
    pub fn from_store(key: K, record: R) -> Self {
        Self {
            key,
            from_store: Some(record),
            from_default: None,
        }
    }

    /// Build an entry representing a default-provider match.
    pub fn from_default(key: K, record: R) -> Self {
        Self {
            key,
            from_store: None,
            from_default: Some(record),
        }
    }

    /// The record, regardless of which source produced it.
    pub fn record(&self) -> &R {
        self.from_store
            .as_ref()
            .or(self.from_default.as_ref())
            .expect("ResolvedRecord holds exactly one source")
    }

    /// True if this entry came from the persistent store.
    pub fn is_store_sourced(&self) -> bool {
        self.from_store.is_some()
    }
}

// ============================================================================
// TESTS
// ============================================================================


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Recording strikes never produces a negative or decreasing count.
        #[test]
        fn prop_record_strike_monotonic(initial in 0i32..1000, additions in 1usize..20) {
            let now = Utc::now();
            let mut entity = StrikeEntity {
                id: "subject".to_string(),
                strike_count: initial,
                last_strike_at: now,
            };

            let mut previous = initial;
            for i in 0..additions {
                let at = now + chrono::Duration::seconds(i as i64);
                let count = entity.record_strike(at);
                prop_assert!(count > previous || count == i32::MAX);
                prop_assert!(count >= 0);
                previous = count;
            }
        }

        /// An entity is expired iff its age reaches the expiry duration.
        #[test]
        fn prop_expiry_threshold(age_secs in 0i64..10_000, expiry_secs in 1u64..10_000) {
            let now = Utc::now();
            let entity = StrikeEntity {
                id: "subject".to_string(),
                strike_count: 1,
                last_strike_at: now - chrono::Duration::seconds(age_secs),
            };
            let expired = entity.is_expired(now, Duration::from_secs(expiry_secs));
            prop_assert_eq!(expired, age_secs as u64 >= expiry_secs);
        }
    }
}
