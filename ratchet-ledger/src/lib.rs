//! RATCHET Ledger - strike counting, expiry and block decisions
//!
//! A `StrikeLedger` tracks per-entity strike counts for one domain over a
//! shared `StrikeStore`. It owns the in-memory view of the entities it has
//! loaded; the backing store owns durable persistence. Persistence is
//! write-behind and best-effort: a store failure is logged and otherwise
//! treated as "entity not found", never surfaced to the caller.
//!
//! Callers ask `should_block` before performing a sensitive action and
//! record a strike when the action is declined or fails; `remove_strikes`
//! clears the subject once the action completes successfully.

pub mod clock;
pub mod registry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use registry::LedgerRegistry;

use ratchet_core::{LedgerConfig, RatchetResult, StrikeEntity, Timestamp};
use ratchet_storage::StrikeStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Strike ledger for a single domain.
///
/// Operations are synchronous and non-blocking, and assume a single-threaded
/// caller; concurrent mutation requires external serialization.
pub struct StrikeLedger {
    domain: String,
    config: LedgerConfig,
    store: Arc<dyn StrikeStore>,
    clock: Arc<dyn Clock>,
    /// In-memory view of every tracked entity in this domain.
    entities: HashMap<String, StrikeEntity>,
}

impl StrikeLedger {
    /// Create a ledger for `domain`, loading the domain's entities from the
    /// store and sweeping expired strikes.
    ///
    /// # Errors
    ///
    /// Fails only on invalid configuration. Store failures during the
    /// initial load degrade to an empty view.
    pub fn new(
        domain: impl Into<String>,
        config: LedgerConfig,
        store: Arc<dyn StrikeStore>,
    ) -> RatchetResult<Self> {
        Self::with_clock(domain, config, store, Arc::new(SystemClock))
    }

    /// Like [`StrikeLedger::new`] with an injected time source.
    pub fn with_clock(
        domain: impl Into<String>,
        config: LedgerConfig,
        store: Arc<dyn StrikeStore>,
        clock: Arc<dyn Clock>,
    ) -> RatchetResult<Self> {
        config.validate()?;
        let domain = domain.into();

        let mut ledger = Self {
            entities: Self::load_domain(&domain, store.as_ref()),
            domain,
            config,
            store,
            clock,
        };
        // Constructor sweep, matching the source policy of expiring on open.
        ledger.remove_expired_strikes();
        Ok(ledger)
    }

    /// Current non-expired strike count for `id`; `0` if unknown.
    /// Lazily expires the id's stale strikes first.
    pub fn strike_count(&mut self, id: &str) -> i32 {
        self.expire_if_stale(id);
        self.entities.get(id).map(|e| e.strike_count).unwrap_or(0)
    }

    /// Record a strike against `id`, creating the entity if absent, and
    /// return the new count. Triggers a cleanup pass if the tracked-id
    /// count now exceeds the configured cap.
    pub fn add_strike(&mut self, id: &str) -> i32 {
        self.expire_if_stale(id);
        let now = self.clock.now();

        let entity = self
            .entities
            .entry(id.to_string())
            .and_modify(|e| {
                e.record_strike(now);
            })
            .or_insert_with(|| StrikeEntity::first_strike(id, now));
        let count = entity.strike_count;
        let snapshot = entity.clone();
        self.persist(&snapshot);

        if self.entities.len() > self.config.max_tracked_entities {
            self.run_cleanup();
        }

        count
    }

    /// Clear all strikes for `id` immediately, e.g. on successful
    /// completion of the throttled action.
    pub fn remove_strikes(&mut self, id: &str) {
        if self.entities.remove(id).is_some() {
            self.forget(id);
        }
    }

    /// `true` iff the non-expired strike count for `id` has reached the
    /// configured block threshold.
    pub fn should_block(&mut self, id: &str) -> bool {
        self.strike_count(id) >= self.config.max_strikes_before_block
    }

    /// Sweep all tracked entities, deleting those whose strikes have
    /// expired. Also invoked at construction; callers may invoke it
    /// periodically.
    pub fn remove_expired_strikes(&mut self) {
        let now = self.clock.now();
        let expiry = self.config.expiry;
        let expired: Vec<String> = self
            .entities
            .values()
            .filter(|e| e.is_expired(now, expiry))
            .map(|e| e.id.clone())
            .collect();

        if !expired.is_empty() {
            debug!(
                domain = %self.domain,
                expired = expired.len(),
                "sweeping expired strike entities"
            );
        }
        for id in expired {
            self.entities.remove(&id);
            self.forget(&id);
        }
    }

    /// Number of distinct ids currently tracked.
    pub fn tracked_entity_count(&self) -> usize {
        self.entities.len()
    }

    /// The domain tag this ledger is scoped to.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The policy this ledger enforces.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ========================================================================
    // INTERNAL
    // ========================================================================

    /// Load every entity of `domain` from the store, best-effort.
    fn load_domain(domain: &str, store: &dyn StrikeStore) -> HashMap<String, StrikeEntity> {
        let ids = match store.list_ids(domain) {
            Ok(ids) => ids,
            Err(e) => {
                warn!(domain = %domain, error = %e, "failed to list strike entities; starting empty");
                return HashMap::new();
            }
        };

        let mut entities = HashMap::with_capacity(ids.len());
        for id in ids {
            match store.get(domain, &id) {
                Ok(Some(entity)) => {
                    entities.insert(id, entity);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(domain = %domain, id = %id, error = %e, "failed to load strike entity; skipping");
                }
            }
        }
        entities
    }

    /// Drop `id` from the view and the store if its strikes have expired.
    fn expire_if_stale(&mut self, id: &str) {
        let now = self.clock.now();
        let stale = self
            .entities
            .get(id)
            .map(|e| e.is_expired(now, self.config.expiry))
            .unwrap_or(false);
        if stale {
            self.entities.remove(id);
            self.forget(id);
        }
    }

    /// Evict oldest-by-last-strike entities until the cleanup target is
    /// reached. Retains the most recently active ids.
    fn run_cleanup(&mut self) {
        let excess = self
            .entities
            .len()
            .saturating_sub(self.config.cleanup_target_count);
        if excess == 0 {
            return;
        }

        let mut by_age: Vec<(Timestamp, String)> = self
            .entities
            .values()
            .map(|e| (e.last_strike_at, e.id.clone()))
            .collect();
        // Oldest first; id as a deterministic tie-break.
        by_age.sort();

        debug!(
            domain = %self.domain,
            evicting = excess,
            remaining = self.config.cleanup_target_count,
            "strike entity cap exceeded, evicting least recently active"
        );
        for (_, id) in by_age.into_iter().take(excess) {
            self.entities.remove(&id);
            self.forget(&id);
        }
    }

    /// Best-effort write-through of an entity to the store.
    fn persist(&self, entity: &StrikeEntity) {
        if let Err(e) = self.store.put(&self.domain, entity) {
            warn!(
                domain = %self.domain,
                id = %entity.id,
                error = %e,
                "strike persistence failed; continuing with in-memory state"
            );
        }
    }

    /// Best-effort deletion of an entity from the store.
    fn forget(&self, id: &str) {
        if let Err(e) = self.store.delete(&self.domain, id) {
            warn!(
                domain = %self.domain,
                id = %id,
                error = %e,
                "strike deletion failed; continuing with in-memory state"
            );
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
