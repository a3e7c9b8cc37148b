//! Per-domain ledger registry.
//!
//! Several ledger domains share one backing store. When a domain's policy
//! demands unique ids, two live ledgers over the same domain would clobber
//! each other's write-behind state, so the registry owns the "at most one
//! live instance per domain" guarantee as an explicit object rather than a
//! bare global.

use crate::clock::{Clock, SystemClock};
use crate::StrikeLedger;
use ratchet_core::{ConfigError, LedgerConfig, RatchetError, RatchetResult};
use ratchet_storage::StrikeStore;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Registry handing out at most one live [`StrikeLedger`] per domain over a
/// shared store.
pub struct LedgerRegistry {
    store: Arc<dyn StrikeStore>,
    clock: Arc<dyn Clock>,
    live_domains: Mutex<HashSet<String>>,
}

impl LedgerRegistry {
    /// Create a registry over a shared backing store.
    pub fn new(store: Arc<dyn StrikeStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Like [`LedgerRegistry::new`] with an injected time source for the
    /// ledgers it creates.
    pub fn with_clock(store: Arc<dyn StrikeStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            live_domains: Mutex::new(HashSet::new()),
        }
    }

    /// Build a ledger for `domain`.
    ///
    /// When `config.require_unique_ids` is set, a second live registration
    /// of the same domain fails with `ConfigError::DomainAlreadyRegistered`
    /// until [`LedgerRegistry::release`] frees the slot. Domains that opt
    /// out of the uniqueness policy accept the collision risk and may
    /// register freely.
    pub fn register(
        &self,
        domain: impl Into<String>,
        config: LedgerConfig,
    ) -> RatchetResult<StrikeLedger> {
        let domain = domain.into();

        if config.require_unique_ids {
            let mut live = self
                .live_domains
                .lock()
                .map_err(|_| ratchet_core::StorageError::LockPoisoned)?;
            if !live.insert(domain.clone()) {
                return Err(RatchetError::Config(ConfigError::DomainAlreadyRegistered {
                    domain,
                }));
            }
        }

        let result = StrikeLedger::with_clock(
            domain.clone(),
            config,
            self.store.clone(),
            self.clock.clone(),
        );
        if result.is_err() {
            // Invalid config: do not hold the slot for a ledger that never
            // came to life.
            self.release(&domain);
        }
        result
    }

    /// Free the live-instance slot for `domain`.
    pub fn release(&self, domain: &str) {
        if let Ok(mut live) = self.live_domains.lock() {
            live.remove(domain);
        }
    }

    /// Whether `domain` currently holds a live registration.
    pub fn is_registered(&self, domain: &str) -> bool {
        self.live_domains
            .lock()
            .map(|live| live.contains(domain))
            .unwrap_or(false)
    }
}
