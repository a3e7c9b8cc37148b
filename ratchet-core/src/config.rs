//! Configuration types

use crate::error::{ConfigError, RatchetError, RatchetResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-domain throttling policy, supplied at ledger construction.
/// ALL values are required - no defaults anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Hard cap on distinct tracked ids.
    pub max_tracked_entities: usize,
    /// Size to shrink to when the cap is exceeded. Must be less than
    /// `max_tracked_entities`.
    pub cleanup_target_count: usize,
    /// Threshold at or above which the subject is considered blocked.
    pub max_strikes_before_block: i32,
    /// Age after which a strike no longer counts.
    pub expiry: Duration,
    /// Whether ids must be globally unique across all ledger domains
    /// sharing the same backing store.
    pub require_unique_ids: bool,
}

impl LedgerConfig {
    /// Policy used for virtual card enrollment prompts: up to 50 cards
    /// tracked, trimmed to 30 on overflow, blocked at 3 strikes, strikes
    /// expiring after 180 days.
    pub fn virtual_card_enrollment() -> Self {
        Self {
            max_tracked_entities: 50,
            cleanup_target_count: 30,
            max_strikes_before_block: 3,
            expiry: Duration::from_secs(180 * 24 * 60 * 60),
            require_unique_ids: true,
        }
    }

    /// Validate the configuration.
    /// Returns Ok(()) if valid, Err(RatchetError::Config) if invalid.
    ///
    /// Validates:
    /// - max_tracked_entities > 0
    /// - cleanup_target_count < max_tracked_entities
    /// - max_strikes_before_block > 0
    /// - expiry is positive
    pub fn validate(&self) -> RatchetResult<()> {
        if self.max_tracked_entities == 0 {
            return Err(RatchetError::Config(ConfigError::InvalidValue {
                field: "max_tracked_entities".to_string(),
                value: self.max_tracked_entities.to_string(),
                reason: "max_tracked_entities must be greater than 0".to_string(),
            }));
        }

        if self.cleanup_target_count >= self.max_tracked_entities {
            return Err(RatchetError::Config(ConfigError::InvalidValue {
                field: "cleanup_target_count".to_string(),
                value: self.cleanup_target_count.to_string(),
                reason: "cleanup_target_count must be less than max_tracked_entities".to_string(),
            }));
        }

        if self.max_strikes_before_block <= 0 {
            return Err(RatchetError::Config(ConfigError::InvalidValue {
                field: "max_strikes_before_block".to_string(),
                value: self.max_strikes_before_block.to_string(),
                reason: "max_strikes_before_block must be greater than 0".to_string(),
            }));
        }

        if self.expiry.is_zero() {
            return Err(RatchetError::Config(ConfigError::InvalidValue {
                field: "expiry".to_string(),
                value: format!("{:?}", self.expiry),
                reason: "expiry must be positive".to_string(),
            }));
        }

        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
