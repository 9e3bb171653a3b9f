//! Economy tuning constants.

use serde::{Deserialize, Serialize};

/// Tunable parameters for the credit economy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Credit capacity of a fresh registered account, before achievements.
    pub base_cap: u32,
    /// Fixed credit capacity of guest accounts.
    pub guest_cap: u32,
    /// Headroom above `base_cap` that generic earns are validated against.
    pub earn_buffer: u32,
    /// Largest amount a single transaction may move.
    pub max_txn_amount: u32,
    /// Wall-clock milliseconds per regenerated credit.
    pub refill_interval_ms: i64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            base_cap: 20,
            guest_cap: 10,
            earn_buffer: 10,
            max_txn_amount: 100,
            refill_interval_ms: 300_000,
        }
    }
}

impl EconomyConfig {
    /// The ceiling a generic earn is validated against.
    pub fn earn_ceiling(&self) -> u32 {
        self.base_cap + self.earn_buffer
    }
}
