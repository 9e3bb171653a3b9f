//! Credit economy for Fabelweg.
//!
//! Credits are the spendable resource gating narrative choice selection.
//! This crate owns the [`UserAccount`] aggregate, the append-only
//! transaction log, the [`CreditLedger`] that serializes all balance
//! mutations per user, and the pure lazy-refill planner.

/// The user account aggregate and its stat counters.
pub mod account;
/// Economy tuning constants.
pub mod config;
/// Error types for credit operations.
pub mod error;
/// The transactional balance ledger.
pub mod ledger;
/// Pure, lazy, time-based credit regeneration.
pub mod refill;
/// Immutable credit transaction records.
pub mod transaction;

/// Re-export account types.
pub use account::{PlayerStats, UserAccount, UserId};
/// Re-export configuration.
pub use config::EconomyConfig;
/// Re-export error types.
pub use error::{EconomyError, EconomyResult};
/// Re-export ledger types.
pub use ledger::{CreditLedger, RatingBonus};
/// Re-export refill planner types.
pub use refill::{RefillPlan, next_refill_eta, plan_refill};
/// Re-export transaction types.
pub use transaction::{CreditTransaction, TransactionId, TransactionKind};
