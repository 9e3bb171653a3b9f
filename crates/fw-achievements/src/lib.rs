//! Achievements for Fabelweg.
//!
//! Achievements are unlockable, condition-evaluated rewards that can raise a
//! user's credit capacity and grant cosmetic unlocks. The catalog is static,
//! loaded once; unlocking is idempotent; guest accounts never evaluate.

/// The static achievement catalog.
pub mod catalog;
/// Unlock conditions and progress evaluation.
pub mod condition;
/// The unlock engine.
pub mod engine;
/// Error types for achievement operations.
pub mod error;
/// Reward definitions.
pub mod reward;

/// Re-export catalog types.
pub use catalog::{Achievement, AchievementCatalog, Rarity};
/// Re-export condition types.
pub use condition::{Progress, UnlockCondition};
/// Re-export engine types.
pub use engine::{AchievementEngine, UnlockOutcome, UnlockRecord, UnlockSource};
/// Re-export error types.
pub use error::{AchievementError, AchievementResult};
/// Re-export reward types.
pub use reward::RewardSet;
