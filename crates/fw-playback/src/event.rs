//! Events emitted for UI consumption.

use std::fmt;

use serde::{Deserialize, Serialize};

use fw_achievements::UnlockSource;
use fw_core::{AchievementId, NodeId, StoryId};
use fw_economy::CreditTransaction;

/// Why a choice selection was rejected. All recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The choice requires an achievement the user has not unlocked.
    Locked,
    /// The spend exceeded the available balance.
    InsufficientCredits,
    /// The playthrough was not awaiting a choice.
    NotAwaitingChoice,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Locked => write!(f, "choice locked"),
            Self::InsufficientCredits => write!(f, "insufficient credits"),
            Self::NotAwaitingChoice => write!(f, "not awaiting a choice"),
        }
    }
}

/// Something the engine did that a UI layer renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A credit transaction was committed.
    TransactionCommitted {
        /// The committed transaction.
        transaction: CreditTransaction,
    },
    /// An achievement was unlocked.
    AchievementUnlocked {
        /// The unlocked achievement.
        achievement: AchievementId,
        /// What triggered the unlock.
        source: UnlockSource,
    },
    /// A playthrough reached an ending node.
    EndingReached {
        /// The completed story.
        story: StoryId,
        /// The ending node.
        node: NodeId,
    },
    /// A choice selection was rejected without any mutation.
    ChoiceRejected {
        /// Why the selection was rejected.
        reason: RejectReason,
    },
}
