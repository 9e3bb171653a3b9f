//! Unlock conditions and progress evaluation.

use serde::{Deserialize, Serialize};

use fw_core::StoryId;
use fw_economy::UserAccount;

/// How far a user is toward satisfying one condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Whether the condition is satisfied (`current >= target`).
    pub completed: bool,
    /// Completion percentage, clamped to 0..=100.
    pub percent: u8,
    /// The user's current value for this condition.
    pub current: u64,
    /// The value required to complete.
    pub target: u64,
}

impl Progress {
    fn of(current: u64, target: u64) -> Self {
        let target = target.max(1);
        Self {
            completed: current >= target,
            percent: ((current * 100) / target).min(100) as u8,
            current,
            target,
        }
    }

    fn none(target: u64) -> Self {
        Self {
            completed: false,
            percent: 0,
            current: 0,
            target,
        }
    }
}

/// A condition evaluated against a user's aggregate state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnlockCondition {
    /// Complete at least `count` stories.
    StoriesCompleted {
        /// Required completions.
        count: u32,
    },
    /// Complete at least `count` stories of one genre.
    StoriesInGenre {
        /// The genre tag to count.
        genre: String,
        /// Required completions in that genre.
        count: u32,
    },
    /// Complete one specific story.
    SpecificStory {
        /// The story to complete.
        story: StoryId,
    },
    /// Write at least `count` reviews.
    ReviewsWritten {
        /// Required reviews.
        count: u32,
    },
    /// Accumulate at least `minutes` of playtime.
    TotalPlaytime {
        /// Required minutes.
        minutes: u64,
    },
    /// Spend at least `amount` credits lifetime.
    CreditsSpent {
        /// Required credits spent.
        amount: u64,
    },
    /// Log in on `days` consecutive calendar days.
    LoginStreak {
        /// Required streak length.
        days: u32,
    },
    /// Reach every ending of one story.
    ///
    /// Per-ending completion is not tracked yet, so this reports zero
    /// progress and never completes. A known gap, not a silent wrong answer.
    AllEndings {
        /// The story whose endings must all be reached.
        story: StoryId,
    },
}

impl UnlockCondition {
    /// Evaluate the condition against an account's aggregate state.
    pub fn evaluate(&self, account: &UserAccount) -> Progress {
        let stats = &account.stats;
        match self {
            Self::StoriesCompleted { count } => {
                Progress::of(u64::from(stats.stories_completed), u64::from(*count))
            }
            Self::StoriesInGenre { genre, count } => Progress::of(
                u64::from(stats.completed_in_genre(genre)),
                u64::from(*count),
            ),
            Self::SpecificStory { story } => {
                Progress::of(u64::from(account.played.contains(story)), 1)
            }
            Self::ReviewsWritten { count } => {
                Progress::of(u64::from(stats.reviews_written), u64::from(*count))
            }
            Self::TotalPlaytime { minutes } => Progress::of(stats.playtime_minutes, *minutes),
            Self::CreditsSpent { amount } => Progress::of(stats.credits_spent, *amount),
            Self::LoginStreak { days } => {
                Progress::of(u64::from(stats.login_streak), u64::from(*days))
            }
            Self::AllEndings { .. } => Progress::none(1),
        }
    }
}
