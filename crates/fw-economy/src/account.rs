//! The user account aggregate.
//!
//! `UserAccount` is the unit of persistence and concurrency control. It is
//! mutated only through [`CreditLedger`](crate::ledger::CreditLedger)
//! commands, never ad hoc.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fw_core::{AchievementId, StoryId};

use crate::config::EconomyConfig;

/// Unique identifier for a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Aggregate counters that feed achievement evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    /// Stories finished (ending reached), counting each completion.
    pub stories_completed: u32,
    /// Completions per genre tag.
    pub completed_by_genre: BTreeMap<String, u32>,
    /// Reviews submitted.
    pub reviews_written: u32,
    /// Total playtime in minutes.
    pub playtime_minutes: u64,
    /// Lifetime credits spent.
    pub credits_spent: u64,
    /// Consecutive calendar days with a login.
    pub login_streak: u32,
    /// When the user last logged in, for streak bookkeeping.
    pub last_login: Option<DateTime<Utc>>,
}

impl PlayerStats {
    /// Record a story completion in the given genre.
    pub fn record_completion(&mut self, genre: &str) {
        self.stories_completed += 1;
        if !genre.is_empty() {
            *self.completed_by_genre.entry(genre.to_string()).or_default() += 1;
        }
    }

    /// Record a submitted review.
    pub fn record_review(&mut self) {
        self.reviews_written += 1;
    }

    /// Add playtime minutes.
    pub fn add_playtime(&mut self, minutes: u64) {
        self.playtime_minutes += minutes;
    }

    /// Record a login, extending or resetting the calendar-day streak.
    pub fn record_login(&mut self, now: DateTime<Utc>) {
        let streak = match self.last_login {
            Some(last) => {
                let days = (now.date_naive() - last.date_naive()).num_days();
                match days {
                    0 => self.login_streak,
                    1 => self.login_streak + 1,
                    _ => 1,
                }
            }
            None => 1,
        };
        self.login_streak = streak;
        self.last_login = Some(now);
    }

    /// Completions in one genre.
    pub fn completed_in_genre(&self, genre: &str) -> u32 {
        self.completed_by_genre.get(genre).copied().unwrap_or(0)
    }
}

/// A user account: credits, achievements, and story bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    /// Unique account id.
    pub id: UserId,
    /// Current credit balance. Always within `0..=max_credits`.
    pub credits: u32,
    /// Current credit capacity.
    pub max_credits: u32,
    /// Anchor timestamp for lazy credit regeneration.
    pub last_refill: DateTime<Utc>,
    /// Unlocked achievement ids.
    pub achievements: BTreeSet<AchievementId>,
    /// Stories whose one-time rating bonus has been granted.
    pub rated_for_bonus: BTreeSet<StoryId>,
    /// Stories the user has completed at least once.
    pub played: BTreeSet<StoryId>,
    /// Favorited stories.
    pub favorites: BTreeSet<StoryId>,
    /// Unlocked cosmetic avatar ids.
    pub avatars: BTreeSet<String>,
    /// Guest sessions have a fixed capacity and never unlock achievements.
    pub is_guest: bool,
    /// Aggregate counters for achievement evaluation.
    pub stats: PlayerStats,
}

impl UserAccount {
    /// Create a registered account, starting with a full balance.
    pub fn registered(config: &EconomyConfig, now: DateTime<Utc>) -> Self {
        Self::with_cap(config.base_cap, false, now)
    }

    /// Create a guest account with the fixed guest capacity.
    pub fn guest(config: &EconomyConfig, now: DateTime<Utc>) -> Self {
        Self::with_cap(config.guest_cap, true, now)
    }

    fn with_cap(cap: u32, is_guest: bool, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            credits: cap,
            max_credits: cap,
            last_refill: now,
            achievements: BTreeSet::new(),
            rated_for_bonus: BTreeSet::new(),
            played: BTreeSet::new(),
            favorites: BTreeSet::new(),
            avatars: BTreeSet::new(),
            is_guest,
            stats: PlayerStats::default(),
        }
    }

    /// Whether the balance sits at capacity.
    pub fn is_full(&self) -> bool {
        self.credits >= self.max_credits
    }

    /// Whether the user has unlocked an achievement.
    pub fn has_achievement(&self, id: &AchievementId) -> bool {
        self.achievements.contains(id)
    }

    /// Whether the rating bonus for a story was already granted.
    pub fn has_rating_bonus(&self, story: &StoryId) -> bool {
        self.rated_for_bonus.contains(story)
    }
}
