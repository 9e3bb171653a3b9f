//! The unlock engine.
//!
//! Evaluates catalog conditions against an account's aggregate state and
//! applies unlocks idempotently. Capacity recomputation happens here; the
//! one-time credit bonus is reported back to the caller, who applies it
//! through the ledger's saturating bonus path.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use fw_core::{AchievementId, StoryId};
use fw_economy::UserAccount;

use crate::catalog::AchievementCatalog;
use crate::condition::Progress;
use crate::error::{AchievementError, AchievementResult};

/// What triggered an unlock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnlockSource {
    /// Completing a story satisfied the condition.
    StoryCompletion {
        /// The completed story.
        story: StoryId,
    },
    /// A background evaluation pass satisfied the condition.
    Automatic,
    /// An administrator granted the achievement directly.
    AdminGrant,
    /// A limited-time event granted the achievement.
    SpecialEvent,
}

impl fmt::Display for UnlockSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoryCompletion { story } => write!(f, "story completion: {story}"),
            Self::Automatic => write!(f, "automatic"),
            Self::AdminGrant => write!(f, "admin grant"),
            Self::SpecialEvent => write!(f, "special event"),
        }
    }
}

/// Record of one applied unlock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockRecord {
    /// The unlocked achievement.
    pub achievement: AchievementId,
    /// What triggered the unlock.
    pub source: UnlockSource,
    /// One-time credit grant still to be applied through the ledger.
    pub credit_bonus: u32,
}

/// Result of an unlock attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockOutcome {
    /// First unlock: rewards were applied.
    Unlocked(UnlockRecord),
    /// The achievement was already unlocked. Not an error.
    AlreadyUnlocked,
}

/// Evaluates conditions and applies unlocks against user accounts.
#[derive(Debug, Clone)]
pub struct AchievementEngine {
    catalog: AchievementCatalog,
}

impl AchievementEngine {
    /// Create an engine over a loaded catalog.
    pub fn new(catalog: AchievementCatalog) -> Self {
        Self { catalog }
    }

    /// The underlying catalog.
    pub fn catalog(&self) -> &AchievementCatalog {
        &self.catalog
    }

    /// Progress toward one achievement. Guests always report zero progress.
    pub fn progress(
        &self,
        account: &UserAccount,
        id: &AchievementId,
    ) -> AchievementResult<Progress> {
        let achievement = self
            .catalog
            .get(id)
            .ok_or_else(|| AchievementError::UnknownAchievement(id.clone()))?;
        if account.is_guest {
            return Ok(Progress {
                completed: false,
                percent: 0,
                current: 0,
                target: 1,
            });
        }
        Ok(achievement.condition.evaluate(account))
    }

    /// Progress toward every achievement, in catalog order.
    pub fn progress_all(&self, account: &UserAccount) -> Vec<(AchievementId, Progress)> {
        self.catalog
            .all()
            .map(|a| {
                let progress = if account.is_guest {
                    Progress {
                        completed: false,
                        percent: 0,
                        current: 0,
                        target: 1,
                    }
                } else {
                    a.condition.evaluate(account)
                };
                (a.id.clone(), progress)
            })
            .collect()
    }

    /// Achievements whose conditions are now satisfied but are not yet
    /// unlocked. Empty for guests: they never evaluate.
    pub fn newly_satisfied(&self, account: &UserAccount) -> Vec<AchievementId> {
        if account.is_guest {
            return Vec::new();
        }
        self.catalog
            .all()
            .filter(|a| !account.has_achievement(&a.id))
            .filter(|a| a.condition.evaluate(account).completed)
            .map(|a| a.id.clone())
            .collect()
    }

    /// The credit capacity implied by a set of unlocked achievements.
    pub fn capacity(&self, base_cap: u32, unlocked: &BTreeSet<AchievementId>) -> u32 {
        let increase: u32 = unlocked
            .iter()
            .filter_map(|id| self.catalog.get(id))
            .map(|a| a.rewards.max_credit_increase)
            .sum();
        base_cap + increase
    }

    /// Unlock an achievement on an account. Idempotent.
    ///
    /// On first unlock: the id is added, capacity is recomputed from the
    /// catalog (guest capacity stays fixed), avatar cosmetics unlock, and
    /// the returned record carries the credit bonus for the ledger to
    /// apply. A second call reports [`UnlockOutcome::AlreadyUnlocked`] and
    /// changes nothing.
    pub fn unlock(
        &self,
        account: &mut UserAccount,
        id: &AchievementId,
        source: UnlockSource,
        base_cap: u32,
    ) -> AchievementResult<UnlockOutcome> {
        let achievement = self
            .catalog
            .get(id)
            .ok_or_else(|| AchievementError::UnknownAchievement(id.clone()))?;

        if account.has_achievement(id) {
            return Ok(UnlockOutcome::AlreadyUnlocked);
        }

        account.achievements.insert(id.clone());
        if !account.is_guest {
            account.max_credits = self.capacity(base_cap, &account.achievements);
        }
        for avatar in &achievement.rewards.avatar_unlocks {
            account.avatars.insert(avatar.clone());
        }

        debug!(user = %account.id, achievement = %id, source = %source, "achievement unlocked");

        Ok(UnlockOutcome::Unlocked(UnlockRecord {
            achievement: id.clone(),
            source,
            credit_bonus: achievement.rewards.credit_bonus,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fw_economy::EconomyConfig;

    use crate::catalog::{Achievement, Rarity};
    use crate::condition::UnlockCondition;
    use crate::reward::RewardSet;

    fn engine() -> AchievementEngine {
        let mut catalog = AchievementCatalog::new();
        catalog
            .add_achievement(
                Achievement::new(
                    "first-steps",
                    "First Steps",
                    UnlockCondition::StoriesCompleted { count: 1 },
                    Rarity::Common,
                )
                .with_rewards(RewardSet::credits(5)),
            )
            .unwrap();
        catalog
            .add_achievement(
                Achievement::new(
                    "devoted",
                    "Devoted",
                    UnlockCondition::LoginStreak { days: 7 },
                    Rarity::Epic,
                )
                .with_rewards(RewardSet::capacity(5).with_avatar("lantern")),
            )
            .unwrap();
        AchievementEngine::new(catalog)
    }

    fn account() -> UserAccount {
        UserAccount::registered(&EconomyConfig::default(), Utc::now())
    }

    #[test]
    fn unlock_applies_capacity_and_avatars() {
        let engine = engine();
        let mut account = account();

        let outcome = engine
            .unlock(
                &mut account,
                &AchievementId::new("devoted"),
                UnlockSource::Automatic,
                20,
            )
            .unwrap();

        assert!(matches!(outcome, UnlockOutcome::Unlocked(_)));
        assert_eq!(account.max_credits, 25);
        assert!(account.avatars.contains("lantern"));
    }

    #[test]
    fn unlock_is_idempotent() {
        let engine = engine();
        let mut account = account();
        let id = AchievementId::new("devoted");

        engine
            .unlock(&mut account, &id, UnlockSource::Automatic, 20)
            .unwrap();
        let again = engine
            .unlock(&mut account, &id, UnlockSource::AdminGrant, 20)
            .unwrap();

        assert_eq!(again, UnlockOutcome::AlreadyUnlocked);
        assert_eq!(account.max_credits, 25);
        assert_eq!(account.achievements.len(), 1);
    }

    #[test]
    fn unlock_reports_credit_bonus_for_ledger() {
        let engine = engine();
        let mut account = account();

        let outcome = engine
            .unlock(
                &mut account,
                &AchievementId::new("first-steps"),
                UnlockSource::StoryCompletion {
                    story: StoryId::new("the-gate"),
                },
                20,
            )
            .unwrap();

        let UnlockOutcome::Unlocked(record) = outcome else {
            panic!("expected unlock");
        };
        assert_eq!(record.credit_bonus, 5);
        // Capacity unchanged: this reward only grants credits.
        assert_eq!(account.max_credits, 20);
    }

    #[test]
    fn guest_capacity_stays_fixed() {
        let engine = engine();
        let mut account = UserAccount::guest(&EconomyConfig::default(), Utc::now());

        engine
            .unlock(
                &mut account,
                &AchievementId::new("devoted"),
                UnlockSource::AdminGrant,
                20,
            )
            .unwrap();

        assert_eq!(account.max_credits, 10);
    }

    #[test]
    fn unknown_achievement_rejected() {
        let engine = engine();
        let mut account = account();
        assert!(matches!(
            engine.unlock(
                &mut account,
                &AchievementId::new("ghost"),
                UnlockSource::Automatic,
                20
            ),
            Err(AchievementError::UnknownAchievement(_))
        ));
    }

    #[test]
    fn newly_satisfied_skips_unlocked() {
        let engine = engine();
        let mut account = account();
        account.stats.stories_completed = 1;
        account.stats.login_streak = 7;

        let satisfied = engine.newly_satisfied(&account);
        assert_eq!(satisfied.len(), 2);

        engine
            .unlock(
                &mut account,
                &AchievementId::new("first-steps"),
                UnlockSource::Automatic,
                20,
            )
            .unwrap();
        let satisfied = engine.newly_satisfied(&account);
        assert_eq!(satisfied, vec![AchievementId::new("devoted")]);
    }

    #[test]
    fn guests_never_evaluate() {
        let engine = engine();
        let mut account = UserAccount::guest(&EconomyConfig::default(), Utc::now());
        account.stats.stories_completed = 50;
        account.stats.login_streak = 50;

        assert!(engine.newly_satisfied(&account).is_empty());
        let progress = engine
            .progress(&account, &AchievementId::new("first-steps"))
            .unwrap();
        assert!(!progress.completed);
        assert_eq!(progress.percent, 0);
    }

    #[test]
    fn capacity_sums_unlocked_increases() {
        let engine = engine();
        let mut unlocked = BTreeSet::new();
        assert_eq!(engine.capacity(20, &unlocked), 20);

        unlocked.insert(AchievementId::new("devoted"));
        unlocked.insert(AchievementId::new("first-steps"));
        // Ids missing from the catalog contribute nothing.
        unlocked.insert(AchievementId::new("ghost"));
        assert_eq!(engine.capacity(20, &unlocked), 25);
    }
}
