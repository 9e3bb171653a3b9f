//! The domain service composing catalogs, ledger, and playthroughs.
//!
//! `StoryService` is the one place the platform's commands live. Any UI or
//! API surface drives it identically: commands mutate through the ledger's
//! serialized path and return the ordered events they produced; queries
//! never emit events.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use fw_achievements::{AchievementCatalog, AchievementEngine, UnlockOutcome, UnlockSource};
use fw_core::{NodeId, StoryCatalog, StoryError, StoryId};
use fw_economy::{
    CreditLedger, CreditTransaction, EconomyConfig, EconomyError, RatingBonus, UserId,
};

use crate::assets::{AssetPrefetcher, NoopPrefetcher};
use crate::error::{PlaybackError, PlaybackResult};
use crate::event::{EngineEvent, RejectReason};
use crate::history::HistoryLog;
use crate::playthrough::{PlaybackPhase, Playthrough};

/// One choice as a UI should render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceView {
    /// Index to pass to `select_choice`.
    pub index: usize,
    /// The choice text.
    pub text: String,
    /// Credits this choice costs.
    pub cost: u32,
    /// Whether the choice is gated behind an achievement the user lacks.
    pub locked: bool,
}

/// A snapshot of a playthrough for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaythroughView {
    /// The story being played.
    pub story: StoryId,
    /// The current node.
    pub node: NodeId,
    /// The current phase.
    pub phase: PlaybackPhase,
    /// Index of the segment currently displayed.
    pub segment_index: usize,
    /// The current node's joined narrative text.
    pub narrative: String,
    /// The current node's choices, gating already resolved.
    pub choices: Vec<ChoiceView>,
}

/// The Fabelweg domain service.
pub struct StoryService {
    stories: StoryCatalog,
    achievements: AchievementEngine,
    ledger: CreditLedger,
    playthroughs: Mutex<HashMap<UserId, Playthrough>>,
    prefetcher: Box<dyn AssetPrefetcher>,
}

impl StoryService {
    /// Create a service over loaded content.
    pub fn new(
        stories: StoryCatalog,
        achievements: AchievementCatalog,
        config: EconomyConfig,
    ) -> Self {
        Self {
            stories,
            achievements: AchievementEngine::new(achievements),
            ledger: CreditLedger::new(config),
            playthroughs: Mutex::new(HashMap::new()),
            prefetcher: Box::new(NoopPrefetcher),
        }
    }

    /// Replace the asset prefetcher.
    #[must_use]
    pub fn with_prefetcher(mut self, prefetcher: Box<dyn AssetPrefetcher>) -> Self {
        self.prefetcher = prefetcher;
        self
    }

    /// The story catalog.
    pub fn stories(&self) -> &StoryCatalog {
        &self.stories
    }

    /// The achievement engine.
    pub fn achievements(&self) -> &AchievementEngine {
        &self.achievements
    }

    /// The credit ledger.
    pub fn ledger(&self) -> &CreditLedger {
        &self.ledger
    }

    // -----------------------------------------------------------------------
    // Session lifecycle
    // -----------------------------------------------------------------------

    /// Create a registered account.
    pub fn register(&self, now: DateTime<Utc>) -> UserId {
        self.ledger.create_registered(now)
    }

    /// Create a guest account with the fixed guest capacity.
    pub fn guest(&self, now: DateTime<Utc>) -> UserId {
        self.ledger.create_guest(now)
    }

    /// Record a login, extending or resetting the streak, then evaluate
    /// achievements (streak unlocks fire here).
    pub fn record_login(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> PlaybackResult<Vec<EngineEvent>> {
        self.ledger
            .update_account(user, |account| account.stats.record_login(now))?;
        self.evaluate_unlocks(user, UnlockSource::Automatic, now)
    }

    /// End a session. Guest accounts are destroyed; registered accounts
    /// persist with only their playthrough dropped.
    pub fn logout(&self, user: UserId) -> PlaybackResult<()> {
        self.playthroughs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&user);
        let is_guest = self.ledger.with_account(user, |a| a.is_guest)?;
        if is_guest {
            self.ledger.remove(user)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Playback commands
    // -----------------------------------------------------------------------

    /// Start (or replace) the user's playthrough of a story.
    pub fn begin_story(
        &self,
        user: UserId,
        story: &StoryId,
        now: DateTime<Utc>,
    ) -> PlaybackResult<Vec<EngineEvent>> {
        self.ledger.with_account(user, |_| ())?;
        let graph = self.stories.story(story)?;
        let (playthrough, ending) = Playthrough::begin(graph)?;
        self.playthroughs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user, playthrough);

        match ending {
            Some(node) => self.complete_story(user, story, node, now),
            None => Ok(Vec::new()),
        }
    }

    /// Select a choice on the current node.
    ///
    /// Gating order: phase, achievement lock, target integrity, then the
    /// credit spend. A rejection leaves every piece of state untouched and
    /// returns a single [`EngineEvent::ChoiceRejected`]. A broken target is
    /// fatal to the playthrough: it is logged, the playthrough dropped, and
    /// the error returned — the user lands back at story selection, never
    /// in an undefined state. No credits are charged for a broken target.
    pub fn select_choice(
        &self,
        user: UserId,
        index: usize,
        now: DateTime<Utc>,
    ) -> PlaybackResult<Vec<EngineEvent>> {
        let mut playthroughs = self
            .playthroughs
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let playthrough = playthroughs
            .get_mut(&user)
            .ok_or(PlaybackError::NoActivePlaythrough(user))?;

        if playthrough.phase() != PlaybackPhase::AwaitingChoice {
            return Ok(vec![EngineEvent::ChoiceRejected {
                reason: RejectReason::NotAwaitingChoice,
            }]);
        }

        let story = playthrough.story().clone();
        let graph = self.stories.story(&story)?;
        let node = playthrough.current_node(graph)?;
        let choice = node
            .choices
            .get(index)
            .ok_or_else(|| PlaybackError::NoSuchChoice {
                node: node.id.clone(),
                index,
            })?;

        // Hard block: no resource consumed, state unchanged.
        if let Some(required) = &choice.required_achievement {
            let unlocked = self
                .ledger
                .with_account(user, |a| a.has_achievement(required))?;
            if !unlocked {
                return Ok(vec![EngineEvent::ChoiceRejected {
                    reason: RejectReason::Locked,
                }]);
            }
        }

        // Content bug: fatal, logged, never charged.
        let Some(target) = graph.node(&choice.next_node) else {
            let integrity = StoryError::GraphIntegrity {
                story: story.clone(),
                node: node.id.clone(),
                choice: choice.id.clone(),
                target: choice.next_node.clone(),
            };
            error!(
                user = %user,
                story = %story,
                node = %node.id,
                choice = %choice.id,
                target = %choice.next_node,
                "broken choice target; abandoning playthrough"
            );
            playthroughs.remove(&user);
            return Err(integrity.into());
        };

        // Preload completes before the transition commits.
        self.prefetcher.prefetch(&target.media_refs());

        let transaction = match self.ledger.spend(user, choice.credit_cost(), "choice", now) {
            Ok(txn) => txn,
            Err(EconomyError::InsufficientCredits { .. }) => {
                return Ok(vec![EngineEvent::ChoiceRejected {
                    reason: RejectReason::InsufficientCredits,
                }]);
            }
            Err(err) => return Err(err.into()),
        };

        let mut events = vec![EngineEvent::TransactionCommitted { transaction }];
        let ending = playthrough.commit_choice(graph, index)?;
        drop(playthroughs);

        if let Some(node) = ending {
            events.extend(self.complete_story(user, &story, node, now)?);
        }
        Ok(events)
    }

    /// Advance segment display by elapsed wall-clock milliseconds.
    pub fn elapse(
        &self,
        user: UserId,
        ms: u64,
        now: DateTime<Utc>,
    ) -> PlaybackResult<Vec<EngineEvent>> {
        self.drive(user, now, |playthrough, graph| playthrough.elapse(graph, ms))
    }

    /// Skip the current segment.
    pub fn skip_segment(&self, user: UserId, now: DateTime<Utc>) -> PlaybackResult<Vec<EngineEvent>> {
        self.drive(user, now, Playthrough::skip_segment)
    }

    /// Re-display the current node from its first segment.
    pub fn replay_node(&self, user: UserId, now: DateTime<Utc>) -> PlaybackResult<Vec<EngineEvent>> {
        self.drive(user, now, Playthrough::replay_node)
    }

    /// Restart the playthrough from the story's start node.
    pub fn restart_playthrough(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> PlaybackResult<Vec<EngineEvent>> {
        self.drive(user, now, Playthrough::restart)
    }

    /// Shared drive loop: run a playthrough operation, then the completion
    /// pipeline if it pushed the run onto an ending.
    fn drive(
        &self,
        user: UserId,
        now: DateTime<Utc>,
        op: impl FnOnce(&mut Playthrough, &fw_core::StoryGraph) -> PlaybackResult<Option<NodeId>>,
    ) -> PlaybackResult<Vec<EngineEvent>> {
        let mut playthroughs = self
            .playthroughs
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let playthrough = playthroughs
            .get_mut(&user)
            .ok_or(PlaybackError::NoActivePlaythrough(user))?;
        let story = playthrough.story().clone();
        let graph = self.stories.story(&story)?;

        let ending = op(playthrough, graph)?;
        drop(playthroughs);

        match ending {
            Some(node) => self.complete_story(user, &story, node, now),
            None => Ok(Vec::new()),
        }
    }

    // -----------------------------------------------------------------------
    // Economy commands
    // -----------------------------------------------------------------------

    /// Spend credits for a choice outside the playthrough flow.
    pub fn spend_for_choice(
        &self,
        user: UserId,
        amount: u32,
        now: DateTime<Utc>,
    ) -> PlaybackResult<Vec<EngineEvent>> {
        let transaction = self.ledger.spend(user, amount, "choice", now)?;
        Ok(vec![EngineEvent::TransactionCommitted { transaction }])
    }

    /// Grant the one-time rating bonus for a story. Idempotent: the second
    /// rating of the same story produces no events and no credits.
    pub fn grant_rating_bonus_once(
        &self,
        user: UserId,
        story: &StoryId,
        amount: u32,
        now: DateTime<Utc>,
    ) -> PlaybackResult<Vec<EngineEvent>> {
        self.stories.story(story)?;
        match self.ledger.grant_rating_bonus_once(user, story, amount, now)? {
            RatingBonus::AlreadyGranted => Ok(Vec::new()),
            RatingBonus::Granted(transaction) => {
                self.ledger
                    .update_account(user, |account| account.stats.record_review())?;
                let mut events: Vec<EngineEvent> = transaction
                    .map(|transaction| EngineEvent::TransactionCommitted { transaction })
                    .into_iter()
                    .collect();
                events.extend(self.evaluate_unlocks(user, UnlockSource::Automatic, now)?);
                Ok(events)
            }
        }
    }

    /// Unlock an achievement directly (admin grant, special event).
    /// Idempotent; the credit bonus saturates at capacity.
    pub fn unlock_achievement(
        &self,
        user: UserId,
        achievement: &fw_core::AchievementId,
        source: UnlockSource,
        now: DateTime<Utc>,
    ) -> PlaybackResult<Vec<EngineEvent>> {
        self.apply_unlock(user, achievement, source, now)
    }

    /// Add playtime minutes, then evaluate achievements.
    pub fn add_playtime(
        &self,
        user: UserId,
        minutes: u64,
        now: DateTime<Utc>,
    ) -> PlaybackResult<Vec<EngineEvent>> {
        self.ledger
            .update_account(user, |account| account.stats.add_playtime(minutes))?;
        self.evaluate_unlocks(user, UnlockSource::Automatic, now)
    }

    /// Mark a story as a favorite.
    pub fn set_favorite(&self, user: UserId, story: &StoryId) -> PlaybackResult<()> {
        self.stories.story(story)?;
        self.ledger.update_account(user, |account| {
            account.favorites.insert(story.clone());
        })?;
        Ok(())
    }

    /// Remove a story from favorites.
    pub fn clear_favorite(&self, user: UserId, story: &StoryId) -> PlaybackResult<()> {
        self.ledger.update_account(user, |account| {
            account.favorites.remove(story);
        })?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Current balance, with any due refill committed first.
    pub fn balance(&self, user: UserId, now: DateTime<Utc>) -> PlaybackResult<u32> {
        self.ledger.poll_refill(user, now)?;
        Ok(self.ledger.balance(user)?)
    }

    /// Current credit capacity.
    pub fn max_credits(&self, user: UserId) -> PlaybackResult<u32> {
        Ok(self.ledger.max_credits(user)?)
    }

    /// Milliseconds until the next credit regenerates, `None` at capacity.
    pub fn next_refill_eta(&self, user: UserId, now: DateTime<Utc>) -> PlaybackResult<Option<i64>> {
        Ok(self.ledger.next_refill_eta(user, now)?)
    }

    /// The user's transaction log, oldest first.
    pub fn transactions(&self, user: UserId) -> PlaybackResult<Vec<CreditTransaction>> {
        Ok(self.ledger.transactions(user)?)
    }

    /// The current playthrough's history log.
    pub fn history(&self, user: UserId) -> PlaybackResult<HistoryLog> {
        let playthroughs = self
            .playthroughs
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        playthroughs
            .get(&user)
            .map(|p| p.history().clone())
            .ok_or(PlaybackError::NoActivePlaythrough(user))
    }

    /// Progress toward every achievement, in catalog order.
    pub fn achievement_progress(
        &self,
        user: UserId,
    ) -> PlaybackResult<Vec<(fw_core::AchievementId, fw_achievements::Progress)>> {
        let account = self.ledger.with_account(user, Clone::clone)?;
        Ok(self.achievements.progress_all(&account))
    }

    /// A render-ready snapshot of the current playthrough.
    pub fn view(&self, user: UserId) -> PlaybackResult<PlaythroughView> {
        let playthroughs = self
            .playthroughs
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let playthrough = playthroughs
            .get(&user)
            .ok_or(PlaybackError::NoActivePlaythrough(user))?;
        let graph = self.stories.story(playthrough.story())?;
        let node = playthrough.current_node(graph)?;
        let account = self.ledger.with_account(user, Clone::clone)?;

        let choices = node
            .choices
            .iter()
            .enumerate()
            .map(|(index, choice)| ChoiceView {
                index,
                text: choice.text.clone(),
                cost: choice.credit_cost(),
                locked: choice
                    .required_achievement
                    .as_ref()
                    .is_some_and(|required| !account.has_achievement(required)),
            })
            .collect();

        Ok(PlaythroughView {
            story: playthrough.story().clone(),
            node: playthrough.current().clone(),
            phase: playthrough.phase(),
            segment_index: playthrough.segment_index(),
            narrative: node.narrative_text(),
            choices,
        })
    }

    // -----------------------------------------------------------------------
    // Completion pipeline
    // -----------------------------------------------------------------------

    /// An ending fired: mark the story played, bump the completion stats,
    /// and evaluate achievements (guests skip evaluation).
    fn complete_story(
        &self,
        user: UserId,
        story: &StoryId,
        node: NodeId,
        now: DateTime<Utc>,
    ) -> PlaybackResult<Vec<EngineEvent>> {
        let genre = self.stories.story(story)?.genre.clone();
        self.ledger.update_account(user, |account| {
            account.played.insert(story.clone());
            account.stats.record_completion(&genre);
        })?;

        let mut events = vec![EngineEvent::EndingReached {
            story: story.clone(),
            node,
        }];
        events.extend(self.evaluate_unlocks(
            user,
            UnlockSource::StoryCompletion {
                story: story.clone(),
            },
            now,
        )?);
        Ok(events)
    }

    /// Unlock everything newly satisfied, applying rewards through the
    /// ledger.
    fn evaluate_unlocks(
        &self,
        user: UserId,
        source: UnlockSource,
        now: DateTime<Utc>,
    ) -> PlaybackResult<Vec<EngineEvent>> {
        let account = self.ledger.with_account(user, Clone::clone)?;
        let satisfied = self.achievements.newly_satisfied(&account);

        let mut events = Vec::new();
        for id in satisfied {
            events.extend(self.apply_unlock(user, &id, source.clone(), now)?);
        }
        Ok(events)
    }

    fn apply_unlock(
        &self,
        user: UserId,
        id: &fw_core::AchievementId,
        source: UnlockSource,
        now: DateTime<Utc>,
    ) -> PlaybackResult<Vec<EngineEvent>> {
        let base_cap = self.ledger.config().base_cap;
        let outcome = self.ledger.update_account(user, |account| {
            self.achievements.unlock(account, id, source, base_cap)
        })??;

        match outcome {
            UnlockOutcome::AlreadyUnlocked => Ok(Vec::new()),
            UnlockOutcome::Unlocked(record) => {
                let mut events = vec![EngineEvent::AchievementUnlocked {
                    achievement: record.achievement,
                    source: record.source,
                }];
                if record.credit_bonus > 0
                    && let Some(transaction) =
                        self.ledger.bonus(user, record.credit_bonus, "achievement", now)?
                {
                    events.push(EngineEvent::TransactionCommitted { transaction });
                }
                Ok(events)
            }
        }
    }
}
