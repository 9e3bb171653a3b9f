//! The transactional balance ledger.
//!
//! All balance mutations for one user happen inside that user's own mutex:
//! read, validate, write, append log entry as a single critical section.
//! Overlapping requests (a double-click, a retried network call) therefore
//! cannot both observe a sufficient balance and both succeed. The critical
//! section is O(1).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::debug;

use fw_core::StoryId;

use crate::account::{UserAccount, UserId};
use crate::config::EconomyConfig;
use crate::error::{EconomyError, EconomyResult};
use crate::refill::{self, RefillPlan};
use crate::transaction::{CreditTransaction, TransactionKind};

/// Outcome of the idempotent rating-bonus wrapper.
#[derive(Debug, Clone, PartialEq)]
pub enum RatingBonus {
    /// First rating of this story: the bonus was applied. The transaction
    /// is absent when the balance was already at capacity.
    Granted(Option<CreditTransaction>),
    /// The bonus for this story fired before; nothing changed.
    AlreadyGranted,
}

/// Per-user ledger state: the account plus its append-only transaction log.
#[derive(Debug)]
struct AccountEntry {
    account: UserAccount,
    log: Vec<CreditTransaction>,
}

/// The outer lock guards only the map shape; each entry has its own mutex.
type Registry = HashMap<UserId, Arc<Mutex<AccountEntry>>>;

/// The credit ledger: balance plus append-only transaction log per user.
///
/// This is the single serialization point of the whole engine. The refill
/// planner, the achievement engine, and the playback engine all commit
/// their credit effects through it.
#[derive(Debug)]
pub struct CreditLedger {
    config: EconomyConfig,
    accounts: RwLock<Registry>,
}

impl CreditLedger {
    /// Create an empty ledger with the given configuration.
    pub fn new(config: EconomyConfig) -> Self {
        Self {
            config,
            accounts: RwLock::new(HashMap::new()),
        }
    }

    /// The economy configuration.
    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    /// Create a registered account, returning its id.
    pub fn create_registered(&self, now: DateTime<Utc>) -> UserId {
        self.insert(UserAccount::registered(&self.config, now))
    }

    /// Create a guest account, returning its id.
    pub fn create_guest(&self, now: DateTime<Utc>) -> UserId {
        self.insert(UserAccount::guest(&self.config, now))
    }

    /// Insert an existing account (e.g. loaded from persistence).
    pub fn insert(&self, account: UserAccount) -> UserId {
        let id = account.id;
        let entry = AccountEntry {
            account,
            log: Vec::new(),
        };
        self.accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(Mutex::new(entry)));
        id
    }

    /// Remove an account (guest logout), returning its final state.
    pub fn remove(&self, user: UserId) -> EconomyResult<UserAccount> {
        let entry = self
            .accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&user)
            .ok_or(EconomyError::UnknownUser(user))?;
        let entry = Arc::try_unwrap(entry)
            .map(|m| m.into_inner().unwrap_or_else(PoisonError::into_inner))
            .unwrap_or_else(|arc| {
                let guard = arc.lock().unwrap_or_else(PoisonError::into_inner);
                AccountEntry {
                    account: guard.account.clone(),
                    log: guard.log.clone(),
                }
            });
        Ok(entry.account)
    }

    fn entry(&self, user: UserId) -> EconomyResult<Arc<Mutex<AccountEntry>>> {
        self.accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user)
            .cloned()
            .ok_or(EconomyError::UnknownUser(user))
    }

    /// Run a read-only closure against an account.
    pub fn with_account<R>(
        &self,
        user: UserId,
        f: impl FnOnce(&UserAccount) -> R,
    ) -> EconomyResult<R> {
        let entry = self.entry(user)?;
        let guard = entry.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&guard.account))
    }

    /// Run a mutating closure against an account, inside its critical
    /// section. This is the seam the achievement engine and the service use
    /// for non-balance aggregate updates (unlocks, stats, favorites); all
    /// balance movements go through the typed operations below.
    pub fn update_account<R>(
        &self,
        user: UserId,
        f: impl FnOnce(&mut UserAccount) -> R,
    ) -> EconomyResult<R> {
        let entry = self.entry(user)?;
        let mut guard = entry.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&mut guard.account))
    }

    /// Current balance, as stored. Callers wanting the lazily regenerated
    /// value poll [`Self::poll_refill`] first.
    pub fn balance(&self, user: UserId) -> EconomyResult<u32> {
        self.with_account(user, |a| a.credits)
    }

    /// Current credit capacity.
    pub fn max_credits(&self, user: UserId) -> EconomyResult<u32> {
        self.with_account(user, |a| a.max_credits)
    }

    /// The user's transaction log, oldest first.
    pub fn transactions(&self, user: UserId) -> EconomyResult<Vec<CreditTransaction>> {
        let entry = self.entry(user)?;
        let guard = entry.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.log.clone())
    }

    /// Milliseconds until the next credit regenerates, `None` at capacity.
    ///
    /// Pending whole intervals are committed first so the answer reflects
    /// the regenerated balance, not a stale anchor.
    pub fn next_refill_eta(&self, user: UserId, now: DateTime<Utc>) -> EconomyResult<Option<i64>> {
        self.poll_refill(user, now)?;
        self.with_account(user, |a| {
            refill::next_refill_eta(
                a.credits,
                a.max_credits,
                a.last_refill,
                now,
                self.config.refill_interval_ms,
            )
        })
    }

    /// Spend credits.
    ///
    /// Fails with [`EconomyError::InvalidAmount`] or
    /// [`EconomyError::InsufficientCredits`] before any mutation. If the
    /// prior balance sat exactly at capacity, the refill anchor resets to
    /// `now`: the regeneration cycle starts when the user first drops below
    /// full.
    pub fn spend(
        &self,
        user: UserId,
        amount: u32,
        source: &str,
        now: DateTime<Utc>,
    ) -> EconomyResult<CreditTransaction> {
        self.validate_amount(amount)?;
        let entry = self.entry(user)?;
        let mut guard = entry.lock().unwrap_or_else(PoisonError::into_inner);

        let balance = guard.account.credits;
        if balance < amount {
            return Err(EconomyError::InsufficientCredits {
                required: amount,
                available: balance,
            });
        }

        let was_full = guard.account.is_full();
        guard.account.credits = balance - amount;
        if was_full {
            guard.account.last_refill = now;
        }
        guard.account.stats.credits_spent += u64::from(amount);

        let txn = self.append(&mut guard, user, TransactionKind::Spend, source, amount, now);
        Ok(txn)
    }

    /// Earn credits through the validated path.
    ///
    /// Fails with [`EconomyError::ExceedsCap`] when the result would pass
    /// the earn ceiling or the account's capacity; never clamps.
    pub fn earn(
        &self,
        user: UserId,
        amount: u32,
        source: &str,
        now: DateTime<Utc>,
    ) -> EconomyResult<CreditTransaction> {
        self.validate_amount(amount)?;
        let entry = self.entry(user)?;
        let mut guard = entry.lock().unwrap_or_else(PoisonError::into_inner);

        let balance = guard.account.credits;
        let ceiling = self.config.earn_ceiling().min(guard.account.max_credits);
        if balance + amount > ceiling {
            return Err(EconomyError::ExceedsCap {
                balance,
                amount,
                ceiling,
            });
        }

        guard.account.credits = balance + amount;
        let txn = self.append(&mut guard, user, TransactionKind::Earn, source, amount, now);
        Ok(txn)
    }

    /// Grant reward credits, saturating silently at capacity.
    ///
    /// The credited amount may be less than requested; at capacity nothing
    /// is credited and no transaction is appended.
    pub fn bonus(
        &self,
        user: UserId,
        amount: u32,
        source: &str,
        now: DateTime<Utc>,
    ) -> EconomyResult<Option<CreditTransaction>> {
        self.credit_saturating(user, amount, TransactionKind::Bonus, source, now)
    }

    /// Restore credits, saturating silently at capacity.
    pub fn refund(
        &self,
        user: UserId,
        amount: u32,
        source: &str,
        now: DateTime<Utc>,
    ) -> EconomyResult<Option<CreditTransaction>> {
        self.credit_saturating(user, amount, TransactionKind::Refund, source, now)
    }

    /// Grant the one-time rating bonus for a story.
    ///
    /// Idempotent: the story is marked on first grant and every later call
    /// reports [`RatingBonus::AlreadyGranted`] without touching anything.
    pub fn grant_rating_bonus_once(
        &self,
        user: UserId,
        story: &StoryId,
        amount: u32,
        now: DateTime<Utc>,
    ) -> EconomyResult<RatingBonus> {
        self.validate_amount(amount)?;
        let entry = self.entry(user)?;
        let mut guard = entry.lock().unwrap_or_else(PoisonError::into_inner);

        if guard.account.rated_for_bonus.contains(story) {
            return Ok(RatingBonus::AlreadyGranted);
        }
        guard.account.rated_for_bonus.insert(story.clone());

        let balance = guard.account.credits;
        let credited = amount.min(guard.account.max_credits - balance);
        if credited == 0 {
            return Ok(RatingBonus::Granted(None));
        }
        guard.account.credits = balance + credited;
        let txn = self.append(
            &mut guard,
            user,
            TransactionKind::Bonus,
            "review",
            credited,
            now,
        );
        Ok(RatingBonus::Granted(Some(txn)))
    }

    /// Commit any refill due at `now` through the serialized path.
    ///
    /// Returns the refill transaction when at least one credit
    /// materialized; a bare anchor touch-up appends nothing.
    pub fn poll_refill(
        &self,
        user: UserId,
        now: DateTime<Utc>,
    ) -> EconomyResult<Option<CreditTransaction>> {
        let entry = self.entry(user)?;
        let mut guard = entry.lock().unwrap_or_else(PoisonError::into_inner);

        let RefillPlan {
            credits_to_add,
            last_refill,
        } = refill::plan_refill(
            guard.account.credits,
            guard.account.max_credits,
            guard.account.last_refill,
            now,
            self.config.refill_interval_ms,
        );

        guard.account.last_refill = last_refill;
        if credits_to_add == 0 {
            return Ok(None);
        }
        guard.account.credits += credits_to_add;
        let txn = self.append(
            &mut guard,
            user,
            TransactionKind::Earn,
            "refill",
            credits_to_add,
            now,
        );
        Ok(Some(txn))
    }

    fn credit_saturating(
        &self,
        user: UserId,
        amount: u32,
        kind: TransactionKind,
        source: &str,
        now: DateTime<Utc>,
    ) -> EconomyResult<Option<CreditTransaction>> {
        self.validate_amount(amount)?;
        let entry = self.entry(user)?;
        let mut guard = entry.lock().unwrap_or_else(PoisonError::into_inner);

        let balance = guard.account.credits;
        let credited = amount.min(guard.account.max_credits - balance);
        if credited == 0 {
            return Ok(None);
        }
        guard.account.credits = balance + credited;
        let txn = self.append(&mut guard, user, kind, source, credited, now);
        Ok(Some(txn))
    }

    fn validate_amount(&self, amount: u32) -> EconomyResult<()> {
        if amount == 0 || amount > self.config.max_txn_amount {
            return Err(EconomyError::InvalidAmount {
                amount,
                limit: self.config.max_txn_amount,
            });
        }
        Ok(())
    }

    fn append(
        &self,
        entry: &mut AccountEntry,
        user: UserId,
        kind: TransactionKind,
        source: &str,
        amount: u32,
        now: DateTime<Utc>,
    ) -> CreditTransaction {
        let balance_after = entry.account.credits;
        let balance_before = match kind {
            TransactionKind::Spend => balance_after + amount,
            _ => balance_after - amount,
        };
        let txn = CreditTransaction::record(
            user, kind, source, amount, balance_before, balance_after, now,
        );
        debug!(
            user = %user,
            kind = %kind,
            source,
            amount,
            balance_after,
            "ledger commit"
        );
        entry.log.push(txn.clone());
        txn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn ledger() -> CreditLedger {
        CreditLedger::new(EconomyConfig::default())
    }

    #[test]
    fn spend_decrements_and_logs() {
        let ledger = ledger();
        let user = ledger.create_registered(t0());

        let txn = ledger.spend(user, 3, "choice", t0()).unwrap();
        assert_eq!(txn.balance_before, 20);
        assert_eq!(txn.balance_after, 17);
        assert_eq!(ledger.balance(user).unwrap(), 17);
        assert_eq!(ledger.transactions(user).unwrap().len(), 1);
    }

    #[test]
    fn spend_rejects_insufficient_without_mutation() {
        let ledger = ledger();
        let user = ledger.create_registered(t0());
        ledger.spend(user, 20, "choice", t0()).unwrap();

        let err = ledger.spend(user, 1, "choice", t0()).unwrap_err();
        assert_eq!(
            err,
            EconomyError::InsufficientCredits {
                required: 1,
                available: 0
            }
        );
        assert_eq!(ledger.balance(user).unwrap(), 0);
        assert_eq!(ledger.transactions(user).unwrap().len(), 1);
    }

    #[test]
    fn spend_rejects_invalid_amounts() {
        let ledger = ledger();
        let user = ledger.create_registered(t0());

        assert!(matches!(
            ledger.spend(user, 0, "choice", t0()),
            Err(EconomyError::InvalidAmount { .. })
        ));
        assert!(matches!(
            ledger.spend(user, 101, "choice", t0()),
            Err(EconomyError::InvalidAmount { .. })
        ));
        assert!(ledger.transactions(user).unwrap().is_empty());
    }

    #[test]
    fn spend_at_cap_resets_refill_anchor() {
        let ledger = ledger();
        let user = ledger.create_registered(t0());
        let later = t0() + TimeDelta::milliseconds(90_000);

        // Balance sits at capacity, so the anchor jumps to the spend time.
        ledger.spend(user, 1, "choice", later).unwrap();
        let anchor = ledger.with_account(user, |a| a.last_refill).unwrap();
        assert_eq!(anchor, later);
    }

    #[test]
    fn spend_below_cap_leaves_anchor_untouched() {
        let ledger = ledger();
        let user = ledger.create_registered(t0());
        ledger.spend(user, 1, "choice", t0()).unwrap();

        let later = t0() + TimeDelta::milliseconds(1_000);
        ledger.spend(user, 1, "choice", later).unwrap();
        let anchor = ledger.with_account(user, |a| a.last_refill).unwrap();
        assert_eq!(anchor, t0());
    }

    #[test]
    fn earn_rejects_over_ceiling() {
        let ledger = ledger();
        let user = ledger.create_registered(t0());
        ledger.spend(user, 15, "choice", t0()).unwrap();

        // Capacity 20 binds before the earn buffer (30) does.
        let err = ledger.earn(user, 16, "reward", t0()).unwrap_err();
        assert_eq!(
            err,
            EconomyError::ExceedsCap {
                balance: 5,
                amount: 16,
                ceiling: 20
            }
        );
        assert_eq!(ledger.balance(user).unwrap(), 5);

        ledger.earn(user, 15, "reward", t0()).unwrap();
        assert_eq!(ledger.balance(user).unwrap(), 20);
    }

    #[test]
    fn bonus_saturates_at_capacity() {
        let ledger = ledger();
        let user = ledger.create_registered(t0());
        ledger.spend(user, 2, "choice", t0()).unwrap();

        // Only two credits of room: a five-credit bonus credits two.
        let txn = ledger.bonus(user, 5, "achievement", t0()).unwrap().unwrap();
        assert_eq!(txn.amount, 2);
        assert_eq!(ledger.balance(user).unwrap(), 20);

        // At capacity: nothing credited, nothing logged.
        assert_eq!(ledger.bonus(user, 5, "achievement", t0()).unwrap(), None);
        assert_eq!(ledger.transactions(user).unwrap().len(), 2);
    }

    #[test]
    fn refund_saturates_like_bonus() {
        let ledger = ledger();
        let user = ledger.create_registered(t0());
        ledger.spend(user, 1, "choice", t0()).unwrap();

        let txn = ledger.refund(user, 3, "choice", t0()).unwrap().unwrap();
        assert_eq!(txn.kind, TransactionKind::Refund);
        assert_eq!(txn.amount, 1);
        assert_eq!(ledger.balance(user).unwrap(), 20);
    }

    #[test]
    fn rating_bonus_fires_exactly_once() {
        let ledger = ledger();
        let user = ledger.create_registered(t0());
        ledger.spend(user, 10, "choice", t0()).unwrap();
        let story = StoryId::new("the-gate");

        let first = ledger
            .grant_rating_bonus_once(user, &story, 5, t0())
            .unwrap();
        assert!(matches!(first, RatingBonus::Granted(Some(_))));
        assert_eq!(ledger.balance(user).unwrap(), 15);

        let second = ledger
            .grant_rating_bonus_once(user, &story, 5, t0())
            .unwrap();
        assert_eq!(second, RatingBonus::AlreadyGranted);
        assert_eq!(ledger.balance(user).unwrap(), 15);
        assert_eq!(ledger.transactions(user).unwrap().len(), 2);
    }

    #[test]
    fn rating_bonus_at_capacity_still_marks_story() {
        let ledger = ledger();
        let user = ledger.create_registered(t0());
        let story = StoryId::new("the-gate");

        let outcome = ledger
            .grant_rating_bonus_once(user, &story, 5, t0())
            .unwrap();
        assert_eq!(outcome, RatingBonus::Granted(None));
        assert!(
            ledger
                .with_account(user, |a| a.has_rating_bonus(&story))
                .unwrap()
        );
    }

    #[test]
    fn poll_refill_commits_whole_ticks_and_keeps_remainder() {
        let config = EconomyConfig::default();
        let ledger = CreditLedger::new(config);
        let user = ledger.insert({
            let mut account = UserAccount::registered(&EconomyConfig::default(), t0());
            account.credits = 5;
            account.max_credits = 10;
            account
        });

        let now = t0() + TimeDelta::milliseconds(750_000);
        let txn = ledger.poll_refill(user, now).unwrap().unwrap();
        assert_eq!(txn.amount, 2);
        assert_eq!(txn.source, "refill");
        assert_eq!(ledger.balance(user).unwrap(), 7);

        let anchor = ledger.with_account(user, |a| a.last_refill).unwrap();
        assert_eq!(anchor, t0() + TimeDelta::milliseconds(600_000));
    }

    #[test]
    fn poll_refill_below_interval_is_noop() {
        let ledger = ledger();
        let user = ledger.create_registered(t0());
        ledger.spend(user, 5, "choice", t0()).unwrap();

        let now = t0() + TimeDelta::milliseconds(200_000);
        assert_eq!(ledger.poll_refill(user, now).unwrap(), None);
        assert_eq!(ledger.balance(user).unwrap(), 15);
    }

    #[test]
    fn eta_reflects_committed_refill() {
        let ledger = ledger();
        let user = ledger.create_registered(t0());
        ledger.spend(user, 5, "choice", t0()).unwrap();

        let now = t0() + TimeDelta::milliseconds(400_000);
        let eta = ledger.next_refill_eta(user, now).unwrap();
        // One credit committed at 300s; 200s remain toward the next.
        assert_eq!(eta, Some(200_000));
        assert_eq!(ledger.balance(user).unwrap(), 16);
    }

    #[test]
    fn eta_none_at_capacity() {
        let ledger = ledger();
        let user = ledger.create_registered(t0());
        assert_eq!(ledger.next_refill_eta(user, t0()).unwrap(), None);
    }

    #[test]
    fn transactions_chain() {
        let ledger = ledger();
        let user = ledger.create_registered(t0());

        ledger.spend(user, 4, "choice", t0()).unwrap();
        ledger.spend(user, 2, "choice", t0()).unwrap();
        ledger.bonus(user, 3, "achievement", t0()).unwrap();
        ledger.refund(user, 1, "choice", t0()).unwrap();

        let log = ledger.transactions(user).unwrap();
        assert_eq!(log.len(), 4);
        for pair in log.windows(2) {
            assert_eq!(pair[1].balance_before, pair[0].balance_after);
        }
    }

    #[test]
    fn unknown_user_rejected() {
        let ledger = ledger();
        assert!(matches!(
            ledger.spend(UserId::new(), 1, "choice", t0()),
            Err(EconomyError::UnknownUser(_))
        ));
    }

    #[test]
    fn guest_logout_returns_account() {
        let ledger = ledger();
        let user = ledger.create_guest(t0());
        ledger.spend(user, 1, "choice", t0()).unwrap();

        let account = ledger.remove(user).unwrap();
        assert!(account.is_guest);
        assert_eq!(account.credits, 9);
        assert!(matches!(
            ledger.balance(user),
            Err(EconomyError::UnknownUser(_))
        ));
    }

    #[test]
    fn concurrent_spends_cannot_overdraw() {
        use std::thread;

        let ledger = Arc::new(ledger());
        let user = ledger.create_registered(t0());
        // Leave exactly one credit.
        ledger.spend(user, 19, "choice", t0()).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || ledger.spend(user, 1, "choice", t0()).is_ok())
            })
            .collect();
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|succeeded| *succeeded)
            .count();

        assert_eq!(successes, 1);
        assert_eq!(ledger.balance(user).unwrap(), 0);
    }

    proptest! {
        #[test]
        fn balance_stays_within_bounds(ops in proptest::collection::vec(0u8..4, 1..40)) {
            let ledger = CreditLedger::new(EconomyConfig::default());
            let user = ledger.create_registered(t0());
            let mut now = t0();

            for op in ops {
                now += TimeDelta::milliseconds(60_000);
                match op {
                    0 => { let _ = ledger.spend(user, 3, "choice", now); }
                    1 => { let _ = ledger.earn(user, 2, "reward", now); }
                    2 => { let _ = ledger.bonus(user, 4, "achievement", now); }
                    _ => { let _ = ledger.poll_refill(user, now); }
                }
                let account = ledger.with_account(user, |a| a.clone()).unwrap();
                prop_assert!(account.credits <= account.max_credits);
            }

            let log = ledger.transactions(user).unwrap();
            for pair in log.windows(2) {
                prop_assert_eq!(pair[1].balance_before, pair[0].balance_after);
            }
        }
    }
}
