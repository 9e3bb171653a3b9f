//! Pure, lazy, time-based credit regeneration.
//!
//! Regeneration is recomputed from the stored anchor timestamp on every
//! read or poll — never accumulated by a running counter — so it stays
//! correct even if the consuming process was suspended for hours. The
//! planner proposes a new state; the caller commits it through the same
//! serialized ledger path as any other credit mutation.

use chrono::{DateTime, TimeDelta, Utc};

/// A proposed refill: how many credits materialize and the new anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefillPlan {
    /// Credits to add. Zero means only the anchor may move.
    pub credits_to_add: u32,
    /// The new anchor timestamp to store.
    pub last_refill: DateTime<Utc>,
}

/// Compute the refill due at `now`.
///
/// - At or above capacity there is nothing to regenerate; the anchor is
///   touched up to `now` so the next spend's countdown starts clean.
/// - Below one full interval the state is untouched.
/// - Otherwise one credit per elapsed interval is added, clamped to
///   capacity, and the anchor becomes `now - (elapsed mod interval)`: the
///   sub-interval remainder is preserved, so partial progress toward the
///   next credit survives recomputation.
pub fn plan_refill(
    credits: u32,
    max_credits: u32,
    last_refill: DateTime<Utc>,
    now: DateTime<Utc>,
    interval_ms: i64,
) -> RefillPlan {
    if credits >= max_credits {
        return RefillPlan {
            credits_to_add: 0,
            last_refill: now,
        };
    }

    let elapsed = (now - last_refill).num_milliseconds();
    if interval_ms <= 0 || elapsed < interval_ms {
        return RefillPlan {
            credits_to_add: 0,
            last_refill,
        };
    }

    let ticks = elapsed / interval_ms;
    let missing = i64::from(max_credits - credits);
    let credits_to_add = ticks.min(missing) as u32;

    RefillPlan {
        credits_to_add,
        last_refill: now - TimeDelta::milliseconds(elapsed % interval_ms),
    }
}

/// Milliseconds until the next credit materializes, or `None` at capacity.
pub fn next_refill_eta(
    credits: u32,
    max_credits: u32,
    last_refill: DateTime<Utc>,
    now: DateTime<Utc>,
    interval_ms: i64,
) -> Option<i64> {
    if credits >= max_credits || interval_ms <= 0 {
        return None;
    }
    let elapsed = (now - last_refill).num_milliseconds();
    Some(interval_ms - elapsed.rem_euclid(interval_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    const INTERVAL: i64 = 300_000;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn two_ticks_preserve_remainder() {
        // 12.5 minutes at a 5-minute interval: two full ticks, 150s left over.
        let now = t0() + TimeDelta::milliseconds(750_000);
        let plan = plan_refill(5, 10, t0(), now, INTERVAL);

        assert_eq!(plan.credits_to_add, 2);
        assert_eq!(plan.last_refill, t0() + TimeDelta::milliseconds(600_000));
    }

    #[test]
    fn below_one_interval_untouched() {
        let now = t0() + TimeDelta::milliseconds(299_999);
        let plan = plan_refill(5, 10, t0(), now, INTERVAL);

        assert_eq!(plan.credits_to_add, 0);
        assert_eq!(plan.last_refill, t0());
    }

    #[test]
    fn at_capacity_touches_anchor_only() {
        let now = t0() + TimeDelta::milliseconds(900_000);
        let plan = plan_refill(10, 10, t0(), now, INTERVAL);

        assert_eq!(plan.credits_to_add, 0);
        assert_eq!(plan.last_refill, now);
    }

    #[test]
    fn clamped_to_capacity() {
        // Ten intervals elapsed but only three credits missing.
        let now = t0() + TimeDelta::milliseconds(INTERVAL * 10);
        let plan = plan_refill(7, 10, t0(), now, INTERVAL);

        assert_eq!(plan.credits_to_add, 3);
    }

    #[test]
    fn long_suspension_recovers() {
        // Process was gone for a week; the recompute is still exact.
        let now = t0() + TimeDelta::days(7) + TimeDelta::milliseconds(120_000);
        let plan = plan_refill(0, 20, t0(), now, INTERVAL);

        assert_eq!(plan.credits_to_add, 20);
    }

    #[test]
    fn clock_skew_is_inert() {
        // Anchor in the future: no refill, nothing moves.
        let now = t0() - TimeDelta::milliseconds(5_000);
        let plan = plan_refill(5, 10, t0(), now, INTERVAL);

        assert_eq!(plan.credits_to_add, 0);
        assert_eq!(plan.last_refill, t0());
    }

    #[test]
    fn eta_counts_down_within_interval() {
        let now = t0() + TimeDelta::milliseconds(100_000);
        assert_eq!(next_refill_eta(5, 10, t0(), now, INTERVAL), Some(200_000));
    }

    #[test]
    fn eta_none_at_capacity() {
        assert_eq!(next_refill_eta(10, 10, t0(), t0(), INTERVAL), None);
    }

    #[test]
    fn eta_fresh_anchor_is_full_interval() {
        assert_eq!(next_refill_eta(5, 10, t0(), t0(), INTERVAL), Some(INTERVAL));
    }

    proptest! {
        #[test]
        fn never_exceeds_capacity(
            credits in 0u32..50,
            max in 1u32..50,
            elapsed_ms in 0i64..100_000_000,
        ) {
            let now = t0() + TimeDelta::milliseconds(elapsed_ms);
            let plan = plan_refill(credits, max, t0(), now, INTERVAL);
            prop_assert!(credits.saturating_add(plan.credits_to_add) <= credits.max(max));
        }

        #[test]
        fn new_anchor_never_in_future(
            credits in 0u32..50,
            max in 1u32..50,
            elapsed_ms in 0i64..100_000_000,
        ) {
            let now = t0() + TimeDelta::milliseconds(elapsed_ms);
            let plan = plan_refill(credits, max, t0(), now, INTERVAL);
            prop_assert!(plan.last_refill <= now);
        }

        #[test]
        fn remainder_below_interval_when_refilling(
            credits in 0u32..10,
            elapsed_ms in 300_000i64..100_000_000,
        ) {
            let now = t0() + TimeDelta::milliseconds(elapsed_ms);
            let plan = plan_refill(credits, 10, t0(), now, INTERVAL);
            let remainder = (now - plan.last_refill).num_milliseconds();
            prop_assert!(remainder < INTERVAL);
        }
    }
}
