//! Tradefeed Cooldown - keeps synthetic values from repeating
//!
//! A `CooldownGuard` remembers every value it handed out together with the
//! time it was issued. While a value is "hot" (younger than the policy TTL)
//! it will not be handed out again. Expired entries are pruned before every
//! reservation.
//!
//! When the sampler keeps producing hot values and the attempt budget runs
//! out, the guard does not fail: it evicts the oldest tracked value and
//! reissues it. Forward progress is guaranteed at the cost of an occasional
//! short-window repeat.
//!
//! # Example
//!
//! ```ignore
//! use tradefeed_cooldown::{CooldownGuard, CooldownPolicy};
//!
//! let mut deposits = CooldownGuard::new(CooldownPolicy::deposits(), clock.clone());
//! let reservation = deposits.reserve_unique(|| Decimal::from(rng.gen_range(100..=900)), 200);
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use tradefeed_types::SharedClock;

/// Default attempt budget for deposits
pub const DEPOSIT_MAX_ATTEMPTS: usize = 200;

/// Default attempt budget for profits
pub const PROFIT_MAX_ATTEMPTS: usize = 500;

/// Cooldown parameters for one tracked quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooldownPolicy {
    /// How long an issued value stays forbidden
    #[serde(with = "tradefeed_types::duration_secs")]
    pub ttl: Duration,
    /// Sampler draws before falling back to the oldest value
    pub max_attempts: usize,
    /// Granularity values are rounded to before the uniqueness check
    pub step: Decimal,
}

impl CooldownPolicy {
    /// Deposits: drawn from small discrete ranges, recycled after 6 hours
    pub fn deposits() -> Self {
        Self {
            ttl: Duration::hours(6),
            max_attempts: DEPOSIT_MAX_ATTEMPTS,
            step: Decimal::ONE,
        }
    }

    /// Profits: rounded to 50, recycled after 12 hours
    pub fn profits() -> Self {
        Self {
            ttl: Duration::hours(12),
            max_attempts: PROFIT_MAX_ATTEMPTS,
            step: Decimal::from(50),
        }
    }
}

/// Round `value` to the nearest multiple of `step` (halves away from zero).
///
/// A non-positive step leaves the value unchanged.
pub fn round_to_step(value: Decimal, step: Decimal) -> Decimal {
    if step <= Decimal::ZERO {
        return value;
    }
    (value / step).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero) * step
}

/// How a reservation was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationOutcome {
    /// A value not currently tracked was found within the budget
    Fresh {
        /// Draws used, including the accepted one
        attempts: usize,
    },
    /// Budget exhausted; the oldest tracked value was evicted and reissued
    Recycled,
    /// Budget exhausted with nothing tracked to recycle; the last draw was
    /// accepted as is
    Forced,
}

/// Value handed out by a guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    /// The reserved (rounded) value
    pub value: Decimal,
    /// How it was obtained
    pub outcome: ReservationOutcome,
}

impl Reservation {
    /// Whether the attempt budget ran out
    pub fn exhausted(&self) -> bool {
        !matches!(self.outcome, ReservationOutcome::Fresh { .. })
    }
}

/// Tracks recently issued values of a single quantity
pub struct CooldownGuard {
    policy: CooldownPolicy,
    clock: SharedClock,
    issued: HashMap<Decimal, DateTime<Utc>>,
}

impl CooldownGuard {
    /// Create an empty guard
    pub fn new(policy: CooldownPolicy, clock: SharedClock) -> Self {
        Self {
            policy,
            clock,
            issued: HashMap::new(),
        }
    }

    /// Policy in effect
    pub fn policy(&self) -> &CooldownPolicy {
        &self.policy
    }

    /// Number of tracked values (including expired ones not yet pruned)
    pub fn len(&self) -> usize {
        self.issued.len()
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }

    /// Remove every value older than `ttl`; returns how many were dropped
    pub fn prune(&mut self, ttl: Duration) -> usize {
        let now = self.clock.now();
        let before = self.issued.len();
        self.issued.retain(|_, issued_at| now - *issued_at <= ttl);
        before - self.issued.len()
    }

    /// Whether `value` (after rounding) is still inside its cooldown window
    pub fn is_cooling(&self, value: Decimal) -> bool {
        let key = round_to_step(value, self.policy.step).normalize();
        match self.issued.get(&key) {
            Some(issued_at) => self.clock.now() - *issued_at <= self.policy.ttl,
            None => false,
        }
    }

    /// Draw from `sampler` until a value outside its cooldown window appears.
    ///
    /// See [`CooldownGuard::reserve_unique_avoiding`] for the fallback rules.
    pub fn reserve_unique<F>(&mut self, sampler: F, max_attempts: usize) -> Reservation
    where
        F: FnMut() -> Decimal,
    {
        self.reserve_unique_avoiding(sampler, max_attempts, |_| false)
    }

    /// Like [`CooldownGuard::reserve_unique`], additionally rejecting values
    /// for which `avoid` returns true (e.g. values seen in persisted history).
    ///
    /// If every attempt collides, the oldest tracked value is evicted and
    /// reissued with the current time. If nothing is tracked at all, the last
    /// draw is accepted.
    pub fn reserve_unique_avoiding<F, A>(&mut self, mut sampler: F, max_attempts: usize, avoid: A) -> Reservation
    where
        F: FnMut() -> Decimal,
        A: Fn(&Decimal) -> bool,
    {
        let ttl = self.policy.ttl;
        self.prune(ttl);

        let mut last_draw = None;
        for attempt in 1..=max_attempts {
            let candidate = round_to_step(sampler(), self.policy.step).normalize();
            last_draw = Some(candidate);

            if !self.issued.contains_key(&candidate) && !avoid(&candidate) {
                self.record(candidate);
                return Reservation {
                    value: candidate,
                    outcome: ReservationOutcome::Fresh { attempts: attempt },
                };
            }
        }

        let oldest = self
            .issued
            .iter()
            .min_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)))
            .map(|(value, _)| *value);

        let (value, outcome) = match oldest {
            Some(value) => (value, ReservationOutcome::Recycled),
            None => {
                let value = last_draw.unwrap_or_else(|| round_to_step(sampler(), self.policy.step).normalize());
                (value, ReservationOutcome::Forced)
            }
        };

        debug!(
            %value,
            max_attempts,
            tracked = self.issued.len(),
            "Cooldown budget exhausted, reissuing"
        );
        self.record(value);
        Reservation { value, outcome }
    }

    fn record(&mut self, value: Decimal) {
        self.issued.insert(value, self.clock.now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rust_decimal_macros::dec;
    use tradefeed_types::{Clock, ManualClock};

    fn guard(policy: CooldownPolicy) -> (CooldownGuard, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        (CooldownGuard::new(policy, clock.clone()), clock)
    }

    #[test]
    fn test_round_to_step() {
        assert_eq!(round_to_step(dec!(1224), dec!(50)), dec!(1200));
        assert_eq!(round_to_step(dec!(1225), dec!(50)), dec!(1250));
        assert_eq!(round_to_step(dec!(1274.9), dec!(50)), dec!(1250));
        assert_eq!(round_to_step(dec!(-1225), dec!(50)), dec!(-1250));
        assert_eq!(round_to_step(dec!(733.4), dec!(1)), dec!(733));
        assert_eq!(round_to_step(dec!(733.4), Decimal::ZERO), dec!(733.4));
    }

    #[test]
    fn test_no_repeat_within_window_unless_exhausted() {
        let (mut guard, clock) = guard(CooldownPolicy::deposits());
        let mut rng = StdRng::seed_from_u64(7);
        let mut hot: HashSet<Decimal> = HashSet::new();
        let mut exhausted = 0;

        for _ in 0..40 {
            let reservation = guard.reserve_unique(
                || Decimal::from(rng.gen_range(1..=12)),
                DEPOSIT_MAX_ATTEMPTS,
            );
            if reservation.exhausted() {
                exhausted += 1;
            } else {
                assert!(hot.insert(reservation.value), "fresh value {} repeated", reservation.value);
            }
            clock.advance(Duration::minutes(1));
        }

        // 12 distinct values exist, so the rest of the 40 draws must have hit the fallback
        assert_eq!(hot.len(), 12);
        assert_eq!(exhausted, 28);
    }

    #[test]
    fn test_exhaustion_recycles_oldest() {
        let (mut guard, clock) = guard(CooldownPolicy::deposits());

        let first = guard.reserve_unique(|| dec!(100), 10);
        clock.advance(Duration::minutes(5));
        let second = guard.reserve_unique(|| dec!(200), 10);
        clock.advance(Duration::minutes(5));

        assert_eq!(first.outcome, ReservationOutcome::Fresh { attempts: 1 });
        assert_eq!(second.value, dec!(200));

        // Both values are hot; the sampler only offers hot values.
        let mut flip = false;
        let third = guard.reserve_unique(
            || {
                flip = !flip;
                if flip { dec!(100) } else { dec!(200) }
            },
            20,
        );
        assert_eq!(third.outcome, ReservationOutcome::Recycled);
        assert_eq!(third.value, dec!(100));

        // 100 was re-stamped, so 200 is now the oldest.
        clock.advance(Duration::minutes(1));
        let fourth = guard.reserve_unique(|| dec!(100), 5);
        assert_eq!(fourth.value, dec!(200));
        assert!(fourth.exhausted());
    }

    #[test]
    fn test_pruning_boundary() {
        let (mut guard, clock) = guard(CooldownPolicy::deposits());
        let start = clock.now();
        guard.reserve_unique(|| dec!(500), 1);

        clock.set(start + Duration::hours(6) - Duration::seconds(1));
        assert!(guard.is_cooling(dec!(500)));
        let blocked = guard.reserve_unique(|| dec!(500), 3);
        assert!(blocked.exhausted());

        // The fallback re-stamped 500; measure from that point.
        let restamped = clock.now();
        clock.set(restamped + Duration::hours(6) + Duration::seconds(1));
        assert!(!guard.is_cooling(dec!(500)));
        let reused = guard.reserve_unique(|| dec!(500), 1);
        assert_eq!(reused.outcome, ReservationOutcome::Fresh { attempts: 1 });
    }

    #[test]
    fn test_prune_removes_only_expired() {
        let (mut guard, clock) = guard(CooldownPolicy::profits());
        guard.reserve_unique(|| dec!(1000), 1);
        clock.advance(Duration::hours(8));
        guard.reserve_unique(|| dec!(2000), 1);
        clock.advance(Duration::hours(5));

        assert_eq!(guard.prune(Duration::hours(12)), 1);
        assert_eq!(guard.len(), 1);
        assert!(guard.is_cooling(dec!(2000)));
        assert!(!guard.is_cooling(dec!(1000)));
    }

    #[test]
    fn test_profit_rounding_collides_nearby_values() {
        let (mut guard, _clock) = guard(CooldownPolicy::profits());
        let first = guard.reserve_unique(|| dec!(3010), 1);
        assert_eq!(first.value, dec!(3000));

        let mut draws = vec![dec!(2990), dec!(3020), dec!(3110)].into_iter();
        let second = guard.reserve_unique(|| draws.next().unwrap_or(dec!(0)), 10);
        assert_eq!(second.value, dec!(3100));
        assert_eq!(second.outcome, ReservationOutcome::Fresh { attempts: 3 });
    }

    #[test]
    fn test_avoid_predicate_and_forced_fallback() {
        let (mut guard, _clock) = guard(CooldownPolicy::profits());
        let history = [dec!(1500)];

        let mut draws = vec![dec!(1500), dec!(1550)].into_iter();
        let picked = guard.reserve_unique_avoiding(
            || draws.next().unwrap_or(dec!(0)),
            5,
            |v| history.contains(v),
        );
        assert_eq!(picked.value, dec!(1550));

        let (mut empty, _clock) = self::guard(CooldownPolicy::profits());
        let forced = empty.reserve_unique_avoiding(|| dec!(1500), 3, |v| history.contains(v));
        assert_eq!(forced.outcome, ReservationOutcome::Forced);
        assert_eq!(forced.value, dec!(1500));
        assert!(empty.is_cooling(dec!(1500)));
    }
}
