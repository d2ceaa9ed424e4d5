use crate::shared_wheel_game::{SpinOutcome, WheelOutcomeGenerator};
use crate::token::TokenBalances;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_DAILY_SPIN_LIMIT: u32 = 3;

/// Per-user spin bookkeeping. Persisted by the caller between operations.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct UserSpinState {
    pub spins_used_today: u32,
    pub last_spin_at: Option<DateTime<Utc>>,
    pub total_spins: u64,
    pub total_wins: u64,
    pub accumulated: TokenBalances,
    pub claimed: TokenBalances,
    pub last_claim_at: Option<DateTime<Utc>>,
}

impl UserSpinState {
    /// Spins counted against `now`'s UTC day. A stale counter from an earlier
    /// day counts as zero.
    pub fn spins_used_on(&self, now: DateTime<Utc>) -> u32 {
        if is_same_utc_day(self.last_spin_at, now) {
            self.spins_used_today
        } else {
            0
        }
    }
}

fn is_same_utc_day(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last {
        Some(last) => last.date_naive() == now.date_naive(),
        None => false,
    }
}

/// The next UTC midnight strictly after `now`.
pub fn next_utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = now.date_naive() + Duration::days(1);
    match tomorrow.and_hms_opt(0, 0, 0) {
        Some(midnight) => Utc.from_utc_datetime(&midnight),
        None => now + Duration::days(1),
    }
}

/// Source of the current time. Swapped for a fixed clock in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpinError {
    DailyLimitReached { daily_limit: u32, resets_at: DateTime<Utc> },
    BalanceOverflow,
}

impl fmt::Display for SpinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DailyLimitReached { daily_limit, resets_at } => write!(
                f,
                "You have used all {} spins for today. Come back tomorrow (resets at {} UTC).",
                daily_limit,
                resets_at.format("%Y-%m-%d %H:%M")
            ),
            Self::BalanceOverflow => write!(f, "Accumulated balance would overflow"),
        }
    }
}

impl std::error::Error for SpinError {}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SpinReceipt {
    pub outcome: SpinOutcome,
    pub spins_remaining: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct SpinAllowance {
    pub daily_limit: u32,
    pub spins_used_today: u32,
    pub spins_remaining: u32,
    pub resets_at: DateTime<Utc>,
}

/// Enforces the per-UTC-day spin limit and folds wins into the user's
/// accumulated balances.
#[derive(Debug, Clone)]
pub struct DailySpinLedger {
    generator: WheelOutcomeGenerator,
    daily_limit: u32,
}

impl Default for DailySpinLedger {
    fn default() -> Self {
        Self::new(WheelOutcomeGenerator::default(), DEFAULT_DAILY_SPIN_LIMIT)
    }
}

impl DailySpinLedger {
    pub fn new(generator: WheelOutcomeGenerator, daily_limit: u32) -> Self {
        Self { generator, daily_limit }
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    pub fn generator(&self) -> &WheelOutcomeGenerator {
        &self.generator
    }

    pub fn allowance(&self, state: &UserSpinState, now: DateTime<Utc>) -> SpinAllowance {
        let used = state.spins_used_on(now);
        SpinAllowance {
            daily_limit: self.daily_limit,
            spins_used_today: used,
            spins_remaining: self.daily_limit.saturating_sub(used),
            resets_at: next_utc_midnight(now),
        }
    }

    pub fn request_spin(
        &self,
        state: &mut UserSpinState,
        now: DateTime<Utc>,
    ) -> Result<SpinReceipt, SpinError> {
        self.request_spin_with(state, now, &mut OsRng)
    }

    /// Checks the limit, spins, and applies the outcome. On error `state` is
    /// left exactly as it was.
    pub fn request_spin_with<R: Rng + ?Sized>(
        &self,
        state: &mut UserSpinState,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<SpinReceipt, SpinError> {
        let effective_used = state.spins_used_on(now);
        if effective_used >= self.daily_limit {
            log::debug!("spin rejected: {} of {} used", effective_used, self.daily_limit);
            return Err(SpinError::DailyLimitReached {
                daily_limit: self.daily_limit,
                resets_at: next_utc_midnight(now),
            });
        }

        let outcome = self.generator.spin_with(rng);

        let credited = match outcome.token_type {
            Some(token) if outcome.is_win => {
                let total = state
                    .accumulated
                    .checked_plus(token, outcome.reward_amount)
                    .ok_or(SpinError::BalanceOverflow)?;
                Some((token, total))
            }
            _ => None,
        };

        if let Some((token, total)) = credited {
            state.accumulated.set(token, total);
            state.total_wins += 1;
        }
        state.spins_used_today = effective_used + 1;
        state.last_spin_at = Some(now);
        state.total_spins += 1;

        log::debug!(
            "spin {} -> {} ({} spins used today)",
            state.total_spins,
            outcome.segment,
            state.spins_used_today
        );

        Ok(SpinReceipt {
            outcome,
            spins_remaining: self.daily_limit - state.spins_used_today,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_wheel_game::{RewardRule, SegmentName, WheelSegment, WheelTable};
    use crate::token::{token_units, TokenType};
    use ethers_core::types::U256;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn always(segment: WheelSegment) -> DailySpinLedger {
        let table = WheelTable::new(vec![segment]).unwrap();
        DailySpinLedger::new(WheelOutcomeGenerator::new(table), 3)
    }

    #[test]
    fn test_fourth_spin_same_day_is_rejected_without_mutation() {
        let ledger = DailySpinLedger::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = UserSpinState::default();
        let now = at(2024, 5, 1, 12, 0);

        for expected_remaining in [2, 1, 0] {
            let receipt = ledger.request_spin_with(&mut state, now, &mut rng).unwrap();
            assert_eq!(receipt.spins_remaining, expected_remaining);
        }
        assert_eq!(state.spins_used_today, 3);

        let before = state.clone();
        let err = ledger.request_spin_with(&mut state, now, &mut rng).unwrap_err();
        assert_eq!(
            err,
            SpinError::DailyLimitReached { daily_limit: 3, resets_at: at(2024, 5, 2, 0, 0) }
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_next_calendar_day_resets_counter_but_not_lifetime_totals() {
        let ledger = DailySpinLedger::default();
        let mut rng = StdRng::seed_from_u64(2);
        let mut state = UserSpinState::default();

        for _ in 0..3 {
            ledger.request_spin_with(&mut state, at(2024, 5, 1, 23, 59), &mut rng).unwrap();
        }
        assert!(ledger.request_spin_with(&mut state, at(2024, 5, 1, 23, 59), &mut rng).is_err());

        // Two minutes later, but a new UTC day.
        let receipt = ledger.request_spin_with(&mut state, at(2024, 5, 2, 0, 1), &mut rng).unwrap();
        assert_eq!(receipt.spins_remaining, 2);
        assert_eq!(state.spins_used_today, 1);
        assert_eq!(state.total_spins, 4);
    }

    #[test]
    fn test_wins_accumulate_exactly() {
        let ledger = always(WheelSegment::winning(
            SegmentName::TokenA,
            1,
            RewardRule::new(TokenType::Token1, token_units(1, 18)),
        ));
        let mut state = UserSpinState::default();
        let now = at(2024, 5, 1, 9, 0);

        ledger.request_spin(&mut state, now).unwrap();
        ledger.request_spin(&mut state, now).unwrap();

        assert_eq!(
            state.accumulated.get(TokenType::Token1),
            U256::from_dec_str("2000000000000000000").unwrap()
        );
        assert_eq!(state.total_wins, 2);
        assert!(state.accumulated.get(TokenType::Token2).is_zero());
    }

    #[test]
    fn test_bust_counts_spin_but_not_win() {
        let ledger = always(WheelSegment::bust(1));
        let mut state = UserSpinState::default();
        let receipt = ledger.request_spin(&mut state, at(2024, 5, 1, 9, 0)).unwrap();
        assert!(!receipt.outcome.is_win);
        assert_eq!(state.total_spins, 1);
        assert_eq!(state.total_wins, 0);
        assert!(state.accumulated.is_zero());
    }

    #[test]
    fn test_overflowing_credit_leaves_state_untouched() {
        let ledger = always(WheelSegment::winning(
            SegmentName::TokenA,
            1,
            RewardRule::new(TokenType::Token1, U256::from(2)),
        ));
        let mut state = UserSpinState::default();
        state.accumulated.set(TokenType::Token1, U256::MAX);
        let before = state.clone();

        let err = ledger.request_spin(&mut state, at(2024, 5, 1, 9, 0)).unwrap_err();
        assert_eq!(err, SpinError::BalanceOverflow);
        assert_eq!(state, before);
    }

    #[test]
    fn test_allowance_ignores_stale_counter() {
        let ledger = DailySpinLedger::default();
        let state = UserSpinState {
            spins_used_today: 3,
            last_spin_at: Some(at(2024, 4, 30, 18, 0)),
            ..Default::default()
        };
        let allowance = ledger.allowance(&state, at(2024, 5, 1, 8, 0));
        assert_eq!(allowance.spins_used_today, 0);
        assert_eq!(allowance.spins_remaining, 3);
        assert_eq!(allowance.resets_at, at(2024, 5, 2, 0, 0));
    }
}
