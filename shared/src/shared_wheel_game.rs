use crate::token::{decimal_u256, token_units, TokenBalances, TokenType};
use ethers_core::types::U256;
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decimals of every reward token. Amounts are always in base units.
pub const TOKEN_DECIMALS: usize = 18;
pub const BONUS_MULTIPLIER: u64 = 2;
pub const JACKPOT_MULTIPLIER: u64 = 10;

/// Labels painted on the wheel.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SegmentName {
    TokenA,
    Bust,
    TokenB,
    Bonus,
    TokenC,
    Jackpot,
}

impl fmt::Display for SegmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::TokenA => "TOKEN_A",
            Self::Bust => "BUST",
            Self::TokenB => "TOKEN_B",
            Self::Bonus => "BONUS",
            Self::TokenC => "TOKEN_C",
            Self::Jackpot => "JACKPOT",
        };
        f.write_str(label)
    }
}

/// What a winning segment pays: `base_amount * multiplier` of `token`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RewardRule {
    pub token: TokenType,
    #[serde(with = "decimal_u256")]
    pub base_amount: U256,
    pub multiplier: u64,
}

impl RewardRule {
    pub fn new(token: TokenType, base_amount: U256) -> Self {
        Self { token, base_amount, multiplier: 1 }
    }

    pub fn multiplied(token: TokenType, base_amount: U256, multiplier: u64) -> Self {
        Self { token, base_amount, multiplier }
    }

    pub fn payout(&self) -> Option<U256> {
        self.base_amount.checked_mul(U256::from(self.multiplier))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WheelSegment {
    pub name: SegmentName,
    pub weight: u32,
    pub reward: Option<RewardRule>,
}

impl WheelSegment {
    pub fn winning(name: SegmentName, weight: u32, reward: RewardRule) -> Self {
        Self { name, weight, reward: Some(reward) }
    }

    pub fn bust(weight: u32) -> Self {
        Self { name: SegmentName::Bust, weight, reward: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WheelConfigError {
    Empty,
    ZeroWeight(SegmentName),
    MissingReward(SegmentName),
    RewardOnBust,
    ZeroPayout(SegmentName),
    PayoutOverflow(SegmentName),
}

impl fmt::Display for WheelConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Wheel table has no segments"),
            Self::ZeroWeight(name) => write!(f, "Segment {} has zero weight", name),
            Self::MissingReward(name) => write!(f, "Winning segment {} has no reward rule", name),
            Self::RewardOnBust => write!(f, "BUST segment must not carry a reward"),
            Self::ZeroPayout(name) => write!(f, "Segment {} pays nothing", name),
            Self::PayoutOverflow(name) => write!(f, "Segment {} payout overflows", name),
        }
    }
}

impl std::error::Error for WheelConfigError {}

/// A validated segment with its payout resolved up front.
#[derive(Debug, Clone)]
struct ResolvedSegment {
    segment: WheelSegment,
    payout: Option<(TokenType, U256)>,
}

/// The static wheel layout. Declaration order is significant: the draw walks
/// segments in this order.
#[derive(Debug, Clone)]
pub struct WheelTable {
    segments: Vec<ResolvedSegment>,
    total_weight: u64,
}

impl WheelTable {
    pub fn new(segments: Vec<WheelSegment>) -> Result<Self, WheelConfigError> {
        if segments.is_empty() {
            return Err(WheelConfigError::Empty);
        }

        let mut resolved = Vec::with_capacity(segments.len());
        let mut total_weight: u64 = 0;
        for segment in segments {
            if segment.weight == 0 {
                return Err(WheelConfigError::ZeroWeight(segment.name));
            }
            let payout = match (segment.name, segment.reward) {
                (SegmentName::Bust, Some(_)) => return Err(WheelConfigError::RewardOnBust),
                (SegmentName::Bust, None) => None,
                (name, None) => return Err(WheelConfigError::MissingReward(name)),
                (name, Some(rule)) => {
                    let amount = rule.payout().ok_or(WheelConfigError::PayoutOverflow(name))?;
                    if amount.is_zero() {
                        return Err(WheelConfigError::ZeroPayout(name));
                    }
                    Some((rule.token, amount))
                }
            };
            total_weight += u64::from(segment.weight);
            resolved.push(ResolvedSegment { segment, payout });
        }

        Ok(Self { segments: resolved, total_weight })
    }

    /// The production ArbCasino wheel. Weights sum to 100.
    pub fn standard() -> Self {
        let one = token_units(1, TOKEN_DECIMALS);
        let ten = token_units(10, TOKEN_DECIMALS);
        let hundred = token_units(100, TOKEN_DECIMALS);

        let segments = vec![
            WheelSegment::winning(SegmentName::TokenA, 30, RewardRule::new(TokenType::Token1, one)),
            WheelSegment::bust(25),
            WheelSegment::winning(SegmentName::TokenB, 20, RewardRule::new(TokenType::Token2, ten)),
            WheelSegment::winning(
                SegmentName::Bonus,
                12,
                RewardRule::multiplied(TokenType::Token1, one, BONUS_MULTIPLIER),
            ),
            WheelSegment::winning(SegmentName::TokenC, 10, RewardRule::new(TokenType::Token3, hundred)),
            WheelSegment::winning(
                SegmentName::Jackpot,
                3,
                RewardRule::multiplied(TokenType::Token3, hundred, JACKPOT_MULTIPLIER),
            ),
        ];

        match Self::new(segments) {
            Ok(table) => table,
            // The literal table above is valid; a failure here is a broken edit.
            Err(e) => panic!("standard wheel table is invalid: {}", e),
        }
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn segments(&self) -> impl Iterator<Item = &WheelSegment> {
        self.segments.iter().map(|s| &s.segment)
    }

    /// First segment whose cumulative weight strictly exceeds `draw`.
    /// `draw` must lie in `[0, total_weight)`.
    fn resolve(&self, draw: u64) -> &ResolvedSegment {
        let mut cumulative = 0u64;
        for resolved in &self.segments {
            cumulative += u64::from(resolved.segment.weight);
            if cumulative > draw {
                return resolved;
            }
        }
        // Only reachable if draw >= total_weight.
        &self.segments[self.segments.len() - 1]
    }
}

/// The result of one spin. Produced by the generator, consumed by the ledger.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SpinOutcome {
    pub segment: SegmentName,
    pub is_win: bool,
    /// `None` on BUST.
    pub token_type: Option<TokenType>,
    #[serde(with = "decimal_u256")]
    pub reward_amount: U256,
    /// Audit-only token. The outcome is fixed by the draw, not derived from this.
    pub random_seed: String,
}

/// Weighted random choice over a [`WheelTable`].
#[derive(Debug, Clone)]
pub struct WheelOutcomeGenerator {
    table: WheelTable,
}

impl Default for WheelOutcomeGenerator {
    fn default() -> Self {
        Self::new(WheelTable::standard())
    }
}

impl WheelOutcomeGenerator {
    pub fn new(table: WheelTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &WheelTable {
        &self.table
    }

    /// Spins using the operating system's RNG.
    pub fn spin(&self) -> SpinOutcome {
        self.spin_with(&mut OsRng)
    }

    pub fn spin_with<R: Rng + ?Sized>(&self, rng: &mut R) -> SpinOutcome {
        let draw = rng.gen_range(0..self.table.total_weight);
        let resolved = self.table.resolve(draw);

        let mut seed = [0u8; 16];
        rng.fill_bytes(&mut seed);

        let (token_type, reward_amount) = match resolved.payout {
            Some((token, amount)) => (Some(token), amount),
            None => (None, U256::zero()),
        };

        SpinOutcome {
            segment: resolved.segment.name,
            is_win: resolved.segment.name != SegmentName::Bust,
            token_type,
            reward_amount,
            random_seed: hex::encode(seed),
        }
    }
}

// === API Types ===

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WheelSpinResponse {
    pub success: bool,
    pub outcome: SpinOutcome,
    pub spins_remaining: u32,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WheelSegmentsResponse {
    pub total_weight: u64,
    pub segments: Vec<WheelSegment>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WheelStatusResponse {
    pub daily_limit: u32,
    pub spins_used_today: u32,
    pub spins_remaining: u32,
    pub resets_at: chrono::DateTime<chrono::Utc>,
    pub total_spins: u64,
    pub total_wins: u64,
    pub accumulated: TokenBalances,
    pub claimed: TokenBalances,
    pub last_spin_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_claim_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// One on-chain transfer the caller must perform after a claim.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TokenTransfer {
    pub token: TokenType,
    /// `None` when the token's contract address is not configured.
    pub contract_address: Option<ethers_core::types::Address>,
    #[serde(with = "decimal_u256")]
    pub amount: U256,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClaimResponse {
    pub success: bool,
    pub claimed: TokenBalances,
    pub transfers: Vec<TokenTransfer>,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub wallet_address: String,
    pub total_spins: u64,
    pub total_wins: u64,
    pub claimed: TokenBalances,
}

/// Human-readable line for the spin result toast.
pub fn outcome_message(outcome: &SpinOutcome) -> String {
    match (outcome.segment, outcome.token_type) {
        (SegmentName::Bust, _) | (_, None) => "Bust! Better luck on your next spin.".to_string(),
        (SegmentName::Jackpot, Some(token)) => {
            format!("JACKPOT! You won {} {} base units!", outcome.reward_amount, token)
        }
        (SegmentName::Bonus, Some(token)) => {
            format!("Bonus! You won {} {} base units!", outcome.reward_amount, token)
        }
        (_, Some(token)) => format!("You won {} {} base units!", outcome.reward_amount, token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[test]
    fn test_probability_mass_matches_weights() {
        let generator = WheelOutcomeGenerator::default();
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let spins = 1_000_000u32;

        let mut counts: HashMap<SegmentName, u32> = HashMap::new();
        for _ in 0..spins {
            *counts.entry(generator.spin_with(&mut rng).segment).or_default() += 1;
        }

        let total = generator.table().total_weight() as f64;
        for segment in generator.table().segments() {
            let expected = f64::from(segment.weight) / total;
            let observed = f64::from(counts.get(&segment.name).copied().unwrap_or(0)) / f64::from(spins);
            assert!(
                (observed - expected).abs() < 0.005,
                "{} observed {:.4} expected {:.4}",
                segment.name,
                observed,
                expected
            );
        }
    }

    #[test]
    fn test_bust_never_pays_and_wins_always_pay() {
        let generator = WheelOutcomeGenerator::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let outcome = generator.spin_with(&mut rng);
            if outcome.segment == SegmentName::Bust {
                assert!(!outcome.is_win);
                assert_eq!(outcome.token_type, None);
                assert!(outcome.reward_amount.is_zero());
            } else {
                assert!(outcome.is_win);
                assert!(outcome.token_type.is_some());
                assert!(outcome.reward_amount > U256::zero());
            }
            assert_eq!(outcome.random_seed.len(), 32);
        }
    }

    #[test]
    fn test_draw_walks_cumulative_weights_in_order() {
        let table = WheelTable::standard();
        assert_eq!(table.total_weight(), 100);
        assert_eq!(table.resolve(0).segment.name, SegmentName::TokenA);
        assert_eq!(table.resolve(29).segment.name, SegmentName::TokenA);
        assert_eq!(table.resolve(30).segment.name, SegmentName::Bust);
        assert_eq!(table.resolve(54).segment.name, SegmentName::Bust);
        assert_eq!(table.resolve(55).segment.name, SegmentName::TokenB);
        assert_eq!(table.resolve(75).segment.name, SegmentName::Bonus);
        assert_eq!(table.resolve(87).segment.name, SegmentName::TokenC);
        assert_eq!(table.resolve(97).segment.name, SegmentName::Jackpot);
        assert_eq!(table.resolve(99).segment.name, SegmentName::Jackpot);
    }

    #[test]
    fn test_bonus_and_jackpot_multiply_base_amount() {
        let table = WheelTable::standard();
        let bonus = table.resolve(75).payout.unwrap();
        assert_eq!(bonus, (TokenType::Token1, token_units(2, TOKEN_DECIMALS)));
        let jackpot = table.resolve(99).payout.unwrap();
        assert_eq!(jackpot, (TokenType::Token3, token_units(1000, TOKEN_DECIMALS)));
    }

    #[test]
    fn test_table_validation() {
        assert_eq!(WheelTable::new(vec![]).unwrap_err(), WheelConfigError::Empty);
        assert_eq!(
            WheelTable::new(vec![WheelSegment::bust(0)]).unwrap_err(),
            WheelConfigError::ZeroWeight(SegmentName::Bust)
        );
        let no_reward = WheelSegment { name: SegmentName::TokenA, weight: 1, reward: None };
        assert_eq!(
            WheelTable::new(vec![no_reward]).unwrap_err(),
            WheelConfigError::MissingReward(SegmentName::TokenA)
        );
        let overflow = WheelSegment::winning(
            SegmentName::Jackpot,
            1,
            RewardRule::multiplied(TokenType::Token3, U256::MAX, 10),
        );
        assert_eq!(
            WheelTable::new(vec![overflow]).unwrap_err(),
            WheelConfigError::PayoutOverflow(SegmentName::Jackpot)
        );
    }

    #[test]
    fn test_outcome_serializes_for_the_api() {
        let outcome = SpinOutcome {
            segment: SegmentName::TokenA,
            is_win: true,
            token_type: Some(TokenType::Token1),
            reward_amount: token_units(1, TOKEN_DECIMALS),
            random_seed: "ab".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["segment"], "TOKEN_A");
        assert_eq!(json["token_type"], "TOKEN_1");
        assert_eq!(json["reward_amount"], "1000000000000000000");
    }
}
