use crate::spin_ledger::UserSpinState;
use crate::token::{TokenBalances, TokenType, UnknownToken};
use chrono::{DateTime, Utc};
use ethers_core::types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which balances a claim should move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimTarget {
    Token(TokenType),
    All,
}

impl FromStr for ClaimTarget {
    type Err = SettlementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        Ok(Self::Token(s.parse::<TokenType>()?))
    }
}

impl fmt::Display for ClaimTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(token) => write!(f, "{}", token),
            Self::All => f.write_str("ALL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementError {
    NoPendingRewards,
    InvalidTokenType(String),
    BalanceOverflow,
}

impl fmt::Display for SettlementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPendingRewards => write!(f, "No pending rewards to claim. Spin and win first!"),
            Self::InvalidTokenType(token) => write!(f, "Invalid token type: {}", token),
            Self::BalanceOverflow => write!(f, "Claimed total would overflow"),
        }
    }
}

impl std::error::Error for SettlementError {}

impl From<UnknownToken> for SettlementError {
    fn from(err: UnknownToken) -> Self {
        Self::InvalidTokenType(err.0)
    }
}

/// Amounts moved from `accumulated` to `claimed`. Tokens that were not moved
/// carry zero. The caller performs the on-chain transfer.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub amounts: TokenBalances,
}

impl Settlement {
    pub fn moved(&self) -> impl Iterator<Item = (TokenType, U256)> + '_ {
        self.amounts.iter().filter(|(_, amount)| !amount.is_zero())
    }
}

pub fn settle(
    state: &mut UserSpinState,
    target: ClaimTarget,
    now: DateTime<Utc>,
) -> Result<Settlement, SettlementError> {
    match target {
        ClaimTarget::Token(token) => settle_one(state, token, now),
        ClaimTarget::All => settle_all(state, now),
    }
}

pub fn settle_one(
    state: &mut UserSpinState,
    token: TokenType,
    now: DateTime<Utc>,
) -> Result<Settlement, SettlementError> {
    settle_tokens(state, &[token], now)
}

pub fn settle_all(state: &mut UserSpinState, now: DateTime<Utc>) -> Result<Settlement, SettlementError> {
    settle_tokens(state, &TokenType::ALL, now)
}

/// All-or-nothing: every new claimed total is computed before anything is
/// written, so an error leaves `state` untouched.
fn settle_tokens(
    state: &mut UserSpinState,
    tokens: &[TokenType],
    now: DateTime<Utc>,
) -> Result<Settlement, SettlementError> {
    let mut amounts = TokenBalances::default();
    let mut claimed = state.claimed;

    for &token in tokens {
        let pending = state.accumulated.get(token);
        if pending.is_zero() {
            continue;
        }
        let total = claimed
            .checked_plus(token, pending)
            .ok_or(SettlementError::BalanceOverflow)?;
        claimed.set(token, total);
        amounts.set(token, pending);
    }

    if amounts.is_zero() {
        return Err(SettlementError::NoPendingRewards);
    }

    for (token, amount) in amounts.iter() {
        if !amount.is_zero() {
            state.accumulated.set(token, U256::zero());
        }
    }
    state.claimed = claimed;
    state.last_claim_at = Some(now);

    log::debug!("settled {:?}", amounts);
    Ok(Settlement { amounts })
}
