use crate::store::{StoreError, StoredState};
use chrono::{DateTime, Utc};
use shared::{Address, TokenBalances, UserSpinState, U256};
use std::str::FromStr;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserSpinRow {
    pub wallet_address: String,
    pub spins_used_today: i32,
    pub last_spin_at: Option<DateTime<Utc>>,
    pub total_spins: i64,
    pub total_wins: i64,
    pub accumulated_token_1: String,
    pub accumulated_token_2: String,
    pub accumulated_token_3: String,
    pub claimed_token_1: String,
    pub claimed_token_2: String,
    pub claimed_token_3: String,
    pub last_claim_at: Option<DateTime<Utc>>,
    pub version: i64,
}

fn parse_amount(column: &str, value: &str) -> Result<U256, StoreError> {
    U256::from_dec_str(value)
        .map_err(|_| StoreError::Corrupt(format!("{} is not a base-unit amount: {:?}", column, value)))
}

fn to_unsigned<T: TryFrom<i64>>(column: &str, value: i64) -> Result<T, StoreError> {
    T::try_from(value).map_err(|_| StoreError::Corrupt(format!("{} is negative: {}", column, value)))
}

impl UserSpinRow {
    pub fn address(&self) -> Result<Address, StoreError> {
        let hex = self.wallet_address.trim_start_matches("0x");
        Address::from_str(hex)
            .map_err(|_| StoreError::Corrupt(format!("bad wallet address {:?}", self.wallet_address)))
    }

    pub fn into_stored(self) -> Result<StoredState, StoreError> {
        let state = UserSpinState {
            spins_used_today: to_unsigned("spins_used_today", i64::from(self.spins_used_today))?,
            last_spin_at: self.last_spin_at,
            total_spins: to_unsigned("total_spins", self.total_spins)?,
            total_wins: to_unsigned("total_wins", self.total_wins)?,
            accumulated: TokenBalances {
                token_1: parse_amount("accumulated_token_1", &self.accumulated_token_1)?,
                token_2: parse_amount("accumulated_token_2", &self.accumulated_token_2)?,
                token_3: parse_amount("accumulated_token_3", &self.accumulated_token_3)?,
            },
            claimed: TokenBalances {
                token_1: parse_amount("claimed_token_1", &self.claimed_token_1)?,
                token_2: parse_amount("claimed_token_2", &self.claimed_token_2)?,
                token_3: parse_amount("claimed_token_3", &self.claimed_token_3)?,
            },
            last_claim_at: self.last_claim_at,
        };
        Ok(StoredState { state, version: self.version })
    }
}

/// Column values for an insert or update, already range-checked.
#[derive(Debug, Clone)]
pub struct UserSpinColumns {
    pub spins_used_today: i32,
    pub total_spins: i64,
    pub total_wins: i64,
    pub accumulated: [String; 3],
    pub claimed: [String; 3],
}

impl UserSpinColumns {
    pub fn from_state(state: &UserSpinState) -> Result<Self, StoreError> {
        let too_large = |column: &str| StoreError::Corrupt(format!("{} does not fit its column", column));
        let amounts = |balances: &TokenBalances| {
            [
                balances.token_1.to_string(),
                balances.token_2.to_string(),
                balances.token_3.to_string(),
            ]
        };
        Ok(Self {
            spins_used_today: i32::try_from(state.spins_used_today)
                .map_err(|_| too_large("spins_used_today"))?,
            total_spins: i64::try_from(state.total_spins).map_err(|_| too_large("total_spins"))?,
            total_wins: i64::try_from(state.total_wins).map_err(|_| too_large("total_wins"))?,
            accumulated: amounts(&state.accumulated),
            claimed: amounts(&state.claimed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::TokenType;

    fn row() -> UserSpinRow {
        UserSpinRow {
            wallet_address: "0x52908400098527886e0f7030069857d2e4169ee7".to_string(),
            spins_used_today: 2,
            last_spin_at: None,
            total_spins: 10,
            total_wins: 6,
            accumulated_token_1: "2000000000000000000".to_string(),
            accumulated_token_2: "0".to_string(),
            accumulated_token_3: "0".to_string(),
            claimed_token_1: "0".to_string(),
            claimed_token_2: "10000000000000000000".to_string(),
            claimed_token_3: "0".to_string(),
            last_claim_at: None,
            version: 4,
        }
    }

    #[test]
    fn test_row_converts_to_state() {
        let row = row();
        assert_eq!(
            crate::store::wallet_key(&row.address().unwrap()),
            "0x52908400098527886e0f7030069857d2e4169ee7"
        );
        let stored = row.into_stored().unwrap();
        assert_eq!(stored.version, 4);
        assert_eq!(stored.state.spins_used_today, 2);
        assert_eq!(
            stored.state.accumulated.get(TokenType::Token1),
            U256::from_dec_str("2000000000000000000").unwrap()
        );

        let columns = UserSpinColumns::from_state(&stored.state).unwrap();
        assert_eq!(columns.claimed[1], "10000000000000000000");
    }

    #[test]
    fn test_corrupt_rows_are_reported() {
        let mut bad_amount = row();
        bad_amount.accumulated_token_3 = "12.5".to_string();
        assert!(matches!(bad_amount.into_stored(), Err(StoreError::Corrupt(_))));

        let mut negative = row();
        negative.total_wins = -1;
        assert!(matches!(negative.into_stored(), Err(StoreError::Corrupt(_))));
    }
}
