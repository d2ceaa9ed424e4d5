use ethers_core::types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three reward token slots paid out by the wheel.
///
/// Contract addresses for each slot are owned by the backend configuration;
/// the core only ever deals in slots and base-unit amounts.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenType {
    #[serde(rename = "TOKEN_1")]
    Token1,
    #[serde(rename = "TOKEN_2")]
    Token2,
    #[serde(rename = "TOKEN_3")]
    Token3,
}

impl TokenType {
    pub const ALL: [TokenType; 3] = [TokenType::Token1, TokenType::Token2, TokenType::Token3];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Token1 => "TOKEN_1",
            Self::Token2 => "TOKEN_2",
            Self::Token3 => "TOKEN_3",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Token1 => 0,
            Self::Token2 => 1,
            Self::Token3 => 2,
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownToken(pub String);

impl fmt::Display for UnknownToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown token type: {}", self.0)
    }
}

impl std::error::Error for UnknownToken {}

impl FromStr for TokenType {
    type Err = UnknownToken;

    /// Case-insensitive `TOKEN_1` or `TOKEN1`; nothing else.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TOKEN_1" | "TOKEN1" => Ok(Self::Token1),
            "TOKEN_2" | "TOKEN2" => Ok(Self::Token2),
            "TOKEN_3" | "TOKEN3" => Ok(Self::Token3),
            _ => Err(UnknownToken(s.to_string())),
        }
    }
}

/// A base-unit amount for each token slot.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenBalances {
    #[serde(rename = "TOKEN_1", with = "decimal_u256")]
    pub token_1: U256,
    #[serde(rename = "TOKEN_2", with = "decimal_u256")]
    pub token_2: U256,
    #[serde(rename = "TOKEN_3", with = "decimal_u256")]
    pub token_3: U256,
}

impl TokenBalances {
    pub fn get(&self, token: TokenType) -> U256 {
        match token {
            TokenType::Token1 => self.token_1,
            TokenType::Token2 => self.token_2,
            TokenType::Token3 => self.token_3,
        }
    }

    pub fn set(&mut self, token: TokenType, amount: U256) {
        match token {
            TokenType::Token1 => self.token_1 = amount,
            TokenType::Token2 => self.token_2 = amount,
            TokenType::Token3 => self.token_3 = amount,
        }
    }

    /// Returns the balance of `token` plus `amount`, or `None` on overflow.
    /// Does not mutate.
    pub fn checked_plus(&self, token: TokenType, amount: U256) -> Option<U256> {
        self.get(token).checked_add(amount)
    }

    pub fn is_zero(&self) -> bool {
        TokenType::ALL.iter().all(|t| self.get(*t).is_zero())
    }

    pub fn iter(&self) -> impl Iterator<Item = (TokenType, U256)> + '_ {
        TokenType::ALL.iter().map(move |t| (*t, self.get(*t)))
    }
}

/// Serializes `U256` amounts as base-10 strings. They routinely exceed what a
/// JSON number can carry exactly.
pub mod decimal_u256 {
    use ethers_core::types::U256;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        U256::from_dec_str(&s).map_err(de::Error::custom)
    }
}

/// `10^decimals` whole-token scale, e.g. `token_units(5, 18)` is five tokens.
pub fn token_units(whole: u64, decimals: usize) -> U256 {
    U256::from(whole) * U256::exp10(decimals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_type_variants() {
        assert_eq!("TOKEN_1".parse::<TokenType>(), Ok(TokenType::Token1));
        assert_eq!("token2".parse::<TokenType>(), Ok(TokenType::Token2));
        assert_eq!(" Token_3 ".parse::<TokenType>(), Ok(TokenType::Token3));
        assert_eq!(
            "AIDOGE".parse::<TokenType>(),
            Err(UnknownToken("AIDOGE".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_stray_underscores() {
        for raw in ["T_O_K_E_N_1", "_token3_", "TOKEN__2", "TOKEN_ 1"] {
            assert_eq!(raw.parse::<TokenType>(), Err(UnknownToken(raw.to_string())));
        }
    }

    #[test]
    fn test_balances_serialize_as_decimal_strings() {
        let mut balances = TokenBalances::default();
        balances.set(TokenType::Token1, token_units(2, 18));
        let json = serde_json::to_value(balances).unwrap();
        assert_eq!(json["TOKEN_1"], "2000000000000000000");
        assert_eq!(json["TOKEN_2"], "0");

        let back: TokenBalances = serde_json::from_value(json).unwrap();
        assert_eq!(back, balances);
    }
}
