use axum::http::HeaderValue;
use shared::spin_ledger::DEFAULT_DAILY_SPIN_LIMIT;
use shared::{Address, TokenType};
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::warn;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// ERC-20 contract address for each reward slot. A missing entry means the
/// on-chain side has not been configured for that token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenRegistry {
    addresses: [Option<Address>; 3],
}

impl TokenRegistry {
    pub fn new(addresses: [Option<Address>; 3]) -> Self {
        Self { addresses }
    }

    pub fn address_of(&self, token: TokenType) -> Option<Address> {
        self.addresses[token.index()]
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub daily_spin_limit: u32,
    pub tokens: TokenRegistry,
    pub cors_origin: Option<HeaderValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid value for {}: {:?}", self.key, self.value)
    }
}

impl std::error::Error for ConfigError {}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError { key, value: value.to_string() }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_raw = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|_| invalid("BIND_ADDR", &bind_raw))?;

        let daily_spin_limit = match lookup("DAILY_SPIN_LIMIT") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(limit) if limit > 0 => limit,
                _ => return Err(invalid("DAILY_SPIN_LIMIT", &raw)),
            },
            None => DEFAULT_DAILY_SPIN_LIMIT,
        };

        let mut addresses = [None; 3];
        for (slot, key) in [
            (TokenType::Token1, "TOKEN_1_ADDRESS"),
            (TokenType::Token2, "TOKEN_2_ADDRESS"),
            (TokenType::Token3, "TOKEN_3_ADDRESS"),
        ] {
            match lookup(key) {
                Some(raw) => {
                    shared::validation::validate_wallet_address(raw.trim())
                        .map_err(|_| invalid(key, &raw))?;
                    let address = Address::from_str(raw.trim().trim_start_matches("0x"))
                        .map_err(|_| invalid(key, &raw))?;
                    addresses[slot.index()] = Some(address);
                }
                None => warn!("{} is not set; claims of {} will carry no contract address", key, slot),
            }
        }

        let cors_origin = match lookup("CORS_ORIGIN") {
            Some(raw) => Some(HeaderValue::from_str(raw.trim()).map_err(|_| invalid("CORS_ORIGIN", &raw))?),
            None => None,
        };

        Ok(Self {
            bind_addr,
            database_url: lookup("DATABASE_URL"),
            redis_url: lookup("REDIS_URL"),
            daily_spin_limit,
            tokens: TokenRegistry::new(addresses),
            cors_origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.daily_spin_limit, 3);
        assert!(config.database_url.is_none());
        assert!(config.redis_url.is_none());
        assert_eq!(config.tokens.address_of(TokenType::Token1), None);
    }

    #[test]
    fn test_token_addresses_and_limit() {
        let config = config_from(&[
            ("DAILY_SPIN_LIMIT", "5"),
            ("TOKEN_2_ADDRESS", "0x52908400098527886E0F7030069857D2E4169EE7"),
        ])
        .unwrap();
        assert_eq!(config.daily_spin_limit, 5);
        assert_eq!(
            config.tokens.address_of(TokenType::Token2),
            Some(Address::from_str("52908400098527886E0F7030069857D2E4169EE7").unwrap())
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        assert_eq!(config_from(&[("DAILY_SPIN_LIMIT", "0")]).unwrap_err().key, "DAILY_SPIN_LIMIT");
        assert_eq!(config_from(&[("BIND_ADDR", "nowhere")]).unwrap_err().key, "BIND_ADDR");
        assert_eq!(config_from(&[("TOKEN_1_ADDRESS", "0x1234")]).unwrap_err().key, "TOKEN_1_ADDRESS");
    }
}
