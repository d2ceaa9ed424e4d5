use crate::reward_settlement::{ClaimTarget, SettlementError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::ValidationError;

static WALLET_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("wallet address pattern")
});

pub fn validate_wallet_address(address: &str) -> Result<(), ValidationError> {
    if !WALLET_ADDRESS.is_match(address) {
        return Err(ValidationError::new("invalid_wallet_address"));
    }
    Ok(())
}

/// Body of `POST /api/wheel/:address/claim`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClaimRequest {
    pub token: String,
}

impl ClaimRequest {
    pub fn target(&self) -> Result<ClaimTarget, SettlementError> {
        self.token.parse()
    }
}
