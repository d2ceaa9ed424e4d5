use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const API_WINDOW: Duration = Duration::from_secs(60);
pub const SPIN_WINDOW: Duration = Duration::from_secs(60);
pub const CLAIM_WINDOW: Duration = Duration::from_secs(60);

pub const API_MAX_REQUESTS: u32 = 600;
pub const SPIN_MAX_ATTEMPTS: u32 = 10;
pub const CLAIM_MAX_ATTEMPTS: u32 = 5;

pub const API_RATE_LIMIT_ERROR: &str = "Too Many Requests";
pub const SPIN_RATE_LIMIT_ERROR: &str = "Too many spin requests. Please slow down.";
pub const CLAIM_RATE_LIMIT_ERROR: &str = "Too many claim requests. Please try again in a minute.";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitType {
    Api,
    Spin,
    Claim,
}

impl RateLimitType {
    pub fn get_window(&self) -> Duration {
        match self {
            Self::Api => API_WINDOW,
            Self::Spin => SPIN_WINDOW,
            Self::Claim => CLAIM_WINDOW,
        }
    }

    pub fn get_max_attempts(&self) -> u32 {
        match self {
            Self::Api => API_MAX_REQUESTS,
            Self::Spin => SPIN_MAX_ATTEMPTS,
            Self::Claim => CLAIM_MAX_ATTEMPTS,
        }
    }

    pub fn get_error_message(&self) -> &'static str {
        match self {
            Self::Api => API_RATE_LIMIT_ERROR,
            Self::Spin => SPIN_RATE_LIMIT_ERROR,
            Self::Claim => CLAIM_RATE_LIMIT_ERROR,
        }
    }

    fn key_segment(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Spin => "spin",
            Self::Claim => "claim",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitCheck {
    pub current_attempts: u32,
    pub is_locked: bool,
}

impl RateLimitCheck {
    /// `attempts` includes the request being checked.
    pub fn new(attempts: u32, limit_type: RateLimitType) -> Self {
        Self {
            current_attempts: attempts,
            is_locked: attempts > limit_type.get_max_attempts(),
        }
    }
}

pub fn get_rate_limit_key(limit_type: RateLimitType, identifier: &str) -> String {
    format!("rate_limit:{}:{}", limit_type.key_segment(), identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(
            get_rate_limit_key(RateLimitType::Spin, "0xabc"),
            "rate_limit:spin:0xabc"
        );
    }

    #[test]
    fn test_lock_only_past_max() {
        assert!(!RateLimitCheck::new(SPIN_MAX_ATTEMPTS, RateLimitType::Spin).is_locked);
        assert!(RateLimitCheck::new(SPIN_MAX_ATTEMPTS + 1, RateLimitType::Spin).is_locked);
    }
}
