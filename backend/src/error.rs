use crate::store::StoreError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use shared::constants::{BUSY_ERROR, INVALID_ADDRESS_ERROR, INVALID_TOKEN_ERROR, STORAGE_ERROR};
use shared::rate_limit::RateLimitType;
use shared::{SettlementError, SpinError};
use std::fmt;

#[derive(Debug)]
pub enum Error {
    Spin(SpinError),
    Settlement(SettlementError),
    Store(StoreError),
    /// Optimistic retries exhausted.
    Busy,
    InvalidAddress(String),
    /// Body could not be read as the expected JSON.
    BadRequest(String),
    RateLimited(RateLimitType),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spin(e) => write!(f, "{}", e),
            Self::Settlement(e) => write!(f, "{}", e),
            Self::Store(e) => write!(f, "{}", e),
            Self::Busy => write!(f, "Too many concurrent updates"),
            Self::InvalidAddress(address) => write!(f, "Invalid wallet address: {}", address),
            Self::BadRequest(reason) => write!(f, "Invalid request body: {}", reason),
            Self::RateLimited(limit) => write!(f, "{}", limit.get_error_message()),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spin(e) => Some(e),
            Self::Settlement(e) => Some(e),
            Self::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SpinError> for Error {
    fn from(err: SpinError) -> Self {
        Error::Spin(err)
    }
}

impl From<SettlementError> for Error {
    fn from(err: SettlementError) -> Self {
        Error::Settlement(err)
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::Store(err)
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::BadRequest(rejection.body_text())
    }
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Spin(SpinError::DailyLimitReached { .. }) => "DAILY_LIMIT_REACHED",
            Self::Spin(SpinError::BalanceOverflow) | Self::Settlement(SettlementError::BalanceOverflow) => {
                "BALANCE_OVERFLOW"
            }
            Self::Settlement(SettlementError::NoPendingRewards) => "NO_PENDING_REWARDS",
            Self::Settlement(SettlementError::InvalidTokenType(_)) => "INVALID_TOKEN_TYPE",
            Self::Store(_) => "STORAGE_UNAVAILABLE",
            Self::Busy => "BUSY",
            Self::InvalidAddress(_) => "INVALID_ADDRESS",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::RateLimited(_) => "RATE_LIMITED",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Spin(SpinError::DailyLimitReached { .. }) | Self::RateLimited(_) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            Self::Spin(SpinError::BalanceOverflow) | Self::Settlement(SettlementError::BalanceOverflow) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Settlement(_) | Self::InvalidAddress(_) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Busy => StatusCode::CONFLICT,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Settlement(SettlementError::InvalidTokenType(_)) => INVALID_TOKEN_ERROR.to_string(),
            Self::InvalidAddress(_) => INVALID_ADDRESS_ERROR.to_string(),
            Self::Store(e) => {
                tracing::error!("Storage error: {}", e);
                STORAGE_ERROR.to_string()
            }
            Self::Busy => BUSY_ERROR.to_string(),
            other => other.to_string(),
        };

        let mut body = json!({ "error": message, "code": self.code() });
        if let Self::Spin(SpinError::DailyLimitReached { resets_at, .. }) = &self {
            body["resets_at"] = json!(resets_at);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_status_mapping() {
        let resets_at = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
        let limit = Error::from(SpinError::DailyLimitReached { daily_limit: 3, resets_at });
        assert_eq!(limit.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(limit.code(), "DAILY_LIMIT_REACHED");

        let empty = Error::from(SettlementError::NoPendingRewards);
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

        let storage = Error::from(StoreError::Unavailable("down".to_string()));
        assert_eq!(storage.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(Error::Busy.status(), StatusCode::CONFLICT);

        let body = Error::BadRequest("missing field `token`".to_string());
        assert_eq!(body.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body.code(), "BAD_REQUEST");
    }
}
