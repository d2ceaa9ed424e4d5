use axum::async_trait;
use shared::{Address, UserSpinState};
use std::fmt;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A user's state plus the row version it was read at. Version 0 means the
/// user has never been saved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredState {
    pub state: UserSpinState,
    pub version: i64,
}

#[derive(Debug)]
pub enum StoreError {
    /// The row changed since it was loaded.
    Conflict,
    Unavailable(String),
    Corrupt(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict => write!(f, "Concurrent update detected"),
            Self::Unavailable(e) => write!(f, "Storage unavailable: {}", e),
            Self::Corrupt(e) => write!(f, "Corrupt stored state: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Persistence provider for per-user spin state.
///
/// `save` must only succeed when the stored version still equals
/// `expected_version`; otherwise it returns [`StoreError::Conflict`] and writes
/// nothing. Callers reload and retry.
#[async_trait]
pub trait SpinStateStore: Send + Sync {
    async fn load(&self, user: &Address) -> Result<StoredState, StoreError>;

    /// Returns the new version.
    async fn save(
        &self,
        user: &Address,
        state: &UserSpinState,
        expected_version: i64,
    ) -> Result<i64, StoreError>;

    /// Users ordered by lifetime wins, then lifetime spins.
    async fn leaderboard(&self, limit: usize) -> Result<Vec<(Address, UserSpinState)>, StoreError>;
}

/// Canonical storage key: lowercase, `0x`-prefixed, unabbreviated.
pub fn wallet_key(address: &Address) -> String {
    format!("{:#x}", address)
}
