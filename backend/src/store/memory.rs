use super::{SpinStateStore, StoreError, StoredState};
use axum::async_trait;
use shared::{Address, UserSpinState};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// In-process store for tests and local runs without `DATABASE_URL`.
/// Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<Address, StoredState>>,
}

impl MemoryStore {
    fn rows(&self) -> Result<MutexGuard<'_, HashMap<Address, StoredState>>, StoreError> {
        self.rows
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl SpinStateStore for MemoryStore {
    async fn load(&self, user: &Address) -> Result<StoredState, StoreError> {
        Ok(self.rows()?.get(user).cloned().unwrap_or_default())
    }

    async fn save(
        &self,
        user: &Address,
        state: &UserSpinState,
        expected_version: i64,
    ) -> Result<i64, StoreError> {
        let mut rows = self.rows()?;
        let current = rows.get(user).map(|row| row.version).unwrap_or(0);
        if current != expected_version {
            return Err(StoreError::Conflict);
        }
        let version = current + 1;
        rows.insert(*user, StoredState { state: state.clone(), version });
        Ok(version)
    }

    async fn leaderboard(&self, limit: usize) -> Result<Vec<(Address, UserSpinState)>, StoreError> {
        let rows = self.rows()?;
        let mut entries: Vec<(Address, UserSpinState)> = rows
            .iter()
            .map(|(address, row)| (*address, row.state.clone()))
            .collect();
        entries.sort_by(|(a_addr, a), (b_addr, b)| {
            b.total_wins
                .cmp(&a.total_wins)
                .then(b.total_spins.cmp(&a.total_spins))
                .then(a_addr.cmp(b_addr))
        });
        entries.truncate(limit);
        Ok(entries)
    }
}
