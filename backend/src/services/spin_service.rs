use crate::error::Error;
use crate::store::{SpinStateStore, StoreError, StoredState};
use chrono::{DateTime, Utc};
use shared::reward_settlement::settle;
use shared::spin_ledger::SpinAllowance;
use shared::{Address, ClaimTarget, Clock, DailySpinLedger, Settlement, SpinReceipt, UserSpinState};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::warn;

/// Attempts per operation before giving up on optimistic conflicts.
pub const MAX_CONFLICT_RETRIES: usize = 3;

/// Idle lock entries are pruned once the map grows past this.
const LOCK_PRUNE_THRESHOLD: usize = 1024;

/// One async mutex per wallet, so read-check-write sequences for the same user
/// never interleave inside this process.
#[derive(Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<Address, Arc<AsyncMutex<()>>>>,
}

impl UserLocks {
    pub async fn acquire(&self, user: Address) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            if locks.len() >= LOCK_PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks.entry(user).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Runs the wheel core against persisted state: load, apply, save.
pub struct SpinService {
    store: Arc<dyn SpinStateStore>,
    ledger: DailySpinLedger,
    clock: Arc<dyn Clock>,
    locks: UserLocks,
}

impl SpinService {
    pub fn new(store: Arc<dyn SpinStateStore>, ledger: DailySpinLedger, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            ledger,
            clock,
            locks: UserLocks::default(),
        }
    }

    pub fn ledger(&self) -> &DailySpinLedger {
        &self.ledger
    }

    pub async fn spin(&self, user: Address) -> Result<SpinReceipt, Error> {
        self.mutate(user, |ledger, state, now| Ok(ledger.request_spin(state, now)?))
            .await
    }

    pub async fn claim(&self, user: Address, target: ClaimTarget) -> Result<Settlement, Error> {
        self.mutate(user, move |_, state, now| Ok(settle(state, target, now)?))
            .await
    }

    pub async fn status(&self, user: Address) -> Result<(SpinAllowance, UserSpinState), Error> {
        let StoredState { state, .. } = self.store.load(&user).await?;
        let allowance = self.ledger.allowance(&state, self.clock.now());
        Ok((allowance, state))
    }

    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<(Address, UserSpinState)>, Error> {
        Ok(self.store.leaderboard(limit).await?)
    }

    /// Applies `op` to the user's state and persists the result. A failing
    /// `op` writes nothing. A version conflict from another writer reloads and
    /// reapplies, so the daily limit is checked against the winning write.
    async fn mutate<T, F>(&self, user: Address, mut op: F) -> Result<T, Error>
    where
        F: FnMut(&DailySpinLedger, &mut UserSpinState, DateTime<Utc>) -> Result<T, Error> + Send,
        T: Send,
    {
        let _guard = self.locks.acquire(user).await;

        for attempt in 1..=MAX_CONFLICT_RETRIES {
            let StoredState { mut state, version } = self.store.load(&user).await?;
            let result = op(&self.ledger, &mut state, self.clock.now())?;

            match self.store.save(&user, &state, version).await {
                Ok(_) => return Ok(result),
                Err(StoreError::Conflict) => {
                    warn!(
                        "Version conflict for {:#x} (attempt {}/{}), retrying",
                        user, attempt, MAX_CONFLICT_RETRIES
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(Error::Busy)
    }
}
