use super::{wallet_key, SpinStateStore, StoreError, StoredState};
use crate::models::{UserSpinColumns, UserSpinRow};
use axum::async_trait;
use shared::{Address, UserSpinState};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

const SELECT_COLUMNS: &str = r#"
    wallet_address, spins_used_today, last_spin_at, total_spins, total_wins,
    accumulated_token_1, accumulated_token_2, accumulated_token_3,
    claimed_token_1, claimed_token_2, claimed_token_3,
    last_claim_at, version
"#;

/// PostgreSQL-backed store. Optimistic concurrency rides on the `version`
/// column, so several backend processes can share one database.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects and applies pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migration failed: {}", e)))?;

        info!("Connected to Postgres and applied migrations");
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl SpinStateStore for PgStore {
    async fn load(&self, user: &Address) -> Result<StoredState, StoreError> {
        let query = format!("SELECT {} FROM user_spin_state WHERE wallet_address = $1", SELECT_COLUMNS);
        let row = sqlx::query_as::<_, UserSpinRow>(&query)
            .bind(wallet_key(user))
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => row.into_stored(),
            None => Ok(StoredState::default()),
        }
    }

    async fn save(
        &self,
        user: &Address,
        state: &UserSpinState,
        expected_version: i64,
    ) -> Result<i64, StoreError> {
        let columns = UserSpinColumns::from_state(state)?;
        let [acc_1, acc_2, acc_3] = columns.accumulated;
        let [claimed_1, claimed_2, claimed_3] = columns.claimed;

        let result = if expected_version == 0 {
            sqlx::query(
                r#"
                INSERT INTO user_spin_state (
                    wallet_address, spins_used_today, last_spin_at, total_spins, total_wins,
                    accumulated_token_1, accumulated_token_2, accumulated_token_3,
                    claimed_token_1, claimed_token_2, claimed_token_3,
                    last_claim_at, version
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 1)
                ON CONFLICT (wallet_address) DO NOTHING
                "#,
            )
            .bind(wallet_key(user))
            .bind(columns.spins_used_today)
            .bind(state.last_spin_at)
            .bind(columns.total_spins)
            .bind(columns.total_wins)
            .bind(acc_1)
            .bind(acc_2)
            .bind(acc_3)
            .bind(claimed_1)
            .bind(claimed_2)
            .bind(claimed_3)
            .bind(state.last_claim_at)
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE user_spin_state
                SET spins_used_today = $2,
                    last_spin_at = $3,
                    total_spins = $4,
                    total_wins = $5,
                    accumulated_token_1 = $6,
                    accumulated_token_2 = $7,
                    accumulated_token_3 = $8,
                    claimed_token_1 = $9,
                    claimed_token_2 = $10,
                    claimed_token_3 = $11,
                    last_claim_at = $12,
                    version = version + 1,
                    updated_at = NOW()
                WHERE wallet_address = $1 AND version = $13
                "#,
            )
            .bind(wallet_key(user))
            .bind(columns.spins_used_today)
            .bind(state.last_spin_at)
            .bind(columns.total_spins)
            .bind(columns.total_wins)
            .bind(acc_1)
            .bind(acc_2)
            .bind(acc_3)
            .bind(claimed_1)
            .bind(claimed_2)
            .bind(claimed_3)
            .bind(state.last_claim_at)
            .bind(expected_version)
            .execute(&self.pool)
            .await?
        };

        if result.rows_affected() != 1 {
            return Err(StoreError::Conflict);
        }
        Ok(expected_version + 1)
    }

    async fn leaderboard(&self, limit: usize) -> Result<Vec<(Address, UserSpinState)>, StoreError> {
        let query = format!(
            "SELECT {} FROM user_spin_state \
             ORDER BY total_wins DESC, total_spins DESC, wallet_address \
             LIMIT $1",
            SELECT_COLUMNS
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, UserSpinRow>(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                let address = row.address()?;
                Ok((address, row.into_stored()?.state))
            })
            .collect()
    }
}
