use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use shared::constants::{DEFAULT_LEADERBOARD_LIMIT, MAX_LEADERBOARD_LIMIT};
use shared::shared_wheel_game::LeaderboardEntry;
use tracing::{debug, error};

use crate::error::Error;
use crate::store::wallet_key;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

/// Top wallets by lifetime wins.
pub async fn leaderboard_handler(
    State(state): State<AppState>,
    Query(params): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, Error> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .clamp(1, MAX_LEADERBOARD_LIMIT);

    let rows = state.spins.leaderboard(limit).await.map_err(|e| {
        error!("Failed to load leaderboard: {}", e);
        e
    })?;
    debug!("Leaderboard returned {} entries", rows.len());

    Ok(Json(
        rows.into_iter()
            .map(|(address, user)| LeaderboardEntry {
                wallet_address: wallet_key(&address),
                total_spins: user.total_spins,
                total_wins: user.total_wins,
                claimed: user.claimed,
            })
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenRegistry;
    use crate::services::SpinService;
    use crate::store::{MemoryStore, SpinStateStore};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use shared::{Address, DailySpinLedger, SystemClock, UserSpinState};
    use std::sync::Arc;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_leaderboard_clamps_limit_and_orders_by_wins() {
        let store = Arc::new(MemoryStore::default());
        for (byte, wins) in [(1u8, 4u64), (2, 9), (3, 1)] {
            let user = UserSpinState { total_wins: wins, total_spins: wins, ..Default::default() };
            store.save(&Address::repeat_byte(byte), &user, 0).await.unwrap();
        }

        let state = AppState {
            spins: Arc::new(SpinService::new(store, DailySpinLedger::default(), Arc::new(SystemClock))),
            redis: None,
            tokens: Arc::new(TokenRegistry::default()),
        };
        let app = Router::new()
            .route("/api/leaderboard", get(leaderboard_handler))
            .with_state(state);

        let response = app
            .oneshot(Request::builder().uri("/api/leaderboard?limit=0").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let entries: Vec<LeaderboardEntry> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].wallet_address, wallet_key(&Address::repeat_byte(2)));
        assert_eq!(entries[0].total_wins, 9);
    }
}
