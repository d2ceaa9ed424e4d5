use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use shared::rate_limit::RateLimitType;
use shared::shared_wheel_game::*;
use shared::validation::{validate_wallet_address, ClaimRequest};
use shared::{Address, SpinError};
use std::str::FromStr;

use crate::error::Error;
use crate::services::check_rate_limit;
use crate::store::wallet_key;
use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/segments", get(get_segments))
        .route("/:address/spin", post(spin_wheel))
        .route("/:address/status", get(get_wheel_status))
        .route("/:address/claim", post(claim_rewards))
}

pub fn parse_wallet(raw: &str) -> Result<Address, Error> {
    let raw = raw.trim();
    validate_wallet_address(raw).map_err(|_| Error::InvalidAddress(raw.to_string()))?;
    Address::from_str(raw.trim_start_matches("0x")).map_err(|_| Error::InvalidAddress(raw.to_string()))
}

async fn get_segments(State(state): State<AppState>) -> Json<WheelSegmentsResponse> {
    let table = state.spins.ledger().generator().table();
    Json(WheelSegmentsResponse {
        total_weight: table.total_weight(),
        segments: table.segments().cloned().collect(),
    })
}

async fn spin_wheel(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<WheelSpinResponse>, Error> {
    let wallet = parse_wallet(&address)?;
    let key = wallet_key(&wallet);
    check_rate_limit(state.redis.as_ref(), RateLimitType::Spin, &key).await?;

    match state.spins.spin(wallet).await {
        Ok(receipt) => {
            let outcome = receipt.outcome;
            if outcome.is_win {
                tracing::info!(
                    "🎡 WHEEL SPIN: {} landed on {} and won {} {} ({} spins left today) seed={}",
                    key,
                    outcome.segment,
                    outcome.reward_amount,
                    outcome.token_type.map(|t| t.as_str()).unwrap_or("-"),
                    receipt.spins_remaining,
                    outcome.random_seed
                );
            } else {
                tracing::info!(
                    "🎡 WHEEL SPIN: {} busted ({} spins left today) seed={}",
                    key,
                    receipt.spins_remaining,
                    outcome.random_seed
                );
            }

            Ok(Json(WheelSpinResponse {
                success: true,
                message: outcome_message(&outcome),
                outcome,
                spins_remaining: receipt.spins_remaining,
            }))
        }
        Err(e) => {
            if let Error::Spin(SpinError::DailyLimitReached { .. }) = &e {
                tracing::info!("⏳ {} tried to spin past the daily limit", key);
            }
            Err(e)
        }
    }
}

async fn get_wheel_status(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<WheelStatusResponse>, Error> {
    let wallet = parse_wallet(&address)?;
    let (allowance, user) = state.spins.status(wallet).await?;

    Ok(Json(WheelStatusResponse {
        daily_limit: allowance.daily_limit,
        spins_used_today: allowance.spins_used_today,
        spins_remaining: allowance.spins_remaining,
        resets_at: allowance.resets_at,
        total_spins: user.total_spins,
        total_wins: user.total_wins,
        accumulated: user.accumulated,
        claimed: user.claimed,
        last_spin_at: user.last_spin_at,
        last_claim_at: user.last_claim_at,
    }))
}

async fn claim_rewards(
    State(state): State<AppState>,
    Path(address): Path<String>,
    request: Result<Json<ClaimRequest>, JsonRejection>,
) -> Result<Json<ClaimResponse>, Error> {
    let wallet = parse_wallet(&address)?;
    let Json(request) = request?;
    let target = request.target()?;

    let key = wallet_key(&wallet);
    check_rate_limit(state.redis.as_ref(), RateLimitType::Claim, &key).await?;

    let settlement = state.spins.claim(wallet, target).await?;

    let transfers: Vec<TokenTransfer> = settlement
        .moved()
        .map(|(token, amount)| TokenTransfer {
            token,
            contract_address: state.tokens.address_of(token),
            amount,
        })
        .collect();

    for transfer in &transfers {
        tracing::info!(
            "🧾 CLAIM: {} settled {} {} (contract {})",
            key,
            transfer.amount,
            transfer.token,
            transfer
                .contract_address
                .map(|a| format!("{:#x}", a))
                .unwrap_or_else(|| "unconfigured".to_string())
        );
    }

    Ok(Json(ClaimResponse {
        success: true,
        claimed: settlement.amounts,
        message: format!("Claimed {} of your pending rewards.", target),
        transfers,
    }))
}
