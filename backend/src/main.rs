use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{extract::State, middleware, Router};
use redis::Client as RedisClient;
use shared::rate_limit::RateLimitType;
use shared::{DailySpinLedger, SystemClock, WheelOutcomeGenerator};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::{Config, TokenRegistry};
use crate::games::backend_wheel_game::create_router as create_wheel_game_router;
use crate::handlers::leaderboard_handler;
use crate::services::{check_rate_limit, SpinService};
use crate::store::{MemoryStore, PgStore, SpinStateStore};

mod config;
mod error;
mod games;
mod handlers;
mod logging;
mod models;
mod services;
mod store;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AppState {
    spins: Arc<SpinService>,
    redis: Option<RedisClient>,
    tokens: Arc<TokenRegistry>,
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Prefers the proxy headers our deployment sets, in this order.
fn client_ip(headers: &HeaderMap) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(',').next().unwrap_or("").trim().to_string())
            .filter(|value| !value.is_empty())
    };

    header_value("cf-connecting-ip")
        .or_else(|| header_value("x-forwarded-for"))
        .or_else(|| header_value("x-real-ip"))
        .unwrap_or_else(|| "unknown".to_string())
}

async fn ip_rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: middleware::Next,
) -> Response {
    let ip = client_ip(request.headers());
    if let Err(e) = check_rate_limit(state.redis.as_ref(), RateLimitType::Api, &ip).await {
        warn!("Rate limited client {}", ip);
        return e.into_response();
    }
    next.run(request).await
}

fn build_router(state: AppState, cors_origin: Option<header::HeaderValue>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);
    let cors = match cors_origin {
        Some(origin) => cors.allow_origin(origin),
        None => cors.allow_origin(Any),
    };

    let api = Router::new()
        .nest("/api/wheel", create_wheel_game_router())
        .route("/api/leaderboard", get(leaderboard_handler))
        .layer(middleware::from_fn_with_state(state.clone(), ip_rate_limit_middleware));

    Router::new()
        .route("/health", get(health_check))
        .merge(api)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let store: Arc<dyn SpinStateStore> = match &config.database_url {
        Some(url) => Arc::new(PgStore::connect(url).await?),
        None => {
            warn!("DATABASE_URL is not set; spin state is kept in memory and lost on restart");
            Arc::new(MemoryStore::default())
        }
    };

    let redis = match &config.redis_url {
        Some(url) => Some(RedisClient::open(url.as_str())?),
        None => {
            warn!("REDIS_URL is not set; rate limiting is disabled");
            None
        }
    };

    let ledger = DailySpinLedger::new(WheelOutcomeGenerator::default(), config.daily_spin_limit);
    let state = AppState {
        spins: Arc::new(SpinService::new(store, ledger, Arc::new(SystemClock))),
        redis,
        tokens: Arc::new(config.tokens.clone()),
    };

    let app = build_router(state, config.cors_origin.clone());
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(
        "🚀 ArbCasino backend listening on {} ({} spins per UTC day)",
        config.bind_addr, config.daily_spin_limit
    );

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::setup();

    if let Err(e) = run().await {
        error!("Server failed: {}", e);
        std::process::exit(1);
    }
}
