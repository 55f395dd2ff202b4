use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::require_auth;
use super::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Public routes: no authentication
    let public = Router::new()
        .route("/health", get(handlers::system::health_check))
        .route("/metrics", get(handlers::system::render_metrics));

    // Protected API routes: Bearer token required when API_TOKEN is set
    let protected = Router::new()
        // Market data (manual pass through the pipeline)
        .route("/api/market", get(handlers::market::fetch))
        // Signals
        .route("/api/signals", get(handlers::signals::list))
        .route("/api/trade-queue", get(handlers::signals::trade_queue))
        // Events
        .route("/api/whales", get(handlers::events::whales))
        .route("/api/pump-dumps", get(handlers::events::pump_dumps))
        // Trades
        .route("/api/trades", get(handlers::trades::list))
        // Auto-trader control
        .route("/api/auto-trade/start", post(handlers::auto_trade::start))
        .route("/api/auto-trade/stop", post(handlers::auto_trade::stop))
        .route("/api/auto-trade/stats", get(handlers::auto_trade::stats))
        // Engine config
        .route(
            "/api/config",
            get(handlers::config::get_config).put(handlers::config::update_config),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
