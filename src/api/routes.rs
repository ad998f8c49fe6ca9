//! REST API routes configuration

use crate::api::handlers::{self, ApiState};
use crate::api::websocket::ws_handler;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    // Configure CORS for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // WebSocket for real-time updates
        .route("/ws", get(ws_handler))
        // Accounts
        .route(
            "/api/accounts/{address}/fund",
            post(handlers::fund_account),
        )
        .route(
            "/api/accounts/{address}/balance",
            get(handlers::get_balance),
        )
        // Wallets
        .route(
            "/api/wallets",
            get(handlers::list_wallets).post(handlers::create_wallet),
        )
        .route("/api/wallets/{address}", get(handlers::get_wallet))
        .route("/api/wallets/{address}/deposit", post(handlers::deposit))
        .route(
            "/api/wallets/{address}/relay/accept",
            post(handlers::accept_relayed_call),
        )
        // Transactions
        .route(
            "/api/wallets/{address}/transactions",
            get(handlers::list_transactions).post(handlers::submit_transaction),
        )
        .route(
            "/api/wallets/{address}/transactions/{id}",
            get(handlers::get_transaction),
        )
        .route(
            "/api/wallets/{address}/transactions/{id}/confirm",
            post(handlers::confirm_transaction),
        )
        .route(
            "/api/wallets/{address}/transactions/{id}/revoke",
            post(handlers::revoke_confirmation),
        )
        .route(
            "/api/wallets/{address}/transactions/{id}/execute",
            post(handlers::execute_transaction),
        )
        // Devnet clock and event log
        .route("/api/time/advance", post(handlers::advance_time))
        .route("/api/events", get(handlers::list_events))
        // Add state and middleware
        .with_state(state)
        .layer(cors)
}
