use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/wallet", get(handlers::get_wallet))
        .route("/api/transactions", get(handlers::get_transactions))
        .route("/api/trend", get(handlers::get_trend))
        .route("/api/checkout", post(handlers::checkout))
        .route("/api/checkout/callback", post(handlers::checkout_callback))
        .route("/assets/*path", get(handlers::asset))
        .with_state(state)
}
