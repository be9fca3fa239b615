use crate::errors::AppError;
use crate::models::{
    CheckoutCallbackRequest, CheckoutRequest, CheckoutSessionResponse, LedgerData, PendingCheckout,
    Transaction, TransactionsResponse, TrendResponse, WalletSummaryResponse,
};
use crate::offline::{AssetRequest, StoredResponse};
use crate::state::AppState;
use crate::storage::persist_data;
use crate::trend::build_trend;
use crate::ui::render_index;
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, Response},
};
use chrono::Local;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

pub const CURRENCY: &str = "USD";

// Cap per simulated deposit; the fake provider has no limits of its own.
const MAX_DEPOSIT_CENTS: i64 = 1_000_000_00;

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let data = state.data.lock().await;
    Html(render_index(
        data.balance_cents(),
        CURRENCY,
        data.transactions.len(),
    ))
}

pub async fn get_wallet(
    State(state): State<AppState>,
) -> Result<Json<WalletSummaryResponse>, AppError> {
    let data = state.data.lock().await;
    Ok(Json(summary(&data)))
}

pub async fn get_transactions(
    State(state): State<AppState>,
) -> Result<Json<TransactionsResponse>, AppError> {
    let data = state.data.lock().await;
    let mut transactions = data.transactions.clone();
    transactions.reverse();
    Ok(Json(TransactionsResponse { transactions }))
}

pub async fn get_trend(State(state): State<AppState>) -> Result<Json<TrendResponse>, AppError> {
    let data = state.data.lock().await;
    Ok(Json(build_trend(&data)))
}

pub async fn checkout(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutSessionResponse>, AppError> {
    if payload.amount_cents <= 0 {
        return Err(AppError::bad_request("amount_cents must be positive"));
    }
    if payload.amount_cents > MAX_DEPOSIT_CENTS {
        return Err(AppError::bad_request("amount_cents exceeds the deposit cap"));
    }

    let checkout_id = mint_id("co");
    state.checkouts.lock().await.insert(
        checkout_id.clone(),
        PendingCheckout {
            amount_cents: payload.amount_cents,
            created_at: now_string(),
        },
    );

    Ok(Json(CheckoutSessionResponse {
        widget_url: format!("https://widget.paylane.example/session/{checkout_id}"),
        checkout_id,
        amount_cents: payload.amount_cents,
    }))
}

pub async fn checkout_callback(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutCallbackRequest>,
) -> Result<Json<WalletSummaryResponse>, AppError> {
    match payload.status.as_str() {
        "succeeded" => {
            let pending = state
                .checkouts
                .lock()
                .await
                .remove(&payload.checkout_id)
                .ok_or_else(|| AppError::not_found("unknown checkout session"))?;

            let mut data = state.data.lock().await;
            data.transactions.push(Transaction {
                id: mint_id("txn"),
                amount_cents: pending.amount_cents,
                currency: CURRENCY.to_string(),
                reference: payload.checkout_id.clone(),
                recorded_at: now_string(),
            });
            persist_data(&state.data_path, &data).await?;
            info!(
                checkout = %payload.checkout_id,
                amount_cents = pending.amount_cents,
                "deposit recorded"
            );
            Ok(Json(summary(&data)))
        }
        "cancelled" => {
            state
                .checkouts
                .lock()
                .await
                .remove(&payload.checkout_id)
                .ok_or_else(|| AppError::not_found("unknown checkout session"))?;
            let data = state.data.lock().await;
            Ok(Json(summary(&data)))
        }
        _ => Err(AppError::bad_request(
            "status must be 'succeeded' or 'cancelled'",
        )),
    }
}

pub async fn asset(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let url = format!("/assets/{path}");
    let request = if wants_html(&headers) {
        AssetRequest::navigate(url)
    } else {
        AssetRequest::get(url)
    };

    let stored = state.assets.handle(&request).await?;
    into_http(stored)
}

fn into_http(stored: StoredResponse) -> Result<Response, AppError> {
    let status = StatusCode::from_u16(stored.status).unwrap_or(StatusCode::OK);
    let mut builder = axum::http::Response::builder().status(status);
    for (name, value) in &stored.headers {
        builder = builder.header(name, value);
    }
    builder
        .body(Body::from(stored.body))
        .map_err(AppError::internal)
}

fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

fn summary(data: &LedgerData) -> WalletSummaryResponse {
    WalletSummaryResponse {
        balance_cents: data.balance_cents(),
        currency: CURRENCY.to_string(),
        transaction_count: data.transactions.len(),
    }
}

fn now_string() -> String {
    Local::now().to_rfc3339()
}

// Timestamp alone can collide under concurrency; the counter breaks ties.
static MINT_SEQ: AtomicU64 = AtomicU64::new(0);

fn mint_id(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    let seq = MINT_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{nanos:x}-{seq:x}")
}
