use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub reference: String,
    pub recorded_at: String,
}

impl Transaction {
    /// Calendar-day bucket, the date prefix of the RFC 3339 timestamp.
    pub fn day(&self) -> &str {
        self.recorded_at.get(..10).unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LedgerData {
    pub transactions: Vec<Transaction>,
}

impl LedgerData {
    pub fn balance_cents(&self) -> i64 {
        self.transactions
            .iter()
            .fold(0i64, |sum, tx| sum.saturating_add(tx.amount_cents))
    }
}

#[derive(Debug, Clone)]
pub struct PendingCheckout {
    pub amount_cents: i64,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub amount_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct CheckoutSessionResponse {
    pub checkout_id: String,
    pub widget_url: String,
    pub amount_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutCallbackRequest {
    pub checkout_id: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WalletSummaryResponse {
    pub balance_cents: i64,
    pub currency: String,
    pub transaction_count: usize,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Serialize)]
pub struct TrendPoint {
    pub date: String,
    pub credited_cents: i64,
    pub balance_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct TrendResponse {
    pub start_date: String,
    pub end_date: String,
    pub opening_balance_cents: i64,
    pub points: Vec<TrendPoint>,
}
