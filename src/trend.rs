use crate::models::{LedgerData, TrendPoint, TrendResponse};
use chrono::{Duration, Local, NaiveDate};
use std::collections::BTreeMap;

const TREND_DAYS: i64 = 7;

pub fn build_trend(data: &LedgerData) -> TrendResponse {
    build_trend_at(Local::now().date_naive(), data)
}

pub fn build_trend_at(today: NaiveDate, data: &LedgerData) -> TrendResponse {
    let start = today - Duration::days(TREND_DAYS - 1);
    let start_key = date_key(start);
    let end_key = date_key(today);

    // Bucket credits by calendar day; everything before the window folds
    // into the opening balance. Day keys are ISO dates, so string order is
    // date order. Malformed or future-dated entries are skipped.
    let mut credited_by_day: BTreeMap<String, i64> = BTreeMap::new();
    let mut opening = 0i64;
    for tx in &data.transactions {
        let day = tx.day();
        if day.is_empty() || day > end_key.as_str() {
            continue;
        }
        if day < start_key.as_str() {
            opening = opening.saturating_add(tx.amount_cents);
        } else {
            let entry = credited_by_day.entry(day.to_string()).or_default();
            *entry = entry.saturating_add(tx.amount_cents);
        }
    }

    let mut balance = opening;
    let mut points = Vec::with_capacity(TREND_DAYS as usize);
    for offset in (0..TREND_DAYS).rev() {
        let date = today - Duration::days(offset);
        let key = date_key(date);
        let credited = credited_by_day.get(&key).copied().unwrap_or(0);
        balance = balance.saturating_add(credited);
        points.push(TrendPoint {
            date: key,
            credited_cents: credited,
            balance_cents: balance,
        });
    }

    TrendResponse {
        start_date: start_key,
        end_date: end_key,
        opening_balance_cents: opening,
        points,
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
