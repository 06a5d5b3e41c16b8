//! Persistence row types

use serde::{Deserialize, Serialize};

/// One tradable quote series (a metal product or a currency pair).
///
/// Created by seeding migrations, soft-deactivated via `active`, never
/// hard-deleted in normal operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub id: String,
    pub category: String,
    pub name: String,
    pub market_code: Option<String>,
    pub currency: String,
    pub unit: Option<String>,
    pub sort_order: i32,
    pub active: bool,
}

/// Append-only historical quote row. Multiple rows may exist per
/// (instrument, ts) pair from different sources; deduplication is a
/// read-time concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalQuote {
    pub id: i64,
    pub instrument_id: String,
    pub ts: i64,
    pub price: f64,
    pub buy: Option<f64>,
    pub sell: Option<f64>,
    pub source: String,
    pub raw: Option<String>,
    pub created_at: String,
}

/// Single most-recent quote per instrument, overwritten in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestSnapshot {
    pub instrument_id: String,
    pub ts: i64,
    pub price: f64,
    pub buy: Option<f64>,
    pub sell: Option<f64>,
    /// Reference price from roughly 24 hours earlier, resolved from the
    /// historical series at write time
    pub price_day_ago: Option<f64>,
    pub ts_day_ago: Option<i64>,
    pub source: String,
    pub raw: Option<String>,
    pub updated_at: String,
}

/// Terminal status of a refresh attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Success,
    Error,
    InProgress,
}

impl FetchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStatus::Success => "success",
            FetchStatus::Error => "error",
            FetchStatus::InProgress => "in_progress",
        }
    }
}

/// Per-category fetch ledger row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchState {
    pub category: String,
    pub last_success_ts: Option<i64>,
    pub last_attempt_ts: Option<i64>,
    pub last_status: Option<String>,
    pub last_error: Option<String>,
    pub consecutive_failures: i64,
    pub updated_at: String,
}
