//! History Service
//!
//! Serves historical ranges for charting. The series is append-only and
//! may hold several rows per timestamp from different sources, so this
//! is where read-time deduplication happens: one point per time bucket,
//! measured sources outranking computed ones.

use crate::db::models::HistoricalQuote;
use crate::db::Db;
use crate::error::{AppError, Result};
use crate::providers::types::CALCULATED_SUFFIX;
use serde::Serialize;
use std::collections::BTreeMap;

/// Requested spans longer than this are bucketed to one point per day
const DAILY_BUCKET_SPAN_SECS: i64 = 90 * 24 * 3600;

const DAY_SECS: i64 = 24 * 3600;

/// One chart point
#[derive(Debug, Clone, Serialize)]
pub struct HistoryPoint {
    pub ts: i64,
    pub price: f64,
    pub buy: Option<f64>,
    pub sell: Option<f64>,
    pub source: String,
}

/// History service for business logic
pub struct HistoryService;

impl HistoryService {
    /// Historical range for one instrument, deduplicated and bucketed
    /// for charting. `limit` keeps the most recent points.
    pub fn get_history(
        db: &Db,
        instrument_id: &str,
        from: Option<i64>,
        to: Option<i64>,
        limit: Option<usize>,
    ) -> Result<Vec<HistoryPoint>> {
        if db.get_instrument(instrument_id)?.is_none() {
            return Err(AppError::NotFound(format!(
                "Instrument '{}' does not exist",
                instrument_id
            )));
        }

        let rows = db.get_history(instrument_id, from, to, None)?;
        let mut points = dedupe_and_bucket(rows);

        if let Some(limit) = limit {
            if points.len() > limit {
                points.drain(..points.len() - limit);
            }
        }

        Ok(points)
    }
}

/// Pick one winning row per bucket. Buckets collapse to day granularity
/// when the observed span is long enough that raw ticks would swamp a
/// chart; within a bucket the best-ranked source wins, ties going to the
/// most recent observation.
fn dedupe_and_bucket(rows: Vec<HistoricalQuote>) -> Vec<HistoryPoint> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let Some(last) = rows.last() else {
        return Vec::new();
    };

    let bucket_size = if last.ts - first.ts > DAILY_BUCKET_SPAN_SECS {
        DAY_SECS
    } else {
        1
    };

    let mut buckets: BTreeMap<i64, HistoricalQuote> = BTreeMap::new();
    for row in rows {
        let key = row.ts / bucket_size;
        let replace = match buckets.get(&key) {
            Some(current) => wins_over(&row, current),
            None => true,
        };
        if replace {
            buckets.insert(key, row);
        }
    }

    buckets
        .into_values()
        .map(|row| HistoryPoint {
            ts: row.ts,
            price: row.price,
            buy: row.buy,
            sell: row.sell,
            source: row.source,
        })
        .collect()
}

fn wins_over(candidate: &HistoricalQuote, current: &HistoricalQuote) -> bool {
    let candidate_rank = source_rank(&candidate.source);
    let current_rank = source_rank(&current.source);
    candidate_rank < current_rank
        || (candidate_rank == current_rank && candidate.ts >= current.ts)
}

/// Source-priority ordering: live feeds, then archives, then the
/// spread-less fallback, with computed rows always last.
fn source_rank(source: &str) -> u8 {
    if source.ends_with(CALCULATED_SUFFIX) {
        return 4;
    }
    match source {
        "harem" | "tcmb" => 0,
        "investing" => 1,
        "bigpara" => 2,
        _ => 3,
    }
}
