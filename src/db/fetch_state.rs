//! Per-category fetch ledger
//!
//! One row per refresh category. The consecutive-failure counter resets
//! on success and increments on error; crossing the alert threshold is
//! surfaced as an error-level log line.

use crate::db::models::{FetchState, FetchStatus};
use crate::error::Result;
use rusqlite::{params, Connection};

/// Consecutive failures after which the ledger raises an alert
pub const FAILURE_ALERT_THRESHOLD: i64 = 5;

/// Record the terminal outcome of one refresh attempt.
///
/// Always stamps `last_attempt_ts`; stamps `last_success_ts` and resets
/// the counter on success; increments the counter and keeps the message
/// on error. Returns the counter value after the write.
pub fn record_attempt(
    conn: &Connection,
    category: &str,
    status: FetchStatus,
    error_message: Option<&str>,
    now_ts: i64,
) -> Result<i64> {
    let previous_failures: i64 = conn
        .query_row(
            "SELECT consecutive_failures FROM fetch_state WHERE category = ?1",
            params![category],
            |row| row.get(0),
        )
        .unwrap_or(0);

    let failures = match status {
        FetchStatus::Success => 0,
        FetchStatus::Error => previous_failures + 1,
        FetchStatus::InProgress => previous_failures,
    };

    let success_ts = if status == FetchStatus::Success {
        Some(now_ts)
    } else {
        None
    };

    conn.execute(
        "INSERT INTO fetch_state
             (category, last_success_ts, last_attempt_ts, last_status, last_error,
              consecutive_failures, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))
         ON CONFLICT(category) DO UPDATE SET
             last_success_ts = COALESCE(excluded.last_success_ts, fetch_state.last_success_ts),
             last_attempt_ts = excluded.last_attempt_ts,
             last_status = excluded.last_status,
             last_error = excluded.last_error,
             consecutive_failures = excluded.consecutive_failures,
             updated_at = datetime('now')",
        params![
            category,
            success_ts,
            now_ts,
            status.as_str(),
            error_message,
            failures,
        ],
    )?;

    if failures >= FAILURE_ALERT_THRESHOLD {
        tracing::error!(
            "Category '{}' has failed {} consecutive refreshes, last error: {}",
            category,
            failures,
            error_message.unwrap_or("unknown")
        );
    }

    Ok(failures)
}

/// Current ledger row for a category
pub fn get_state(conn: &Connection, category: &str) -> Result<Option<FetchState>> {
    let result = conn.query_row(
        "SELECT category, last_success_ts, last_attempt_ts, last_status, last_error,
                consecutive_failures, updated_at
         FROM fetch_state WHERE category = ?1",
        params![category],
        |row| {
            Ok(FetchState {
                category: row.get(0)?,
                last_success_ts: row.get(1)?,
                last_attempt_ts: row.get(2)?,
                last_status: row.get(3)?,
                last_error: row.get(4)?,
                consecutive_failures: row.get(5)?,
                updated_at: row.get(6)?,
            })
        },
    );

    match result {
        Ok(state) => Ok(Some(state)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
