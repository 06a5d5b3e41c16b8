//! Latest-snapshot upsert and reads
//!
//! One row per instrument, overwritten in place. Last-write-wins follows
//! call order, not the quote's own timestamp, so only live-refresh paths
//! may write here (backfill never does).

use crate::db::models::LatestSnapshot;
use crate::error::Result;
use crate::providers::types::NormalizedQuote;
use rusqlite::{params, Connection};

/// Insert-or-update the snapshot row for one instrument, with the
/// resolved day-ago reference (None when no historical row fell in the
/// lookup window)
pub fn upsert_latest(
    conn: &Connection,
    quote: &NormalizedQuote,
    day_ago: Option<(i64, f64)>,
) -> Result<()> {
    let (ts_day_ago, price_day_ago) = match day_ago {
        Some((ts, price)) => (Some(ts), Some(price)),
        None => (None, None),
    };

    conn.execute(
        "INSERT INTO quote_latest
             (instrument_id, ts, price, buy, sell, price_day_ago, ts_day_ago, source, raw, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, datetime('now'))
         ON CONFLICT(instrument_id) DO UPDATE SET
             ts = excluded.ts,
             price = excluded.price,
             buy = excluded.buy,
             sell = excluded.sell,
             price_day_ago = excluded.price_day_ago,
             ts_day_ago = excluded.ts_day_ago,
             source = excluded.source,
             raw = excluded.raw,
             updated_at = datetime('now')",
        params![
            quote.instrument_id,
            quote.ts,
            quote.price,
            quote.buy,
            quote.sell,
            price_day_ago,
            ts_day_ago,
            quote.source,
            quote.raw,
        ],
    )?;

    Ok(())
}

fn row_to_snapshot(row: &rusqlite::Row<'_>) -> rusqlite::Result<LatestSnapshot> {
    Ok(LatestSnapshot {
        instrument_id: row.get(0)?,
        ts: row.get(1)?,
        price: row.get(2)?,
        buy: row.get(3)?,
        sell: row.get(4)?,
        price_day_ago: row.get(5)?,
        ts_day_ago: row.get(6)?,
        source: row.get(7)?,
        raw: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

const SELECT_COLUMNS: &str =
    "l.instrument_id, l.ts, l.price, l.buy, l.sell, l.price_day_ago, l.ts_day_ago, l.source, l.raw, l.updated_at";

/// Snapshot rows for every active instrument in a category, in display order
pub fn get_latest_for_category(conn: &Connection, category: &str) -> Result<Vec<LatestSnapshot>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM quote_latest l
         INNER JOIN instruments i ON i.id = l.instrument_id
         WHERE i.category = ?1 AND i.active = 1
         ORDER BY i.sort_order",
        SELECT_COLUMNS
    ))?;

    let snapshots = stmt
        .query_map(params![category], row_to_snapshot)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(snapshots)
}

/// Snapshot row for one instrument
pub fn get_latest(conn: &Connection, instrument_id: &str) -> Result<Option<LatestSnapshot>> {
    let result = conn.query_row(
        &format!(
            "SELECT {} FROM quote_latest l WHERE l.instrument_id = ?1",
            SELECT_COLUMNS
        ),
        params![instrument_id],
        row_to_snapshot,
    );

    match result {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
