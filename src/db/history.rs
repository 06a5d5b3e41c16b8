//! Append-only historical quote series
//!
//! Inserts are batched inside a transaction with a prepared statement;
//! large backfills are chunked so no single transaction grows unbounded.
//! There is deliberately no uniqueness constraint over (instrument, ts) -
//! overlapping sources append side by side and reads pick a winner.

use crate::db::models::HistoricalQuote;
use crate::error::Result;
use crate::providers::types::NormalizedQuote;
use rusqlite::{params, Connection};

/// Rows per insert transaction during bulk appends
pub const INSERT_BATCH_SIZE: usize = 500;

/// Append quotes as new historical rows (batch insert with transaction)
pub fn append_history(conn: &mut Connection, quotes: &[NormalizedQuote]) -> Result<usize> {
    let mut inserted = 0;

    for chunk in quotes.chunks(INSERT_BATCH_SIZE) {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO quote_history (instrument_id, ts, price, buy, sell, source, raw)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;

            for quote in chunk {
                stmt.execute(params![
                    quote.instrument_id,
                    quote.ts,
                    quote.price,
                    quote.buy,
                    quote.sell,
                    quote.source,
                    quote.raw,
                ])?;
            }
        }
        tx.commit()?;
        inserted += chunk.len();
    }

    tracing::debug!("Appended {} historical rows", inserted);
    Ok(inserted)
}

fn row_to_quote(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoricalQuote> {
    Ok(HistoricalQuote {
        id: row.get(0)?,
        instrument_id: row.get(1)?,
        ts: row.get(2)?,
        price: row.get(3)?,
        buy: row.get(4)?,
        sell: row.get(5)?,
        source: row.get(6)?,
        raw: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Read a historical range, oldest first. `limit` of None means unbounded.
pub fn get_history(
    conn: &Connection,
    instrument_id: &str,
    from: Option<i64>,
    to: Option<i64>,
    limit: Option<usize>,
) -> Result<Vec<HistoricalQuote>> {
    let from = from.unwrap_or(0);
    let to = to.unwrap_or(i64::MAX);
    // SQLite treats a negative LIMIT as "no limit"
    let limit = limit.map(|l| l as i64).unwrap_or(-1);

    let mut stmt = conn.prepare(
        "SELECT id, instrument_id, ts, price, buy, sell, source, raw, created_at
         FROM quote_history
         WHERE instrument_id = ?1 AND ts >= ?2 AND ts <= ?3
         ORDER BY ts ASC
         LIMIT ?4",
    )?;

    let quotes = stmt
        .query_map(params![instrument_id, from, to, limit], row_to_quote)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(quotes)
}

/// Earliest (oldest) row in a timestamp window, used as the day-ago
/// reference when upserting the latest snapshot
pub fn find_reference_in_window(
    conn: &Connection,
    instrument_id: &str,
    window_start: i64,
    window_end: i64,
) -> Result<Option<(i64, f64)>> {
    let result = conn.query_row(
        "SELECT ts, price FROM quote_history
         WHERE instrument_id = ?1 AND ts >= ?2 AND ts <= ?3
         ORDER BY ts ASC
         LIMIT 1",
        params![instrument_id, window_start, window_end],
        |row| Ok((row.get(0)?, row.get(1)?)),
    );

    match result {
        Ok(pair) => Ok(Some(pair)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Oldest stored timestamp for an instrument
pub fn oldest_ts(conn: &Connection, instrument_id: &str) -> Result<Option<i64>> {
    let ts: Option<i64> = conn.query_row(
        "SELECT MIN(ts) FROM quote_history WHERE instrument_id = ?1",
        params![instrument_id],
        |row| row.get(0),
    )?;
    Ok(ts)
}

/// Row count for an instrument
pub fn count_history(conn: &Connection, instrument_id: &str) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM quote_history WHERE instrument_id = ?1",
        params![instrument_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Corrective maintenance: purge every row a source wrote.
pub fn delete_by_source(conn: &Connection, source: &str) -> Result<usize> {
    let rows = conn.execute(
        "DELETE FROM quote_history WHERE source = ?1",
        params![source],
    )?;
    tracing::warn!("Purged {} historical rows from source '{}'", rows, source);
    Ok(rows)
}
