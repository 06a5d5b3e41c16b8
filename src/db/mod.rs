//! SQLite database module

pub mod models;
mod fetch_state;
mod history;
mod instrument;
mod latest;
mod migrations;

use crate::error::Result;
use crate::providers::types::{Category, NormalizedQuote};
use models::{FetchState, FetchStatus, HistoricalQuote, Instrument, LatestSnapshot};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

pub use fetch_state::FAILURE_ALERT_THRESHOLD;
pub use history::INSERT_BATCH_SIZE;

/// Center of the day-ago reference lookup, seconds before "now"
const DAY_AGO_SECS: i64 = 24 * 3600;
/// Half-width of the lookup window around that center
const DAY_AGO_WINDOW_SECS: i64 = 12 * 3600;
/// Slack allowed when judging whether stored history reaches a lookback target
const BACKFILL_TOLERANCE_SECS: i64 = 30 * 24 * 3600;

/// SQLite database wrapper
///
/// A single connection behind a mutex: the cooldown gate plus
/// single-process cooperative scheduling already serialize writers per
/// category, so no pool is needed.
pub struct Db {
    conn: Mutex<Connection>,
}

impl Db {
    /// Open (or create) the database file and bring the schema up to date
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// In-memory database, used by tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock();
        migrations::run_migrations(&conn)
    }

    // ========== Instruments ==========

    /// List active instruments, optionally for one category
    pub fn list_instruments(&self, category: Option<Category>) -> Result<Vec<Instrument>> {
        let conn = self.conn.lock();
        instrument::list_instruments(&conn, category.map(|c| c.as_str()))
    }

    /// Look up one instrument by id
    pub fn get_instrument(&self, id: &str) -> Result<Option<Instrument>> {
        let conn = self.conn.lock();
        instrument::get_instrument(&conn, id)
    }

    /// Soft-deactivate / reactivate an instrument
    pub fn set_instrument_active(&self, id: &str, active: bool) -> Result<bool> {
        let conn = self.conn.lock();
        instrument::set_active(&conn, id, active)
    }

    // ========== Historical series ==========

    /// Append quotes to the historical series (batched, never rejects on
    /// duplicates)
    pub fn append_history(&self, quotes: &[NormalizedQuote]) -> Result<usize> {
        let mut conn = self.conn.lock();
        history::append_history(&mut conn, quotes)
    }

    /// Read a historical range for one instrument, oldest first
    pub fn get_history(
        &self,
        instrument_id: &str,
        from: Option<i64>,
        to: Option<i64>,
        limit: Option<usize>,
    ) -> Result<Vec<HistoricalQuote>> {
        let conn = self.conn.lock();
        history::get_history(&conn, instrument_id, from, to, limit)
    }

    /// Oldest stored timestamp for an instrument
    pub fn oldest_history_ts(&self, instrument_id: &str) -> Result<Option<i64>> {
        let conn = self.conn.lock();
        history::oldest_ts(&conn, instrument_id)
    }

    /// Historical row count for an instrument
    pub fn count_history(&self, instrument_id: &str) -> Result<i64> {
        let conn = self.conn.lock();
        history::count_history(&conn, instrument_id)
    }

    /// Corrective maintenance: purge all rows a source wrote
    pub fn purge_history_source(&self, source: &str) -> Result<usize> {
        let conn = self.conn.lock();
        history::delete_by_source(&conn, source)
    }

    /// Whether the oldest stored row for `instrument_id` reaches back at
    /// least `target_years` from `now_ts`, within a 30-day tolerance.
    /// Makes backfill idempotent/skippable.
    pub fn has_sufficient_history(
        &self,
        instrument_id: &str,
        target_years: i64,
        now_ts: i64,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        let oldest = history::oldest_ts(&conn, instrument_id)?;
        let cutoff = now_ts - target_years * 365 * 24 * 3600 + BACKFILL_TOLERANCE_SECS;
        Ok(matches!(oldest, Some(ts) if ts <= cutoff))
    }

    // ========== Latest snapshot ==========

    /// Upsert the latest snapshot for each quote, resolving the day-ago
    /// reference from the historical series at write time.
    ///
    /// Last-write-wins follows call order, not quote timestamps: callers
    /// must not pass out-of-order timestamps for one instrument, and
    /// backfill paths must never call this.
    pub fn upsert_latest(&self, quotes: &[NormalizedQuote], now_ts: i64) -> Result<()> {
        let conn = self.conn.lock();
        let window_start = now_ts - DAY_AGO_SECS - DAY_AGO_WINDOW_SECS;
        let window_end = now_ts - DAY_AGO_SECS + DAY_AGO_WINDOW_SECS;

        for quote in quotes {
            let day_ago = history::find_reference_in_window(
                &conn,
                &quote.instrument_id,
                window_start,
                window_end,
            )?;
            latest::upsert_latest(&conn, quote, day_ago)?;
        }

        Ok(())
    }

    /// Snapshot rows for a category, in display order
    pub fn get_latest_for_category(&self, category: Category) -> Result<Vec<LatestSnapshot>> {
        let conn = self.conn.lock();
        latest::get_latest_for_category(&conn, category.as_str())
    }

    /// Snapshot row for one instrument
    pub fn get_latest(&self, instrument_id: &str) -> Result<Option<LatestSnapshot>> {
        let conn = self.conn.lock();
        latest::get_latest(&conn, instrument_id)
    }

    // ========== Fetch ledger ==========

    /// Record the terminal outcome of one refresh attempt; returns the
    /// consecutive-failure count after the write
    pub fn record_fetch_attempt(
        &self,
        category: Category,
        status: FetchStatus,
        error_message: Option<&str>,
        now_ts: i64,
    ) -> Result<i64> {
        let conn = self.conn.lock();
        fetch_state::record_attempt(&conn, category.as_str(), status, error_message, now_ts)
    }

    /// Current ledger row for a category
    pub fn get_fetch_state(&self, category: Category) -> Result<Option<FetchState>> {
        let conn = self.conn.lock();
        fetch_state::get_state(&conn, category.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(instrument: &str, ts: i64, price: f64) -> NormalizedQuote {
        NormalizedQuote::price_only(instrument, ts, price, "test")
    }

    #[test]
    fn migrations_seed_instruments() {
        let db = Db::open_in_memory().unwrap();
        let metals = db.list_instruments(Some(Category::Metals)).unwrap();
        assert!(metals.iter().any(|i| i.id == "gram"));
        assert!(metals.iter().any(|i| i.id == "ayar14"));
        let fx = db.list_instruments(Some(Category::Fx)).unwrap();
        assert!(fx.iter().any(|i| i.id == "USDTRY"));
        // display order follows sort_order
        assert_eq!(metals[0].id, "gram");
    }

    #[test]
    fn history_append_allows_duplicates() {
        let db = Db::open_in_memory().unwrap();
        let q = quote("gram", 1_700_000_000, 2550.0);
        db.append_history(&[q.clone()]).unwrap();
        db.append_history(&[q]).unwrap();
        assert_eq!(db.count_history("gram").unwrap(), 2);
    }

    #[test]
    fn history_range_and_limit() {
        let db = Db::open_in_memory().unwrap();
        let quotes: Vec<NormalizedQuote> = (0..10)
            .map(|i| quote("gram", 1_700_000_000 + i * 60, 2500.0 + i as f64))
            .collect();
        db.append_history(&quotes).unwrap();

        let all = db.get_history("gram", None, None, None).unwrap();
        assert_eq!(all.len(), 10);
        assert!(all.windows(2).all(|w| w[0].ts <= w[1].ts));

        let bounded = db
            .get_history("gram", Some(1_700_000_120), Some(1_700_000_300), None)
            .unwrap();
        assert_eq!(bounded.len(), 4);

        let limited = db.get_history("gram", None, None, Some(3)).unwrap();
        assert_eq!(limited.len(), 3);
    }

    #[test]
    fn upsert_latest_is_idempotent() {
        let db = Db::open_in_memory().unwrap();
        let now = 1_700_000_000;
        let q = NormalizedQuote::with_sides("gram", now, 2550.0, 2555.0, "harem");

        db.upsert_latest(&[q.clone()], now).unwrap();
        db.upsert_latest(&[q], now).unwrap();

        let snapshot = db.get_latest("gram").unwrap().unwrap();
        assert_eq!(snapshot.price, 2552.5);
        // still a single row for the category member
        let all = db.get_latest_for_category(Category::Metals).unwrap();
        assert_eq!(all.iter().filter(|s| s.instrument_id == "gram").count(), 1);
    }

    #[test]
    fn upsert_latest_resolves_day_ago_reference() {
        let db = Db::open_in_memory().unwrap();
        let now = 1_700_100_000;

        // Two historical rows inside the window; the earliest must win
        let early = quote("gram", now - 30 * 3600, 2400.0);
        let late = quote("gram", now - 20 * 3600, 2450.0);
        db.append_history(&[late, early]).unwrap();

        db.upsert_latest(&[quote("gram", now, 2500.0)], now).unwrap();
        let snapshot = db.get_latest("gram").unwrap().unwrap();
        assert_eq!(snapshot.price_day_ago, Some(2400.0));
        assert_eq!(snapshot.ts_day_ago, Some(now - 30 * 3600));
    }

    #[test]
    fn upsert_latest_without_history_leaves_reference_null() {
        let db = Db::open_in_memory().unwrap();
        let now = 1_700_000_000;
        db.upsert_latest(&[quote("gram", now, 2500.0)], now).unwrap();
        let snapshot = db.get_latest("gram").unwrap().unwrap();
        assert!(snapshot.price_day_ago.is_none());
        assert!(snapshot.ts_day_ago.is_none());
    }

    #[test]
    fn day_ago_rows_outside_window_ignored() {
        let db = Db::open_in_memory().unwrap();
        let now = 1_700_100_000;
        // 40h old: outside [now-36h, now-12h]
        db.append_history(&[quote("gram", now - 40 * 3600, 2300.0)])
            .unwrap();
        db.upsert_latest(&[quote("gram", now, 2500.0)], now).unwrap();
        let snapshot = db.get_latest("gram").unwrap().unwrap();
        assert!(snapshot.price_day_ago.is_none());
    }

    #[test]
    fn fetch_counter_rules() {
        let db = Db::open_in_memory().unwrap();
        let now = 1_700_000_000;

        let f = db
            .record_fetch_attempt(Category::Fx, FetchStatus::Error, Some("timeout"), now)
            .unwrap();
        assert_eq!(f, 1);
        let f = db
            .record_fetch_attempt(Category::Fx, FetchStatus::Error, Some("timeout"), now + 10)
            .unwrap();
        assert_eq!(f, 2);
        let f = db
            .record_fetch_attempt(Category::Fx, FetchStatus::Success, None, now + 20)
            .unwrap();
        assert_eq!(f, 0);

        let state = db.get_fetch_state(Category::Fx).unwrap().unwrap();
        assert_eq!(state.last_success_ts, Some(now + 20));
        assert_eq!(state.last_attempt_ts, Some(now + 20));
        assert_eq!(state.last_status.as_deref(), Some("success"));
    }

    #[test]
    fn fetch_error_preserves_last_success() {
        let db = Db::open_in_memory().unwrap();
        let now = 1_700_000_000;
        db.record_fetch_attempt(Category::Metals, FetchStatus::Success, None, now)
            .unwrap();
        db.record_fetch_attempt(Category::Metals, FetchStatus::Error, Some("boom"), now + 60)
            .unwrap();

        let state = db.get_fetch_state(Category::Metals).unwrap().unwrap();
        assert_eq!(state.last_success_ts, Some(now));
        assert_eq!(state.last_attempt_ts, Some(now + 60));
        assert_eq!(state.last_error.as_deref(), Some("boom"));
    }

    #[test]
    fn on_disk_database_reopens_with_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sarraf.db");

        {
            let db = Db::new(&path).unwrap();
            db.append_history(&[quote("gram", 1_700_000_000, 2550.0)])
                .unwrap();
        }

        // migrations are idempotent and the data survives a reopen
        let db = Db::new(&path).unwrap();
        assert_eq!(db.count_history("gram").unwrap(), 1);
    }

    #[test]
    fn sufficient_history_tolerance() {
        let db = Db::open_in_memory().unwrap();
        let now = 1_700_000_000;
        let five_years = 5 * 365 * 24 * 3600;

        assert!(!db.has_sufficient_history("gram", 5, now).unwrap());

        // 20 days short of five years: inside the 30-day tolerance
        db.append_history(&[quote("gram", now - five_years + 20 * 24 * 3600, 1000.0)])
            .unwrap();
        assert!(db.has_sufficient_history("gram", 5, now).unwrap());

        // but 40 days short would not be
        let db2 = Db::open_in_memory().unwrap();
        db2.append_history(&[quote("gram", now - five_years + 40 * 24 * 3600, 1000.0)])
            .unwrap();
        assert!(!db2.has_sufficient_history("gram", 5, now).unwrap());
    }
}
