//! SQLite database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Run all database migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    // Create migrations table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    // Run each migration
    run_migration(conn, "001_instruments", CREATE_INSTRUMENTS_TABLE)?;
    run_migration(conn, "002_quote_history", CREATE_QUOTE_HISTORY_TABLE)?;
    run_migration(conn, "003_quote_latest", CREATE_QUOTE_LATEST_TABLE)?;
    run_migration(conn, "004_fetch_state", CREATE_FETCH_STATE_TABLE)?;
    run_migration(conn, "005_seed_instruments", SEED_INSTRUMENTS)?;

    tracing::info!("Database migrations completed");
    Ok(())
}

fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
    // Check if migration already applied
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM migrations WHERE name = ?)",
        [name],
        |row| row.get(0),
    )?;

    if !exists {
        tracing::info!("Running migration: {}", name);
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO migrations (name) VALUES (?)", [name])?;
    }

    Ok(())
}

const CREATE_INSTRUMENTS_TABLE: &str = r#"
CREATE TABLE instruments (
    id TEXT PRIMARY KEY,
    category TEXT NOT NULL,
    name TEXT NOT NULL,
    market_code TEXT,
    currency TEXT NOT NULL,
    unit TEXT,
    sort_order INTEGER NOT NULL DEFAULT 0,
    active INTEGER NOT NULL DEFAULT 1
);
CREATE INDEX IF NOT EXISTS idx_instruments_category ON instruments(category);
"#;

const CREATE_QUOTE_HISTORY_TABLE: &str = r#"
CREATE TABLE quote_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    instrument_id TEXT NOT NULL REFERENCES instruments(id),
    ts INTEGER NOT NULL,
    price REAL NOT NULL,
    buy REAL,
    sell REAL,
    source TEXT NOT NULL,
    raw TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS idx_quote_history_instrument_ts ON quote_history(instrument_id, ts);
"#;

const CREATE_QUOTE_LATEST_TABLE: &str = r#"
CREATE TABLE quote_latest (
    instrument_id TEXT PRIMARY KEY REFERENCES instruments(id),
    ts INTEGER NOT NULL,
    price REAL NOT NULL,
    buy REAL,
    sell REAL,
    price_day_ago REAL,
    ts_day_ago INTEGER,
    source TEXT NOT NULL,
    raw TEXT,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

const CREATE_FETCH_STATE_TABLE: &str = r#"
CREATE TABLE fetch_state (
    category TEXT PRIMARY KEY,
    last_success_ts INTEGER,
    last_attempt_ts INTEGER,
    last_status TEXT,
    last_error TEXT,
    consecutive_failures INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

const SEED_INSTRUMENTS: &str = r#"
INSERT OR IGNORE INTO instruments (id, category, name, market_code, currency, unit, sort_order) VALUES
    ('gram',   'metals', 'Gram Altın',    'gram-altin',   'TRY', 'g',  1),
    ('ayar14', 'metals', '14 Ayar Altın', NULL,           'TRY', 'g',  2),
    ('ceyrek', 'metals', 'Çeyrek Altın',  'ceyrek-altin', 'TRY', NULL, 3),
    ('ons',    'metals', 'Ons Altın',     '8830',         'USD', 'oz', 4),
    ('USDTRY', 'fx', 'Amerikan Doları', 'USD', 'TRY', NULL, 10),
    ('EURTRY', 'fx', 'Euro',            'EUR', 'TRY', NULL, 11),
    ('GBPTRY', 'fx', 'İngiliz Sterlini','GBP', 'TRY', NULL, 12),
    ('EURUSD', 'fx', 'Euro / Dolar',    NULL,  'USD', NULL, 13);
"#;
