//! Instrument queries

use crate::db::models::Instrument;
use crate::error::Result;
use rusqlite::{params, Connection};

fn row_to_instrument(row: &rusqlite::Row<'_>) -> rusqlite::Result<Instrument> {
    Ok(Instrument {
        id: row.get(0)?,
        category: row.get(1)?,
        name: row.get(2)?,
        market_code: row.get(3)?,
        currency: row.get(4)?,
        unit: row.get(5)?,
        sort_order: row.get(6)?,
        active: row.get::<_, i32>(7)? == 1,
    })
}

const SELECT_COLUMNS: &str =
    "id, category, name, market_code, currency, unit, sort_order, active";

/// List active instruments, optionally restricted to one category
pub fn list_instruments(conn: &Connection, category: Option<&str>) -> Result<Vec<Instrument>> {
    let instruments = if let Some(cat) = category {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM instruments WHERE active = 1 AND category = ?1 ORDER BY sort_order",
            SELECT_COLUMNS
        ))?;
        let rows = stmt.query_map(params![cat], row_to_instrument)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()?
    } else {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM instruments WHERE active = 1 ORDER BY sort_order",
            SELECT_COLUMNS
        ))?;
        let rows = stmt.query_map([], row_to_instrument)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()?
    };

    Ok(instruments)
}

/// Look up one instrument by id (active or not)
pub fn get_instrument(conn: &Connection, id: &str) -> Result<Option<Instrument>> {
    let result = conn.query_row(
        &format!("SELECT {} FROM instruments WHERE id = ?1", SELECT_COLUMNS),
        params![id],
        row_to_instrument,
    );

    match result {
        Ok(instrument) => Ok(Some(instrument)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Soft-deactivate an instrument; history and snapshot rows stay in place
pub fn set_active(conn: &Connection, id: &str, active: bool) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE instruments SET active = ?2 WHERE id = ?1",
        params![id, active as i32],
    )?;
    Ok(rows > 0)
}
