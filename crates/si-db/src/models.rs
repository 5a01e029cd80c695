//! Row mapping between SQLite columns and the si-core domain types.
//!
//! Each model implements [`FromRow`] for constructing itself from a
//! `rusqlite::Row`.

use chrono::{NaiveDate, NaiveDateTime, Timelike, Utc};
use rusqlite::types::Type;
use si_core::{cents_to_price, Sale, SaleId};

/// Storage format of `sale_date` columns.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Storage format of `created_at` / `updated_at` columns.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Construct a value from a row selected with the matching column list.
pub trait FromRow: Sized {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self>;
}

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

/// Current UTC time truncated to microseconds, matching PostgreSQL precision.
pub fn now() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    let micros = now.nanosecond() / 1_000 * 1_000;
    now.with_nanosecond(micros).unwrap_or(now)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_date(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = row.get(idx)?;
    NaiveDate::parse_from_str(&s, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let s: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

// ---------------------------------------------------------------------------
// Sale
// ---------------------------------------------------------------------------

/// Column list matching [`Sale::from_row`].
pub const SALE_COLUMNS: &str =
    "id, product_name, quantity, price_cents, sale_date, created_at, updated_at";

impl FromRow for Sale {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: SaleId::new(row.get(0)?),
            product_name: row.get(1)?,
            quantity: row.get(2)?,
            price: cents_to_price(row.get(3)?),
            sale_date: parse_date(row, 4)?,
            created_at: parse_timestamp(row, 5)?,
            updated_at: parse_timestamp(row, 6)?,
        })
    }
}
