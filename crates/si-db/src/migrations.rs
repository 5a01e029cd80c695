//! Embedded SQL migrations and runner.
//!
//! Migrations are stored as `&str` constants and executed in order.  A
//! `schema_migrations` table tracks which versions have been applied.

use rusqlite::Connection;
use si_core::{Error, Result};

/// V1: the sales table, its check constraints, and lookup indexes.
///
/// Prices are stored as integer cents; dates as `YYYY-MM-DD` text so that
/// range comparisons sort correctly.
const V1_SALES: &str = r#"
CREATE TABLE sales (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    product_name TEXT    NOT NULL,
    quantity     INTEGER NOT NULL CONSTRAINT check_quantity_positive CHECK (quantity > 0),
    price_cents  INTEGER NOT NULL CONSTRAINT check_price_non_negative CHECK (price_cents >= 0),
    sale_date    TEXT    NOT NULL,
    created_at   TEXT    NOT NULL,
    updated_at   TEXT    NOT NULL
);

CREATE INDEX idx_sales_product_name  ON sales(product_name);
CREATE INDEX idx_sales_sale_date     ON sales(sale_date);
CREATE INDEX idx_sale_date_product   ON sales(sale_date, product_name);
"#;

/// Ordered list of (version, sql) pairs.
const MIGRATIONS: &[(i64, &str)] = &[(1, V1_SALES)];

/// Run all pending migrations on `conn`.
///
/// Creates the `schema_migrations` tracking table if it does not exist,
/// then applies each outstanding migration inside a transaction. Returns
/// the number of migrations applied.
pub fn run_migrations(conn: &Connection) -> Result<usize> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .map_err(|e| Error::database(format!("Failed to create schema_migrations: {e}")))?;

    let mut applied = 0;
    for &(version, sql) in MIGRATIONS {
        let already: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
                [version],
                |row| row.get(0),
            )
            .map_err(|e| Error::database(e.to_string()))?;

        if already {
            continue;
        }

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        tx.execute_batch(sql)
            .map_err(|e| Error::database(format!("Migration V{version} failed: {e}")))?;

        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [version],
        )
        .map_err(|e| Error::database(e.to_string()))?;

        tx.commit().map_err(|e| Error::database(e.to_string()))?;

        tracing::info!("Applied migration V{version}");
        applied += 1;
    }

    Ok(applied)
}

/// Highest migration version known to this build.
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|&(v, _)| v).unwrap_or(0)
}
