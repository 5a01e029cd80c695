//! Connection pool management for SQLite via r2d2.

use std::sync::atomic::{AtomicU64, Ordering};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use si_core::{Error, Result};

use crate::migrations;

/// Type alias for the database connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Type alias for a pooled database connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Initialize a database pool backed by a file on disk.
///
/// Creates the SQLite file if it does not exist, enables foreign keys and
/// WAL journal mode on every new connection, and runs pending migrations.
pub fn init_pool(db_path: &str, max_size: u32) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
    });
    build_migrated(manager, max_size)
}

/// Initialize an in-memory database pool of up to `max_size` connections.
///
/// Every call gets its own shared-cache database, so connections within one
/// pool see the same rows while separate pools (and parallel tests) do not.
pub fn init_memory_pool(max_size: u32) -> Result<DbPool> {
    static NEXT_DB: AtomicU64 = AtomicU64::new(0);
    let uri = format!(
        "file:sales_memdb_{}?mode=memory&cache=shared",
        NEXT_DB.fetch_add(1, Ordering::Relaxed)
    );
    let manager = SqliteConnectionManager::file(uri)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    build_migrated(manager, max_size)
}

fn build_migrated(manager: SqliteConnectionManager, max_size: u32) -> Result<DbPool> {
    let max_size = max_size.max(1);
    let pool = Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create connection pool: {e}")))?;

    let conn = get_conn(&pool)?;
    migrations::run_migrations(&conn)?;
    tracing::debug!(max_size, "SQLite pool ready");
    Ok(pool)
}

/// Check out a connection, mapping pool timeouts into [`Error::Database`].
pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::database(format!("Failed to get connection from pool: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_pool_honours_max_size() {
        assert_eq!(init_memory_pool(4).unwrap().max_size(), 4);
        assert_eq!(init_memory_pool(9).unwrap().max_size(), 9);
        assert_eq!(init_memory_pool(0).unwrap().max_size(), 1);
    }

    #[test]
    fn test_get_conn() {
        let pool = init_memory_pool(2).unwrap();
        let conn = get_conn(&pool).unwrap();

        let fk: i32 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn test_migrations_run_on_init() {
        let pool = init_memory_pool(2).unwrap();
        let conn = get_conn(&pool).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='sales'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_memory_pools_are_isolated() {
        let a = init_memory_pool(2).unwrap();
        let b = init_memory_pool(2).unwrap();

        get_conn(&a)
            .unwrap()
            .execute(
                "INSERT INTO sales (product_name, quantity, price_cents, sale_date, created_at, updated_at)
                 VALUES ('Mouse', 1, 1999, '2024-01-15', '2024-01-15T00:00:00', '2024-01-15T00:00:00')",
                [],
            )
            .unwrap();

        let count_b: i64 = get_conn(&b)
            .unwrap()
            .query_row("SELECT COUNT(*) FROM sales", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count_b, 0);
    }

    #[test]
    fn test_file_pool_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.db");
        let path_str = path.to_string_lossy();

        {
            let pool = init_pool(&path_str, 2).unwrap();
            assert_eq!(pool.max_size(), 2);
            get_conn(&pool)
                .unwrap()
                .execute(
                    "INSERT INTO sales (product_name, quantity, price_cents, sale_date, created_at, updated_at)
                     VALUES ('Keyboard', 2, 4999, '2024-02-01', '2024-02-01T00:00:00', '2024-02-01T00:00:00')",
                    [],
                )
                .unwrap();
        }

        let pool = init_pool(&path_str, 2).unwrap();
        let count: i64 = get_conn(&pool)
            .unwrap()
            .query_row("SELECT COUNT(*) FROM sales", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
