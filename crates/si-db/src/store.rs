//! Backend-agnostic sale storage.
//!
//! [`SaleStore`] is what the HTTP layer talks to. [`SqliteStore`] wraps the
//! synchronous rusqlite queries in `spawn_blocking`; the PostgreSQL side lives
//! in [`crate::postgres`].

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use si_core::config::DatabaseConfig;
use si_core::{Error, NewSale, ProductSummary, Result, Sale, SaleChanges, SaleFilter, SaleId};

use crate::pool::{self, DbPool};
use crate::postgres::PgStore;
use crate::queries;
use crate::url::DatabaseUrl;

/// Persistence operations for sales.
#[async_trait]
pub trait SaleStore: Send + Sync {
    /// Short backend name, e.g. `"sqlite"`.
    fn backend(&self) -> &'static str;

    /// Check that the database answers a trivial query.
    async fn ping(&self) -> Result<()>;

    async fn create_sale(&self, new: NewSale) -> Result<Sale>;

    async fn list_sales(&self, filter: SaleFilter) -> Result<Vec<Sale>>;

    async fn get_sale(&self, id: SaleId) -> Result<Option<Sale>>;

    /// Returns `None` when no sale has this id.
    async fn update_sale(&self, id: SaleId, changes: SaleChanges) -> Result<Option<Sale>>;

    /// Returns `false` when no sale has this id.
    async fn delete_sale(&self, id: SaleId) -> Result<bool>;

    async fn total_revenue(&self, filter: SaleFilter) -> Result<Decimal>;

    async fn total_items_sold(&self, filter: SaleFilter) -> Result<i64>;

    async fn top_products(&self, filter: SaleFilter, limit: u32) -> Result<Vec<ProductSummary>>;
}

/// Open the store selected by `url`, creating and migrating the schema.
pub async fn connect(url: &DatabaseUrl, config: &DatabaseConfig) -> Result<Arc<dyn SaleStore>> {
    tracing::info!(database = %url, "Connecting to database");
    let store: Arc<dyn SaleStore> = match url {
        DatabaseUrl::Sqlite(path) => Arc::new(SqliteStore::open(path, config.max_connections)?),
        DatabaseUrl::SqliteMemory => Arc::new(SqliteStore::open_in_memory(config.max_connections)?),
        DatabaseUrl::Postgres(conn_str) => {
            let store = PgStore::connect(conn_str, config.max_connections).await?;
            store.migrate().await?;
            Arc::new(store)
        }
    };
    Ok(store)
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

/// SQLite-backed store over an r2d2 pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Open (or create) the database file at `path` and run migrations.
    pub fn open(path: &Path, max_connections: u32) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let pool = pool::init_pool(&path.to_string_lossy(), max_connections)?;
        Ok(Self { pool })
    }

    /// Fresh, isolated in-memory database with up to `max_connections`.
    pub fn open_in_memory(max_connections: u32) -> Result<Self> {
        Ok(Self {
            pool: pool::init_memory_pool(max_connections)?,
        })
    }

    /// In-memory database sized like the default configuration.
    pub fn in_memory() -> Result<Self> {
        Self::open_in_memory(DatabaseConfig::default().max_connections)
    }

    /// Run `f` with a pooled connection on the blocking thread pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool::get_conn(&pool)?;
            f(&*conn)
        })
        .await
        .map_err(|e| Error::Internal(format!("spawn_blocking join error: {e}")))?
    }
}

#[async_trait]
impl SaleStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn ping(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(|e| Error::database(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn create_sale(&self, new: NewSale) -> Result<Sale> {
        self.with_conn(move |conn| queries::sales::create_sale(conn, &new))
            .await
    }

    async fn list_sales(&self, filter: SaleFilter) -> Result<Vec<Sale>> {
        self.with_conn(move |conn| queries::sales::list_sales(conn, &filter))
            .await
    }

    async fn get_sale(&self, id: SaleId) -> Result<Option<Sale>> {
        self.with_conn(move |conn| queries::sales::get_sale(conn, id))
            .await
    }

    async fn update_sale(&self, id: SaleId, changes: SaleChanges) -> Result<Option<Sale>> {
        self.with_conn(move |conn| queries::sales::update_sale(conn, id, &changes))
            .await
    }

    async fn delete_sale(&self, id: SaleId) -> Result<bool> {
        self.with_conn(move |conn| queries::sales::delete_sale(conn, id))
            .await
    }

    async fn total_revenue(&self, filter: SaleFilter) -> Result<Decimal> {
        self.with_conn(move |conn| queries::sales::total_revenue(conn, &filter))
            .await
    }

    async fn total_items_sold(&self, filter: SaleFilter) -> Result<i64> {
        self.with_conn(move |conn| queries::sales::total_items_sold(conn, &filter))
            .await
    }

    async fn top_products(&self, filter: SaleFilter, limit: u32) -> Result<Vec<ProductSummary>> {
        self.with_conn(move |conn| queries::sales::top_products(conn, &filter, limit))
            .await
    }
}
