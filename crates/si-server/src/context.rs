//! Application context shared by all route handlers via Axum state.

use std::sync::Arc;

use si_db::SaleStore;

/// Cheaply cloneable because it only holds an `Arc`.
#[derive(Clone)]
pub struct AppContext {
    /// Sale persistence, SQLite or PostgreSQL depending on `DATABASE_URL`.
    pub store: Arc<dyn SaleStore>,
}

impl AppContext {
    pub fn new(store: Arc<dyn SaleStore>) -> Self {
        Self { store }
    }
}
