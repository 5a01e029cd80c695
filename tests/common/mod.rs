//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an isolated in-memory SQLite store
//! and the [`AppContext`] around it. The [`with_server`] constructor
//! starts Axum on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use si_core::{NewSale, Sale};
use si_db::{SaleStore, SqliteStore};
use si_server::context::AppContext;
use si_server::router::build_router;

/// Test harness wrapping a fully-constructed [`AppContext`] backed by an
/// in-memory database.
pub struct TestHarness {
    pub ctx: AppContext,
    pub store: Arc<dyn SaleStore>,
}

impl TestHarness {
    /// Create a new harness over a fresh in-memory DB.
    pub fn new() -> Self {
        let store: Arc<dyn SaleStore> =
            Arc::new(SqliteStore::in_memory().expect("failed to create in-memory store"));
        let ctx = AppContext::new(store.clone());
        Self { ctx, store }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        let harness = Self::new();
        let app = build_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// Insert a sale directly through the store.
    pub async fn create_sale(&self, name: &str, quantity: i64, price: &str, date: &str) -> Sale {
        self.store
            .create_sale(NewSale {
                product_name: name.to_string(),
                quantity,
                price: Decimal::from_str(price).expect("bad price literal"),
                sale_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("bad date literal"),
            })
            .await
            .expect("failed to create sale")
    }

    /// Seed a small, fixed data set spanning two months.
    pub async fn seed(&self) {
        self.create_sale("Laptop", 2, "999.99", "2024-01-10").await;
        self.create_sale("Mouse", 10, "19.99", "2024-01-15").await;
        self.create_sale("Laptop", 1, "1099.00", "2024-02-01").await;
        self.create_sale("Keyboard", 5, "49.50", "2024-02-20").await;
    }
}

/// A valid create payload.
pub fn laptop_payload() -> serde_json::Value {
    serde_json::json!({
        "product_name": "Laptop",
        "quantity": 2,
        "price": 999.99,
        "sale_date": "2024-11-27"
    })
}
