//! si-db: database access and persistence layer.
//!
//! SQLite is served by rusqlite behind an r2d2 pool with embedded migrations
//! and synchronous query functions; PostgreSQL is served by sqlx. Both sit
//! behind the async [`store::SaleStore`] trait so the HTTP layer does not
//! care which one `DATABASE_URL` selected.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod postgres;
pub mod queries;
pub mod store;
pub mod url;

pub use store::{connect, SaleStore, SqliteStore};
pub use url::DatabaseUrl;
