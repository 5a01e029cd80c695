//! Route handlers for the HTTP API.

pub mod analytics;
pub mod health;
pub mod sales;
