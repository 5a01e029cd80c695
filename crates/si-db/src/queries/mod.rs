//! Database query modules.

pub mod sales;
