//! si-core: shared error type, configuration, and sale domain types.
//!
//! This crate is the foundational dependency for the other si-* crates. It
//! owns the unified [`Error`], the TOML-backed [`config::Config`], and the
//! `Sale` model together with the validation rules every backend relies on.

pub mod config;
pub mod error;
pub mod sale;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use sale::*;
