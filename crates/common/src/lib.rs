//! Common types shared by the infrastructure assertion harness.

#![warn(clippy::pedantic)]

/// Module for query error types
pub mod error;

/// Module for resource record types
pub mod types;

pub use error::QueryError;
pub use types::{Record, RecordSet};
