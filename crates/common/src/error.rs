//! Common error types for infrastructure queries.

use thiserror::Error;

/// Errors a resource query can fail with.
///
/// Every variant is converted into a failed assertion outcome at the scenario
/// boundary; none of them abort a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The query returned nothing where at least one match was required
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network, authentication or permission failure reaching the provider
    #[error("Transport error: {0}")]
    Transport(String),

    /// More than one record matched a selection that must be unique
    #[error("Ambiguous match: {what} matched {count} records")]
    Ambiguous {
        /// Description of the selection that matched too much
        what: String,
        /// Number of matching records
        count: usize,
    },
}

impl QueryError {
    /// Short machine-friendly name of the error class.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::NotFound(_) => "not_found",
            QueryError::Transport(_) => "transport",
            QueryError::Ambiguous { .. } => "configuration",
        }
    }
}
