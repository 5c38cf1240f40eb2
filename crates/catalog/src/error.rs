//! Error types for the catalog crate.
//!
//! Every failure talking to or reading from the catalog ends up here, so
//! callers can tell a broken retrieval apart from an exhausted one.

use thiserror::Error;

/// Errors that can occur while building filters or reading catalog data
///
/// Transport, HTTP status and parse errors are all fatal to the retrieval
/// that produced them. Nothing in this crate ever turns one of them into a
/// partially filled `MovieRecord`.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Network failure talking to the catalog
    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// The catalog answered, but not with a success status
    #[error("Catalog returned HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// Markup or JSON did not look like what we expect
    ///
    /// `context` names the piece being parsed (e.g. "search envelope",
    /// "listing item") so a markup change is easy to locate in the logs.
    #[error("Parse error in {context}: {reason}")]
    Parse { context: String, reason: String },

    /// A single field had a value we could not interpret
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// A filter specification failed validation
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Startup configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CatalogError {
    /// Shorthand for building a `Parse` error.
    pub fn parse(context: impl Into<String>, reason: impl Into<String>) -> Self {
        CatalogError::Parse {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// True for errors raised while fetching or reading upstream data.
    pub fn is_retrieval(&self) -> bool {
        matches!(
            self,
            CatalogError::Transport { .. }
                | CatalogError::HttpStatus { .. }
                | CatalogError::Parse { .. }
        )
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, CatalogError>;
