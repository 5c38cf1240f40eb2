//! # Catalog Crate
//!
//! Domain types and markup handling for the filmvandaag.nl movie catalog.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Service, MovieRecord, catalog bounds)
//! - **config**: Read-only lookup tables (services, genres, thresholds)
//! - **filter**: FilterSpecBuilder / FilterSpecification
//! - **query**: Browser and query-endpoint URL construction
//! - **parser**: JSON envelope, result fragments and listing pages
//! - **dates**: Dutch date headings
//! - **error**: Error types for catalog access
//!
//! ## Example Usage
//!
//! ```ignore
//! use catalog::{CatalogConfig, FilterSpecBuilder, query};
//!
//! let config = CatalogConfig::default();
//! let mut builder = FilterSpecBuilder::new();
//! builder.add_genre("horror");
//! builder.set_min_imdb_score(Some(7.0));
//! let spec = builder.build(&config, 2024)?;
//!
//! println!("{}", query::browser_url(&config.base_url, &spec)?);
//! ```

// Public modules
pub mod config;
pub mod dates;
pub mod error;
pub mod filter;
pub mod parser;
pub mod query;
pub mod types;

// Re-export commonly used types for convenience
pub use config::{CatalogConfig, ServiceSelection};
pub use error::{CatalogError, Result};
pub use filter::{FilterSpecBuilder, FilterSpecification, ServiceChoice};
pub use parser::SearchEnvelope;
pub use types::{MovieRecord, OTHER_GENRE, Service};
