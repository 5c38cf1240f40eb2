//! # Sources Crate
//!
//! Retrieval of movie records from the catalog.
//!
//! ## Sources
//!
//! - **SearchSource**: Lazy, paginated search driven by a `FilterSpecification`
//! - **NewReleasesSource**: Recent additions per streaming service
//!
//! Both talk to the catalog through the `CatalogClient` trait. The HTTP
//! implementation lives in `client`; `memory` serves canned markup.

pub mod client;
pub mod memory;
pub mod new_releases;
pub mod search;

pub use client::{CatalogClient, HttpCatalogClient};
pub use memory::InMemoryCatalog;
pub use new_releases::NewReleasesSource;
pub use search::{Batch, BatchEnd, MovieStream, SearchSource, next_batch};
