//! Post-filtering and ranking of scraped movie records.
//!
//! This crate provides:
//! - Filter trait and implementations for record filtering
//! - FilterPipeline for composing filters
//! - rank_by_rating for merged result lists
//!
//! ## Architecture
//! The catalog cannot express every constraint server-side. Records are
//! processed in stages after each fetch:
//! 1. Filters remove unwanted records (too few votes, rating below a floor)
//! 2. Lists merged from several sources are ranked by rating
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::FilterPipeline;
//! use pipeline::filters::*;
//!
//! let pipeline = FilterPipeline::new()
//!     .add_filter(MinimumVotesFilter::new(1000))
//!     .add_filter(MinimumRatingFilter::new(6.0));
//!
//! let mut kept = pipeline.apply(records);
//! pipeline::rank_by_rating(&mut kept);
//! ```

pub mod filter_pipeline;
pub mod filters;
pub mod ranking;
pub mod traits;

// Re-export main types
pub use filter_pipeline::FilterPipeline;
pub use ranking::rank_by_rating;
pub use traits::Filter;
