//! Concrete filters for a `FilterPipeline`.

pub mod minimum_rating;
pub mod minimum_votes;

pub use minimum_rating::MinimumRatingFilter;
pub use minimum_votes::MinimumVotesFilter;
