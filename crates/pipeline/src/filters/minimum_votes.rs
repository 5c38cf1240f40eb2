//! Filter on IMDB vote count.
//!
//! The catalog's query endpoint cannot filter on vote count, so obscure
//! titles with a handful of enthusiastic votes are removed here, after a
//! page has been fetched.

use catalog::MovieRecord;

use crate::traits::Filter;

/// Removes records backed by too few IMDB votes.
///
/// ## Algorithm
/// Keep a record only if `num_votes >= min_votes`. Raising `min_votes`
/// can only shrink the output for the same input.
pub struct MinimumVotesFilter {
    min_votes: u32,
}

impl MinimumVotesFilter {
    /// # Arguments
    /// * `min_votes` - Minimum number of IMDB votes (typically 1000)
    pub fn new(min_votes: u32) -> Self {
        Self { min_votes }
    }
}

impl Filter for MinimumVotesFilter {
    fn name(&self) -> &str {
        "MinimumVotesFilter"
    }

    fn keep(&self, record: &MovieRecord) -> bool {
        record.num_votes >= self.min_votes
    }
}
