//! Rating floor.
//!
//! The new-releases listing has no server-side score filter at all, so
//! the floor is applied here.

use catalog::MovieRecord;

use crate::traits::Filter;

/// Keeps records rated at or above `min_rating`
pub struct MinimumRatingFilter {
    min_rating: f32,
}

impl MinimumRatingFilter {
    /// # Arguments
    /// * `min_rating` - Minimum IMDB rating, inclusive (typically 6.0)
    pub fn new(min_rating: f32) -> Self {
        Self { min_rating }
    }
}

impl Filter for MinimumRatingFilter {
    fn name(&self) -> &str {
        "MinimumRatingFilter"
    }

    fn keep(&self, record: &MovieRecord) -> bool {
        record.rating >= self.min_rating
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;

    #[test]
    fn test_floor_is_inclusive() {
        let filter = MinimumRatingFilter::new(6.0);

        assert!(filter.keep(&record("High Rated Movie", 8.1, 5000)));
        assert!(filter.keep(&record("Borderline Movie", 6.0, 5000)));
        assert!(!filter.keep(&record("Low Rated Movie", 4.2, 5000)));
    }

    #[test]
    fn test_zero_floor_keeps_unrated() {
        assert!(MinimumRatingFilter::new(0.0).keep(&record("No votes yet", 0.0, 0)));
    }
}
