//! Ordering of record lists.
//!
//! Search results arrive already ranked by the catalog. New releases come
//! from several listing pages and are merged here.

use std::cmp::Ordering;

use catalog::MovieRecord;

/// Sort records by rating, highest first.
///
/// The sort is stable: records with equal ratings keep their input order.
/// NaN ratings (which the parser never produces) compare as equal instead
/// of panicking.
pub fn rank_by_rating(records: &mut [MovieRecord]) {
    records.sort_by(|a, b| b.rating.partial_cmp(&a.rating).unwrap_or(Ordering::Equal));
}
