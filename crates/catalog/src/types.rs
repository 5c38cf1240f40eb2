//! Core domain types for the movie catalog.
//!
//! This module defines the values that flow between the retrieval layer
//! and the conversation engine:
//! - `Service`: the streaming services the catalog knows about
//! - `MovieRecord`: one movie as scraped from the catalog
//! - catalog-wide bounds used when a filter leaves a range open

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

// =============================================================================
// Catalog bounds
// =============================================================================

/// Lowest IMDB score the catalog accepts in a range query
pub const CATALOG_MIN_SCORE: f32 = 0.0;

/// Highest IMDB score the catalog accepts in a range query
pub const CATALOG_MAX_SCORE: f32 = 10.0;

/// Oldest release year the catalog accepts in a range query
pub const CATALOG_MIN_YEAR: u16 = 1900;

/// An open year range ends this many years after the current year
pub const YEARS_AHEAD: u16 = 2;

/// Catch-all genre tag offered next to the configured genres
pub const OTHER_GENRE: &str = "overig";

/// Genre tags the catalog uses in its search form
pub const DEFAULT_GENRES: &[&str] = &[
    "actie",
    "animatie",
    "avontuur",
    "comedy",
    "documentaire",
    "drama",
    "familie",
    "fantasy",
    "horror",
    "misdaad",
    "oorlog",
    "romantiek",
    "sciencefiction",
    "thriller",
    "western",
];

// =============================================================================
// Streaming services
// =============================================================================

/// A streaming service the catalog tracks.
///
/// Each service has three spellings:
/// - `key()`: what users type and what we show ("prime")
/// - `vod_key()`: what the catalog search form expects ("amazon")
/// - `listing_path()`: where its "new movies" page lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Netflix,
    Prime,
    Pathe,
    Disney,
}

impl Service {
    /// Every service, in the order we present them
    pub const ALL: [Service; 4] = [
        Service::Netflix,
        Service::Prime,
        Service::Pathe,
        Service::Disney,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Service::Netflix => "netflix",
            Service::Prime => "prime",
            Service::Pathe => "pathe",
            Service::Disney => "disney",
        }
    }

    pub fn vod_key(self) -> &'static str {
        match self {
            Service::Netflix => "netflix",
            Service::Prime => "amazon",
            Service::Pathe => "pathe",
            Service::Disney => "disney",
        }
    }

    /// Path of the "new movies" listing page, relative to the catalog root
    pub fn listing_path(self) -> &'static str {
        match self {
            Service::Netflix => "/video-on-demand/netflix/nieuwe-films",
            Service::Prime => "/video-on-demand/amazon-prime-video/nieuwe-films",
            Service::Pathe => "/video-on-demand/pathe-thuis/nieuw-op-pathe-thuis",
            Service::Disney => "/video-on-demand/disney-plus/nieuwe-films",
        }
    }

    /// Case-insensitive lookup by user-facing key
    pub fn from_key(key: &str) -> Option<Service> {
        let key = key.trim().to_lowercase();
        Service::ALL.into_iter().find(|s| s.key() == key)
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Service {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Service::from_key(s).ok_or_else(|| CatalogError::InvalidValue {
            field: "service".to_string(),
            value: s.to_string(),
        })
    }
}

// =============================================================================
// Movie records
// =============================================================================

/// One movie as listed by the catalog.
///
/// Records are plain values: no identity beyond their fields, and the same
/// movie may show up twice if the catalog reorders between page requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub title: String,
    /// Release year, when the markup carries one (search results do,
    /// new-release listings usually don't)
    pub release_year: Option<u16>,
    /// IMDB rating, 0.0 - 10.0
    pub rating: f32,
    /// Number of IMDB votes behind `rating`
    pub num_votes: u32,
    pub genres: Vec<String>,
    pub director: Option<String>,
    /// Absolute link to the movie page
    pub url: String,
    /// Only set by the new-releases listing
    pub service: Option<Service>,
    /// Date heading the movie was listed under (new-releases only)
    pub added_on: Option<NaiveDate>,
    /// Free-form sub line (runtime, age rating, ...)
    pub sub: Option<String>,
}

impl MovieRecord {
    /// Year as shown to users, "????" when unknown
    pub fn year_label(&self) -> String {
        self.release_year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "????".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_lookup_is_case_insensitive() {
        assert_eq!(Service::from_key("Netflix"), Some(Service::Netflix));
        assert_eq!(Service::from_key(" PRIME "), Some(Service::Prime));
        assert_eq!(Service::from_key("foobar"), None);
    }

    #[test]
    fn test_prime_uses_amazon_in_search_form() {
        assert_eq!(Service::Prime.key(), "prime");
        assert_eq!(Service::Prime.vod_key(), "amazon");
    }

    #[test]
    fn test_service_from_str_error_names_value() {
        let err = "hbo".parse::<Service>().unwrap_err();
        assert!(err.to_string().contains("hbo"));
    }
}
