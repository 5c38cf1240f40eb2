//! Read-only lookup tables injected at startup.
//!
//! `CatalogConfig` holds everything the core needs to know about the
//! catalog: which services and genres are recognized, the post-filter
//! thresholds, and where the catalog lives.

use url::Url;

use crate::error::{CatalogError, Result};
use crate::types::{DEFAULT_GENRES, OTHER_GENRE, Service};

/// Default catalog root
pub const DEFAULT_BASE_URL: &str = "https://www.filmvandaag.nl";

/// Configuration shared by the retrieval layer and the conversation engine
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub base_url: Url,
    /// Services users may pick; "any"/"all" expands to this list
    pub services: Vec<Service>,
    /// Genre tags offered in the search dialogue
    pub genres: Vec<String>,
    /// Records with fewer IMDB votes are dropped
    pub votes_threshold: u32,
    /// How far back the new-releases listing is read
    pub new_releases_days: u32,
    /// New releases rated below this are dropped
    pub new_releases_min_rating: f32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            services: Service::ALL.to_vec(),
            genres: DEFAULT_GENRES.iter().map(|g| g.to_string()).collect(),
            votes_threshold: 1000,
            new_releases_days: 7,
            new_releases_min_rating: 6.0,
        }
    }
}

/// Result of reading a free-text list of service names
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServiceSelection {
    pub recognized: Vec<Service>,
    /// Tokens we could not match, lowercased, in input order
    pub unrecognized: Vec<String>,
}

impl ServiceSelection {
    /// A selection is usable when nothing was unrecognized and something was picked
    pub fn is_valid(&self) -> bool {
        self.unrecognized.is_empty() && !self.recognized.is_empty()
    }
}

impl CatalogConfig {
    /// Check the configuration before anything is started with it.
    pub fn validate(&self) -> Result<()> {
        if self.services.is_empty() {
            return Err(CatalogError::InvalidConfig(
                "at least one streaming service is required".to_string(),
            ));
        }
        if self.genres.is_empty() {
            return Err(CatalogError::InvalidConfig(
                "at least one genre is required".to_string(),
            ));
        }
        if self.new_releases_days == 0 {
            return Err(CatalogError::InvalidConfig(
                "new releases day window must be positive".to_string(),
            ));
        }
        if !(0.0..=10.0).contains(&self.new_releases_min_rating) {
            return Err(CatalogError::InvalidConfig(format!(
                "new releases minimum rating {} is outside 0-10",
                self.new_releases_min_rating
            )));
        }
        if self.base_url.cannot_be_a_base() {
            return Err(CatalogError::InvalidConfig(format!(
                "catalog url {} cannot be used as a base",
                self.base_url
            )));
        }
        Ok(())
    }

    /// Genre tags offered to the user: configured genres plus the catch-all
    pub fn genre_choices(&self) -> Vec<&str> {
        self.genres
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(OTHER_GENRE))
            .collect()
    }

    pub fn is_known_genre(&self, tag: &str) -> bool {
        tag == OTHER_GENRE || self.genres.iter().any(|g| g == tag)
    }

    /// Parse space-separated service names typed by a user.
    ///
    /// Matching is case-insensitive. The tokens "all" and "any" expand to
    /// every configured service. Duplicates are collapsed, first mention wins.
    pub fn parse_services(&self, input: &str) -> ServiceSelection {
        let mut selection = ServiceSelection::default();

        for token in input.split_whitespace().map(str::to_lowercase) {
            if token == "all" || token == "any" {
                for service in &self.services {
                    if !selection.recognized.contains(service) {
                        selection.recognized.push(*service);
                    }
                }
                continue;
            }

            match Service::from_key(&token).filter(|s| self.services.contains(s)) {
                Some(service) => {
                    if !selection.recognized.contains(&service) {
                        selection.recognized.push(service);
                    }
                }
                None => selection.unrecognized.push(token),
            }
        }

        selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CatalogConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_services_rejected() {
        let config = CatalogConfig {
            services: vec![],
            ..CatalogConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CatalogError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_parse_services_flags_unknown_tokens() {
        let config = CatalogConfig::default();
        let selection = config.parse_services("netflix foobar");

        assert_eq!(selection.recognized, vec![Service::Netflix]);
        assert_eq!(selection.unrecognized, vec!["foobar".to_string()]);
        assert!(!selection.is_valid());
    }

    #[test]
    fn test_parse_services_any_expands_to_configured() {
        let config = CatalogConfig {
            services: vec![Service::Netflix, Service::Disney],
            ..CatalogConfig::default()
        };

        let selection = config.parse_services("ANY");
        assert_eq!(selection.recognized, vec![Service::Netflix, Service::Disney]);
        assert!(selection.is_valid());

        // Pathe is a real service but not configured here
        let selection = config.parse_services("pathe");
        assert_eq!(selection.unrecognized, vec!["pathe".to_string()]);
    }

    #[test]
    fn test_parse_services_collapses_duplicates() {
        let config = CatalogConfig::default();
        let selection = config.parse_services("Netflix netflix all");
        assert_eq!(selection.recognized, Service::ALL.to_vec());
    }

    #[test]
    fn test_empty_input_is_not_valid() {
        let config = CatalogConfig::default();
        let selection = config.parse_services("   ");
        assert!(selection.unrecognized.is_empty());
        assert!(!selection.is_valid());
    }

    #[test]
    fn test_genre_choices_include_catch_all() {
        let config = CatalogConfig::default();
        let choices = config.genre_choices();
        assert_eq!(choices.last(), Some(&OTHER_GENRE));
        assert!(config.is_known_genre("horror"));
        assert!(config.is_known_genre(OTHER_GENRE));
        assert!(!config.is_known_genre("telenovela"));
    }
}
