//! Filter specification accumulated over a search conversation.
//!
//! Two types split the lifecycle:
//! - `FilterSpecBuilder` is filled in one dimension per conversation turn
//! - `FilterSpecification` is the validated, read-only result handed to
//!   the retrieval layer
//!
//! Once built, a specification cannot be changed; a new search starts
//! from a fresh builder.

use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::types::{
    CATALOG_MAX_SCORE, CATALOG_MIN_SCORE, CATALOG_MIN_YEAR, Service, YEARS_AHEAD,
};

/// Which services to search
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ServiceChoice {
    /// Every configured service
    #[default]
    Any,
    Only(Vec<Service>),
}

/// In-progress filter, one field per dialogue step
#[derive(Debug, Clone, Default)]
pub struct FilterSpecBuilder {
    services: ServiceChoice,
    genres: Vec<String>,
    min_imdb_score: Option<f32>,
    min_release_year: Option<u16>,
}

impl FilterSpecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn services(mut self, services: ServiceChoice) -> Self {
        self.services = services;
        self
    }

    /// Append a genre tag. Returns false (and changes nothing) when the tag
    /// was already chosen.
    pub fn add_genre(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if self.genres.contains(&tag) {
            return false;
        }
        self.genres.push(tag);
        true
    }

    /// `None` means "no preference"
    pub fn set_min_imdb_score(&mut self, score: Option<f32>) {
        self.min_imdb_score = score;
    }

    /// `None` means "no preference"
    pub fn set_min_release_year(&mut self, year: Option<u16>) {
        self.min_release_year = year;
    }

    pub fn genres(&self) -> &[String] {
        &self.genres
    }

    pub fn min_imdb_score(&self) -> Option<f32> {
        self.min_imdb_score
    }

    pub fn min_release_year(&self) -> Option<u16> {
        self.min_release_year
    }

    /// Validate and freeze the filter.
    ///
    /// # Arguments
    /// * `config` - Lookup tables for services and genres
    /// * `current_year` - Anchors the default upper year bound
    ///
    /// # Errors
    /// `CatalogError::InvalidFilter` when a service or genre is not
    /// configured, the score is outside the catalog range, or the year
    /// range would be empty.
    pub fn build(self, config: &CatalogConfig, current_year: u16) -> Result<FilterSpecification> {
        let services = match self.services {
            ServiceChoice::Any => config.services.clone(),
            ServiceChoice::Only(services) => services,
        };
        if services.is_empty() {
            return Err(CatalogError::InvalidFilter(
                "no streaming services selected".to_string(),
            ));
        }
        if let Some(service) = services.iter().find(|s| !config.services.contains(s)) {
            return Err(CatalogError::InvalidFilter(format!(
                "service {} is not available",
                service
            )));
        }

        if let Some(tag) = self.genres.iter().find(|g| !config.is_known_genre(g)) {
            return Err(CatalogError::InvalidFilter(format!("unknown genre {}", tag)));
        }

        if let Some(score) = self.min_imdb_score {
            if !(CATALOG_MIN_SCORE..=CATALOG_MAX_SCORE).contains(&score) {
                return Err(CatalogError::InvalidFilter(format!(
                    "IMDB score {} is outside {}-{}",
                    score, CATALOG_MIN_SCORE, CATALOG_MAX_SCORE
                )));
            }
        }

        let max_release_year = current_year.saturating_add(YEARS_AHEAD);
        if let Some(year) = self.min_release_year {
            if !(CATALOG_MIN_YEAR..=max_release_year).contains(&year) {
                return Err(CatalogError::InvalidFilter(format!(
                    "release year {} is outside {}-{}",
                    year, CATALOG_MIN_YEAR, max_release_year
                )));
            }
        }

        Ok(FilterSpecification {
            services,
            genres: self.genres,
            min_imdb_score: self.min_imdb_score,
            min_release_year: self.min_release_year,
            max_release_year,
        })
    }
}

/// Validated, immutable search filter
///
/// Unset lower bounds fall back to the catalog minima; upper bounds are
/// always the catalog maximum score and `current_year + 2`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpecification {
    services: Vec<Service>,
    genres: Vec<String>,
    min_imdb_score: Option<f32>,
    min_release_year: Option<u16>,
    max_release_year: u16,
}

impl FilterSpecification {
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Genres are matched with OR semantics
    pub fn genres(&self) -> &[String] {
        &self.genres
    }

    pub fn min_imdb_score(&self) -> Option<f32> {
        self.min_imdb_score
    }

    pub fn min_release_year(&self) -> Option<u16> {
        self.min_release_year
    }

    /// Effective (lower, upper) score bounds
    pub fn score_range(&self) -> (f32, f32) {
        (
            self.min_imdb_score.unwrap_or(CATALOG_MIN_SCORE),
            CATALOG_MAX_SCORE,
        )
    }

    /// Effective (lower, upper) release year bounds
    pub fn year_range(&self) -> (u16, u16) {
        (
            self.min_release_year.unwrap_or(CATALOG_MIN_YEAR),
            self.max_release_year,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_expands_to_configured_services() {
        let config = CatalogConfig::default();
        let spec = FilterSpecBuilder::new().build(&config, 2024).unwrap();
        assert_eq!(spec.services(), config.services.as_slice());
    }

    #[test]
    fn test_open_bounds_default_to_catalog_limits() {
        let config = CatalogConfig::default();
        let spec = FilterSpecBuilder::new().build(&config, 2024).unwrap();

        assert_eq!(spec.score_range(), (0.0, 10.0));
        assert_eq!(spec.year_range(), (1900, 2026));
    }

    #[test]
    fn test_scenario_filter() {
        let config = CatalogConfig::default();
        let mut builder = FilterSpecBuilder::new();
        builder.add_genre("actie");
        builder.add_genre("horror");
        builder.set_min_imdb_score(Some(7.0));
        builder.set_min_release_year(Some(2018));

        let spec = builder.build(&config, 2024).unwrap();
        assert_eq!(spec.genres(), &["actie".to_string(), "horror".to_string()]);
        assert_eq!(spec.score_range(), (7.0, 10.0));
        assert_eq!(spec.year_range(), (2018, 2026));
    }

    #[test]
    fn test_duplicate_genre_is_ignored() {
        let mut builder = FilterSpecBuilder::new();
        assert!(builder.add_genre("drama"));
        assert!(!builder.add_genre("drama"));
        assert_eq!(builder.genres().len(), 1);
    }

    #[test]
    fn test_unknown_genre_rejected() {
        let config = CatalogConfig::default();
        let mut builder = FilterSpecBuilder::new();
        builder.add_genre("telenovela");
        assert!(matches!(
            builder.build(&config, 2024),
            Err(CatalogError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_score_out_of_range_rejected() {
        let config = CatalogConfig::default();
        let mut builder = FilterSpecBuilder::new();
        builder.set_min_imdb_score(Some(11.0));
        assert!(builder.build(&config, 2024).is_err());
    }

    #[test]
    fn test_year_beyond_upper_bound_rejected() {
        let config = CatalogConfig::default();
        let mut builder = FilterSpecBuilder::new();
        builder.set_min_release_year(Some(2030));
        assert!(builder.build(&config, 2024).is_err());
    }

    #[test]
    fn test_unconfigured_service_rejected() {
        let config = CatalogConfig {
            services: vec![Service::Netflix],
            ..CatalogConfig::default()
        };
        let builder = FilterSpecBuilder::new().services(ServiceChoice::Only(vec![Service::Disney]));
        assert!(builder.build(&config, 2024).is_err());
    }
}
