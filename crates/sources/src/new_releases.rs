//! New Releases Source
//!
//! Reads each service's "new movies" listing and keeps what was added
//! within the configured day window.
//!
//! ## Algorithm
//! 1. Fetch the listing page of one service
//! 2. Walk its dated sections newest first, stop at the first section
//!    older than `today - days`
//! 3. Drop records below the vote threshold or the minimum rating
//! 4. Repeat for every service, then rank everything by rating
//!
//! Services are fetched one after another; the first failure aborts the
//! whole retrieval.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::{debug, info, instrument};
use url::Url;

use catalog::parser::parse_listing_since;
use catalog::{CatalogConfig, MovieRecord, Result, Service};
use pipeline::FilterPipeline;
use pipeline::filters::{MinimumRatingFilter, MinimumVotesFilter};
use pipeline::ranking::rank_by_rating;

use crate::client::CatalogClient;

pub struct NewReleasesSource {
    client: Arc<dyn CatalogClient>,
    filters: FilterPipeline,
    base_url: Url,
    days: u32,
}

impl NewReleasesSource {
    pub fn new(client: Arc<dyn CatalogClient>, config: &CatalogConfig) -> Self {
        let filters = FilterPipeline::new()
            .add_filter(MinimumVotesFilter::new(config.votes_threshold))
            .add_filter(MinimumRatingFilter::new(config.new_releases_min_rating));

        Self {
            client,
            filters,
            base_url: config.base_url.clone(),
            days: config.new_releases_days,
        }
    }

    /// Size of the look-back window in days
    pub fn days(&self) -> u32 {
        self.days
    }

    /// Qualifying recent additions of one service, in listing order
    #[instrument(skip(self))]
    pub async fn fetch_service(&self, service: Service, today: NaiveDate) -> Result<Vec<MovieRecord>> {
        let cutoff = today - Duration::days(i64::from(self.days));
        let html = self.client.listing_page(service).await?;

        let mut records = parse_listing_since(&html, &self.base_url, today, cutoff)?;
        for record in &mut records {
            record.service = Some(service);
        }

        let found = records.len();
        let kept = self.filters.apply(records);
        debug!("{}: {} added since {}, {} qualify", service, found, cutoff, kept.len());
        Ok(kept)
    }

    /// Qualifying recent additions across `services`, best rated first
    pub async fn fetch(&self, services: &[Service], today: NaiveDate) -> Result<Vec<MovieRecord>> {
        let mut all = Vec::new();
        for service in services {
            all.extend(self.fetch_service(*service, today).await?);
        }
        rank_by_rating(&mut all);

        info!(
            "Found {} new releases on {} services in the last {} days",
            all.len(),
            services.len(),
            self.days
        );
        Ok(all)
    }
}
