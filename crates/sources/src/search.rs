//! Search Source - lazy, paginated catalog search
//!
//! Turns a finalized `FilterSpecification` into a stream of `MovieRecord`s.
//!
//! ## Algorithm
//! 1. Request page 0 of the query endpoint
//! 2. Parse the page's HTML fragment into records
//! 3. If the page held no items at all, the stream ends
//! 4. Drop records below the vote threshold (the endpoint can't do this)
//! 5. Yield what is left, then request the next page when asked for more
//!
//! The stream is cold and single-pass: nothing is fetched until it is
//! polled, and once it ends (or is dropped) a new one has to be opened to
//! start again from page 0. A transport or parse failure is yielded as an
//! `Err` item, after which the stream ends.

use std::pin::Pin;
use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use tracing::{debug, instrument};
use url::Url;

use catalog::parser::parse_search_fragment;
use catalog::{CatalogConfig, CatalogError, FilterSpecification, MovieRecord, Result, query};
use pipeline::FilterPipeline;
use pipeline::filters::MinimumVotesFilter;

use crate::client::CatalogClient;

/// Lazily fetched sequence of records
pub type MovieStream = Pin<Box<dyn Stream<Item = Result<MovieRecord>> + Send>>;

/// Opens search result streams against one catalog
#[derive(Clone)]
pub struct SearchSource {
    client: Arc<dyn CatalogClient>,
    filters: Arc<FilterPipeline>,
    base_url: Url,
}

impl SearchSource {
    /// Create a search source
    ///
    /// ## Parameters
    /// - `client`: where pages come from
    /// - `config`: supplies the vote threshold and the base URL for links
    pub fn new(client: Arc<dyn CatalogClient>, config: &CatalogConfig) -> Self {
        let filters =
            FilterPipeline::new().add_filter(MinimumVotesFilter::new(config.votes_threshold));
        Self {
            client,
            filters: Arc::new(filters),
            base_url: config.base_url.clone(),
        }
    }

    /// Catalog deep link showing the same results in a browser
    pub fn browser_url(&self, spec: &FilterSpecification) -> Result<Url> {
        query::browser_url(&self.base_url, spec)
    }

    /// Open a fresh result stream, starting at page 0.
    #[instrument(skip(self, spec), fields(genres = ?spec.genres()))]
    pub fn open(&self, spec: FilterSpecification) -> MovieStream {
        let client = Arc::clone(&self.client);
        let filters = Arc::clone(&self.filters);
        let base_url = self.base_url.clone();

        debug!("Opening search stream");
        Box::pin(async_stream::try_stream! {
            let mut page: u32 = 0;
            loop {
                let envelope = client.search_page(&spec, page).await?;
                let raw = parse_search_fragment(&envelope.html, &base_url)?;
                if raw.is_empty() {
                    debug!("Page {} is empty, search exhausted", page);
                    break;
                }

                let raw_count = raw.len();
                let kept = filters.apply(raw);
                debug!(
                    "Page {} (catalog total {}): {} raw, {} after filters",
                    page,
                    envelope.total,
                    raw_count,
                    kept.len()
                );

                for record in kept {
                    yield record;
                }
                page += 1;
            }
        })
    }
}

/// Why a batch stopped filling up
#[derive(Debug)]
pub enum BatchEnd {
    /// The batch is full; the stream may have more
    Full,
    /// The stream ended normally
    Exhausted,
    /// The stream ended with an error
    Failed(CatalogError),
}

/// Up to `size` records pulled from a stream
#[derive(Debug)]
pub struct Batch {
    pub records: Vec<MovieRecord>,
    pub end: BatchEnd,
}

/// Pull up to `size` records from an open stream.
///
/// Records collected before a failure are kept in the batch, so callers can
/// still show them.
pub async fn next_batch(stream: &mut MovieStream, size: usize) -> Batch {
    let mut records = Vec::with_capacity(size);
    while records.len() < size {
        match stream.next().await {
            Some(Ok(record)) => records.push(record),
            Some(Err(err)) => {
                return Batch {
                    records,
                    end: BatchEnd::Failed(err),
                };
            }
            None => {
                return Batch {
                    records,
                    end: BatchEnd::Exhausted,
                };
            }
        }
    }
    Batch {
        records,
        end: BatchEnd::Full,
    }
}
