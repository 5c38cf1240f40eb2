//! Access to the remote catalog.
//!
//! `CatalogClient` is the seam between retrieval logic and HTTP: sources
//! only ever talk to the trait, so they can be driven by the real site or
//! by an in-memory catalog in tests.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use catalog::parser::parse_search_envelope;
use catalog::{CatalogError, FilterSpecification, Result, SearchEnvelope, Service, query};

/// Something that can serve catalog pages
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch one page (starting at 0) of the query endpoint for a filter
    async fn search_page(&self, spec: &FilterSpecification, page: u32) -> Result<SearchEnvelope>;

    /// Fetch the raw HTML of a service's "new movies" listing
    async fn listing_page(&self, service: Service) -> Result<String>;
}

/// `CatalogClient` backed by reqwest.
///
/// Connection-level behavior (keep-alive, redirects) is left to reqwest;
/// a failed request is reported once and never retried here.
pub struct HttpCatalogClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpCatalogClient {
    const USER_AGENT: &'static str = concat!("fv-bot/", env!("CARGO_PKG_VERSION"));

    /// Create a client for the catalog rooted at `base_url`.
    ///
    /// # Errors
    /// `CatalogError::InvalidConfig` if the HTTP client cannot be built
    /// (e.g. no TLS backend available).
    pub fn new(base_url: Url) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(Self::USER_AGENT)
            .build()
            .map_err(|e| CatalogError::InvalidConfig(format!("http client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get_text(&self, url: Url) -> Result<String> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Catalog answered {} for {}", status, url);
            return Err(CatalogError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| transport_error(&url, e))
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn search_page(&self, spec: &FilterSpecification, page: u32) -> Result<SearchEnvelope> {
        let url = query::query_url(&self.base_url, spec, page)?;
        let body = self.get_text(url).await?;
        parse_search_envelope(&body)
    }

    async fn listing_page(&self, service: Service) -> Result<String> {
        let url = query::listing_url(&self.base_url, service)?;
        self.get_text(url).await
    }
}

fn transport_error(url: &Url, err: reqwest::Error) -> CatalogError {
    CatalogError::Transport {
        url: url.to_string(),
        reason: err.to_string(),
    }
}
