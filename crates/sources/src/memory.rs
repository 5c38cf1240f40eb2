//! In-memory catalog
//!
//! A `CatalogClient` that serves canned markup instead of talking to the
//! network. Used by the test suites of this crate and the bot crate, and by
//! the CLI's offline demo runs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use catalog::{CatalogError, FilterSpecification, Result, SearchEnvelope, Service};

use crate::client::CatalogClient;

/// Catalog served from memory, with request bookkeeping
#[derive(Default)]
pub struct InMemoryCatalog {
    /// HTML fragment per query page; pages past the end are empty
    search_pages: Vec<String>,
    failing_page: Option<u32>,
    listings: HashMap<Service, String>,
    requests: Mutex<Requests>,
}

#[derive(Default)]
struct Requests {
    pages: Vec<u32>,
    specs: Vec<FilterSpecification>,
    listings: Vec<Service>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_pages(mut self, pages: Vec<String>) -> Self {
        self.search_pages = pages;
        self
    }

    /// Make requests for `page` fail with a transport error
    pub fn failing_at_page(mut self, page: u32) -> Self {
        self.failing_page = Some(page);
        self
    }

    pub fn with_listing(mut self, service: Service, html: impl Into<String>) -> Self {
        self.listings.insert(service, html.into());
        self
    }

    /// Query pages requested so far, in request order
    pub fn requested_pages(&self) -> Vec<u32> {
        self.lock().pages.clone()
    }

    /// Filter of every page request, in request order
    pub fn requested_specs(&self) -> Vec<FilterSpecification> {
        // Page 0 marks the start of a search
        let requests = self.lock();
        requests
            .pages
            .iter()
            .zip(&requests.specs)
            .filter(|(page, _)| **page == 0)
            .map(|(_, spec)| spec.clone())
            .collect()
    }

    pub fn requested_listings(&self) -> Vec<Service> {
        self.lock().listings.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Requests> {
        // A panicking test thread must not hide the bookkeeping from others
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CatalogClient for InMemoryCatalog {
    async fn search_page(&self, spec: &FilterSpecification, page: u32) -> Result<SearchEnvelope> {
        {
            let mut requests = self.lock();
            requests.pages.push(page);
            requests.specs.push(spec.clone());
        }

        if self.failing_page == Some(page) {
            return Err(CatalogError::Transport {
                url: format!("memory://search/{}", page),
                reason: "connection reset".to_string(),
            });
        }

        let html = self
            .search_pages
            .get(page as usize)
            .cloned()
            .unwrap_or_default();
        Ok(SearchEnvelope {
            total: self.search_pages.len() as u32,
            page,
            html,
        })
    }

    async fn listing_page(&self, service: Service) -> Result<String> {
        self.lock().listings.push(service);
        self.listings
            .get(&service)
            .cloned()
            .ok_or_else(|| CatalogError::HttpStatus {
                url: format!("memory://listing/{}", service.key()),
                status: 404,
            })
    }
}

/// Markup for one catalog item, as the site renders it
pub fn item_html(title: &str, rating: f32, votes: u32, year: u16) -> String {
    format!(
        r#"<li>
  <div class="rating"><span title="{votes} stemmen">{rating:.1}</span></div>
  <div class="item-content">
    <h4><a href="/film/{slug}">{title}</a> <span class="year">({year})</span></h4>
    <div>Actie / Thriller • Jane Doe</div>
  </div>
</li>"#,
        slug = title.to_lowercase().replace(' ', "-"),
    )
}

/// Listing page with one dated section per `(heading, items)` pair
pub fn listing_html(sections: &[(&str, Vec<String>)]) -> String {
    let mut html = String::from("<html><body>");
    for (heading, items) in sections {
        html.push_str(&format!(r#"<h3 class="is-list-heading">{}</h3>"#, heading));
        html.push_str(r#"<ul class="item-list">"#);
        for item in items {
            html.push_str(item);
        }
        html.push_str("</ul>");
    }
    html.push_str("</body></html>");
    html
}
