//! URL construction for the catalog.
//!
//! The browser deep link and the paginated query endpoint are built from
//! the same parameter list, so both always describe the same filter:
//!
//! ```text
//! <base>/zoek?categorie=films&vod=netflix,amazon&genre=actie,horror&imdb-score=7,10&jaar=2018,2026&sorteer=imdb-score
//! <base>/api/zoek?<same parameters>&pagina=0
//! ```

use url::Url;

use crate::error::{CatalogError, Result};
use crate::filter::FilterSpecification;
use crate::types::Service;

const BROWSER_PATH: &str = "/zoek";
const QUERY_PATH: &str = "/api/zoek";
const PAGE_PARAM: &str = "pagina";

/// Query parameters describing a filter, in a stable order.
///
/// Genres are left out entirely when none were chosen, which the catalog
/// reads as "all genres".
pub fn search_params(spec: &FilterSpecification) -> Vec<(&'static str, String)> {
    let (score_lo, score_hi) = spec.score_range();
    let (year_lo, year_hi) = spec.year_range();

    let vod = spec
        .services()
        .iter()
        .map(|s| s.vod_key())
        .collect::<Vec<_>>()
        .join(",");

    let mut params = vec![("categorie", "films".to_string()), ("vod", vod)];
    if !spec.genres().is_empty() {
        params.push(("genre", spec.genres().join(",")));
    }
    params.push(("imdb-score", format!("{},{}", score_lo, score_hi)));
    params.push(("jaar", format!("{},{}", year_lo, year_hi)));
    params.push(("sorteer", "imdb-score".to_string()));
    params
}

/// Deep link to the catalog's own search page for this filter.
///
/// Pure function of its inputs; used for display only.
pub fn browser_url(base: &Url, spec: &FilterSpecification) -> Result<Url> {
    let mut url = join(base, BROWSER_PATH)?;
    url.query_pairs_mut().extend_pairs(search_params(spec));
    Ok(url)
}

/// Query endpoint URL for one page of results (pages start at 0)
pub fn query_url(base: &Url, spec: &FilterSpecification, page: u32) -> Result<Url> {
    let mut url = join(base, QUERY_PATH)?;
    url.query_pairs_mut()
        .extend_pairs(search_params(spec))
        .append_pair(PAGE_PARAM, &page.to_string());
    Ok(url)
}

/// "New movies" listing page of a service
pub fn listing_url(base: &Url, service: Service) -> Result<Url> {
    join(base, service.listing_path())
}

/// Turn a (possibly relative) href from catalog markup into an absolute link
pub fn resolve_href(base: &Url, href: &str) -> Result<String> {
    join(base, href).map(String::from)
}

fn join(base: &Url, path: &str) -> Result<Url> {
    base.join(path).map_err(|e| CatalogError::InvalidValue {
        field: "url".to_string(),
        value: format!("{}{} ({})", base, path, e),
    })
}
