//! Parser for catalog markup.
//!
//! Two inputs are handled here:
//! - the query endpoint's JSON envelope and the HTML fragment inside it
//! - the per-service "new movies" listing pages
//!
//! Both render movies with the same item markup:
//!
//! ```text
//! <li>
//!   <div class="rating"><span title="12.345 stemmen">7.4</span></div>
//!   <div class="item-content">
//!     <h4><a href="/film/1-title">Title</a> <span class="year">(2019)</span></h4>
//!     <div>Actie / Thriller • Director Name</div>
//!     <div class="sub">120 min</div>
//!   </div>
//! </li>
//! ```
//!
//! Anything required that is missing (title, link, rating, vote count) is a
//! parse error for the whole page; we never hand out half-read records.

use std::sync::LazyLock;

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::dates::parse_dutch_date;
use crate::error::{CatalogError, Result};
use crate::query::resolve_href;
use crate::types::MovieRecord;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

static ITEM: LazyLock<Selector> = LazyLock::new(|| selector("li"));
static ITEM_CONTENT: LazyLock<Selector> = LazyLock::new(|| selector("div.item-content"));
static TITLE_LINK: LazyLock<Selector> = LazyLock::new(|| selector("div.item-content h4 a"));
static YEAR: LazyLock<Selector> = LazyLock::new(|| selector("span.year"));
static RATING: LazyLock<Selector> = LazyLock::new(|| selector("div.rating span"));
static INFO: LazyLock<Selector> =
    LazyLock::new(|| selector("div.item-content > div:not(.sub):not(.rating)"));
static SUB: LazyLock<Selector> = LazyLock::new(|| selector("div.sub"));
static HEADING: LazyLock<Selector> = LazyLock::new(|| selector("h3.is-list-heading"));
static ITEM_LIST: LazyLock<Selector> = LazyLock::new(|| selector("ul.item-list"));

/// Separates genres from the director in an item's info line
const DIRECTOR_SEPARATOR: char = '•';
const GENRE_SEPARATOR: char = '/';

// =============================================================================
// Query endpoint
// =============================================================================

/// JSON envelope returned by the query endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct SearchEnvelope {
    /// Total number of matches the catalog reports (before our vote filter)
    #[serde(alias = "count")]
    pub total: u32,
    pub page: u32,
    /// HTML fragment with the result items of this page
    #[serde(alias = "items")]
    pub html: String,
}

pub fn parse_search_envelope(body: &str) -> Result<SearchEnvelope> {
    serde_json::from_str(body).map_err(|e| CatalogError::parse("search envelope", e.to_string()))
}

/// Parse all result items from a query endpoint fragment.
///
/// An empty vector means the page held no results, which is how the
/// endpoint signals the end of a result set.
pub fn parse_search_fragment(html: &str, base: &Url) -> Result<Vec<MovieRecord>> {
    let fragment = Html::parse_fragment(html);
    let records = fragment
        .select(&ITEM)
        .filter(|item| item.select(&ITEM_CONTENT).next().is_some())
        .map(|item| parse_item(item, base, "search item"))
        .collect::<Result<Vec<_>>>()?;

    debug!("Parsed {} records from search fragment", records.len());
    Ok(records)
}

// =============================================================================
// Listing pages
// =============================================================================

/// Parse a "new movies" listing page, newest section first.
///
/// Sections are read in page order and reading stops at the first section
/// whose date falls strictly before `cutoff`; items further down the page
/// are never looked at. Each record gets `added_on` set to its section date.
pub fn parse_listing_since(
    html: &str,
    base: &Url,
    today: NaiveDate,
    cutoff: NaiveDate,
) -> Result<Vec<MovieRecord>> {
    let document = Html::parse_document(html);
    let headings: Vec<ElementRef> = document.select(&HEADING).collect();
    let lists: Vec<ElementRef> = document.select(&ITEM_LIST).collect();

    if lists.len() < headings.len() {
        return Err(CatalogError::parse(
            "listing page",
            format!(
                "{} date headings but only {} item lists",
                headings.len(),
                lists.len()
            ),
        ));
    }

    let mut records = Vec::new();
    for (heading, list) in headings.into_iter().zip(lists) {
        let heading_text = text_of(heading);
        let added_on = parse_dutch_date(&heading_text, today)?;
        if added_on < cutoff {
            debug!("Reached cutoff at section '{}' ({})", heading_text, added_on);
            break;
        }

        for item in list.select(&ITEM) {
            let mut record = parse_item(item, base, "listing item")?;
            record.added_on = Some(added_on);
            records.push(record);
        }
    }

    Ok(records)
}

// =============================================================================
// Items
// =============================================================================

fn parse_item(item: ElementRef, base: &Url, context: &str) -> Result<MovieRecord> {
    let link = item
        .select(&TITLE_LINK)
        .next()
        .ok_or_else(|| CatalogError::parse(context, "missing title link"))?;
    let title = text_of(link);
    if title.is_empty() {
        return Err(CatalogError::parse(context, "empty title"));
    }
    let href = link
        .value()
        .attr("href")
        .ok_or_else(|| CatalogError::parse(context, format!("no href for '{}'", title)))?;
    // Field failures inside an item are bad markup, not bad input
    let field_error = |e: CatalogError| CatalogError::parse(context, format!("'{}': {}", title, e));
    let url = resolve_href(base, href).map_err(field_error)?;

    let rating_el = item
        .select(&RATING)
        .next()
        .ok_or_else(|| CatalogError::parse(context, format!("no rating for '{}'", title)))?;
    let rating = parse_rating(&text_of(rating_el)).map_err(field_error)?;
    let num_votes =
        parse_votes(rating_el.value().attr("title").unwrap_or_default()).map_err(field_error)?;

    let info = item.select(&INFO).next().map(text_of).unwrap_or_default();
    let (genres, director) = split_genres_and_director(&info);

    let release_year = item.select(&YEAR).next().and_then(|el| parse_year(&text_of(el)));
    let sub = item
        .select(&SUB)
        .next()
        .map(text_of)
        .filter(|s| !s.is_empty());

    Ok(MovieRecord {
        title,
        release_year,
        rating,
        num_votes,
        genres,
        director,
        url,
        service: None,
        added_on: None,
        sub,
    })
}

/// Split "Actie / Thriller • Director" into genres and an optional director.
///
/// Genres always come from the first segment, whether or not a director
/// separator is present.
pub fn split_genres_and_director(info: &str) -> (Vec<String>, Option<String>) {
    let mut parts = info.splitn(2, DIRECTOR_SEPARATOR);
    let genre_part = parts.next().unwrap_or_default();
    let director = parts
        .next()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    let genres = genre_part
        .split(GENRE_SEPARATOR)
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect();

    (genres, director)
}

/// "7.4" or "7,4"
pub fn parse_rating(text: &str) -> Result<f32> {
    let rating: f32 = text
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| CatalogError::InvalidValue {
            field: "rating".to_string(),
            value: text.to_string(),
        })?;
    if !(0.0..=10.0).contains(&rating) {
        return Err(CatalogError::InvalidValue {
            field: "rating".to_string(),
            value: text.to_string(),
        });
    }
    Ok(rating)
}

/// "12.345 stemmen" -> 12345 (dots are thousands separators)
pub fn parse_votes(title: &str) -> Result<u32> {
    let first = title.split_whitespace().next().unwrap_or_default();
    first
        .replace('.', "")
        .parse()
        .map_err(|_| CatalogError::InvalidValue {
            field: "num_votes".to_string(),
            value: title.to_string(),
        })
}

fn parse_year(text: &str) -> Option<u16> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok().filter(|y| *y >= 1800)
}

fn text_of(el: ElementRef) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.filmvandaag.nl").unwrap()
    }

    fn item(title: &str, rating: &str, votes: &str, info: &str) -> String {
        format!(
            r#"<li>
                 <div class="rating"><span title="{votes} stemmen">{rating}</span></div>
                 <div class="item-content">
                   <h4><a href="/film/1-{slug}">{title}</a> <span class="year">(2019)</span></h4>
                   <div>{info}</div>
                   <div class="sub">120 min</div>
                 </div>
               </li>"#,
            slug = title.to_lowercase().replace(' ', "-"),
        )
    }

    #[test]
    fn test_parse_search_fragment() {
        let html = format!(
            "{}{}",
            item("Parasite", "8.5", "812.345", "Drama / Thriller • Bong Joon Ho"),
            item("Host", "5.9", "980", "Horror")
        );
        let records = parse_search_fragment(&html, &base()).unwrap();

        assert_eq!(records.len(), 2);
        let parasite = &records[0];
        assert_eq!(parasite.title, "Parasite");
        assert_eq!(parasite.rating, 8.5);
        assert_eq!(parasite.num_votes, 812_345);
        assert_eq!(parasite.release_year, Some(2019));
        assert_eq!(parasite.genres, vec!["Drama", "Thriller"]);
        assert_eq!(parasite.director.as_deref(), Some("Bong Joon Ho"));
        assert_eq!(parasite.url, "https://www.filmvandaag.nl/film/1-parasite");
        assert_eq!(parasite.sub.as_deref(), Some("120 min"));

        assert_eq!(records[1].num_votes, 980);
        assert_eq!(records[1].director, None);
    }

    #[test]
    fn test_empty_fragment_has_no_records() {
        assert!(parse_search_fragment("", &base()).unwrap().is_empty());
        assert!(parse_search_fragment("<p>Geen resultaten</p>", &base()).unwrap().is_empty());
    }

    #[test]
    fn test_item_without_rating_is_an_error() {
        let html = r#"<li><div class="item-content"><h4><a href="/film/2">Broken</a></h4></div></li>"#;
        let err = parse_search_fragment(html, &base()).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));
    }

    #[test]
    fn test_unreadable_rating_or_votes_is_a_parse_error() {
        let bad_rating = r#"<li><div class="item-content"><h4><a href="/film/3">Odd</a></h4></div>
            <div class="rating"><span title="1.234 stemmen">n/a</span></div></li>"#;
        let err = parse_search_fragment(bad_rating, &base()).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }), "{:?}", err);
        assert!(err.is_retrieval());

        let bad_votes = r#"<li><div class="item-content"><h4><a href="/film/4">Odd</a></h4></div>
            <div class="rating"><span title="veel stemmen">7,1</span></div></li>"#;
        let err = parse_search_fragment(bad_votes, &base()).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }), "{:?}", err);
        assert!(err.is_retrieval());
    }

    #[test]
    fn test_genres_split_without_director() {
        let (genres, director) = split_genres_and_director("Actie / Avontuur");
        assert_eq!(genres, vec!["Actie", "Avontuur"]);
        assert_eq!(director, None);

        let (genres, director) = split_genres_and_director("Komedie • ");
        assert_eq!(genres, vec!["Komedie"]);
        assert_eq!(director, None);
    }

    #[test]
    fn test_rating_and_votes_parsing() {
        assert_eq!(parse_rating(" 7,3 ").unwrap(), 7.3);
        assert!(parse_rating("n/a").is_err());
        assert!(parse_rating("12").is_err());
        assert_eq!(parse_votes("1.234.567 stemmen").unwrap(), 1_234_567);
        assert!(parse_votes("").is_err());
    }

    #[test]
    fn test_parse_envelope() {
        let body = r#"{"total": 42, "page": 1, "html": "<li></li>"}"#;
        let envelope = parse_search_envelope(body).unwrap();
        assert_eq!(envelope.total, 42);
        assert_eq!(envelope.page, 1);
        assert_eq!(envelope.html, "<li></li>");

        assert!(parse_search_envelope("<html>").is_err());
    }

    #[test]
    fn test_listing_stops_at_cutoff() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let cutoff = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        let html = format!(
            r#"<html><body>
                <h3 class="is-list-heading">Vandaag</h3>
                <ul class="item-list">{}</ul>
                <h3 class="is-list-heading">Dinsdag 5 maart</h3>
                <ul class="item-list">{}</ul>
            </body></html>"#,
            item("Fresh", "7.1", "5.000", "Drama"),
            item("Stale", "9.0", "5.000", "Drama"),
        );

        let records = parse_listing_since(&html, &base(), today, cutoff).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Fresh");
        assert_eq!(records[0].added_on, Some(today));
    }

    #[test]
    fn test_listing_missing_lists_is_an_error() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let html = r#"<h3 class="is-list-heading">Vandaag</h3>"#;
        assert!(parse_listing_since(html, &base(), today, today).is_err());
    }
}
