//! Dutch date headings used on the catalog's listing pages.
//!
//! Headings come in a few shapes:
//! - "Vandaag", "Gisteren", "Eergisteren"
//! - "Maandag 12 oktober"
//! - "12 okt 2023"
//!
//! A heading without a year is taken to be the most recent such date that
//! is not in the future.

use chrono::{Datelike, Duration, NaiveDate};

use crate::error::{CatalogError, Result};

const MONTHS: [(&str, u32); 12] = [
    ("januari", 1),
    ("februari", 2),
    ("maart", 3),
    ("april", 4),
    ("mei", 5),
    ("juni", 6),
    ("juli", 7),
    ("augustus", 8),
    ("september", 9),
    ("oktober", 10),
    ("november", 11),
    ("december", 12),
];

/// Parse a listing heading relative to `today`.
pub fn parse_dutch_date(text: &str, today: NaiveDate) -> Result<NaiveDate> {
    let lower = text.trim().to_lowercase();

    // "eergisteren" contains "gisteren", check it first
    if lower.contains("eergisteren") {
        return Ok(today - Duration::days(2));
    }
    if lower.contains("gisteren") {
        return Ok(today - Duration::days(1));
    }
    if lower.contains("vandaag") {
        return Ok(today);
    }

    let tokens: Vec<&str> = lower
        .split(|c: char| c.is_whitespace() || c == ',' || c == '.')
        .filter(|t| !t.is_empty())
        .collect();

    let (day_idx, day) = tokens
        .iter()
        .enumerate()
        .find_map(|(i, t)| t.parse::<u32>().ok().filter(|d| (1..=31).contains(d)).map(|d| (i, d)))
        .ok_or_else(|| CatalogError::parse("date heading", format!("no day in '{}'", text)))?;

    let month = tokens
        .get(day_idx + 1)
        .and_then(|t| month_number(t))
        .ok_or_else(|| CatalogError::parse("date heading", format!("no month in '{}'", text)))?;

    let explicit_year = tokens
        .get(day_idx + 2)
        .and_then(|t| t.parse::<i32>().ok())
        .filter(|y| *y >= 1900);

    match explicit_year {
        Some(year) => date(year, month, day, text),
        None => {
            let candidate = date(today.year(), month, day, text)?;
            if candidate > today {
                date(today.year() - 1, month, day, text)
            } else {
                Ok(candidate)
            }
        }
    }
}

/// Full month names and their common abbreviations ("okt", "mrt", "sept")
fn month_number(token: &str) -> Option<u32> {
    if token == "mrt" {
        return Some(3);
    }
    if token.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .find(|(name, _)| name.starts_with(token) || token == *name)
        .map(|(_, n)| *n)
}

fn date(year: i32, month: u32, day: u32, text: &str) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| CatalogError::parse("date heading", format!("impossible date '{}'", text)))
}
