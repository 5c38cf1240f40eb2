//! Dutch texts and menus shown to users.
//!
//! Everything here is a pure function from engine data to `Reply`s, so the
//! wording can be checked without a chat.

use catalog::{CatalogConfig, FilterSpecBuilder, MovieRecord, Service};
use url::Url;

use crate::intent::Intent;
use crate::reply::{Button, Keyboard, Reply};

/// Label for "no preference" in the score and year menus
pub const NO_PREFERENCE: &str = "boeiend";
pub const CANCEL_LABEL: &str = "Stop maar";
pub const CONTINUE_LABEL: &str = "verder";
pub const MORE_LABEL: &str = "meer";

pub const END_OF_RESULTS: &str = "dat was het.";
pub const CANCELLED: &str = "Oke, dan niet.";
pub const TIMED_OUT: &str = "Duurt laaaaang.";
pub const RETRIEVAL_FAILED: &str =
    "Sorry, het ophalen van de films is mislukt. Probeer het later nog eens.";

/// Score thresholds offered besides "no preference"
pub const SCORE_CHOICES: [u8; 4] = [5, 6, 7, 8];

/// Year thresholds offered besides "no preference" and the current year
const YEARS_BACK: [u16; 3] = [20, 5, 2];

const GENRES_PER_ROW: usize = 3;

/// Leaves room under Telegram's 4096 character limit
const MAX_REPLY_CHARS: usize = 4000;

pub fn help() -> Reply {
    Reply::text(
        "Hoi! Ik zoek films op de streamingdiensten voor je.\n\
         /zoek - films zoeken op genre, IMDB-score en jaar\n\
         /nieuw - films die de laatste dagen zijn toegevoegd\n\
         /cancel - stoppen",
    )
}

fn cancel_row() -> Vec<Button> {
    vec![Button::new(CANCEL_LABEL, Intent::Cancel)]
}

fn genres_label(filter: &FilterSpecBuilder) -> String {
    if filter.genres().is_empty() {
        "alle".to_string()
    } else {
        filter.genres().join(", ")
    }
}

fn score_label(score: Option<f32>) -> String {
    score
        .map(|s| format!("{}+", s))
        .unwrap_or_else(|| NO_PREFERENCE.to_string())
}

/// Genre menu: every genre not chosen yet, then "continue" and "cancel"
pub fn genre_prompt(config: &CatalogConfig, filter: &FilterSpecBuilder) -> Reply {
    let text = if filter.genres().is_empty() {
        "Oke, ik ga films zoeken. Welke genres?".to_string()
    } else {
        format!(
            "Genres: {}.\nNog een genre? Kies '{}' als je klaar bent.",
            genres_label(filter),
            CONTINUE_LABEL
        )
    };

    let remaining: Vec<Button> = config
        .genre_choices()
        .into_iter()
        .filter(|tag| !filter.genres().iter().any(|g| g == tag))
        .map(|tag| Button::new(tag, Intent::SelectGenre(tag.to_string())))
        .collect();

    let mut rows: Vec<Vec<Button>> = remaining
        .chunks(GENRES_PER_ROW)
        .map(<[Button]>::to_vec)
        .collect();
    rows.push(vec![
        Button::new(CONTINUE_LABEL, Intent::Continue),
        Button::new(CANCEL_LABEL, Intent::Cancel),
    ]);

    Reply::with_buttons(text, rows)
}

pub fn score_menu(filter: &FilterSpecBuilder) -> Reply {
    let text = format!(
        "Genres: {}.\nWat moet de IMDB-score zijn?",
        genres_label(filter)
    );
    let rows = vec![
        vec![Button::new(NO_PREFERENCE, Intent::SelectScore(None))],
        SCORE_CHOICES
            .iter()
            .map(|n| Button::new(format!("{}+", n), Intent::SelectScore(Some(*n))))
            .collect(),
        cancel_row(),
    ];
    Reply::with_buttons(text, rows)
}

pub fn year_menu(filter: &FilterSpecBuilder, current_year: u16) -> Reply {
    let text = format!(
        "Genres: {}.\nIMDB-score: {}\nHoe recent moet de film zijn?",
        genres_label(filter),
        score_label(filter.min_imdb_score())
    );

    let mut rows = vec![vec![Button::new(NO_PREFERENCE, Intent::SelectYear(None))]];
    for back in YEARS_BACK {
        let year = current_year.saturating_sub(back);
        rows.push(vec![Button::new(format!("> {}", year), Intent::SelectYear(Some(year)))]);
    }
    rows.push(vec![Button::new(
        current_year.to_string(),
        Intent::SelectYear(Some(current_year)),
    )]);
    rows.push(cancel_row());

    Reply::with_buttons(text, rows)
}

/// Recap of the finished filter with a link to the same search on the site
pub fn search_summary(filter: &FilterSpecBuilder, browser_url: &Url) -> Reply {
    let year = filter
        .min_release_year()
        .map(|y| y.to_string())
        .unwrap_or_else(|| NO_PREFERENCE.to_string());
    Reply::text(format!(
        "Genres: {}\nIMDB-score: {}\nUitgekomen na: {}\n{}",
        genres_label(filter),
        score_label(filter.min_imdb_score()),
        year,
        browser_url
    ))
}

/// One entry per record: `<title> (<year>) imdb <rating>` and the link
pub fn batch_text(records: &[MovieRecord]) -> String {
    records
        .iter()
        .map(|r| format!("{} ({}) imdb {:.1}\n{}", r.title, r.year_label(), r.rating, r.url))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A full batch, with the button for the next one
pub fn batch_with_more(text: &str, batch: u32) -> Reply {
    Reply::with_buttons(text, vec![vec![Button::new(MORE_LABEL, Intent::ShowMore(batch))]])
}

/// The last batch (possibly empty) with the end-of-results notice
pub fn final_batch(text: &str) -> Reply {
    if text.is_empty() {
        Reply::text(END_OF_RESULTS)
    } else {
        Reply::text(format!("{}\n\n{}", text, END_OF_RESULTS))
    }
}

fn service_suggestions(config: &CatalogConfig) -> Keyboard {
    let mut keys: Vec<String> = config.services.iter().map(|s| s.key().to_string()).collect();
    keys.push("any".to_string());
    Keyboard::Suggestions {
        rows: vec![keys],
        placeholder: Some("Streamingdienst".to_string()),
    }
}

pub fn services_prompt(config: &CatalogConfig) -> Reply {
    Reply::text("Oke, laatste toegevoegde films dus. Welke streamingdienst?")
        .with_keyboard(service_suggestions(config))
}

/// Re-prompt naming the tokens we did not understand
pub fn services_rejected(config: &CatalogConfig, unrecognized: &[String]) -> Reply {
    Reply::text(format!("Oeps, {}? Probeer nog eens:", unrecognized.join(",")))
        .with_keyboard(service_suggestions(config))
}

pub fn fetching_new_releases(services: &[Service]) -> Reply {
    let names: Vec<&str> = services.iter().map(|s| s.key()).collect();
    Reply::text(format!(
        "Okido. Momentje. Ik haal de films op voor {}...",
        names.join(",")
    ))
    .with_keyboard(Keyboard::Remove)
}

pub fn new_releases_header(days: u32, min_rating: f32) -> Reply {
    Reply::text(format!(
        "Deze films zijn de laatste {} dagen toegevoegd en hebben een score van {} of hoger.",
        days, min_rating
    ))
}

/// The new releases, split over as many messages as needed
pub fn new_releases_list(records: &[MovieRecord], days: u32) -> Vec<Reply> {
    if records.is_empty() {
        return vec![Reply::text(format!(
            "Geen nieuwe films gevonden in afgelopen {} dagen.",
            days
        ))];
    }

    let lines = records.iter().map(|r| {
        let service = r.service.map(|s| s.key()).unwrap_or("?");
        format!("{} on {} imdb:{:.1}", r.title, service, r.rating)
    });
    pack_lines(lines, MAX_REPLY_CHARS)
        .into_iter()
        .map(Reply::text)
        .collect()
}

/// Join lines into texts of at most `max_chars` characters each.
///
/// A single line longer than the limit gets a text of its own.
fn pack_lines(lines: impl Iterator<Item = String>, max_chars: usize) -> Vec<String> {
    let mut texts = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for line in lines {
        let line_chars = line.chars().count();
        if !current.is_empty() && current_chars + 1 + line_chars > max_chars {
            texts.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        if !current.is_empty() {
            current.push('\n');
            current_chars += 1;
        }
        current.push_str(&line);
        current_chars += line_chars;
    }
    if !current.is_empty() {
        texts.push(current);
    }
    texts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, rating: f32) -> MovieRecord {
        MovieRecord {
            title: title.to_string(),
            release_year: Some(2019),
            rating,
            num_votes: 5000,
            genres: vec![],
            director: None,
            url: format!("https://www.filmvandaag.nl/film/{}", title),
            service: Some(Service::Netflix),
            added_on: None,
            sub: None,
        }
    }

    #[test]
    fn test_genre_prompt_hides_chosen_genres() {
        let config = CatalogConfig::default();
        let mut filter = FilterSpecBuilder::new();

        let first = genre_prompt(&config, &filter);
        assert_eq!(first.text, "Oke, ik ga films zoeken. Welke genres?");
        assert!(first.intents().contains(&&Intent::SelectGenre("horror".into())));
        assert!(first.intents().contains(&&Intent::SelectGenre("overig".into())));

        filter.add_genre("horror");
        let second = genre_prompt(&config, &filter);
        assert!(second.text.starts_with("Genres: horror."));
        assert!(!second.intents().contains(&&Intent::SelectGenre("horror".into())));
        assert!(second.intents().contains(&&Intent::Continue));
        assert!(second.intents().contains(&&Intent::Cancel));
    }

    #[test]
    fn test_score_menu_choices() {
        let intents: Vec<Intent> = score_menu(&FilterSpecBuilder::new())
            .intents()
            .into_iter()
            .cloned()
            .collect();
        assert_eq!(
            intents,
            vec![
                Intent::SelectScore(None),
                Intent::SelectScore(Some(5)),
                Intent::SelectScore(Some(6)),
                Intent::SelectScore(Some(7)),
                Intent::SelectScore(Some(8)),
                Intent::Cancel,
            ]
        );
    }

    #[test]
    fn test_year_menu_relative_to_current_year() {
        let mut filter = FilterSpecBuilder::new();
        filter.set_min_imdb_score(Some(7.0));
        let menu = year_menu(&filter, 2024);

        assert!(menu.text.contains("IMDB-score: 7+"));
        let intents: Vec<Intent> = menu.intents().into_iter().cloned().collect();
        assert_eq!(
            intents,
            vec![
                Intent::SelectYear(None),
                Intent::SelectYear(Some(2004)),
                Intent::SelectYear(Some(2019)),
                Intent::SelectYear(Some(2022)),
                Intent::SelectYear(Some(2024)),
                Intent::Cancel,
            ]
        );
    }

    #[test]
    fn test_batch_rendering() {
        let text = batch_text(&[record("Heat", 8.3), record("Coco", 8.4)]);
        assert_eq!(
            text,
            "Heat (2019) imdb 8.3\nhttps://www.filmvandaag.nl/film/Heat\n\
             Coco (2019) imdb 8.4\nhttps://www.filmvandaag.nl/film/Coco"
        );
        assert_eq!(batch_with_more(&text, 2).intents(), vec![&Intent::ShowMore(2)]);
        assert_eq!(final_batch("").text, END_OF_RESULTS);
        assert!(final_batch(&text).text.ends_with("\n\ndat was het."));
    }

    #[test]
    fn test_new_releases_texts() {
        assert_eq!(
            new_releases_list(&[], 7),
            vec![Reply::text("Geen nieuwe films gevonden in afgelopen 7 dagen.")]
        );
        assert_eq!(
            new_releases_list(&[record("Heat", 8.3)], 7),
            vec![Reply::text("Heat on netflix imdb:8.3")]
        );
        assert_eq!(
            new_releases_header(7, 6.0).text,
            "Deze films zijn de laatste 7 dagen toegevoegd en hebben een score van 6 of hoger."
        );
        assert_eq!(
            services_rejected(&CatalogConfig::default(), &["foobar".to_string()]).text,
            "Oeps, foobar? Probeer nog eens:"
        );
    }

    #[test]
    fn test_long_lists_are_split() {
        let lines = (0..100).map(|i| format!("{:0>49}", i));
        let texts = pack_lines(lines, 500);
        assert_eq!(texts.len(), 10);
        assert!(texts.iter().all(|t| t.chars().count() <= 500));
        assert_eq!(texts[0].lines().count(), 10);
    }
}
