//! Integration tests for the `/nieuw` dialogue.

mod common;

use bot::render::RETRIEVAL_FAILED;
use bot::{ConversationState, Keyboard, Outcome};
use catalog::{CatalogConfig, Service};
use sources::InMemoryCatalog;
use sources::memory::{item_html, listing_html};

use common::{CHAT, Harness};

#[tokio::test]
async fn test_unrecognized_service_reprompts() {
    let harness = Harness::new(InMemoryCatalog::new());
    assert_eq!(
        harness.command("nieuw").await.unwrap(),
        Outcome::Entered(ConversationState::AwaitingServices)
    );

    let outcome = harness.text("netflix foobar").await.unwrap();
    assert_eq!(
        outcome,
        Outcome::Reprompted {
            unrecognized: vec!["foobar".to_string()]
        }
    );

    let reply = harness.transport.last_sent();
    assert_eq!(reply.text, "Oeps, foobar? Probeer nog eens:");
    assert!(matches!(reply.keyboard, Some(Keyboard::Suggestions { .. })));
    assert_eq!(
        harness.engine.session_state(CHAT).await,
        Some(ConversationState::AwaitingServices)
    );
    // Nothing was fetched for the half-valid answer
    assert!(harness.catalog.requested_listings().is_empty());
}

#[tokio::test]
async fn test_nothing_recent_enough() {
    // Friday 15 March: "Vandaag" is inside the 7 day window, 5 March is not
    let listing = listing_html(&[
        ("Vandaag", vec![item_html("Meh", 5.0, 5000, 2023)]),
        ("Dinsdag 5 maart", vec![item_html("Great But Old", 8.0, 90_000, 2023)]),
    ]);
    let harness = Harness::new(InMemoryCatalog::new().with_listing(Service::Netflix, listing));
    harness.command("new").await.unwrap();

    assert_eq!(
        harness.text("netflix").await.unwrap(),
        Outcome::Entered(ConversationState::Done)
    );

    let texts = harness.transport.sent_texts();
    assert_eq!(
        &texts[texts.len() - 3..],
        &[
            "Okido. Momentje. Ik haal de films op voor netflix...".to_string(),
            "Deze films zijn de laatste 7 dagen toegevoegd en hebben een score van 6 of hoger."
                .to_string(),
            "Geen nieuwe films gevonden in afgelopen 7 dagen.".to_string(),
        ]
    );
    assert!(harness.engine.sessions().is_empty());
}

#[tokio::test]
async fn test_any_lists_all_configured_services_by_rating() {
    let config = CatalogConfig {
        services: vec![Service::Netflix, Service::Disney],
        ..CatalogConfig::default()
    };
    let netflix = listing_html(&[("Gisteren", vec![item_html("Heat", 8.3, 650_000, 1995)])]);
    let disney = listing_html(&[(
        "Vandaag",
        vec![
            item_html("Coco", 8.4, 520_000, 2017),
            item_html("Dud", 4.1, 12_000, 2023),
        ],
    )]);
    let harness = Harness::with_config(
        InMemoryCatalog::new()
            .with_listing(Service::Netflix, netflix)
            .with_listing(Service::Disney, disney),
        config,
    );

    harness.command("nieuw").await.unwrap();
    let outcome = harness.text("ANY").await.unwrap();
    assert_eq!(outcome, Outcome::Entered(ConversationState::Done));

    assert_eq!(
        harness.catalog.requested_listings(),
        vec![Service::Netflix, Service::Disney]
    );
    assert_eq!(
        harness.transport.last_sent().text,
        "Coco on disney imdb:8.4\nHeat on netflix imdb:8.3"
    );

    // The fetching notice takes the suggestion keyboard away
    let fetching = harness
        .transport
        .calls()
        .into_iter()
        .find_map(|call| match call {
            common::Call::Send { reply, .. } if reply.text.starts_with("Okido") => Some(reply),
            _ => None,
        })
        .unwrap();
    assert_eq!(fetching.text, "Okido. Momentje. Ik haal de films op voor netflix,disney...");
    assert_eq!(fetching.keyboard, Some(Keyboard::Remove));
}

#[tokio::test]
async fn test_listing_failure_is_reported_once() {
    let harness = Harness::new(InMemoryCatalog::new());
    harness.command("nieuw").await.unwrap();

    let outcome = harness.text("pathe").await.unwrap();
    assert_eq!(outcome, Outcome::Entered(ConversationState::Done));
    assert_eq!(harness.transport.count_sent(RETRIEVAL_FAILED), 1);
    assert!(harness.engine.sessions().is_empty());

    // Further text goes nowhere
    assert_eq!(harness.text("netflix").await.unwrap(), Outcome::Ignored);
}

#[tokio::test]
async fn test_cancel_removes_suggestions() {
    let harness = Harness::new(InMemoryCatalog::new());
    harness.command("nieuw").await.unwrap();

    assert_eq!(
        harness.command("cancel").await.unwrap(),
        Outcome::Entered(ConversationState::Cancelled)
    );
    let reply = harness.transport.last_sent();
    assert_eq!(reply.text, "Oke, dan niet.");
    assert_eq!(reply.keyboard, Some(Keyboard::Remove));
}
