//! Example: Page through a search without touching the network
//!
//! Run with: cargo run --package sources --example offline_search
//!
//! This example shows how to:
//! 1. Build a filter the way the chat dialogue does
//! 2. Open a lazy search stream over an in-memory catalog
//! 3. Pull results in batches until the catalog runs dry

use std::sync::Arc;

use catalog::{CatalogConfig, FilterSpecBuilder};
use sources::memory::item_html;
use sources::{BatchEnd, InMemoryCatalog, SearchSource, next_batch};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt().with_env_filter("debug").init();

    println!("=== Offline Search Example ===\n");

    let pages = (0..3)
        .map(|p| {
            (0..8)
                .map(|i| item_html(&format!("Movie {}-{}", p, i), 8.0 - i as f32 * 0.2, 500 * (i + 1), 2020))
                .collect::<String>()
        })
        .collect();
    let catalog = Arc::new(InMemoryCatalog::new().with_search_pages(pages));

    let config = CatalogConfig::default();
    let mut builder = FilterSpecBuilder::new();
    builder.add_genre("actie");
    builder.set_min_imdb_score(Some(7.0));
    let spec = builder.build(&config, 2024)?;

    let source = SearchSource::new(catalog.clone(), &config);
    println!("Browser link: {}\n", source.browser_url(&spec)?);

    let mut stream = source.open(spec);
    let mut batch_no = 1;
    loop {
        let batch = next_batch(&mut stream, 5).await;
        println!("Batch {}:", batch_no);
        for record in &batch.records {
            println!("  {} {} imdb:{} ({} votes)", record.title, record.year_label(), record.rating, record.num_votes);
        }

        match batch.end {
            BatchEnd::Full => batch_no += 1,
            BatchEnd::Exhausted => {
                println!("\nDone, pages requested: {:?}", catalog.requested_pages());
                break;
            }
            BatchEnd::Failed(err) => return Err(err.into()),
        }
    }

    Ok(())
}
