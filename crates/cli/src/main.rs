use anyhow::{Context, Result, bail};
use chrono::{Datelike, Local};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;
use url::Url;

use bot::{
    ConversationEngine, Dispatcher, EngineSettings, LogSink, NotificationSink, TelegramAlertSink,
    TelegramTransport,
};
use catalog::config::DEFAULT_BASE_URL;
use catalog::{CatalogConfig, FilterSpecBuilder, MovieRecord, Service, ServiceChoice};
use sources::{BatchEnd, HttpCatalogClient, NewReleasesSource, SearchSource, next_batch};
use telegram_client::{AlertBot, ChatTarget, TelegramClient};

const PROGRAM_NAME: &str = "fv-bot";

/// fv-bot - movie search bot for filmvandaag.nl
#[derive(Parser)]
#[command(name = "fv-bot", version)]
#[command(about = "Telegram bot that searches the filmvandaag.nl streaming catalog", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    catalog: CatalogArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Lookup tables shared by every subcommand
#[derive(Args, Debug)]
struct CatalogArgs {
    /// Streaming services users may pick
    #[arg(
        long,
        env = "FV_SERVICES",
        value_delimiter = ',',
        default_value = "netflix,prime,pathe,disney",
        global = true
    )]
    services: Vec<Service>,

    /// Genre tags offered in the search dialogue (built-in list when empty)
    #[arg(long, env = "FV_GENRES", value_delimiter = ',', global = true)]
    genres: Vec<String>,

    /// Drop records with fewer IMDB votes
    #[arg(long, env = "IMDB_VOTES_THRESHOLD", default_value = "1000", global = true)]
    votes_threshold: u32,

    /// How many days back the new releases go
    #[arg(long, env = "NEW_MOVIES_THRESHOLD_DAYS", default_value = "7", global = true)]
    new_days: u32,

    /// Drop new releases rated below this
    #[arg(long, env = "NEW_MOVIES_MIN_RATING", default_value = "6.0", global = true)]
    new_min_rating: f32,

    /// Catalog site root
    #[arg(long, env = "FV_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    catalog_base_url: Url,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the chat bot until interrupted
    Run(RunArgs),

    /// Run a search from the terminal and print the results
    Search {
        /// Genre tag, repeat for more
        #[arg(long)]
        genre: Vec<String>,

        /// Minimum IMDB score
        #[arg(long)]
        min_score: Option<u8>,

        /// Minimum release year
        #[arg(long)]
        min_year: Option<u16>,

        /// Restrict to a service, repeat for more (all configured when absent)
        #[arg(long)]
        service: Vec<Service>,

        /// Number of records to print
        #[arg(long, default_value = "40")]
        limit: usize,
    },

    /// Print the movies recently added to one or more services
    New {
        /// Service, repeat for more (all configured when absent)
        #[arg(long)]
        service: Vec<Service>,

        /// Override the day window
        #[arg(long)]
        days: Option<u32>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Chat bot token
    #[arg(long, env = "TG_FV_BOT_TOKEN", hide_env_values = true)]
    bot_token: String,

    /// Token of the bot that posts operational alerts
    #[arg(long, env = "TG_ALERT_BOT_TOKEN", hide_env_values = true)]
    alert_bot_token: Option<String>,

    /// Chat id or @channel receiving the alerts
    #[arg(long, env = "TG_ALERT_CHANNEL")]
    alert_channel: Option<String>,

    /// Instance label shown in alerts
    #[arg(long, env = "TG_ALERT_INSTANCE_NAME", default_value = "default")]
    instance_name: String,

    /// Seconds of silence before a conversation is dropped
    #[arg(long, env = "CONV_TIMEOUT", default_value = "30")]
    idle_timeout_secs: u64,

    /// Long-poll timeout for fetching updates
    #[arg(long, default_value = "2")]
    poll_interval_secs: u64,
}

impl CatalogArgs {
    /// Build and validate the catalog lookup tables
    fn into_config(self) -> Result<CatalogConfig> {
        let mut config = CatalogConfig {
            base_url: self.catalog_base_url,
            services: self.services,
            votes_threshold: self.votes_threshold,
            new_releases_days: self.new_days,
            new_releases_min_rating: self.new_min_rating,
            ..CatalogConfig::default()
        };
        let genres: Vec<String> = self
            .genres
            .iter()
            .map(|g| g.trim().to_lowercase())
            .filter(|g| !g.is_empty())
            .collect();
        if !genres.is_empty() {
            config.genres = genres;
        }

        config.validate().context("Invalid catalog configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Run(args) => {
            let sink = build_sink(&args)?;
            handle_run(sink.as_ref(), cli.catalog, &args).await?
        }
        Commands::Search {
            genre,
            min_score,
            min_year,
            service,
            limit,
        } => {
            let config = cli.catalog.into_config()?;
            handle_search(config, genre, min_score, min_year, service, limit).await?
        }
        Commands::New { service, days } => {
            handle_new(cli.catalog.into_config()?, service, days).await?
        }
    }

    Ok(())
}

// =============================================================================
// Bot
// =============================================================================

/// Handle the 'run' command
///
/// Any way out of the bot is a fault: a bad configuration, a rejected
/// token, a signal. The alert sink hears about it before the process
/// exits non-zero.
async fn handle_run(sink: &dyn NotificationSink, catalog: CatalogArgs, args: &RunArgs) -> Result<()> {
    sink.info("Program started.").await;

    let result = match catalog.into_config() {
        Ok(config) => run_bot(config, args).await,
        Err(err) => Err(err),
    };
    if let Err(err) = &result {
        sink.error(&format!("A fatal exception occurred: {:#}", err)).await;
    }

    sink.info("Program ended.").await;
    result
}

fn build_sink(args: &RunArgs) -> Result<Arc<dyn NotificationSink>> {
    let Some(token) = &args.alert_bot_token else {
        info!("No alert bot configured, alerts go to the log");
        return Ok(Arc::new(LogSink));
    };
    let Some(channel) = &args.alert_channel else {
        bail!("--alert-channel is required when an alert bot token is set");
    };

    let target = match channel.parse::<i64>() {
        Ok(id) => ChatTarget::Id(id),
        Err(_) => ChatTarget::from(channel.as_str()),
    };
    let client = TelegramClient::new(token.as_str()).context("Failed to create alert bot client")?;
    let bot = AlertBot::new(client, target, PROGRAM_NAME, args.instance_name.as_str());
    Ok(Arc::new(TelegramAlertSink::new(bot)))
}

async fn run_bot(config: CatalogConfig, args: &RunArgs) -> Result<()> {
    let client = TelegramClient::new(args.bot_token.as_str()).context("Failed to create bot client")?;
    let name = client.get_me().await.context("Bot token was not accepted")?;
    info!("Logged in as {}", name);

    let catalog = Arc::new(
        HttpCatalogClient::new(config.base_url.clone()).context("Failed to create catalog client")?,
    );
    let transport = Arc::new(TelegramTransport::new(client.clone()));
    let settings = EngineSettings {
        idle_timeout: Duration::from_secs(args.idle_timeout_secs),
        ..EngineSettings::default()
    };
    let engine = ConversationEngine::new(config, catalog, transport, settings);
    let dispatcher = Dispatcher::new(client, engine, Duration::from_secs(args.poll_interval_secs));

    let shutdown = CancellationToken::new();
    let mut polling = tokio::spawn(dispatcher.run(shutdown.clone()));

    tokio::select! {
        joined = &mut polling => {
            joined
                .context("Dispatcher task panicked")?
                .context("Polling for updates failed")?;
            Ok(())
        }
        signal = shutdown_signal() => {
            let signal = signal?;
            shutdown.cancel();
            let _ = polling.await;
            bail!("Received {}", signal)
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate()).context("Failed to listen for SIGTERM")?;
    tokio::select! {
        interrupted = tokio::signal::ctrl_c() => {
            interrupted.context("Failed to listen for Ctrl-C")?;
            Ok("SIGINT")
        }
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    Ok("Ctrl-C")
}

// =============================================================================
// Offline diagnostics
// =============================================================================

/// Handle the 'search' command
async fn handle_search(
    config: CatalogConfig,
    genres: Vec<String>,
    min_score: Option<u8>,
    min_year: Option<u16>,
    services: Vec<Service>,
    limit: usize,
) -> Result<()> {
    let mut filter = FilterSpecBuilder::new();
    if !services.is_empty() {
        filter = filter.services(ServiceChoice::Only(services));
    }
    for genre in genres {
        filter.add_genre(genre.to_lowercase());
    }
    filter.set_min_imdb_score(min_score.map(f32::from));
    filter.set_min_release_year(min_year);

    let current_year = u16::try_from(Local::now().year()).context("Current year out of range")?;
    let spec = filter
        .build(&config, current_year)
        .context("Invalid search filter")?;

    let client = Arc::new(
        HttpCatalogClient::new(config.base_url.clone()).context("Failed to create catalog client")?,
    );
    let source = SearchSource::new(client, &config);
    println!("{} {}", "Browse:".bold(), source.browser_url(&spec)?);

    let start = Instant::now();
    let mut stream = source.open(spec);
    let batch = next_batch(&mut stream, limit).await;

    print!("{}", "Search results:\n".bold().blue());
    for (rank, record) in batch.records.iter().enumerate() {
        print_record(rank + 1, record);
    }

    match batch.end {
        BatchEnd::Full => println!("{} more available", "…".dimmed()),
        BatchEnd::Exhausted => println!("{}", "dat was het.".dimmed()),
        BatchEnd::Failed(err) => {
            return Err(err).with_context(|| {
                format!("Retrieval failed after {} records", batch.records.len())
            });
        }
    }
    println!(
        "{} {} records in {:?}",
        "✓".green(),
        batch.records.len(),
        start.elapsed()
    );
    Ok(())
}

/// Handle the 'new' command
async fn handle_new(mut config: CatalogConfig, services: Vec<Service>, days: Option<u32>) -> Result<()> {
    if let Some(days) = days {
        config.new_releases_days = days;
        config.validate().context("Invalid day window")?;
    }
    let services = if services.is_empty() {
        config.services.clone()
    } else {
        services
    };

    let client = Arc::new(
        HttpCatalogClient::new(config.base_url.clone()).context("Failed to create catalog client")?,
    );
    let source = NewReleasesSource::new(client, &config);
    let records = source
        .fetch(&services, Local::now().date_naive())
        .await
        .context("Retrieving new releases failed")?;

    println!(
        "{}",
        format!(
            "Added in the last {} days, rated {} or higher:",
            source.days(),
            config.new_releases_min_rating
        )
        .bold()
        .blue()
    );
    if records.is_empty() {
        println!("{}", "Nothing found.".dimmed());
    }
    for (rank, record) in records.iter().enumerate() {
        print_record(rank + 1, record);
    }
    Ok(())
}

fn print_record(rank: usize, record: &MovieRecord) {
    let rating = format!("{:.1}", record.rating);
    let rating = if record.rating >= 8.0 {
        rating.green()
    } else if record.rating >= 7.0 {
        rating.yellow()
    } else {
        rating.normal()
    };
    let service = record
        .service
        .map(|s| format!(" on {}", s))
        .unwrap_or_default();

    println!(
        "{}. {} ({}){} - imdb {} ({} votes)",
        rank.to_string().green(),
        record.title,
        record.year_label(),
        service,
        rating,
        record.num_votes
    );
    if !record.genres.is_empty() {
        println!("   {}", record.genres.join(", ").dimmed());
    }
    println!("   {}", record.url);
}
