//! # sunline
//!
//! Finds a live outdoor camera sitting on the current sunrise or sunset
//! line and prints a link to its feed.
//!
//! ## Usage
//!
//! ```sh
//! sunline --gazetteer ./cities500.txt best
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Crawling**: discover `(name, feed)` pairs on the camera network
//!    (or replay a saved crawl)
//! 2. **Resolution**: map each name to a longitude via the gazetteer, dropping
//!    the ones that don't resolve
//! 3. **Lookup**: estimate the terminator longitude for now and pick the
//!    nearest camera
//!
//! Steps 1 and 2 run once per session and are cached; step 3 is cheap and
//! repeatable.

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod country;
mod error;
mod gazetteer;
mod lookup;
mod models;
mod outputs;
mod registry;
mod resolver;
mod scrapers;
mod search;
mod session;
mod terminator;
mod utils;

use cli::{Cli, Command};
use config::CrawlConfig;
use error::{CrawlError, LookupError};
use gazetteer::Gazetteer;
use models::{LookupOutcome, RawLocation, SunEvent};
use outputs::{json, report};
use resolver::PlaceResolver;
#[cfg(feature = "browser")]
use scrapers::ChromiumFetcher;
use scrapers::{HttpFetcher, earthcam};
use session::Session;

/// Where a session's raw camera list comes from.
enum CameraSource {
    Saved(Vec<RawLocation>),
    Network(CrawlConfig),
}

impl CameraSource {
    async fn collect(&self) -> Result<Vec<RawLocation>, CrawlError> {
        match self {
            CameraSource::Saved(locations) => Ok(locations.clone()),
            CameraSource::Network(config) => crawl_network(config).await,
        }
    }
}

#[cfg(feature = "browser")]
async fn crawl_network(config: &CrawlConfig) -> Result<Vec<RawLocation>, CrawlError> {
    match ChromiumFetcher::launch(config).await {
        Ok(fetcher) => earthcam::crawl(fetcher, config).await,
        Err(e) => {
            warn!(error = %e, "Chromium unavailable; falling back to plain HTTP");
            crawl_over_http(config).await
        }
    }
}

#[cfg(not(feature = "browser"))]
async fn crawl_network(config: &CrawlConfig) -> Result<Vec<RawLocation>, CrawlError> {
    warn!("Built without the `browser` feature; pages that render client side will time out");
    crawl_over_http(config).await
}

async fn crawl_over_http(config: &CrawlConfig) -> Result<Vec<RawLocation>, CrawlError> {
    let fetcher = HttpFetcher::new(config).map_err(CrawlError::Fetcher)?;
    earthcam::crawl(fetcher, config).await
}

#[instrument(level = "info", skip(config))]
async fn crawl_and_save(config: &CrawlConfig, output: &str) -> Result<(), Box<dyn Error>> {
    let locations = match crawl_network(config).await {
        Ok(locations) => locations,
        Err(e) => {
            error!(error = %e, "Crawl failed");
            eprintln!("{e}");
            return Err(e.into());
        }
    };
    json::write_locations(&locations, output).await?;
    info!(count = locations.len(), "Crawl saved");
    Ok(())
}

/// What a lookup prints; `best` has its own not-found message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    Event(SunEvent),
    Best,
}

fn run_lookup(session: &Session, lookup: Lookup) -> Result<LookupOutcome, LookupError> {
    let now = Utc::now();
    info!(utc_now = %now, ?lookup, "Loading location");
    match lookup {
        Lookup::Event(SunEvent::Sunrise) => session.load_sunrise(now),
        Lookup::Event(SunEvent::Sunset) => session.load_sunset(now),
        Lookup::Best => session.load_best(now),
    }
}

fn print_outcome(outcome: &LookupOutcome, lookup: Lookup, as_json: bool) -> Result<(), Box<dyn Error>> {
    if as_json {
        println!("{}", report::render_json(outcome)?);
    } else if lookup == Lookup::Best && !outcome.found {
        println!("{}", report::render_best_not_found());
    } else {
        println!("Utc now: {}", outcome.utc_now);
        println!("{}", report::render_text(outcome));
    }
    Ok(())
}

/// Build the registry if needed, then run one lookup.
#[instrument(level = "info", skip(session, source))]
async fn build_and_lookup(
    session: &Session,
    source: &CameraSource,
    lookup: Lookup,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let registry = session.ensure_built(|| source.collect()).await?;
    if registry.is_empty() {
        warn!("No camera could be placed on the map; check the gazetteer");
    } else {
        debug!(cameras = registry.len(), "Registry ready");
    }
    if let Some(report) = session.report() {
        info!(resolved = report.resolved, dropped = report.dropped, "Cameras found: {}", report.resolved);
    }
    let outcome = run_lookup(session, lookup)?;
    print_outcome(&outcome, lookup, as_json)
}

#[instrument(level = "info", skip_all)]
async fn interactive(mut session: Session, source: CameraSource, as_json: bool) -> Result<(), Box<dyn Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Commands: sunrise, sunset, best, reset, quit");

    while let Some(line) = lines.next_line().await? {
        let lookup = match line.trim().to_lowercase().as_str() {
            "" => continue,
            "sunrise" => Lookup::Event(SunEvent::Sunrise),
            "sunset" => Lookup::Event(SunEvent::Sunset),
            "best" => Lookup::Best,
            "reset" => {
                session.reset();
                println!("Session reset; cameras will be found again on the next lookup");
                continue;
            }
            "quit" | "exit" => break,
            other => {
                println!("Unknown command: {other}");
                continue;
            }
        };

        // Failures are reported and the session stays usable.
        if let Err(e) = build_and_lookup(&session, &source, lookup, as_json).await {
            error!(error = %e, "Lookup failed");
            eprintln!("{e}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = CrawlConfig::load(args.config.as_deref()).await?;

    let lookup = match &args.command {
        Command::Crawl { output } => return crawl_and_save(&config, output).await,
        Command::Sunrise => Some(Lookup::Event(SunEvent::Sunrise)),
        Command::Sunset => Some(Lookup::Event(SunEvent::Sunset)),
        Command::Best => Some(Lookup::Best),
        Command::Interactive => None,
    };

    let gazetteer = match Gazetteer::load(&args.gazetteer).await {
        Ok(gazetteer) => gazetteer,
        Err(e) => {
            error!(error = %e, "Cannot resolve camera locations without a gazetteer");
            return Err(e.into());
        }
    };
    let session = Session::new(PlaceResolver::new(gazetteer));
    debug!(state = ?session.state(), "Session created");

    let source = match &args.locations {
        Some(path) => CameraSource::Saved(json::read_locations(path).await?),
        None => CameraSource::Network(config),
    };

    let Some(lookup) = lookup else {
        return interactive(session, source, args.json).await;
    };

    if let Err(e) = build_and_lookup(&session, &source, lookup, args.json).await {
        error!(error = %e, "Lookup failed");
        eprintln!("{e}");
        return Err(e);
    }

    let elapsed = start_time.elapsed();
    if elapsed.as_secs() > 60 {
        warn!(?elapsed, "Camera discovery was slow; consider saving a crawl with `crawl --output`");
    }
    info!(?elapsed, "Execution complete");
    Ok(())
}
