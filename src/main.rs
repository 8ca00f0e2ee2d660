//! Immo-Scout main entry point
//!
//! This is the command-line interface for the Immo-Scout listing watcher.

use anyhow::Context;
use clap::Parser;
use immo_scout::config::{load_config_with_hash, validate, Config};
use immo_scout::output::{compute_statistics, print_listings, print_statistics, write_json_lines};
use immo_scout::{ScanScheduler, TracingReporter};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Immo-Scout: a polite private-seller listing watcher
///
/// Immo-Scout polls real-estate search pages in a slow, randomized rhythm,
/// visits every listing it finds and keeps the offers sold without an agent.
/// Press Ctrl-C to stop; the collected listings are printed on exit.
#[derive(Parser, Debug)]
#[command(name = "immo-scout")]
#[command(version = "1.0.0")]
#[command(about = "A polite private-seller listing watcher", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be scanned without scanning
    #[arg(long)]
    dry_run: bool,

    /// Seed for category order, identities and pauses
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Number of recent listings printed on exit
    #[arg(long, value_name = "N", default_value_t = 20)]
    recent: usize,

    /// Print listings as JSON lines instead of a table
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using built-in defaults");
            let config = Config::default();
            validate(&config)?;
            config
        }
    };

    let mut scheduler = ScanScheduler::new(config.clone())?;
    if let Some(seed) = cli.seed {
        tracing::info!("Using fixed random seed {}", seed);
        scheduler = scheduler.with_rng(StdRng::seed_from_u64(seed));
    }

    if cli.dry_run {
        handle_dry_run(&config, &scheduler);
        return Ok(());
    }

    handle_scan(&scheduler, cli.recent, cli.json).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("immo_scout=info,warn"),
            1 => EnvFilter::new("immo_scout=debug,info"),
            2 => EnvFilter::new("immo_scout=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows what would be scanned
fn handle_dry_run(config: &Config, scheduler: &ScanScheduler) {
    println!("=== Immo-Scout Dry Run ===\n");

    println!("Site:");
    println!("  Origin: {}", config.site.origin);
    println!("  Listing path: {}", config.site.listing_path_fragment);

    println!("\nScanner:");
    println!("  Pages per category: {}", config.scanner.pages_per_category);
    println!("  Result capacity: {}", config.scanner.result_capacity);
    println!("  Private keywords: {}", config.scanner.private_keywords.join(", "));
    println!("  User agents: {}", config.http.user_agents.len());

    let pacing = &config.pacing;
    println!("\nPacing (seconds):");
    println!("  Between listings: {}-{}", pacing.listing_delay.min_secs, pacing.listing_delay.max_secs);
    println!("  Between pages: {}-{}", pacing.page_delay.min_secs, pacing.page_delay.max_secs);
    println!(
        "  Between categories: {}-{}",
        pacing.category_delay.min_secs, pacing.category_delay.max_secs
    );
    println!("  Between cycles: {}-{}", pacing.cycle_delay.min_secs, pacing.cycle_delay.max_secs);
    println!("  After HTTP 429: {}", pacing.rate_limit_backoff_secs);
    println!("  After a failed cycle: {}", pacing.error_backoff_secs);

    let selectors = &config.selectors;
    println!("\nSelector chains:");
    for (field, chain) in [
        ("listing links", &selectors.listing_links),
        ("title", &selectors.title),
        ("price", &selectors.price),
        ("area", &selectors.area),
        ("location", &selectors.location),
        ("description", &selectors.description),
    ] {
        println!("  {}: {}", field, chain.join(" | "));
    }

    println!("\nCategories ({}):", scheduler.categories().len());
    for category in scheduler.categories() {
        println!("  - {} ({} / {})", category.name, category.kind, category.region);
        println!("    * {}", category.search_url);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main scan loop and prints the results once it stops
async fn handle_scan(scheduler: &ScanScheduler, recent: usize, json: bool) -> anyhow::Result<()> {
    let handle = scheduler.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping after the current request");
            handle.stop();
        }
    });

    scheduler
        .start(&TracingReporter)
        .await
        .context("scan loop failed to start")?;

    let status = scheduler.status();
    let buffered = scheduler.recent(status.buffered);
    let latest = scheduler.recent(recent);

    if json {
        let stdout = std::io::stdout();
        write_json_lines(&mut stdout.lock(), &latest)?;
    } else {
        print_statistics(&status, &compute_statistics(&buffered));
        print_listings(&latest);
    }

    Ok(())
}
