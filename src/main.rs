//! Sumi-Sweep main entry point
//!
//! This is the command-line interface for the Sumi-Sweep page harvester.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use sumi_sweep::config::{load_config_with_hash, Config};
use sumi_sweep::crawler::{crawl, prepare_seeds, EngineSettings};
use sumi_sweep::frontier::{Frontier, ProgressStore};
use sumi_sweep::output::{load_statistics, print_statistics};
use tracing_subscriber::EnvFilter;

/// Sumi-Sweep: a resumable, multi-worker page harvester
///
/// Sumi-Sweep crawls pages from a list of seed URLs with a pool of paced
/// workers, stores what it extracts in SQLite, and keeps its progress on disk
/// so an interrupted crawl resumes where it stopped.
#[derive(Parser, Debug)]
#[command(name = "sumi-sweep")]
#[command(version = "1.0.0")]
#[command(about = "A resumable, multi-worker page harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Start a fresh crawl, discarding saved progress
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show progress statistics and exit
    #[arg(long, conflicts_with_all = ["dry_run", "fresh"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, cli.fresh)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_sweep=info,warn"),
            1 => EnvFilter::new("sumi_sweep=debug,info"),
            2 => EnvFilter::new("sumi_sweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, fresh: bool) -> anyhow::Result<()> {
    println!("=== Sumi-Sweep Dry Run ===\n");

    let settings = EngineSettings::from_config(config)?;

    println!("Engine:");
    println!("  Workers: {}", settings.workers);
    for index in 1..=settings.workers {
        println!("    * {}", settings.worker_name(index));
    }
    println!("  Progress directory: {}", config.engine.progress_dir.display());
    match config.engine.max_consecutive_failures {
        Some(max) => println!("  Max consecutive failures: {}", max),
        None => println!("  Max consecutive failures: unlimited"),
    }
    match config.engine.max_priority_retries {
        Some(max) => println!("  Max priority retries: {}", max),
        None => println!("  Max priority retries: unlimited"),
    }

    println!("\nPacing:");
    println!(
        "  Delay: mean {}s, std {}s (capped at {:.1}s)",
        config.pacing.mean_seconds,
        config.pacing.std_seconds,
        settings.pacing.upper_bound()
    );

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nFetch:");
    println!("  Request timeout: {}s", config.fetch.request_timeout_secs);
    println!("  Same-site links only: {}", config.fetch.same_site_only);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\nSeeds ({}):", config.engine.seeds.len());
    for seed in &config.engine.seeds {
        println!("  - {}", seed);
    }

    // Seed against a throwaway copy of the saved state; nothing is written
    let frontier = if fresh {
        Frontier::new()
    } else {
        let store = ProgressStore::new(&config.engine.progress_dir);
        Frontier::from_snapshot(store.load().context("Failed to load saved progress")?)
    };
    let seeds = prepare_seeds(&config.engine.seeds).context("Invalid seed URL")?;
    let pending_before = frontier.remaining();
    let new_seeds = frontier.seed(&seeds);

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start with {} pending URLs ({} saved, {} new seeds)",
        frontier.remaining(),
        pending_before,
        new_seeds
    );

    Ok(())
}

/// Handles the --stats mode: shows progress and output statistics
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Progress: {}", config.engine.progress_dir.display());
    println!("Database: {}\n", config.output.database_path);

    let store = ProgressStore::new(&config.engine.progress_dir);
    let stats = load_statistics(&store, Path::new(&config.output.database_path))
        .context("Failed to load statistics")?;

    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring previous progress)");
    } else {
        tracing::info!("Starting crawl (resuming saved progress if any)");
    }

    tracing::info!(
        "Workers: {}, seeds: {}",
        config.engine.workers,
        config.engine.seeds.len()
    );

    let report = crawl(config, fresh).await.context("Crawl failed")?;

    if report.interrupted() {
        tracing::info!(
            "Crawl interrupted: {} URLs left for the next run",
            report.pending
        );
    } else {
        tracing::info!("Crawl completed successfully");
    }

    tracing::info!(
        "{} pages processed, {} records stored, {} failed attempts",
        report.processed(),
        report.records(),
        report.failures()
    );

    Ok(())
}
