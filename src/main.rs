//! Paper-Harvest main entry point
//!
//! This is the command-line interface for the proceedings crawler and the
//! paper annotation pass.

use anyhow::Context;
use clap::Parser;
use paper_harvest::annotate::run_annotation;
use paper_harvest::config::{load_config_with_hash, validate, Config};
use paper_harvest::crawler::run_crawl;
use paper_harvest::output::stats::{print_annotation_summary, print_crawl_summary};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Paper-Harvest: a conference proceedings crawler and annotator
///
/// The default mode walks the configured range of years, downloads every
/// paper's PDF and records its metadata in a CSV file. With `--annotate`, the
/// CSV is read back, abstracts are scraped and each paper is classified.
#[derive(Parser, Debug)]
#[command(name = "paper-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A conference proceedings crawler and annotator", long_about = None)]
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

    /// Run the annotation pass over the crawl CSV instead of crawling
    #[arg(long)]
    annotate: bool,

    /// Validate config and show what would be done without doing it
    #[arg(long)]
    dry_run: bool,

    /// Override the first year to crawl
    #[arg(long, value_name = "YEAR")]
    start_year: Option<i32>,

    /// Override the last year to crawl
    #[arg(long, value_name = "YEAR")]
    end_year: Option<i32>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.start_year.is_some() || cli.end_year.is_some() {
        if let Some(year) = cli.start_year {
            config.crawler.start_year = year;
        }
        if let Some(year) = cli.end_year {
            config.crawler.end_year = year;
        }
        validate(&config).context("Invalid year range on the command line")?;
    }

    if cli.dry_run {
        handle_dry_run(&config, cli.annotate);
    } else if cli.annotate {
        let summary = run_annotation(&config)
            .await
            .context("Annotation pass failed")?;
        if !cli.quiet {
            print_annotation_summary(&summary);
        }
    } else {
        let summary = run_crawl(&config).await.context("Crawl failed")?;
        if !cli.quiet {
            print_crawl_summary(&summary);
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("paper_harvest=info,warn"),
            1 => EnvFilter::new("paper_harvest=debug,info"),
            2 => EnvFilter::new("paper_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config, annotate: bool) {
    println!("=== Paper-Harvest Dry Run ===\n");

    let crawler = &config.crawler;
    println!("Crawler Configuration:");
    println!("  Base URL: {}", crawler.base_url);
    println!("  Years: {}-{}", crawler.start_year, crawler.end_year);
    println!("  Output directory: {}", crawler.output_dir.display());
    println!("  CSV: {}", crawler.csv_path().display());
    println!("  User agent: {}", crawler.user_agent);
    match crawler.max_concurrent_papers {
        Some(limit) => println!("  Max concurrent papers per year: {}", limit),
        None => println!("  Max concurrent papers per year: unbounded"),
    }
    if crawler.accept_invalid_certs {
        println!("  TLS verification: DISABLED");
    }

    println!("\nRetry Policies:");
    for (name, policy) in [
        ("page", &config.retry.page),
        ("year", &config.retry.year),
        ("abstract", &config.retry.abstract_page),
    ] {
        println!(
            "  {}: {} attempts, {}s timeout, {}-{}ms delay",
            name, policy.attempts, policy.timeout_secs, policy.min_delay_ms, policy.max_delay_ms
        );
    }

    let annotation = &config.annotation;
    println!("\nAnnotation:");
    println!("  Input: {}", annotation.input_path.display());
    println!("  Output: {}", annotation.output_path.display());
    println!("  Model: {}", annotation.model);
    println!(
        "  Batch size: {}, concurrency limit: {}",
        annotation.batch_size, annotation.concurrency_limit
    );
    println!("  Categories ({}):", annotation.categories.len());
    for category in &annotation.categories {
        println!("    - {}", category);
    }
    println!(
        "  API key: {}",
        if annotation.resolve_api_key().is_some() {
            "present"
        } else {
            "missing"
        }
    );

    println!("\n✓ Configuration is valid");
    if annotate {
        println!("✓ Would annotate {}", annotation.input_path.display());
    } else {
        println!(
            "✓ Would crawl {} years",
            crawler.end_year - crawler.start_year + 1
        );
    }
}
