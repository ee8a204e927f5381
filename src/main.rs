//! Pagechain main entry point
//!
//! This is the command-line interface for the Pagechain page-chain extractor.

use anyhow::Context;
use clap::Parser;
use pagechain::config::{load_config, validate, Config, FetchMode};
use pagechain::crawler::{Coordinator, CrawlOptions};
use pagechain::output::print_report;
use pagechain::{normalize_url, page_label};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Pagechain: follow a "next page" chain into one clean document
///
/// Pagechain fetches a paginated document page by page, strips navigation
/// chrome, renumbers footnotes, and appends every page to a single
/// Markdown-flavored text file.
#[derive(Parser, Debug)]
#[command(name = "pagechain")]
#[command(version)]
#[command(about = "Extract a paginated, footnoted document into one file", long_about = None)]
struct Cli {
    /// First page of the chain
    #[arg(value_name = "URL")]
    url: String,

    /// Output document (overrides the config file)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Stop after this many pages
    #[arg(long)]
    max_pages: Option<u32>,

    /// Requests per page before giving up
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Delay before the first retry, in milliseconds
    #[arg(long)]
    initial_backoff_ms: Option<u64>,

    /// Factor applied to the retry delay after each retry
    #[arg(long)]
    backoff_multiplier: Option<f64>,

    /// Polite delay between pages, in milliseconds
    #[arg(long)]
    page_delay_ms: Option<u64>,

    /// Fetch pages through the configured headless renderer
    #[arg(long)]
    render: bool,

    /// Skip the robots.txt permission check
    #[arg(long)]
    ignore_robots: bool,

    /// Continue an interrupted crawl from its progress record
    #[arg(long)]
    resume: bool,

    /// Validate config and show effective settings without fetching
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.output.path = output.display().to_string();
        }
        if let Some(max_pages) = self.max_pages {
            config.crawl.max_pages = Some(max_pages);
        }
        if let Some(max_attempts) = self.max_attempts {
            config.fetch.max_attempts = max_attempts;
        }
        if let Some(initial_backoff_ms) = self.initial_backoff_ms {
            config.fetch.initial_backoff_ms = initial_backoff_ms;
        }
        if let Some(multiplier) = self.backoff_multiplier {
            config.fetch.backoff_multiplier = multiplier;
        }
        if let Some(page_delay_ms) = self.page_delay_ms {
            config.crawl.page_delay_ms = page_delay_ms;
        }
        if self.render {
            config.fetch.mode = FetchMode::Render;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;

    if cli.dry_run {
        return handle_dry_run(&config, &cli);
    }

    handle_crawl(config, &cli).await
}

/// Loads the file configuration (or defaults), applies CLI overrides and
/// validates the result
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    cli.apply_overrides(&mut config);
    validate(&config).context("Invalid configuration after command-line overrides")?;
    Ok(config)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pagechain=info,warn"),
            1 => EnvFilter::new("pagechain=debug,info"),
            2 => EnvFilter::new("pagechain=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, cli: &Cli) -> anyhow::Result<()> {
    let seed = normalize_url(&cli.url).with_context(|| format!("Invalid start URL: {}", cli.url))?;

    println!("=== Pagechain Dry Run ===\n");

    println!("Start:");
    println!("  URL: {}", seed);
    println!("  First label: {}", page_label(&seed, &config.output.label_params));
    println!("  Resume: {}", cli.resume);

    println!("\nFetching:");
    println!("  Mode: {:?}", config.fetch.mode);
    println!("  User agent: {}", config.user_agent.user_agent_string());
    println!("  Accept-Language: {}", config.fetch.accept_language);
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!("  Max attempts: {}", config.fetch.max_attempts);
    println!(
        "  Backoff: {}ms x{}",
        config.fetch.initial_backoff_ms, config.fetch.backoff_multiplier
    );
    println!("  Client errors: {:?}", config.fetch.on_client_error);

    println!("\nCrawl:");
    println!("  Page delay: {}ms", config.crawl.page_delay_ms);
    match config.crawl.max_pages {
        Some(cap) => println!("  Page cap: {}", cap),
        None => println!("  Page cap: none"),
    }
    println!("  Next link: {}", config.crawl.next_link_selector);
    println!(
        "  Robots check: {}",
        config.crawl.respect_robots && !cli.ignore_robots
    );

    println!("\nOutput:");
    println!("  Document: {}", config.output.path);
    println!("  Progress: {}", config.output.progress_path());
    println!("  Footnotes: {:?}", config.output.footnotes_placement);

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, cli: &Cli) -> anyhow::Result<()> {
    let options = CrawlOptions {
        resume: cli.resume,
        ignore_robots: cli.ignore_robots,
    };

    if options.resume {
        tracing::info!("Resuming crawl from {}", config.output.progress_path());
    } else {
        tracing::info!("Starting fresh crawl at {}", cli.url);
    }

    let mut coordinator =
        Coordinator::new(config, &cli.url, &options).context("Failed to initialize crawler")?;
    let report = coordinator.run().await.context("Crawl failed")?;

    if !cli.quiet {
        print_report(&report);
    }

    if !report.succeeded() {
        anyhow::bail!("Crawl aborted: {}", report.stop_reason);
    }

    Ok(())
}
