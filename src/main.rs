use clap::Parser;
use config_scraper::{
    config::save_config_template, open_storage, run_scraper, sample_run, stats::RecordStats, urls,
    FetcherConfig, HttpFetcher, RunConfig, Session,
};
use std::{path::PathBuf, process::ExitCode};
use tokio::time::Duration;
use tracing::{error, info, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;

#[derive(Debug, Parser)]
#[command(about = "Scrape structured records from web pages with a JSON site configuration")]
struct Args {
    /// Run configuration file.
    #[arg(long, default_value = "configs/config_01.json")]
    config: PathBuf,

    /// File with the URLs to scrape, one per line.
    #[arg(long, default_value = "configs/urls.txt")]
    urls: PathBuf,

    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Minimum delay between two requests.
    #[arg(long, default_value_t = 1000)]
    delay_ms: u64,

    /// Number of URLs fetched at once.
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Only try the configuration on this URL and print a sample.
    #[arg(long)]
    sample: Option<String>,

    /// Field whose value counts are reported after the run.
    #[arg(long)]
    group_by: Option<String>,

    /// Report brand counts taken from this title field instead.
    #[arg(long, conflicts_with = "group_by")]
    brand_from: Option<String>,

    /// Comma-separated brands looked for by `--brand-from`.
    #[arg(long, value_delimiter = ',', requires = "brand_from")]
    brands: Vec<String>,

    /// Field holding prices to summarise after the run.
    #[arg(long)]
    price_field: Option<String>,

    /// Write a configuration template to this path and exit.
    #[arg(long)]
    init_config: Option<PathBuf>,
}

async fn run(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    if let Some(path) = &args.init_config {
        save_config_template(path, chrono::Local::now())?;
        info!("Configuration template written to {}", path.display());
        return Ok(true);
    }

    let config = RunConfig::load(&args.config)?;
    info!("Loaded configuration for {}", config.site_name);

    let session = Session::new(config.scraper_settings.clone())?;
    let fetcher = HttpFetcher::new(
        FetcherConfig::default().with_delay(Duration::from_millis(args.delay_ms)),
    )?;

    if let Some(url) = &args.sample {
        let report = sample_run(&session, &fetcher, url, 3).await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report.success);
    }

    let targets = urls::load_urls(&args.urls)?;
    if targets.is_empty() {
        warn!("No URLs to scrape in {}", args.urls.display());
        return Ok(false);
    }
    for (domain, count) in urls::domain_stats(&targets) {
        info!("{}: {} URLs", domain, count);
    }

    let report = run_scraper(&session, &fetcher, &targets, args.concurrency).await;
    info!(
        "Scraped {}/{} URLs, {} failed",
        report.succeeded,
        targets.len(),
        report.failed.len()
    );

    if report.records.is_empty() {
        warn!("No records extracted, nothing to save");
        return Ok(false);
    }

    let storage = open_storage(&config, &args.output_dir, chrono::Local::now()).await?;
    storage.save(&report.records).await?;
    info!(
        "Saved {} records to {}",
        report.records.len(),
        storage.location()
    );

    let mut stats = RecordStats::from_records(&report.records, args.group_by.as_deref());
    if let Some(field) = &args.brand_from {
        stats.group_by_brand(&report.records, field, &args.brands);
    }
    if let Some(field) = &args.price_field {
        stats = stats.with_prices(&report.records, field);
    }
    info!("\n{}", stats);

    Ok(true)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| {
                "info,html5ever=error,selectors=error,hyper=warn,reqwest=info,sqlx=warn".into()
            }),
        )
        .with(ErrorLayer::default())
        .init();

    match run(Args::parse()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
