use futures::{stream, StreamExt};
use serde::Serialize;
use std::path::Path;
use tracing::{error, info, warn};

pub mod classifier;
pub mod config;
pub mod document;
pub mod extractor;
pub mod fetcher;
pub mod persistent;
pub mod record;
pub mod stats;
pub mod urls;

mod data;
mod error;
mod utils;

pub use config::{ExportFormat, RunConfig, SiteConfig};
pub use data::Table;
pub use error::{FieldError, Result, ScraperError};
pub use extractor::Session;
pub use fetcher::{FetcherConfig, HttpFetcher, Page};
pub use persistent::{JsonStorage, SqliteStorage};
pub use record::{Record, NOT_AVAILABLE};

#[async_trait::async_trait]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<Page>;
}

#[async_trait::async_trait]
pub trait Storage {
    async fn save(&self, records: &[Record]) -> Result<()>;
    fn location(&self) -> String;
}

#[derive(Debug, Default)]
pub struct BatchReport {
    /// Records of every URL, in URL order.
    pub records: Vec<Record>,
    pub succeeded: usize,
    pub failed: Vec<(String, ScraperError)>,
}

/// Fetches and extracts every URL. A failing URL is logged and skipped.
pub async fn run_scraper<F>(
    session: &Session,
    fetcher: &F,
    urls: &[String],
    concurrency: usize,
) -> BatchReport
where
    F: Fetcher + Sync,
{
    let total = urls.len();
    let outcomes: Vec<_> = stream::iter(urls.iter().enumerate())
        .map(|(i, url)| async move {
            info!("Processing URL {}/{}: {}", i + 1, total, url);
            let outcome = scrape_url(session, fetcher, url).await;
            (i, url, outcome)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut report = BatchReport::default();
    for (i, url, outcome) in outcomes {
        match outcome {
            Ok(records) if records.is_empty() => {
                warn!("No records found at URL {}: {}", i + 1, url);
            }
            Ok(records) => {
                info!("Extracted {} records from URL {}", records.len(), i + 1);
                report.succeeded += 1;
                report.records.extend(records);
            }
            Err(e) => {
                error!("Error processing URL {}: {}", i + 1, e);
                report.failed.push((url.clone(), e));
            }
        }
    }
    report
}

async fn scrape_url<F>(session: &Session, fetcher: &F, url: &str) -> Result<Vec<Record>>
where
    F: Fetcher + Sync,
{
    let page = fetcher.fetch(url).await?;
    session.extract_with_charset(&page.body, page.charset.as_deref(), &page.url)
}

#[derive(Debug, Serialize)]
pub struct SampleReport {
    pub success: bool,
    pub total_records: usize,
    pub sample_records: Vec<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub url: String,
    pub config_used: String,
}

/// Runs the configuration against a single URL and keeps a few records, for
/// checking a new configuration before a full run.
pub async fn sample_run<F>(
    session: &Session,
    fetcher: &F,
    url: &str,
    max_records: usize,
) -> SampleReport
where
    F: Fetcher + Sync,
{
    let (success, total_records, sample_records, error) =
        match scrape_url(session, fetcher, url).await {
            Ok(mut records) => {
                let total = records.len();
                records.truncate(max_records);
                (true, total, records, None)
            }
            Err(e) => (false, 0, vec![], Some(e.to_string())),
        };

    SampleReport {
        success,
        total_records,
        sample_records,
        error,
        url: url.to_string(),
        config_used: session.config_id().to_string(),
    }
}

/// Storage backend chosen by the export settings, rooted at `dir`.
pub async fn open_storage(
    config: &RunConfig,
    dir: &Path,
    now: chrono::DateTime<chrono::Local>,
) -> Result<Box<dyn Storage + Send + Sync>> {
    let dir = dir.join(&config.export_settings.directory);
    let path = dir.join(config.export_settings.file_name(&config.site_name, now));
    let storage: Box<dyn Storage + Send + Sync> = match config.export_settings.export_format()? {
        ExportFormat::Json => Box::new(JsonStorage::new(path)),
        ExportFormat::Sqlite => Box::new(SqliteStorage::new(path, &config.site_name).await?),
    };
    Ok(storage)
}
