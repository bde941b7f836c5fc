//! Declarative extraction: containers are located by class, fields are
//! resolved through their configured path, and every emitted record carries
//! its provenance.

mod decode;
mod path;
mod scanner;
mod value;

pub use decode::decode_document;
pub use path::resolve;
pub use scanner::{extract_field, scan_document};
pub use value::{extract_value, resolve_link};

use crate::{
    config::SiteConfig,
    record::{Fields, Record},
    Result,
};
use chrono::Local;
use scraper::Html;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

pub const SCRAPED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Applies one site configuration to fetched documents.
///
/// A session holds nothing but its configuration, so it can be shared
/// between tasks and used for any number of documents.
#[derive(Debug, Clone)]
pub struct Session {
    config: SiteConfig,
}

impl Session {
    pub fn new(config: SiteConfig) -> Result<Self> {
        config.validate()?;
        Ok(Session { config })
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Self::new(SiteConfig::from_value(value)?)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Self::new(SiteConfig::from_json(s)?)
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn config_id(&self) -> &str {
        self.config.config_id()
    }

    /// Extracts every non-empty container of `html`, fetched from `source_url`.
    ///
    /// Only empty or binary input fails; individual fields fall back to `"N/A"`.
    pub fn extract(&self, html: &[u8], source_url: &str) -> Result<Vec<Record>> {
        self.extract_with_charset(html, None, source_url)
    }

    /// Like [`Session::extract`], with the charset the server declared for
    /// the document.
    pub fn extract_with_charset(
        &self,
        html: &[u8],
        charset: Option<&str>,
        source_url: &str,
    ) -> Result<Vec<Record>> {
        let html = decode_document(html, charset)?;
        let fields = {
            let document = Html::parse_document(&html);
            let base_url = match Url::parse(source_url) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!("Source URL '{}' is not a valid base: {}", source_url, e);
                    None
                }
            };
            scan_document(&document, &self.config, base_url.as_ref())
        };

        debug!("Extracted {} records from {}", fields.len(), source_url);

        let scraped_at = Local::now().format(SCRAPED_AT_FORMAT).to_string();
        Ok(fields
            .into_iter()
            .map(|fields| self.with_provenance(fields, source_url, &scraped_at))
            .collect())
    }

    fn with_provenance(&self, fields: Fields, source_url: &str, scraped_at: &str) -> Record {
        Record {
            fields,
            source_url: source_url.to_string(),
            scraped_at: scraped_at.to_string(),
            config_used: self.config_id().to_string(),
        }
    }
}
