//! Declarative site configuration.
//!
//! A site is described by the class of its repeating container blocks and an
//! ordered set of fields, each reached from the container through a short
//! list of navigation steps.

use crate::{Result, ScraperError};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::{fmt, path::Path, str::FromStr};
use tracing::warn;

/// Tag every container element must have.
pub const CONTAINER_TAG: &str = "div";
pub const DEFAULT_CONFIG_NAME: &str = "default_config";
pub const DEFAULT_SITE_NAME: &str = "default_site";
pub const DEFAULT_FILENAME_TEMPLATE: &str = "{site_name}_{timestamp}.{format}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepKind {
    /// First matching descendant.
    Find,
    /// Matching descendant at `index`.
    FindAll,
    /// Unrecognised step types leave the current element untouched.
    Other(String),
}

impl Default for StepKind {
    fn default() -> Self {
        StepKind::Other(String::new())
    }
}

impl From<String> for StepKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "find" => StepKind::Find,
            "find_all" => StepKind::FindAll,
            _ => StepKind::Other(s),
        }
    }
}

impl From<StepKind> for String {
    fn from(kind: StepKind) -> Self {
        match kind {
            StepKind::Find => "find".to_string(),
            StepKind::FindAll => "find_all".to_string(),
            StepKind::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    #[serde(rename = "type", default)]
    pub kind: StepKind,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default)]
    pub index: i64,
}

impl PathStep {
    pub fn find(tag: &str, class: Option<&str>) -> Self {
        PathStep {
            kind: StepKind::Find,
            tag: Some(tag.to_string()),
            class: class.map(ToString::to_string),
            index: 0,
        }
    }

    pub fn find_all(tag: &str, class: Option<&str>, index: i64) -> Self {
        PathStep {
            kind: StepKind::FindAll,
            tag: Some(tag.to_string()),
            class: class.map(ToString::to_string),
            index,
        }
    }

    /// Class filter, with an empty class meaning "match on tag alone".
    pub fn class_filter(&self) -> Option<&str> {
        self.class.as_deref().filter(|c| !c.is_empty())
    }
}

/// What to read from the terminal element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ExtractMode {
    Text,
    Href,
    Attribute(String),
}

impl Default for ExtractMode {
    fn default() -> Self {
        ExtractMode::Text
    }
}

impl From<String> for ExtractMode {
    fn from(s: String) -> Self {
        match s.as_str() {
            "text" => ExtractMode::Text,
            "href" => ExtractMode::Href,
            _ => ExtractMode::Attribute(s),
        }
    }
}

impl From<ExtractMode> for String {
    fn from(mode: ExtractMode) -> Self {
        match mode {
            ExtractMode::Text => "text".to_string(),
            ExtractMode::Href => "href".to_string(),
            ExtractMode::Attribute(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(default)]
    pub path: Vec<PathStep>,
    #[serde(default)]
    pub extract: ExtractMode,
}

/// A field as read from the configuration. A definition that cannot be read
/// keeps the reason, and only that field comes out as `"N/A"`.
pub type FieldDefinition = std::result::Result<FieldSpec, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub container_class: String,
    /// Fields in the order they appear in the source configuration.
    pub fields: Vec<(String, FieldDefinition)>,
    pub name: Option<String>,
}

impl SiteConfig {
    pub fn new<N: Into<String>>(container_class: N, fields: Vec<(String, FieldSpec)>) -> Result<Self> {
        let config = SiteConfig {
            container_class: container_class.into(),
            fields: fields.into_iter().map(|(name, spec)| (name, Ok(spec))).collect(),
            name: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.container_class.is_empty() {
            return Err(ScraperError::EmptyConfigKey("container_class"));
        }
        if self.fields.is_empty() {
            return Err(ScraperError::EmptyConfigKey("fields"));
        }
        Ok(())
    }

    pub fn with_name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(s)?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let mut map = into_object(value, "scraper settings")?;

        let container_class = match map.remove("container_class") {
            None => return Err(ScraperError::MissingConfigKey("container_class")),
            Some(Value::String(s)) => s,
            Some(other) => {
                return Err(ScraperError::InvalidConfig(format!(
                    "container_class must be a string, got {}",
                    other
                )))
            }
        };

        let raw_fields = match map.remove("fields") {
            None => return Err(ScraperError::MissingConfigKey("fields")),
            Some(Value::Object(fields)) => fields,
            Some(other) => {
                return Err(ScraperError::InvalidConfig(format!(
                    "fields must be an object, got {}",
                    other
                )))
            }
        };

        let fields = raw_fields
            .into_iter()
            .map(|(name, spec)| {
                let spec = serde_json::from_value::<FieldSpec>(spec).map_err(|e| {
                    warn!("Field '{}' cannot be read: {}", name, e);
                    e.to_string()
                });
                (name, spec)
            })
            .collect();

        let config = SiteConfig {
            container_class,
            fields,
            name: None,
        };
        config.validate()?;
        Ok(match map.remove("name") {
            Some(Value::String(name)) => config.with_name(name),
            _ => config,
        })
    }

    /// Identifier written into `_config_used`.
    pub fn config_id(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_CONFIG_NAME)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Sqlite,
}

impl FromStr for ExportFormat {
    type Err = ScraperError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(ExportFormat::Json),
            "sqlite" => Ok(ExportFormat::Sqlite),
            _ => Err(ScraperError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Sqlite => write!(f, "sqlite"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExportSettings {
    #[serde(default)]
    pub directory: String,
    #[serde(default = "default_filename_template")]
    pub filename_template: String,
    pub format: String,
}

fn default_filename_template() -> String {
    DEFAULT_FILENAME_TEMPLATE.to_string()
}

impl ExportSettings {
    pub fn export_format(&self) -> Result<ExportFormat> {
        self.format.parse()
    }

    pub fn file_name(&self, site_name: &str, now: DateTime<Local>) -> String {
        self.filename_template
            .replace("{site_name}", site_name)
            .replace("{timestamp}", &now.format("%Y%m%d_%H%M%S").to_string())
            .replace("{format}", &self.format)
    }
}

/// A whole run configuration file: site settings plus export settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub site_name: String,
    pub scraper_settings: SiteConfig,
    pub export_settings: ExportSettings,
}

impl RunConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let mut map = into_object(serde_json::from_str(s)?, "configuration file")?;

        let scraper_settings = map
            .remove("scraper_settings")
            .ok_or(ScraperError::MissingConfigKey("scraper_settings"))?;
        let export_settings = map
            .remove("export_settings")
            .ok_or(ScraperError::MissingConfigKey("export_settings"))?;

        let export_settings: ExportSettings = serde_json::from_value(export_settings)
            .map_err(|e| ScraperError::InvalidConfig(format!("export_settings: {}", e)))?;
        export_settings.export_format()?;

        let site_name = match map.remove("site_name") {
            Some(Value::String(name)) => name,
            _ => DEFAULT_SITE_NAME.to_string(),
        };

        Ok(RunConfig {
            site_name,
            scraper_settings: SiteConfig::from_value(scraper_settings)?,
            export_settings,
        })
    }
}

/// A complete run configuration to start a new site from.
pub fn config_template(now: DateTime<Local>) -> Value {
    json!({
        "site_name": "ejemplo.com",
        "scraper_settings": {
            "name": "ejemplo_base",
            "container_class": "product-container",
            "fields": {
                "titulo": {
                    "path": [{"type": "find", "tag": "h3", "class": "product-title"}],
                    "extract": "text"
                },
                "precio": {
                    "path": [{"type": "find", "tag": "span", "class": "price"}],
                    "extract": "text"
                },
                "enlace": {
                    "path": [{"type": "find", "tag": "a"}],
                    "extract": "href"
                }
            }
        },
        "export_settings": {
            "directory": "ejemplo",
            "filename_template": DEFAULT_FILENAME_TEMPLATE,
            "format": "json"
        },
        "metadata": {
            "created_at": now.to_rfc3339(),
            "description": "Base scraping configuration",
            "version": "1.0"
        }
    })
}

/// Writes [`config_template`] to `path`, never over an existing file.
pub fn save_config_template<P: AsRef<Path>>(path: P, now: DateTime<Local>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Err(ScraperError::InvalidConfig(format!(
            "{} already exists",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&config_template(now))?)?;
    Ok(())
}

fn into_object(value: Value, what: &str) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ScraperError::InvalidConfig(format!(
            "{} must be a JSON object, got {}",
            what, other
        ))),
    }
}
