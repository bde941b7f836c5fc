//! Assigns catalogue product ids to scraped records by matching their name
//! against known alternative spellings.

use crate::Result;
use lazy_regex::regex;
use serde::Deserialize;
use serde_json::Value;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::SystemTime,
};

pub const PRODUCT_ID_KEY: &str = "product_id";
pub const DEFAULT_NAME_FIELD: &str = "Name";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogEntry {
    pub id: Value,
    pub alternative_names: Vec<String>,
}

pub fn normalize_name(s: &str) -> String {
    regex!(r"\s+").replace_all(s, " ").trim().to_lowercase()
}

#[derive(Debug, Default)]
pub struct Classifier {
    names: HashMap<String, Value>,
}

impl Classifier {
    /// Later entries win when two products share an alternative name.
    pub fn new(catalog: &[CatalogEntry]) -> Self {
        let mut names = HashMap::new();
        for entry in catalog {
            for name in &entry.alternative_names {
                names.insert(normalize_name(name), entry.id.clone());
            }
        }
        Classifier { names }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog: Vec<CatalogEntry> = serde_json::from_str(&content)?;
        Ok(Self::new(&catalog))
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.names.get(&normalize_name(name))
    }

    /// Sets `product_id` on every record object, `""` when nothing matches.
    /// Returns how many records matched.
    pub fn classify(&self, records: &mut [Value], name_field: &str) -> usize {
        let mut matched = 0;
        for record in records.iter_mut() {
            let Some(object) = record.as_object_mut() else {
                continue;
            };
            let id = object
                .get(name_field)
                .and_then(Value::as_str)
                .and_then(|name| self.lookup(name))
                .cloned();
            if id.is_some() {
                matched += 1;
            }
            object.insert(
                PRODUCT_ID_KEY.to_string(),
                id.unwrap_or_else(|| Value::String(String::new())),
            );
        }
        matched
    }
}

/// Most recently modified `.json` file directly inside `dir`.
pub fn latest_json_file<P: AsRef<Path>>(dir: P) -> Result<Option<PathBuf>> {
    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().map_or(true, |ext| ext != "json") {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if latest.as_ref().map_or(true, |(t, _)| modified > *t) {
            latest = Some((modified, path));
        }
    }
    Ok(latest.map(|(_, path)| path))
}
