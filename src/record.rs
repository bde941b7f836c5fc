use serde::{ser::SerializeMap, Serialize, Serializer};
use std::fmt;

/// Value of any field that could not be resolved.
pub const NOT_AVAILABLE: &str = "N/A";

pub const SOURCE_URL_KEY: &str = "_source_url";
pub const SCRAPED_AT_KEY: &str = "_scraped_at";
pub const CONFIG_USED_KEY: &str = "_config_used";

/// Field values pulled out of one container, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(Vec<(String, String)>);

impl Fields {
    pub fn push<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        self.0.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when no field resolved to anything but the sentinel.
    pub fn is_unresolved(&self) -> bool {
        self.0.iter().all(|(_, v)| v == NOT_AVAILABLE)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Fields(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One emitted record: the extracted fields plus provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub fields: Fields,
    pub source_url: String,
    pub scraped_at: String,
    pub config_used: String,
}

impl Record {
    pub fn get(&self, name: &str) -> Option<&str> {
        match name {
            SOURCE_URL_KEY => Some(self.source_url.as_str()),
            SCRAPED_AT_KEY => Some(self.scraped_at.as_str()),
            CONFIG_USED_KEY => Some(self.config_used.as_str()),
            _ => self.fields.get(name),
        }
    }

    /// Keys as they appear in the serialized record.
    pub fn keys(&self) -> Vec<&str> {
        self.own_fields()
            .map(|(name, _)| name)
            .chain([SOURCE_URL_KEY, SCRAPED_AT_KEY, CONFIG_USED_KEY])
            .collect()
    }

    // Provenance keys shadow fields of the same name.
    fn own_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .filter(|(name, _)| !matches!(*name, SOURCE_URL_KEY | SCRAPED_AT_KEY | CONFIG_USED_KEY))
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (name, value) in self.own_fields() {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry(SOURCE_URL_KEY, &self.source_url)?;
        map.serialize_entry(SCRAPED_AT_KEY, &self.scraped_at)?;
        map.serialize_entry(CONFIG_USED_KEY, &self.config_used)?;
        map.end()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .keys()
            .iter()
            .map(|k| k.chars().count())
            .max()
            .unwrap_or(0);
        for (name, value) in self.own_fields() {
            writeln!(f, "{:width$} : {}", name, value, width = width)?;
        }
        writeln!(f, "{:width$} : {}", SOURCE_URL_KEY, self.source_url, width = width)?;
        writeln!(f, "{:width$} : {}", SCRAPED_AT_KEY, self.scraped_at, width = width)?;
        write!(f, "{:width$} : {}", CONFIG_USED_KEY, self.config_used, width = width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(fields: Fields) -> Record {
        Record {
            fields,
            source_url: "https://shop.example/".to_string(),
            scraped_at: "2024-03-09 14:05:07".to_string(),
            config_used: "shop".to_string(),
        }
    }

    #[test]
    fn test_unresolved() {
        let fields: Fields = [("a", NOT_AVAILABLE), ("b", NOT_AVAILABLE)].into_iter().collect();
        assert!(fields.is_unresolved());

        let fields: Fields = [("a", NOT_AVAILABLE), ("b", "")].into_iter().collect();
        assert!(!fields.is_unresolved());
    }

    #[test]
    fn test_serialize_keeps_field_order() {
        let r = record([("title", "A"), ("price", NOT_AVAILABLE)].into_iter().collect());
        let serialized = serde_json::to_string(&r).unwrap();

        assert_eq!(
            serialized,
            r#"{"title":"A","price":"N/A","_source_url":"https://shop.example/","_scraped_at":"2024-03-09 14:05:07","_config_used":"shop"}"#
        );
    }

    #[test]
    fn test_provenance_shadows_fields() {
        let r = record([("title", "A"), ("_source_url", "spoofed")].into_iter().collect());

        assert_eq!(r.keys(), vec!["title", SOURCE_URL_KEY, SCRAPED_AT_KEY, CONFIG_USED_KEY]);
        assert_eq!(r.get(SOURCE_URL_KEY), Some("https://shop.example/"));
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            json!({
                "title": "A",
                "_source_url": "https://shop.example/",
                "_scraped_at": "2024-03-09 14:05:07",
                "_config_used": "shop"
            })
        );
    }

    #[test]
    fn test_display() {
        let r = record([("title", "A")].into_iter().collect());
        assert_eq!(
            r.to_string(),
            "title        : A\n_source_url  : https://shop.example/\n_scraped_at  : 2024-03-09 14:05:07\n_config_used : shop"
        );
    }
}
