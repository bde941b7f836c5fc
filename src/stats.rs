use crate::record::{Record, NOT_AVAILABLE};
use itertools::Itertools;
use lazy_regex::regex;
use serde::Serialize;
use std::{collections::BTreeMap, fmt};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldStats {
    pub total: usize,
    pub with_data: usize,
    /// Percentage of records with data, rounded to two decimals.
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordStats {
    pub total_records: usize,
    pub fields: BTreeMap<String, FieldStats>,
    pub sources: BTreeMap<String, usize>,
    /// Value counts of the grouping field, most frequent first.
    pub groups: Vec<(String, usize)>,
    pub prices: Option<PriceStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceStats {
    /// Records whose price could be read.
    pub parsed: usize,
    pub min: f64,
    pub max: f64,
    pub average: f64,
}

impl PriceStats {
    pub fn from_records(records: &[Record], price_field: &str) -> Option<Self> {
        let prices: Vec<f64> = records
            .iter()
            .filter_map(|r| r.get(price_field))
            .filter_map(clean_price)
            .collect();
        if prices.is_empty() {
            return None;
        }
        let sum: f64 = prices.iter().sum();
        Some(PriceStats {
            parsed: prices.len(),
            min: prices.iter().copied().fold(f64::INFINITY, f64::min),
            max: prices.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            average: (sum / prices.len() as f64 * 100.0).round() / 100.0,
        })
    }
}

/// Reads a scraped price such as `"19,99 €"`, `"1,234.56"` or `"1.234,56"`.
/// The last separator followed by at most two digits is the decimal point.
pub fn clean_price(raw: &str) -> Option<f64> {
    if raw == NOT_AVAILABLE {
        return None;
    }
    let cleaned = regex!(r"[^\d.,]").replace_all(raw, "");
    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(comma), None) => {
            if cleaned.matches(',').count() == 1 && cleaned.len() - comma <= 3 {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (None, Some(_)) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        (None, _) => cleaned.to_string(),
    };
    normalized.parse().ok()
}

/// First known brand mentioned in `title`, ignoring case, or else its first word.
pub fn extract_brand<S: AsRef<str>>(title: &str, known_brands: &[S]) -> Option<String> {
    if title == NOT_AVAILABLE {
        return None;
    }
    let lower = title.to_lowercase();
    known_brands
        .iter()
        .map(|b| b.as_ref())
        .find(|b| !b.is_empty() && lower.contains(&b.to_lowercase()))
        .or_else(|| title.split_whitespace().next())
        .map(ToString::to_string)
}

// Counts each value, most frequent first, ties by value.
fn rank<I: IntoIterator<Item = String>>(values: I) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .collect()
}

impl RecordStats {
    pub fn from_records(records: &[Record], group_field: Option<&str>) -> Self {
        let total = records.len();

        let mut fields = BTreeMap::new();
        for key in records.iter().flat_map(Record::keys).unique() {
            let with_data = records
                .iter()
                .filter(|r| r.get(key).map_or(false, |v| v != NOT_AVAILABLE))
                .count();
            fields.insert(
                key.to_string(),
                FieldStats {
                    total,
                    with_data,
                    completion_rate: percentage(with_data, total),
                },
            );
        }

        let mut sources = BTreeMap::new();
        for record in records {
            *sources.entry(record.source_url.clone()).or_insert(0) += 1;
        }

        let groups = match group_field {
            Some(field) => rank(
                records
                    .iter()
                    .filter_map(|r| r.get(field))
                    .filter(|v| *v != NOT_AVAILABLE)
                    .map(ToString::to_string),
            ),
            None => vec![],
        };

        RecordStats {
            total_records: total,
            fields,
            sources,
            groups,
            prices: None,
        }
    }

    /// Replaces the groups with brand counts read from `title_field`.
    pub fn group_by_brand<S: AsRef<str>>(
        &mut self,
        records: &[Record],
        title_field: &str,
        known_brands: &[S],
    ) {
        self.groups = rank(
            records
                .iter()
                .filter_map(|r| r.get(title_field))
                .filter_map(|title| extract_brand(title, known_brands)),
        );
    }

    pub fn with_prices(mut self, records: &[Record], price_field: &str) -> Self {
        self.prices = PriceStats::from_records(records, price_field);
        self
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 10_000.0).round() / 100.0
}

impl fmt::Display for RecordStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Records         : {}", self.total_records)?;
        writeln!(f, "Fields          : ")?;
        for (name, stats) in &self.fields {
            writeln!(
                f,
                "> {} {}/{} ({}%)",
                name, stats.with_data, stats.total, stats.completion_rate
            )?;
        }
        writeln!(f, "Sources         : ")?;
        for (source, count) in &self.sources {
            writeln!(f, "> {} {}", source, count)?;
        }
        if let Some(prices) = &self.prices {
            writeln!(
                f,
                "Prices          : {} parsed, min {:.2}, max {:.2}, avg {:.2}",
                prices.parsed, prices.min, prices.max, prices.average
            )?;
        }
        if !self.groups.is_empty() {
            writeln!(
                f,
                "Groups          : {}",
                self.groups
                    .iter()
                    .map(|(value, count)| format!("{} ({})", value, count))
                    .join(", ")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Fields;
    use pretty_assertions::assert_eq;

    fn record(source: &str, brand: &str, price: &str) -> Record {
        Record {
            fields: [("brand", brand), ("price", price)].into_iter().collect::<Fields>(),
            source_url: source.to_string(),
            scraped_at: "2024-03-09 14:05:07".to_string(),
            config_used: "tienda".to_string(),
        }
    }

    #[test]
    fn test_stats() {
        let records = vec![
            record("https://a.example/", "Acme", "10"),
            record("https://a.example/", "Zeta", NOT_AVAILABLE),
            record("https://b.example/", "Acme", NOT_AVAILABLE),
            record("https://b.example/", NOT_AVAILABLE, "7"),
            record("https://b.example/", "Beta", NOT_AVAILABLE),
            record("https://b.example/", "Zeta", NOT_AVAILABLE),
        ];
        let stats = RecordStats::from_records(&records, Some("brand"));

        assert_eq!(stats.total_records, 6);
        assert_eq!(
            stats.fields["price"],
            FieldStats {
                total: 6,
                with_data: 2,
                completion_rate: 33.33
            }
        );
        assert_eq!(stats.fields["brand"].completion_rate, 83.33);
        assert_eq!(stats.fields["_source_url"].with_data, 6);
        assert_eq!(stats.fields.len(), 5);

        assert_eq!(stats.sources["https://b.example/"], 4);
        assert_eq!(
            stats.groups,
            vec![
                ("Acme".to_string(), 2),
                ("Zeta".to_string(), 2),
                ("Beta".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_clean_price() {
        let cases = [
            ("19,99 €", Some(19.99)),
            ("1,234.56", Some(1234.56)),
            ("1.234,56 €", Some(1234.56)),
            ("1,234", Some(1234.0)),
            ("1.234.567", Some(1234567.0)),
            ("$ 25", Some(25.0)),
            ("Precio: 7.5", Some(7.5)),
            ("gratis", None),
            (NOT_AVAILABLE, None),
        ];
        for (raw, expected) in cases {
            assert_eq!(clean_price(raw), expected, "{}", raw);
        }
    }

    #[test]
    fn test_extract_brand() {
        let known = ["Philips", "IKEA"];
        assert_eq!(
            extract_brand("Lámpara de mesa ikea Tertial", &known),
            Some("IKEA".to_string())
        );
        assert_eq!(
            extract_brand("  Silla plegable", &known),
            Some("Silla".to_string())
        );
        assert_eq!(extract_brand(NOT_AVAILABLE, &known), None);
        assert_eq!(extract_brand("   ", &[] as &[&str]), None);
    }

    #[test]
    fn test_prices_and_brands() {
        let records = vec![
            record("https://a.example/", "x", "20,00 €"),
            record("https://a.example/", "x", "5"),
            record("https://a.example/", "x", NOT_AVAILABLE),
        ];
        let mut stats = RecordStats::from_records(&records, None).with_prices(&records, "price");
        assert_eq!(
            stats.prices,
            Some(PriceStats {
                parsed: 2,
                min: 5.0,
                max: 20.0,
                average: 12.5
            })
        );

        let titled: Vec<_> = ["IKEA Tertial", "Lámpara ikea", "Acme silla"]
            .into_iter()
            .map(|title| record("https://a.example/", title, "1"))
            .collect();
        stats.group_by_brand(&titled, "brand", &["IKEA"]);
        assert_eq!(
            stats.groups,
            vec![("IKEA".to_string(), 2), ("Acme".to_string(), 1)]
        );
        assert!(stats.to_string().contains("Prices          : 2 parsed, min 5.00, max 20.00, avg 12.50"));
    }

    #[test]
    fn test_empty() {
        let stats = RecordStats::from_records(&[], None);
        assert_eq!(stats.total_records, 0);
        assert!(stats.fields.is_empty());
        assert!(stats.groups.is_empty());
        assert_eq!(stats.with_prices(&[], "price").prices, None);
        assert_eq!(percentage(0, 0), 0.0);
    }
}
