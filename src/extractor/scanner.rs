use super::{path::resolve, value::extract_value};
use crate::{
    config::{FieldDefinition, SiteConfig, CONTAINER_TAG},
    document::{DocumentNode, NodeContent},
    record::{Fields, NOT_AVAILABLE},
    FieldError,
};
use scraper::Html;
use tracing::{debug, warn};
use url::Url;

/// Value of one field inside `container`. Failures become the sentinel.
pub fn extract_field<N>(
    container: N,
    name: &str,
    definition: &FieldDefinition,
    base_url: Option<&Url>,
) -> String
where
    N: DocumentNode + NodeContent,
{
    let value = match definition {
        Ok(spec) => resolve(container, &spec.path)
            .and_then(|terminal| extract_value(terminal.as_ref(), &spec.extract, base_url)),
        Err(reason) => Err(FieldError::InvalidDefinition(reason.clone())),
    };

    match value {
        Ok(value) => value,
        Err(e) => {
            warn!("Error extracting field '{}': {}", name, e);
            NOT_AVAILABLE.to_string()
        }
    }
}

/// One `Fields` per container that yielded at least one value.
pub fn scan_document(document: &Html, config: &SiteConfig, base_url: Option<&Url>) -> Vec<Fields> {
    let containers = match document
        .root_element()
        .find_all(CONTAINER_TAG, Some(config.container_class.as_str()))
    {
        Ok(containers) => containers,
        Err(e) => {
            warn!("Cannot look up containers '{}': {}", config.container_class, e);
            return vec![];
        }
    };

    debug!(
        "Found {} containers with class '{}'",
        containers.len(),
        config.container_class
    );

    containers
        .into_iter()
        .map(|container| {
            config
                .fields
                .iter()
                .map(|(name, definition)| {
                    let value = extract_field(container, name, definition, base_url);
                    (name.as_str(), value)
                })
                .collect::<Fields>()
        })
        .filter(|fields| !fields.is_unresolved())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExtractMode, FieldSpec, PathStep};
    use pretty_assertions::assert_eq;
    use std::fs;

    fn field(path: Vec<PathStep>, extract: ExtractMode) -> FieldSpec {
        FieldSpec { path, extract }
    }

    fn shop_config() -> SiteConfig {
        SiteConfig::new(
            "product",
            vec![
                (
                    "name".to_string(),
                    field(vec![PathStep::find("h2", Some("name"))], ExtractMode::Text),
                ),
                (
                    "price".to_string(),
                    field(
                        vec![
                            PathStep::find("div", Some("pricing")),
                            PathStep::find_all("span", None, 1),
                        ],
                        ExtractMode::Text,
                    ),
                ),
                (
                    "link".to_string(),
                    field(vec![PathStep::find("a", None)], ExtractMode::Href),
                ),
                (
                    "image".to_string(),
                    field(
                        vec![PathStep::find("img", None)],
                        ExtractMode::Attribute("data-src".to_string()),
                    ),
                ),
                (
                    "sku".to_string(),
                    field(vec![], ExtractMode::Attribute("data-sku".to_string())),
                ),
            ],
        )
        .unwrap()
    }

    fn base() -> Url {
        Url::parse("https://tienda.example/catalogo/").unwrap()
    }

    #[test]
    fn test_scan_fixture() {
        let html = fs::read_to_string("tests/htmls/shop.html").expect("Invalid file path");
        let doc = Html::parse_document(&html);

        let records = scan_document(&doc, &shop_config(), Some(&base()));

        let expected: Vec<Fields> = vec![
            [
                ("name", "Lámpara de mesa"),
                ("price", "19,99 €"),
                ("link", "https://tienda.example/p/lampara-mesa"),
                ("image", "https://cdn.tienda.example/lampara.jpg"),
                ("sku", "LMP-001"),
            ]
            .into_iter()
            .collect(),
            [
                ("name", "Silla plegable"),
                ("price", NOT_AVAILABLE),
                ("link", "https://tienda.example/catalogo/silla"),
                ("image", NOT_AVAILABLE),
                ("sku", NOT_AVAILABLE),
            ]
            .into_iter()
            .collect(),
            [
                ("name", NOT_AVAILABLE),
                ("price", NOT_AVAILABLE),
                ("link", NOT_AVAILABLE),
                ("image", NOT_AVAILABLE),
                ("sku", "BANNER-9"),
            ]
            .into_iter()
            .collect(),
        ];
        assert_eq!(records, expected);
    }

    #[test]
    fn test_no_containers() {
        let doc = Html::parse_document("<html><body><p>Nothing here</p></body></html>");
        assert!(scan_document(&doc, &shop_config(), Some(&base())).is_empty());
    }

    #[test]
    fn test_failing_field_is_isolated() {
        let config = SiteConfig::new(
            "card",
            vec![
                (
                    "broken".to_string(),
                    field(vec![PathStep::find("not a tag", None)], ExtractMode::Text),
                ),
                (
                    "title".to_string(),
                    field(vec![PathStep::find("h3", None)], ExtractMode::Text),
                ),
            ],
        )
        .unwrap();
        let doc = Html::parse_document(
            r#"<div class="card"><h3>One</h3></div><div class="card"><h3>Two</h3></div>"#,
        );

        let records = scan_document(&doc, &config, None);
        let titles: Vec<_> = records.iter().map(|r| r.get("title").unwrap()).collect();
        assert_eq!(titles, vec!["One", "Two"]);
        assert!(records.iter().all(|r| r.get("broken") == Some(NOT_AVAILABLE)));
    }

    #[test]
    fn test_container_must_be_div() {
        let config = SiteConfig::new(
            "card",
            vec![("text".to_string(), field(vec![], ExtractMode::Text))],
        )
        .unwrap();
        let doc = Html::parse_document(
            r#"<section class="card">skip</section><div class="wide card">keep</div>"#,
        );

        let records = scan_document(&doc, &config, None);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("text"), Some("keep"));
    }
}
