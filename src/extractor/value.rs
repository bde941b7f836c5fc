use crate::{config::ExtractMode, document::NodeContent, record::NOT_AVAILABLE, FieldError};
use url::Url;

/// Reads the final value from the terminal element. A missing element is
/// always the sentinel, whatever the mode.
pub fn extract_value<N: NodeContent>(
    terminal: Option<&N>,
    mode: &ExtractMode,
    base_url: Option<&Url>,
) -> Result<String, FieldError> {
    let Some(el) = terminal else {
        return Ok(NOT_AVAILABLE.to_string());
    };

    match mode {
        ExtractMode::Text => Ok(el.text_content().trim().to_string()),
        ExtractMode::Href => match el.attribute("href").filter(|h| !h.is_empty()) {
            Some(href) => resolve_link(base_url, href),
            None => Ok(NOT_AVAILABLE.to_string()),
        },
        ExtractMode::Attribute(name) => Ok(el
            .attribute(name)
            .filter(|v| !v.is_empty())
            .unwrap_or(NOT_AVAILABLE)
            .to_string()),
    }
}

/// Joins `href` onto `base_url`; absolute references come back unchanged.
pub fn resolve_link(base_url: Option<&Url>, href: &str) -> Result<String, FieldError> {
    let joined = match base_url {
        Some(base) => base.join(href),
        None => Url::parse(href),
    };
    joined.map(String::from).map_err(|source| FieldError::Link {
        href: href.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    struct FakeNode {
        text: &'static str,
        attrs: HashMap<&'static str, &'static str>,
    }

    impl FakeNode {
        fn new(text: &'static str, attrs: &[(&'static str, &'static str)]) -> Self {
            FakeNode {
                text,
                attrs: attrs.iter().copied().collect(),
            }
        }
    }

    impl NodeContent for FakeNode {
        fn text_content(&self) -> String {
            self.text.to_string()
        }

        fn attribute(&self, name: &str) -> Option<&str> {
            self.attrs.get(name).copied()
        }
    }

    fn base() -> Url {
        Url::parse("https://shop.example/cat/").unwrap()
    }

    fn value(node: Option<&FakeNode>, mode: ExtractMode) -> String {
        extract_value(node, &mode, Some(&base())).unwrap()
    }

    #[test]
    fn test_missing_element_is_sentinel() {
        assert_eq!(value(None, ExtractMode::Text), NOT_AVAILABLE);
        assert_eq!(value(None, ExtractMode::Href), NOT_AVAILABLE);
        assert_eq!(
            value(None, ExtractMode::Attribute("src".to_string())),
            NOT_AVAILABLE
        );
    }

    #[test]
    fn test_text_is_trimmed_only() {
        let node = FakeNode::new("\n   Red   lamp \t", &[]);
        assert_eq!(value(Some(&node), ExtractMode::Text), "Red   lamp");

        let empty = FakeNode::new("   ", &[]);
        assert_eq!(value(Some(&empty), ExtractMode::Text), "");
    }

    #[test]
    fn test_href_resolution() {
        let cases = [
            ("item/42", "https://shop.example/cat/item/42"),
            ("https://cdn.example/x", "https://cdn.example/x"),
            ("/p/1", "https://shop.example/p/1"),
            ("//cdn.example/img.png", "https://cdn.example/img.png"),
            ("../sale?page=2", "https://shop.example/sale?page=2"),
        ];
        for (href, expected) in cases {
            let node = FakeNode::new("", &[("href", href)]);
            assert_eq!(value(Some(&node), ExtractMode::Href), expected);
        }

        let no_href = FakeNode::new("link", &[]);
        assert_eq!(value(Some(&no_href), ExtractMode::Href), NOT_AVAILABLE);

        let empty_href = FakeNode::new("link", &[("href", "")]);
        assert_eq!(value(Some(&empty_href), ExtractMode::Href), NOT_AVAILABLE);
    }

    #[test]
    fn test_href_without_base() {
        let absolute = FakeNode::new("", &[("href", "https://cdn.example/x")]);
        assert_eq!(
            extract_value(Some(&absolute), &ExtractMode::Href, None).unwrap(),
            "https://cdn.example/x"
        );

        let relative = FakeNode::new("", &[("href", "item/42")]);
        assert!(matches!(
            extract_value(Some(&relative), &ExtractMode::Href, None),
            Err(FieldError::Link { .. })
        ));
    }

    #[test]
    fn test_arbitrary_attribute() {
        let node = FakeNode::new("", &[("data-sku", "A-1 & <b>"), ("alt", "")]);
        assert_eq!(
            value(Some(&node), ExtractMode::Attribute("data-sku".to_string())),
            "A-1 & <b>"
        );
        assert_eq!(
            value(Some(&node), ExtractMode::Attribute("alt".to_string())),
            NOT_AVAILABLE
        );
        assert_eq!(
            value(Some(&node), ExtractMode::Attribute("title".to_string())),
            NOT_AVAILABLE
        );
    }
}
