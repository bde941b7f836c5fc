use crate::FieldError;
use scraper::{node::Element, ElementRef};

/// Tree navigation used by the path resolver.
pub trait DocumentNode: Sized + Copy {
    /// First descendant (excluding `self`) with `tag` and, if given, `class`.
    fn find_first(&self, tag: &str, class: Option<&str>) -> Result<Option<Self>, FieldError>;

    /// Every descendant (excluding `self`) with `tag` and, if given, `class`,
    /// in document order.
    fn find_all(&self, tag: &str, class: Option<&str>) -> Result<Vec<Self>, FieldError>;
}

/// Content accessors used by the value extractor.
pub trait NodeContent {
    fn text_content(&self) -> String;
    fn attribute(&self, name: &str) -> Option<&str>;
}

impl<'a> DocumentNode for ElementRef<'a> {
    fn find_first(&self, tag: &str, class: Option<&str>) -> Result<Option<Self>, FieldError> {
        let tag = checked_tag(tag)?;
        Ok(descendant_elements(*self).find(|el| is_match(el.value(), tag, class)))
    }

    fn find_all(&self, tag: &str, class: Option<&str>) -> Result<Vec<Self>, FieldError> {
        let tag = checked_tag(tag)?;
        Ok(descendant_elements(*self)
            .filter(|el| is_match(el.value(), tag, class))
            .collect())
    }
}

impl NodeContent for ElementRef<'_> {
    fn text_content(&self) -> String {
        self.text().collect()
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.value().attr(name)
    }
}

fn descendant_elements(el: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    el.descendants().skip(1).filter_map(ElementRef::wrap)
}

fn checked_tag(tag: &str) -> Result<&str, FieldError> {
    let trimmed = tag.trim();
    if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
        return Err(FieldError::InvalidTag(tag.to_string()));
    }
    Ok(trimmed)
}

// A class filter matches one entry of the class list, or the whole class list
// in order when it names several classes at once.
fn is_match(el: &Element, tag: &str, class: Option<&str>) -> bool {
    if !el.name().eq_ignore_ascii_case(tag) {
        return false;
    }
    match class {
        None => true,
        Some(class) => {
            el.classes().any(|c| c == class)
                || el
                    .attr("class")
                    .map_or(false, |attr| attr.split_whitespace().eq(class.split_whitespace()))
        }
    }
}
