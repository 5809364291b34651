use scraper::{Html, Selector};
use url::Url;

use crate::Result;
use crate::kits::basic::join_url;
use crate::utils::error::CoreError;

/// Owned handle to parsed markup. The outer HTML is kept as a string so
/// handles stay cheap to clone and free of document lifetimes; selectors
/// re-parse on evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlContent {
    html: String,
}

impl HtmlContent {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            html: markup.into(),
        }
    }

    pub fn html(&self) -> &str {
        &self.html
    }
}

/// Splits a selector spec into its CSS part and an optional `@attr`
/// suffix naming the attribute to extract instead of the element text.
fn split_selector(spec: &str) -> (&str, Option<&str>) {
    match spec.rsplit_once('@') {
        Some((css, attr))
            if !css.is_empty()
                && !attr.is_empty()
                && attr
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') =>
        {
            (css, Some(attr))
        }
        _ => (spec, None),
    }
}

fn compile(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| CoreError::Parse(format!("invalid selector {css:?}: {e}")))
}

/// Evaluates the element query of a selector spec. An empty match set is
/// a valid result here; fallback handling happens above this layer.
pub fn query(content: &HtmlContent, spec: &str) -> Result<Vec<HtmlContent>> {
    let (css, _) = split_selector(spec);
    let selector = compile(css)?;
    let document = Html::parse_document(content.html());
    Ok(document
        .select(&selector)
        .map(|element| HtmlContent::new(element.html()))
        .collect())
}

/// Evaluates the text query of a selector spec against the first match.
/// With `is_url` set, relative results are joined onto `base_url`.
pub fn query_text(
    content: &HtmlContent,
    spec: &str,
    is_url: bool,
    base_url: &str,
) -> Result<String> {
    let (css, attr) = split_selector(spec);
    let selector = compile(css)?;
    let document = Html::parse_document(content.html());
    let Some(element) = document.select(&selector).next() else {
        return Ok(String::new());
    };
    let text = match attr {
        Some(attr) => element.value().attr(attr).unwrap_or_default().to_string(),
        None => element
            .text()
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string(),
    };
    if is_url && !text.is_empty() && Url::parse(&text).is_err() {
        return Ok(join_url(&text, base_url));
    }
    Ok(text)
}

/// Text of the whole parsed source with the markup stripped.
pub fn text_of(content: &HtmlContent) -> String {
    let document = Html::parse_document(content.html());
    document
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <ul class="shelf">
            <li class="entry"><a class="title" href="/book/1">First</a></li>
            <li class="entry"><a class="title" href="http://other/book/2">Second</a></li>
        </ul>
    "#;

    #[test]
    fn test_split_selector() {
        assert_eq!(split_selector(".title"), (".title", None));
        assert_eq!(split_selector("a.title@href"), ("a.title", Some("href")));
        assert_eq!(split_selector("a[href^='x']"), ("a[href^='x']", None));
    }

    #[test]
    fn test_query_returns_every_match() {
        let content = HtmlContent::new(LISTING);
        let entries = query(&content, "li.entry").unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].html().contains("First"));
    }

    #[test]
    fn test_query_empty_is_not_an_error() {
        let content = HtmlContent::new(LISTING);
        assert!(query(&content, ".missing").unwrap().is_empty());
    }

    #[test]
    fn test_query_rejects_invalid_selector() {
        let content = HtmlContent::new(LISTING);
        let err = query(&content, "li[").unwrap_err();
        assert_eq!(err.kind(), "ParseError");
    }

    #[test]
    fn test_query_text_and_attributes() {
        let content = HtmlContent::new(LISTING);
        assert_eq!(query_text(&content, ".title", false, "").unwrap(), "First");
        assert_eq!(
            query_text(&content, "a@href", false, "").unwrap(),
            "/book/1"
        );
        assert_eq!(query_text(&content, ".missing", false, "").unwrap(), "");
    }

    #[test]
    fn test_query_text_joins_relative_urls() {
        let content = HtmlContent::new(LISTING);
        assert_eq!(
            query_text(&content, "a@href", true, "http://site/").unwrap(),
            "http://site/book/1"
        );
        // absolute results pass through untouched
        let entries = query(&content, "li.entry").unwrap();
        assert_eq!(
            query_text(&entries[1], "a@href", true, "http://site/").unwrap(),
            "http://other/book/2"
        );
    }

    #[test]
    fn test_text_of_strips_markup() {
        let content = HtmlContent::new("<div><b>bold</b> and plain</div>");
        assert_eq!(text_of(&content), "bold  and plain");
    }
}
