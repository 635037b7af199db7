pub mod analyzer;
pub mod blocks;
pub mod extract;
pub mod sections;

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::ExtractionError;
use crate::records::clean_text;

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());

const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// A fetched page, parsed. Not `Send`: build it, extract from it, drop it.
pub struct ParsedDocument {
    pub url: Url,
    html: Html,
}

impl ParsedDocument {
    pub fn parse(url: &str, body: &str) -> Result<Self, ExtractionError> {
        let url = Url::parse(url).map_err(|e| ExtractionError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            url,
            html: Html::parse_document(body),
        })
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    pub fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }

    pub fn select_first(&self, selector: &Selector) -> Option<ElementRef<'_>> {
        self.html.select(selector).next()
    }

    pub fn select_all(&self, selector: &Selector) -> Vec<ElementRef<'_>> {
        self.html.select(selector).collect()
    }

    /// First element matching `selector`, or the whole document.
    pub fn main_content(&self, selector: &Selector) -> ElementRef<'_> {
        self.select_first(selector).unwrap_or_else(|| self.root())
    }

    pub fn title(&self) -> Option<String> {
        self.select_first(&TITLE)
            .map(element_text)
            .filter(|t| !t.is_empty())
    }

    pub fn visible_text(&self) -> String {
        visible_text(&self.html)
    }

    /// Resolve an href against the page URL.
    pub fn absolute_url(&self, href: &str) -> Option<String> {
        self.url.join(href).ok().map(String::from)
    }
}

/// All text outside script/style elements, whitespace untouched.
pub fn visible_text(html: &Html) -> String {
    let mut out = String::new();
    for node in html.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| e.name()))
            .is_some_and(|name| HIDDEN_TAGS.contains(&name));
        if !hidden {
            out.push_str(text);
        }
    }
    out
}

/// Whitespace-normalized text of an element.
pub fn element_text(el: ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_text_skips_scripts() {
        let doc = ParsedDocument::parse(
            "https://example.org/page",
            "<html><head><script>var robot = 1;</script></head><body><p>Ankh</p></body></html>",
        )
        .unwrap();
        let text = doc.visible_text();
        assert!(text.contains("Ankh"));
        assert!(!text.contains("robot"));
    }

    #[test]
    fn relative_links_resolve() {
        let doc = ParsedDocument::parse("https://en.wikipedia.org/wiki/Category:Symbols", "").unwrap();
        assert_eq!(
            doc.absolute_url("/wiki/Ankh").as_deref(),
            Some("https://en.wikipedia.org/wiki/Ankh")
        );
        assert_eq!(doc.host(), "en.wikipedia.org");
    }

    #[test]
    fn bad_url_is_an_extraction_error() {
        assert!(matches!(
            ParsedDocument::parse("not a url", "<p>x</p>"),
            Err(ExtractionError::InvalidUrl { .. })
        ));
    }
}
