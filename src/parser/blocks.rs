use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};

use super::element_text;

static EDIT_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\[edit\]\s*$").unwrap());
static TH: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").unwrap());
static TD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static LI: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());
static A_HREF: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

const SKIP_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "aside", "header", "footer", "ul", "ol", "li",
    "table", "blockquote", "h1", "h2", "h3", "h4", "h5", "h6",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub text: String,
    pub href: String,
}

/// One unit of page content, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, text: String },
    /// `lead` is a bold run opening the paragraph, if any.
    Paragraph { text: String, lead: Option<String> },
    ListItem { text: String, link: Option<Link> },
    /// Table row with a header cell, as found in info panels.
    Row { label: String, value: String, items: Vec<String> },
}

impl Block {
    pub fn paragraph_text(&self) -> Option<&str> {
        match self {
            Block::Paragraph { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Flatten the content under `root` into blocks.
pub fn classify(root: ElementRef<'_>) -> Vec<Block> {
    let mut blocks = Vec::new();
    walk(root, &mut blocks);
    blocks
}

fn walk(el: ElementRef<'_>, out: &mut Vec<Block>) {
    for child in el.children().filter_map(ElementRef::wrap) {
        let name = child.value().name();
        if SKIP_TAGS.contains(&name) {
            continue;
        }
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let text = heading_text(child);
                if !text.is_empty() {
                    let level = name[1..].parse().unwrap_or(6);
                    out.push(Block::Heading { level, text });
                }
            }
            "p" => push_paragraph(child, out),
            "li" => {
                let text = element_text(child);
                if !text.is_empty() {
                    let link = child.select(&A_HREF).next().map(|a| Link {
                        text: element_text(a),
                        href: a.value().attr("href").unwrap_or_default().to_string(),
                    });
                    out.push(Block::ListItem { text, link });
                }
            }
            "tr" => {
                if let Some(row) = table_row(child) {
                    out.push(row);
                } else {
                    walk(child, out);
                }
            }
            "div" | "section" | "blockquote" if !has_block_children(child) => {
                push_paragraph(child, out)
            }
            _ => walk(child, out),
        }
    }
}

fn push_paragraph(el: ElementRef<'_>, out: &mut Vec<Block>) {
    let text = element_text(el);
    if text.is_empty() {
        return;
    }
    let lead = el
        .children()
        .find(|n| n.value().as_text().map_or(true, |t| !t.trim().is_empty()))
        .and_then(ElementRef::wrap)
        .filter(|e| matches!(e.value().name(), "b" | "strong"))
        .map(element_text)
        .filter(|lead| !lead.is_empty() && text.starts_with(lead.as_str()));
    out.push(Block::Paragraph { text, lead });
}

fn table_row(tr: ElementRef<'_>) -> Option<Block> {
    let label = element_text(tr.select(&TH).next()?);
    let td = tr.select(&TD).next()?;
    let items = td
        .select(&LI)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();
    Some(Block::Row {
        label,
        value: element_text(td),
        items,
    })
}

fn has_block_children(el: ElementRef<'_>) -> bool {
    el.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .any(|e| BLOCK_TAGS.contains(&e.value().name()))
}

/// Heading text without wiki edit markers.
pub fn heading_text(el: ElementRef<'_>) -> String {
    EDIT_MARKER_RE.replace(&element_text(el), "").to_string()
}
