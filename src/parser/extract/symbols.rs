use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use tracing::debug;

use super::{
    any_host, dispatch, is_sacred_texts, is_wikipedia, lead_paragraph, page_title, wiki_text,
    Deduplicate, Extraction, Extractor, Route, INFOBOX, MAIN_CONTENT,
};
use crate::error::ExtractionError;
use crate::normalize::century::parse_century;
use crate::normalize::find_word_start;
use crate::normalize::phrases::extract_visual_elements;
use crate::normalize::tradition::{normalize_tradition, title_case};
use crate::parser::blocks::{classify, Block};
use crate::parser::sections::cluster_sections;
use crate::parser::{element_text, ParsedDocument};
use crate::records::{
    clean_text, is_placeholder, symbol_id, today, DetailRequest, SourceKind, Symbol, UNKNOWN,
};

static INFOBOX_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".infobox-title, caption").unwrap());
static LISTING_LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.mw-category li a, ul.gallery li a").unwrap());

const OCCULT_TERMS: &[&str] = &[
    "symbol", "sign", "occult", "esoteric", "mystical", "spiritual", "alchemical", "magical",
    "sacred", "ancient", "ritual",
];
const NAV_LABELS: &[&str] = &["next", "previous", "contents", "index"];
/// Inferred in this priority order when no element is given.
const ELEMENT_HINTS: &[&str] = &[
    "fire", "water", "earth", "air", "spirit", "life", "death", "protection", "knowledge",
    "balance", "transformation",
];
const MIN_NAME: usize = 2;
const MIN_DESCRIPTION: usize = 30;

/// Symbol fields as scraped, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSymbol {
    pub name: String,
    pub description: String,
    pub tradition: String,
    pub origin: String,
    pub period: String,
    pub date: String,
    pub element: String,
    pub usage: String,
}

impl RawSymbol {
    fn new(name: &str, description: &str) -> Self {
        Self {
            name: clean_text(name),
            description: clean_text(description),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolLead {
    Entry(RawSymbol),
    /// Listed on the page, described elsewhere.
    Reference { name: String, url: String },
}

const ROUTES: &[Route<SymbolLead>] = &[
    Route {
        name: "wikipedia",
        matches: is_wikipedia,
        strategy: wikipedia,
    },
    Route {
        name: "sacred-texts",
        matches: is_sacred_texts,
        strategy: sacred_texts,
    },
    Route {
        name: "generic",
        matches: any_host,
        strategy: generic,
    },
];

pub struct SymbolExtractor;

impl Extractor for SymbolExtractor {
    type Raw = SymbolLead;
    type Output = Symbol;

    fn kind(&self) -> SourceKind {
        SourceKind::Symbol
    }

    fn extract(&self, doc: &ParsedDocument) -> Result<Vec<SymbolLead>, ExtractionError> {
        dispatch(ROUTES, doc)
    }

    fn transform(&self, raw: Vec<SymbolLead>, url: &str) -> Extraction<Symbol> {
        let mut out = Extraction::default();
        let mut rejected = 0usize;
        for lead in raw {
            match lead {
                SymbolLead::Reference { name, url } => out.follow_ups.push(DetailRequest {
                    kind: SourceKind::Symbol,
                    name,
                    url,
                }),
                SymbolLead::Entry(raw) => match build_symbol(raw, url) {
                    Some(symbol) => out.records.push(symbol),
                    None => rejected += 1,
                },
            }
        }
        if rejected > 0 {
            debug!(url, rejected, "dropped invalid symbol candidates");
        }
        out
    }
}

impl Deduplicate for Symbol {
    type Key = String;

    fn dedup_key(&self) -> String {
        self.name.to_lowercase()
    }

    fn detail_len(&self) -> usize {
        self.description.chars().count()
    }
}

fn build_symbol(raw: RawSymbol, url: &str) -> Option<Symbol> {
    let name = clean_text(&raw.name);
    let description = clean_text(&raw.description);
    if name.chars().count() < MIN_NAME || description.chars().count() < MIN_DESCRIPTION {
        return None;
    }

    let century_origin = [&raw.origin, &raw.period, &raw.date]
        .into_iter()
        .map(|text| parse_century(text))
        .find(|&c| c != 0)
        .unwrap_or(0);
    let element = if is_placeholder(&raw.element) {
        infer_element(&description)
    } else {
        title_case(&raw.element)
    };
    let date = today();

    Some(Symbol {
        id: symbol_id(&name, url),
        tradition: normalize_tradition(&raw.tradition),
        element,
        century_origin,
        visual_elements: extract_visual_elements(&description),
        usage: clean_text(&raw.usage),
        source_url: Some(url.to_string()),
        date_added: Some(date),
        last_updated: None,
        name,
        description,
        extra: Default::default(),
    })
}

fn infer_element(description: &str) -> String {
    let lower = description.to_lowercase();
    ELEMENT_HINTS
        .iter()
        .find(|hint| find_word_start(&lower, hint).is_some())
        .map_or_else(|| UNKNOWN.to_string(), |hint| title_case(hint))
}

fn mentions_occult(text: &str) -> bool {
    let lower = text.to_lowercase();
    OCCULT_TERMS.iter().any(|t| lower.contains(t))
}

// ── Strategies ──

fn wikipedia(doc: &ParsedDocument) -> Result<Vec<SymbolLead>, ExtractionError> {
    if let Some(panel) = doc.select_first(&INFOBOX) {
        if let Some(raw) = infobox_symbol(doc, panel) {
            return Ok(vec![SymbolLead::Entry(raw)]);
        }
    }

    let references: Vec<SymbolLead> = doc
        .select_all(&LISTING_LINKS)
        .into_iter()
        .filter_map(|a| {
            let name = element_text(a);
            let url = doc.absolute_url(a.value().attr("href")?)?;
            (!name.is_empty()).then_some(SymbolLead::Reference { name, url })
        })
        .collect();
    if !references.is_empty() {
        return Ok(references);
    }

    Ok(page_title(doc)
        .zip(lead_paragraph(doc))
        .map(|(name, description)| SymbolLead::Entry(RawSymbol::new(&name, &description)))
        .into_iter()
        .collect())
}

fn infobox_symbol(doc: &ParsedDocument, panel: ElementRef<'_>) -> Option<RawSymbol> {
    let name = page_title(doc).or_else(|| {
        panel
            .select(&INFOBOX_TITLE)
            .next()
            .map(element_text)
            .filter(|t| !t.is_empty())
    })?;

    let mut raw = RawSymbol {
        name,
        ..RawSymbol::default()
    };
    for block in classify(panel) {
        let Block::Row { label, value, .. } = block else {
            continue;
        };
        let label = label.to_lowercase();
        let value = wiki_text(&value);
        let slot = if label.contains("tradition") {
            &mut raw.tradition
        } else if label.contains("origin") {
            &mut raw.origin
        } else if label.contains("element") {
            &mut raw.element
        } else if label.contains("symbol of") {
            &mut raw.description
        } else if label.contains("used for") {
            &mut raw.usage
        } else if label.contains("used by") && raw.tradition.is_empty() {
            &mut raw.tradition
        } else if label.contains("period") {
            &mut raw.period
        } else if label.contains("date") {
            &mut raw.date
        } else {
            continue;
        };
        *slot = value;
    }

    let has_field = [
        &raw.tradition,
        &raw.origin,
        &raw.element,
        &raw.description,
        &raw.usage,
        &raw.period,
        &raw.date,
    ]
    .iter()
    .any(|f| !f.is_empty());
    if !has_field {
        return None;
    }
    if raw.description.chars().count() < MIN_DESCRIPTION {
        if let Some(lead) = lead_paragraph(doc) {
            raw.description = lead;
        }
    }
    Some(raw)
}

fn sacred_texts(doc: &ParsedDocument) -> Result<Vec<SymbolLead>, ExtractionError> {
    let blocks = classify(doc.root());
    let mut found = Vec::new();
    let mut push = |name: &str, description: &str| {
        let name = clean_text(name);
        let lower = name.to_lowercase();
        if name.chars().count() < 3 || NAV_LABELS.contains(&lower.as_str()) {
            return;
        }
        if description.chars().count() > MIN_DESCRIPTION {
            found.push(SymbolLead::Entry(RawSymbol::new(&name, description)));
        }
    };

    for section in cluster_sections(&blocks) {
        // a bold-led opening paragraph names its own entry
        let opening = section
            .blocks
            .iter()
            .find(|b| matches!(b, Block::Paragraph { .. }));
        if let (Some(heading), Some(Block::Paragraph { text, lead: None })) =
            (&section.heading, opening)
        {
            push(heading, text);
        }
        for block in &section.blocks {
            if let Block::Paragraph {
                text,
                lead: Some(lead),
            } = block
            {
                let rest = text[lead.len()..]
                    .trim_start_matches(|c: char| c.is_whitespace() || ":.-–—".contains(c));
                push(lead, rest);
            }
        }
    }
    Ok(found)
}

fn generic(doc: &ParsedDocument) -> Result<Vec<SymbolLead>, ExtractionError> {
    let sections = cluster_sections(&classify(doc.main_content(&MAIN_CONTENT)));
    let mut found: Vec<SymbolLead> = sections
        .iter()
        .filter_map(|s| Some((s.heading.as_deref()?, s.first_paragraph()?)))
        .filter(|(heading, text)| {
            text.chars().count() > 40 && mentions_occult(&format!("{} {}", heading, text))
        })
        .map(|(heading, text)| SymbolLead::Entry(RawSymbol::new(heading, text)))
        .collect();

    if found.is_empty() && mentions_occult(&doc.visible_text()) {
        let substantial = sections
            .iter()
            .flat_map(|s| s.paragraphs())
            .find(|p| p.chars().count() > 100);
        if let (Some(title), Some(text)) = (page_title(doc), substantial) {
            found.push(SymbolLead::Entry(RawSymbol::new(&title, text)));
        }
    }
    Ok(found)
}
