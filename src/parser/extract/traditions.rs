use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::Selector;
use tracing::debug;

use super::{
    any_host, dispatch, is_sacred_texts, is_wikipedia, lead_paragraph, page_title, wiki_text,
    Deduplicate, Extraction, Extractor, Route, INFOBOX, MAIN_CONTENT,
};
use crate::error::ExtractionError;
use crate::normalize::century::{parse_century_range, PRESENT_CENTURY};
use crate::normalize::find_word_start;
use crate::normalize::phrases::{extract_concepts, MAX_CONCEPTS};
use crate::normalize::region::normalize_region;
use crate::parser::blocks::{classify, Block};
use crate::parser::sections::{cluster_sections, subtree, Section};
use crate::parser::ParsedDocument;
use crate::records::{clean_text, dedup_ci, today, DetailRequest, SourceKind, Tradition, UNKNOWN};

static ARTICLE_BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#mw-content-text").unwrap());

const CONCEPT_HEADINGS: &[&str] = &[
    "concept", "belief", "teaching", "principle", "doctrine", "idea", "philosophy",
];
const RELATED_HEADINGS: &[&str] = &["tradition", "school", "branch", "movement"];
const TEXT_HEADINGS: &[&str] = &["text", "book", "scripture", "writing"];
const SACRED_TEXTS_CONCEPTS: usize = 10;
const MIN_LONG_PARAGRAPH: usize = 100;
const MIN_NAME: usize = 3;

const TRADITION_TERMS: &[&str] = &[
    "occult", "esoteric", "mystical", "spiritual", "hermetic", "alchemical", "magical",
    "magick", "pagan", "wicca", "druid", "kabbalah", "gnostic", "theosophy", "rosicrucian",
    "masonic", "ceremonial magic", "grimoire", "witchcraft", "sorcery", "shamanism", "tantra",
    "vedic", "mystery cult", "theurgy", "alchemy", "astrology", "divination", "magician",
    "ritual", "initiation", "thelema", "golden dawn", "enochian", "hermeticism", "egyptian",
    "greek", "roman", "norse", "celtic", "druidic", "thelemic", "wiccan", "neopagan", "oto",
    "chaos magic", "goetia", "theosophical",
];
const MODERN_MARKERS: &[&str] = &[
    "chaos magic", "thelema", "wicca", "neo-pagan", "neopagan", "new age", "modern",
    "contemporary", "discordian", "satanism", "golden dawn", "oto", "theosophical",
];
const MODERN_SPAN: (i32, i32) = (19, PRESENT_CENTURY);
const ANCIENT_SPAN: (i32, i32) = (-5, 5);
const UNDATED_SPAN: (i32, i32) = (0, PRESENT_CENTURY);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTradition {
    pub name: String,
    pub description: String,
    pub period: String,
    pub region: String,
    pub texts: Vec<String>,
    pub figures: Vec<String>,
    pub concepts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TraditionLead {
    Entry(RawTradition),
    Reference { name: String, url: String },
}

const ROUTES: &[Route<TraditionLead>] = &[
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

pub struct TraditionExtractor;

impl Extractor for TraditionExtractor {
    type Raw = TraditionLead;
    type Output = Tradition;

    fn kind(&self) -> SourceKind {
        SourceKind::Tradition
    }

    fn extract(&self, doc: &ParsedDocument) -> Result<Vec<TraditionLead>, ExtractionError> {
        dispatch(ROUTES, doc)
    }

    fn transform(&self, raw: Vec<TraditionLead>, url: &str) -> Extraction<Tradition> {
        let mut out = Extraction::default();
        let mut rejected = 0usize;
        for lead in raw {
            match lead {
                TraditionLead::Reference { name, url } => out.follow_ups.push(DetailRequest {
                    kind: SourceKind::Tradition,
                    name,
                    url,
                }),
                TraditionLead::Entry(raw) => match build_tradition(raw, url) {
                    Some(t) => out.records.push(t),
                    None => rejected += 1,
                },
            }
        }
        if rejected > 0 {
            debug!(url, rejected, "dropped invalid tradition candidates");
        }
        out
    }
}

impl Deduplicate for Tradition {
    type Key = String;

    fn dedup_key(&self) -> String {
        self.name.to_lowercase()
    }

    fn detail_len(&self) -> usize {
        self.description.chars().count()
    }
}

fn build_tradition(raw: RawTradition, url: &str) -> Option<Tradition> {
    let name = clean_text(&raw.name);
    if name.chars().count() < MIN_NAME {
        return None;
    }
    let description = clean_text(&raw.description);

    let (start_century, end_century) = parse_century_range(&raw.period)
        .or_else(|| parse_century_range(&description))
        .unwrap_or(if description.is_empty() {
            UNDATED_SPAN
        } else if looks_modern(&name) {
            MODERN_SPAN
        } else {
            ANCIENT_SPAN
        });

    let mut region = normalize_region(&raw.region);
    if region == UNKNOWN {
        region = normalize_region(&description);
    }

    let cleaned = |items: Vec<String>| dedup_ci(items.iter().map(|s| clean_text(s)).collect());
    let mut major_texts = cleaned(raw.texts);
    if major_texts.is_empty() {
        major_texts.push(UNKNOWN.to_string());
    }
    let mut core_concepts = cleaned(raw.concepts);
    core_concepts.truncate(MAX_CONCEPTS);

    Some(Tradition {
        name,
        start_century,
        end_century,
        region,
        description,
        major_texts,
        key_figures: cleaned(raw.figures),
        core_concepts,
        source_url: Some(url.to_string()),
        date_added: Some(today()),
        last_updated: None,
        extra: Default::default(),
    })
}

fn looks_like_tradition(text: &str) -> bool {
    let lower = text.to_lowercase();
    TRADITION_TERMS
        .iter()
        .any(|t| find_word_start(&lower, t).is_some())
}

fn looks_modern(name: &str) -> bool {
    let lower = name.to_lowercase();
    MODERN_MARKERS
        .iter()
        .any(|m| find_word_start(&lower, m).is_some())
}

/// Panel cell as a list: its `li` items, else the text split on `,`/`;`.
fn list_or_split(items: Vec<String>, value: &str) -> Vec<String> {
    if !items.is_empty() {
        return items.iter().map(|s| wiki_text(s)).collect();
    }
    value
        .split([',', ';'])
        .map(wiki_text)
        .filter(|s| !s.is_empty())
        .collect()
}

fn section_list_names(section: &Section) -> Vec<String> {
    section
        .list_items()
        .filter_map(|b| match b {
            Block::ListItem { link: Some(l), .. } if !l.text.is_empty() => Some(l.text.clone()),
            Block::ListItem { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

// ── Strategies ──

fn wikipedia(doc: &ParsedDocument) -> Result<Vec<TraditionLead>, ExtractionError> {
    let Some(name) = page_title(doc) else {
        return Ok(Vec::new());
    };
    let mut raw = RawTradition {
        name,
        description: lead_paragraph(doc).unwrap_or_default(),
        ..RawTradition::default()
    };

    if let Some(panel) = doc.select_first(&INFOBOX) {
        for block in classify(panel) {
            let Block::Row { label, value, items } = block else {
                continue;
            };
            let label = label.to_lowercase();
            let has = |keys: &[&str]| keys.iter().any(|k| find_word_start(&label, k).is_some());
            if has(&["period", "founded", "date", "era"]) {
                raw.period = wiki_text(&value);
            } else if has(&["region", "location", "origin", "country"]) {
                raw.region = wiki_text(&value);
            } else if has(&["text", "scripture"]) {
                raw.texts = list_or_split(items, &value);
            } else if has(&["figure", "notable", "founder"]) {
                raw.figures = list_or_split(items, &value);
            }
        }
    }

    let sections = cluster_sections(&classify(doc.main_content(&ARTICLE_BODY)));
    let concept_text = sections
        .iter()
        .filter(|s| s.heading_mentions(CONCEPT_HEADINGS))
        .flat_map(|s| s.paragraphs())
        .map(wiki_text)
        .collect::<Vec<_>>()
        .join(" ");
    raw.concepts = extract_concepts(&concept_text);

    let mut leads = vec![TraditionLead::Entry(raw)];
    let mut seen = HashSet::new();
    for (i, section) in sections.iter().enumerate() {
        if !section.heading_mentions(RELATED_HEADINGS) {
            continue;
        }
        for sub in subtree(&sections, i) {
            for block in sub.list_items() {
                let Block::ListItem { link: Some(link), .. } = block else {
                    continue;
                };
                if link.text.is_empty() || link.href.starts_with('#') {
                    continue;
                }
                let Some(url) = doc.absolute_url(&link.href) else {
                    continue;
                };
                if seen.insert(url.clone()) {
                    leads.push(TraditionLead::Reference {
                        name: link.text.clone(),
                        url,
                    });
                }
            }
        }
    }
    Ok(leads)
}

fn sacred_texts(doc: &ParsedDocument) -> Result<Vec<TraditionLead>, ExtractionError> {
    let from_title = doc.title().and_then(|title| {
        title
            .split(':')
            .map(|part| clean_text(&part.replace("Sacred Texts", "")))
            .find(|part| !part.is_empty())
    });
    let Some(name) = from_title.or_else(|| page_title(doc)) else {
        return Ok(Vec::new());
    };

    let sections = cluster_sections(&classify(doc.root()));
    let paragraphs: Vec<&str> = sections.iter().flat_map(|s| s.paragraphs()).collect();
    let texts = sections
        .iter()
        .filter(|s| s.heading_mentions(TEXT_HEADINGS))
        .flat_map(section_list_names)
        .collect();
    let mut concepts = extract_concepts(&paragraphs.join(" "));
    concepts.truncate(SACRED_TEXTS_CONCEPTS);

    Ok(vec![TraditionLead::Entry(RawTradition {
        name,
        description: paragraphs.iter().take(2).copied().collect::<Vec<_>>().join(" "),
        texts,
        concepts,
        ..RawTradition::default()
    })])
}

fn generic(doc: &ParsedDocument) -> Result<Vec<TraditionLead>, ExtractionError> {
    let Some(title) = page_title(doc).filter(|t| looks_like_tradition(t)) else {
        return Ok(Vec::new());
    };
    let sections = cluster_sections(&classify(doc.main_content(&MAIN_CONTENT)));
    let description = sections
        .iter()
        .flat_map(|s| s.paragraphs())
        .take(3)
        .find(|p| p.chars().count() > MIN_LONG_PARAGRAPH)
        .unwrap_or_default()
        .to_string();

    let mut leads = vec![TraditionLead::Entry(RawTradition {
        name: title.clone(),
        description,
        ..RawTradition::default()
    })];
    for section in &sections {
        let (Some(heading), Some(text)) = (&section.heading, section.first_paragraph()) else {
            continue;
        };
        if heading.eq_ignore_ascii_case(&title)
            || !looks_like_tradition(heading)
            || text.chars().count() <= MIN_LONG_PARAGRAPH
        {
            continue;
        }
        leads.push(TraditionLead::Entry(RawTradition {
            name: heading.clone(),
            description: text.to_string(),
            ..RawTradition::default()
        }));
    }
    Ok(leads)
}
