use std::collections::HashSet;
use std::ops::Range;
use std::sync::{Arc, LazyLock};

use itertools::Itertools;
use rayon::prelude::*;
use regex::Regex;
use scraper::Selector;
use tracing::debug;

use super::{wiki_text, Deduplicate, Extraction, Extractor, MAIN_CONTENT};
use crate::error::ExtractionError;
use crate::normalize::find_whole_word;
use crate::parser::analyzer::{Assessment, SentenceAnalyzer};
use crate::parser::{element_text, ParsedDocument};
use crate::records::{clean_text, today, Connection, SourceKind};

static SENTENCE_END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+(?:\s+|$)").unwrap());
static PARAGRAPHS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());

/// Fixed alternate names, keyed by a fragment of the canonical name.
const WELL_KNOWN: &[(&str, &[&str])] = &[
    ("ankh", &["key of life", "crux ansata"]),
    ("eye of horus", &["eye of ra", "wadjet"]),
    ("pentagram", &["pentacle", "five pointed star"]),
];
const MIN_DESCRIPTION: usize = 10;
const FOCUS_GAP: Range<usize> = 4..100;

#[derive(Debug, Clone)]
struct RosterEntry {
    id: i64,
    aliases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawConnection {
    pub source: i64,
    pub target: i64,
    pub description: String,
    /// Set when the analyzer scored the pair.
    pub strength: Option<f64>,
}

/// Finds co-mentioned roster symbols sentence by sentence.
#[derive(Clone)]
pub struct ConnectionExtractor {
    roster: Arc<[RosterEntry]>,
    analyzer: Arc<dyn SentenceAnalyzer>,
}

impl ConnectionExtractor {
    pub fn new<I>(symbols: I, analyzer: Arc<dyn SentenceAnalyzer>) -> Self
    where
        I: IntoIterator<Item = (i64, String)>,
    {
        let mut claimed = HashSet::new();
        let mut ids = HashSet::new();
        let mut roster = Vec::new();
        for (id, name) in symbols {
            if !ids.insert(id) {
                continue;
            }
            // an alias belongs to the first symbol that claims it
            let aliases: Vec<String> = aliases(&name)
                .into_iter()
                .filter(|a| claimed.insert(a.clone()))
                .collect();
            if !aliases.is_empty() {
                roster.push(RosterEntry { id, aliases });
            }
        }
        Self {
            roster: roster.into(),
            analyzer,
        }
    }

    pub fn roster_len(&self) -> usize {
        self.roster.len()
    }

    /// Candidate connections in free text.
    pub fn scan_text(&self, text: &str) -> Vec<RawConnection> {
        let sentences = split_sentences(text);
        sentences
            .par_iter()
            .flat_map_iter(|s| self.scan_sentence(s))
            .collect()
    }

    fn scan_sentence(&self, sentence: &str) -> Vec<RawConnection> {
        let lower = sentence.to_lowercase();
        // offsets found in `lower` must stay valid for the text we slice
        let text = if lower.len() == sentence.len() {
            sentence
        } else {
            lower.as_str()
        };

        let mut mentions: Vec<(Range<usize>, &RosterEntry)> = self
            .roster
            .iter()
            .filter_map(|entry| {
                entry
                    .aliases
                    .iter()
                    .filter_map(|a| find_whole_word(&lower, a).map(|p| (p, p + a.len())))
                    .min()
                    .map(|(start, end)| (start..end, entry))
            })
            .collect();
        if mentions.len() < 2 {
            return Vec::new();
        }
        mentions.sort_by_key(|(range, _)| range.start);

        mentions
            .iter()
            .tuple_combinations()
            .filter_map(|((a, first), (b, second))| {
                if first.id == second.id || b.start < a.end {
                    return None;
                }
                let strength = match self.analyzer.assess(text, a.clone(), b.clone()) {
                    Assessment::CoOccurrence => None,
                    Assessment::Related(s) => Some(s),
                    Assessment::Unrelated => return None,
                };
                Some(RawConnection {
                    source: first.id,
                    target: second.id,
                    description: describe(text, a, b),
                    strength,
                })
            })
            .collect()
    }
}

impl Extractor for ConnectionExtractor {
    type Raw = RawConnection;
    type Output = Connection;

    fn kind(&self) -> SourceKind {
        SourceKind::Connection
    }

    fn extract(&self, doc: &ParsedDocument) -> Result<Vec<RawConnection>, ExtractionError> {
        let main = doc.main_content(&MAIN_CONTENT);
        let text = main
            .select(&PARAGRAPHS)
            .map(|p| wiki_text(&element_text(p)))
            .filter(|t| !t.is_empty())
            .join(" ");
        Ok(self.scan_text(&text))
    }

    fn transform(&self, raw: Vec<RawConnection>, url: &str) -> Extraction<Connection> {
        let total = raw.len();
        let records: Vec<Connection> = raw
            .into_iter()
            .filter(|r| r.source != r.target)
            .filter_map(|r| {
                let description = clean_text(&r.description);
                let len = description.chars().count();
                if len < MIN_DESCRIPTION {
                    return None;
                }
                Some(
                    Connection {
                        source: r.source,
                        target: r.target,
                        strength: r.strength.unwrap_or_else(|| strength_from_length(len)),
                        description,
                        source_url: Some(url.to_string()),
                        date_added: Some(today()),
                        ..Connection::default()
                    }
                    .normalized(),
                )
            })
            .collect();
        if records.len() < total {
            debug!(url, rejected = total - records.len(), "dropped invalid connections");
        }
        Extraction {
            records,
            follow_ups: Vec::new(),
        }
    }
}

impl Deduplicate for Connection {
    type Key = (i64, i64);

    fn dedup_key(&self) -> (i64, i64) {
        self.pair()
    }

    fn detail_len(&self) -> usize {
        self.description.chars().count()
    }
}

fn strength_from_length(len: usize) -> f64 {
    match len {
        l if l > 100 => 0.8,
        l if l > 50 => 0.6,
        _ => 0.4,
    }
}

/// Lowercase name variants a sentence may use for a symbol.
fn aliases(name: &str) -> Vec<String> {
    let base = clean_text(&name.to_lowercase());
    // punctuation separates words: "eye-of-horus" reads as "eye of horus"
    let spaced: String = base
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() || c == '_' { c } else { ' ' })
        .collect();
    let mut out = vec![base.clone(), clean_text(&spaced), base.replace('-', "")];

    let unprefixed: Vec<String> = out
        .iter()
        .filter_map(|a| a.strip_prefix("the "))
        .map(str::to_string)
        .collect();
    out.extend(unprefixed);

    let alternates: Vec<String> = WELL_KNOWN
        .iter()
        .filter(|(fragment, _)| out.iter().any(|a| a.contains(fragment)))
        .flat_map(|(_, alternates)| alternates.iter().map(|a| a.to_string()))
        .collect();
    out.extend(alternates);
    out.into_iter().filter(|a| !a.is_empty()).unique().collect()
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END_RE.find_iter(text) {
        let sentence = text[start..m.end()].trim();
        if !sentence.is_empty() {
            out.push(sentence);
        }
        start = m.end();
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

/// "A … B" when the gap between the mentions is short, else the sentence.
fn describe(sentence: &str, first: &Range<usize>, second: &Range<usize>) -> String {
    let gap = sentence[first.end..second.start].trim();
    if FOCUS_GAP.contains(&gap.chars().count()) {
        sentence[first.start..second.end].to_string()
    } else {
        sentence.to_string()
    }
}
