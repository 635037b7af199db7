use std::sync::LazyLock;

use regex::Regex;

use crate::records::{clean_text, dedup_ci};

pub const MAX_CONCEPTS: usize = 15;
pub const MAX_VISUAL_ELEMENTS: usize = 10;
const MIN_SPAN: usize = 4;
const MAX_SPAN: usize = 39;

static CONCEPT_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"concept of ([^,.;:]+)",
        r"principle of ([^,.;:]+)",
        r"belief in ([^,.;:]+)",
        r"doctrine of ([^,.;:]+)",
        r"idea of ([^,.;:]+)",
        r"central to .+? (?:was|is) ([^,.;:]+)",
        r"based on ([^,.;:]+)",
        r"focused on ([^,.;:]+)",
        r"emphasizes ([^,.;:]+)",
        r"practices include ([^,.;:]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static VISUAL_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"depicting (?:a |an )?([^,.;]+)",
        r"showing (?:a |an )?([^,.;]+)",
        r"consists of (?:a |an )?([^,.;]+)",
        r"represents (?:a |an )?([^,.;]+)",
        r"shaped like (?:a |an )?([^,.;]+)",
        r"form of (?:a |an )?([^,.;]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static CAPITALIZED_PHRASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z][a-z]+ (?:[A-Z][a-z]+ ){0,3}[A-Z][a-z]+").unwrap());

/// Short concept phrases found in `text`, capitalized, at most [`MAX_CONCEPTS`].
pub fn extract_concepts(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let lower = text.to_lowercase();
    let mut concepts = Vec::new();

    for re in CONCEPT_RES.iter() {
        for caps in re.captures_iter(&lower) {
            let span = clean_text(&caps[1]);
            if (MIN_SPAN..=MAX_SPAN).contains(&span.chars().count()) {
                concepts.push(capitalize(&span));
            }
        }
    }

    for m in CAPITALIZED_PHRASE_RE.find_iter(text) {
        let len = m.as_str().chars().count();
        if (7..=MAX_SPAN).contains(&len) {
            concepts.push(m.as_str().to_string());
        }
    }

    let mut concepts = dedup_ci(concepts);
    concepts.truncate(MAX_CONCEPTS);
    concepts
}

/// Visual components described in a symbol description, at most
/// [`MAX_VISUAL_ELEMENTS`].
pub fn extract_visual_elements(description: &str) -> Vec<String> {
    let lower = description.to_lowercase();
    let mut found = Vec::new();
    for re in VISUAL_RES.iter() {
        for caps in re.captures_iter(&lower) {
            let span = clean_text(&caps[1]);
            if (MIN_SPAN..=MAX_SPAN).contains(&span.chars().count()) {
                found.push(span);
            }
        }
    }
    let mut found = dedup_ci(found);
    found.truncate(MAX_VISUAL_ELEMENTS);
    found
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
