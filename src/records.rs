use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Symbol IDs live below this bound.
pub const ID_MODULUS: u128 = 1_000_000_000;

pub const UNKNOWN: &str = "Unknown";

/// Which extractor family produced (or should consume) a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Symbol,
    Tradition,
    Connection,
    Search,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Symbol => "symbol",
            SourceKind::Tradition => "tradition",
            SourceKind::Connection => "connection",
            SourceKind::Search => "search",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: i64,
    pub name: String,
    #[serde(default = "unknown")]
    pub tradition: String,
    #[serde(default = "unknown")]
    pub element: String,
    #[serde(default)]
    pub century_origin: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub usage: String,
    #[serde(default)]
    pub visual_elements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_added: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tradition {
    pub name: String,
    #[serde(default)]
    pub start_century: i32,
    #[serde(default = "present_century")]
    pub end_century: i32,
    #[serde(default = "unknown")]
    pub region: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub major_texts: Vec<String>,
    #[serde(default)]
    pub key_figures: Vec<String>,
    #[serde(default)]
    pub core_concepts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_added: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    #[serde(alias = "source_id")]
    pub source: i64,
    #[serde(alias = "target_id")]
    pub target: i64,
    #[serde(default)]
    pub strength: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_added: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A page that is only referenced, not yet content-scraped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRequest {
    pub kind: SourceKind,
    pub name: String,
    pub url: String,
}

impl DetailRequest {
    pub fn queue_key(&self) -> (SourceKind, String) {
        (self.kind, self.name.to_lowercase())
    }
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

fn present_century() -> i32 {
    crate::normalize::century::PRESENT_CENTURY
}

pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Deterministic symbol ID from `name|source_url`.
pub fn symbol_id(name: &str, source_url: &str) -> i64 {
    salted_symbol_id(name, source_url, 0)
}

/// Same as [`symbol_id`], with a salt used to step away from a collision.
pub fn salted_symbol_id(name: &str, source_url: &str, salt: u32) -> i64 {
    let key = if salt == 0 {
        format!("{}|{}", name, source_url)
    } else {
        format!("{}|{}|{}", name, source_url, salt)
    };
    let hash = blake3::hash(key.as_bytes());
    let mut head = [0u8; 16];
    head.copy_from_slice(&hash.as_bytes()[..16]);
    (u128::from_be_bytes(head) % ID_MODULUS) as i64
}

/// Whether a text field still holds a placeholder value.
pub fn is_placeholder(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v.eq_ignore_ascii_case(UNKNOWN)
}

/// Collapse runs of whitespace and trim.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Append `items` to `list`, skipping case-insensitive duplicates.
/// Returns how many were appended.
pub fn extend_unique<I>(list: &mut Vec<String>, items: I) -> usize
where
    I: IntoIterator<Item = String>,
{
    let mut seen: Vec<String> = list.iter().map(|s| s.to_lowercase()).collect();
    let mut added = 0;
    for item in items {
        let lower = item.to_lowercase();
        if item.trim().is_empty() || seen.contains(&lower) {
            continue;
        }
        seen.push(lower);
        list.push(item);
        added += 1;
    }
    added
}

/// Case-insensitive, order-preserving dedup.
pub fn dedup_ci(items: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(items.len());
    extend_unique(&mut out, items);
    out
}

impl Connection {
    /// Order the pair so `source < target`.
    pub fn normalized(mut self) -> Self {
        if self.source > self.target {
            std::mem::swap(&mut self.source, &mut self.target);
        }
        self
    }

    pub fn pair(&self) -> (i64, i64) {
        (self.source.min(self.target), self.source.max(self.target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_ids_are_stable_and_bounded() {
        let a = symbol_id("Ankh", "https://en.wikipedia.org/wiki/Ankh");
        let b = symbol_id("Ankh", "https://en.wikipedia.org/wiki/Ankh");
        assert_eq!(a, b);
        assert!((0..1_000_000_000).contains(&a));
        assert_ne!(a, symbol_id("Ankh", "https://example.org/ankh"));
        assert_ne!(a, salted_symbol_id("Ankh", "https://en.wikipedia.org/wiki/Ankh", 1));
    }

    #[test]
    fn connection_pairs_are_ordered() {
        let c = Connection {
            source: 9,
            target: 3,
            ..Default::default()
        }
        .normalized();
        assert_eq!((c.source, c.target), (3, 9));
        assert_eq!(c.pair(), (3, 9));
    }

    #[test]
    fn extend_unique_is_case_insensitive() {
        let mut list = vec!["Afterlife".to_string()];
        let added = extend_unique(
            &mut list,
            vec!["afterlife".into(), "Ma'at".into(), "MA'AT".into(), " ".into()],
        );
        assert_eq!(added, 1);
        assert_eq!(list, vec!["Afterlife", "Ma'at"]);
    }

    #[test]
    fn curated_records_load_with_defaults() {
        let json = r#"{"name": "Egyptian", "start_century": -30, "end_century": -1,
            "region": "North Africa", "historical_phases": ["Old Kingdom"]}"#;
        let t: Tradition = serde_json::from_str(json).unwrap();
        assert!(t.key_figures.is_empty());
        assert!(t.extra.contains_key("historical_phases"));

        let c: Connection =
            serde_json::from_str(r#"{"source_id": 4, "target_id": 2, "strength": 0.5}"#).unwrap();
        assert_eq!(c.pair(), (2, 4));
        let out = serde_json::to_value(&c).unwrap();
        assert!(out.get("source").is_some());
    }

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  the \n\t Ankh  "), "the Ankh");
    }
}
