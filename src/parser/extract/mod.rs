pub mod connections;
pub mod search;
pub mod symbols;
pub mod traditions;

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::Selector;
use tracing::{debug, info, warn};

use super::{element_text, ParsedDocument};
use crate::error::ExtractionError;
use crate::records::{clean_text, DetailRequest, SourceKind};
use crate::scraper::{Fetcher, RawDocument};

static CITATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(?:\d+|[a-z]|citation needed|note \d+)\]").unwrap());
static FIRST_HEADING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1#firstHeading").unwrap());
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
pub(crate) static MAIN_CONTENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("main, #content, .content, article, .post").unwrap());
pub(crate) static INFOBOX: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".infobox").unwrap());
static LEAD_PARAGRAPHS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("#mw-content-text .mw-parser-output > p, #mw-content-text > p").unwrap()
});
static PARAGRAPHS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());

pub type Strategy<R> = fn(&ParsedDocument) -> Result<Vec<R>, ExtractionError>;

/// One entry of a host dispatch table.
pub struct Route<R> {
    pub name: &'static str,
    pub matches: fn(&str) -> bool,
    pub strategy: Strategy<R>,
}

/// First route accepting `host`, else the last (fallback) route.
pub fn route_for<'a, R>(routes: &'a [Route<R>], host: &str) -> Option<&'a Route<R>> {
    routes
        .iter()
        .find(|r| (r.matches)(host))
        .or_else(|| routes.last())
}

/// Run the route for the document's host.
pub fn dispatch<R>(routes: &[Route<R>], doc: &ParsedDocument) -> Result<Vec<R>, ExtractionError> {
    let route = route_for(routes, doc.host())
        .ok_or_else(|| ExtractionError::Structure("no extraction routes".into()))?;
    debug!(url = %doc.url, route = route.name, "dispatching");
    (route.strategy)(doc)
}

pub fn any_host(_host: &str) -> bool {
    true
}

pub fn is_wikipedia(host: &str) -> bool {
    host_within(host, "wikipedia.org")
}

pub fn is_sacred_texts(host: &str) -> bool {
    host_within(host, "sacred-texts.com")
}

pub fn host_within(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|rest| rest.ends_with('.'))
}

/// Records and stubs produced from one or more pages.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction<T> {
    pub records: Vec<T>,
    pub follow_ups: Vec<DetailRequest>,
}

impl<T> Default for Extraction<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            follow_ups: Vec::new(),
        }
    }
}

pub trait Extractor: Send + Sync {
    type Raw;
    type Output: Deduplicate + Send;

    fn kind(&self) -> SourceKind;
    fn extract(&self, doc: &ParsedDocument) -> Result<Vec<Self::Raw>, ExtractionError>;
    fn transform(&self, raw: Vec<Self::Raw>, url: &str) -> Extraction<Self::Output>;
}

/// Identity and tie-break rule for within-run deduplication.
pub trait Deduplicate {
    type Key: Eq + Hash + Send;

    fn dedup_key(&self) -> Self::Key;
    /// Length of the text that decides which duplicate survives.
    fn detail_len(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Added,
    Replaced,
    Rejected,
}

/// Keeps one item per key; a duplicate wins only with strictly longer detail.
pub struct Deduped<T: Deduplicate> {
    items: Vec<T>,
    index: HashMap<T::Key, usize>,
}

impl<T: Deduplicate> Default for Deduped<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Deduplicate> Deduped<T> {
    pub fn push(&mut self, item: T) -> Admission {
        let key = item.dedup_key();
        match self.index.get(&key) {
            Some(&i) if item.detail_len() > self.items[i].detail_len() => {
                self.items[i] = item;
                Admission::Replaced
            }
            Some(_) => Admission::Rejected,
            None => {
                self.index.insert(key, self.items.len());
                self.items.push(item);
                Admission::Added
            }
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

/// Visited-set guard consulted before every fetch.
#[async_trait]
pub trait UrlGate: Send + Sync {
    /// True when `url` may be fetched for `kind`; marks it visited.
    async fn claim(&self, kind: SourceKind, url: &str) -> bool;

    /// Like [`UrlGate::claim`], but also refuses URLs fetched under another kind.
    async fn claim_unseen(&self, kind: SourceKind, url: &str) -> bool {
        self.claim(kind, url).await
    }
}

/// Gate for URLs that were already claimed by the caller.
pub struct OpenGate;

#[async_trait]
impl UrlGate for OpenGate {
    async fn claim(&self, _kind: SourceKind, _url: &str) -> bool {
        true
    }
}

/// Parse, extract and transform one fetched page. Failures count as zero results.
pub fn process_document<E: Extractor>(extractor: &E, doc: &RawDocument) -> Extraction<E::Output> {
    let raw = ParsedDocument::parse(&doc.url, &doc.body).and_then(|parsed| extractor.extract(&parsed));
    match raw {
        Ok(raw) => extractor.transform(raw, &doc.url),
        Err(e) => {
            warn!("Extraction failed for {}: {}", doc.url, e);
            Extraction::default()
        }
    }
}

/// Fetch `urls` one after another and collect deduplicated results.
/// One URL failing never aborts the rest.
pub async fn fetch_all<E: Extractor>(
    extractor: &E,
    fetcher: &Fetcher,
    urls: &[String],
    gate: &dyn UrlGate,
) -> Extraction<E::Output> {
    let mut records = Deduped::default();
    let mut follow_ups = Vec::new();

    for url in urls {
        if !gate.claim(extractor.kind(), url).await {
            debug!(url = %url, kind = %extractor.kind(), "already visited");
            continue;
        }
        let doc = match fetcher.fetch(url).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Skipping {}: {}", url, e);
                continue;
            }
        };
        let page = process_document(extractor, &doc);
        info!(
            "{} {}: {} records, {} follow-ups",
            extractor.kind(),
            url,
            page.records.len(),
            page.follow_ups.len()
        );
        for record in page.records {
            records.push(record);
        }
        follow_ups.extend(page.follow_ups);
    }

    Extraction {
        records: records.into_vec(),
        follow_ups,
    }
}

/// Strip wiki citation markers and normalize whitespace.
pub fn wiki_text(text: &str) -> String {
    clean_text(&CITATION_RE.replace_all(text, ""))
}

/// Page name: wiki heading, else `<title>` up to its first separator, else first `h1`.
pub fn page_title(doc: &ParsedDocument) -> Option<String> {
    if let Some(h) = doc.select_first(&FIRST_HEADING).map(element_text) {
        if !h.is_empty() {
            return Some(h);
        }
    }
    let from_title = doc.title().map(|t| {
        [" - ", " | ", " — "]
            .iter()
            .fold(t, |acc, sep| acc.split(sep).next().unwrap_or_default().to_string())
            .trim()
            .to_string()
    });
    from_title
        .filter(|t| !t.is_empty())
        .or_else(|| doc.select_first(&H1).map(element_text))
        .filter(|t| !t.is_empty())
}

/// First non-empty paragraph of a wiki article body, falling back to any paragraph.
pub fn lead_paragraph(doc: &ParsedDocument) -> Option<String> {
    let first = |sel: &Selector| {
        doc.select_all(sel)
            .into_iter()
            .map(|p| wiki_text(&element_text(p)))
            .find(|t| !t.is_empty())
    };
    first(&LEAD_PARAGRAPHS).or_else(|| first(&PARAGRAPHS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Item(&'static str, &'static str);

    impl Deduplicate for Item {
        type Key = String;
        fn dedup_key(&self) -> String {
            self.0.to_lowercase()
        }
        fn detail_len(&self) -> usize {
            self.1.len()
        }
    }

    #[test]
    fn longer_detail_replaces_in_place() {
        let mut d = Deduped::default();
        assert_eq!(d.push(Item("Ankh", "short")), Admission::Added);
        assert_eq!(d.push(Item("Djed", "pillar")), Admission::Added);
        assert_eq!(d.push(Item("ankh", "a much longer text")), Admission::Replaced);
        assert_eq!(d.push(Item("ANKH", "tiny")), Admission::Rejected);
        assert_eq!(
            d.into_vec(),
            vec![Item("ankh", "a much longer text"), Item("Djed", "pillar")]
        );
    }

    #[test]
    fn host_routing() {
        assert!(is_wikipedia("en.wikipedia.org"));
        assert!(!is_wikipedia("notwikipedia.org"));
        assert!(is_sacred_texts("www.sacred-texts.com"));

        let routes: [Route<u8>; 2] = [
            Route {
                name: "wiki",
                matches: is_wikipedia,
                strategy: |_| Ok(vec![1]),
            },
            Route {
                name: "generic",
                matches: any_host,
                strategy: |_| Ok(vec![2]),
            },
        ];
        assert_eq!(route_for(&routes, "de.wikipedia.org").unwrap().name, "wiki");
        assert_eq!(route_for(&routes, "example.org").unwrap().name, "generic");
    }

    #[test]
    fn titles_and_citations() {
        let doc = ParsedDocument::parse(
            "https://example.org/x",
            "<html><head><title>Sigil | Grimoire Archive</title></head>\
             <body><p></p><p>A sigil[1] is a sign.[citation needed]</p></body></html>",
        )
        .unwrap();
        assert_eq!(page_title(&doc).as_deref(), Some("Sigil"));
        assert_eq!(lead_paragraph(&doc).as_deref(), Some("A sigil is a sign."));
    }
}
