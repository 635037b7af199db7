use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use tracing::debug;
use url::Url;

use super::{any_host, dispatch, host_within, Deduplicate, Extraction, Extractor, Route};
use crate::error::ExtractionError;
use crate::parser::{element_text, ParsedDocument};
use crate::records::{clean_text, SourceKind};

static GOOGLE_RESULT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.g").unwrap());
static GOOGLE_SNIPPET: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.VwiC3b, span.st, div.s").unwrap());
static BING_RESULT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li.b_algo").unwrap());
static BING_TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2 a").unwrap());
static BING_SNIPPET: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".b_caption p").unwrap());
static DDG_RESULT: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".result").unwrap());
static DDG_TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a.result__a").unwrap());
static DDG_SNIPPET: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".result__snippet").unwrap());
static H3: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h3").unwrap());
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

const KEYWORDS: &[&str] = &[
    "occult", "esoteric", "symbol", "magic", "ritual", "spiritual", "mystic", "sacred", "ancient",
];
const TRUSTED_DOMAINS: &[&str] = &[
    "wikipedia.org",
    "sacred-texts.com",
    "academia.edu",
    "jstor.org",
    "britannica.com",
    "hermetic.com",
];
const TITLE_SCORE: i32 = 2;
const SNIPPET_SCORE: i32 = 1;
const TRUSTED_SCORE: i32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct RawHit {
    pub title: String,
    pub url: String,
    pub description: String,
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub description: String,
    pub score: i32,
}

const ROUTES: &[Route<RawHit>] = &[
    Route {
        name: "google",
        matches: is_google,
        strategy: google,
    },
    Route {
        name: "bing",
        matches: is_bing,
        strategy: bing,
    },
    Route {
        name: "duckduckgo",
        matches: is_duckduckgo,
        strategy: duckduckgo,
    },
    Route {
        name: "generic",
        matches: any_host,
        strategy: generic,
    },
];

fn is_google(host: &str) -> bool {
    host.contains("google.")
}

fn is_bing(host: &str) -> bool {
    host_within(host, "bing.com")
}

fn is_duckduckgo(host: &str) -> bool {
    host_within(host, "duckduckgo.com")
}

pub struct SearchExtractor;

impl Extractor for SearchExtractor {
    type Raw = RawHit;
    type Output = SearchHit;

    fn kind(&self) -> SourceKind {
        SourceKind::Search
    }

    fn extract(&self, doc: &ParsedDocument) -> Result<Vec<RawHit>, ExtractionError> {
        dispatch(ROUTES, doc)
    }

    fn transform(&self, raw: Vec<RawHit>, _url: &str) -> Extraction<SearchHit> {
        let mut seen = HashSet::new();
        let mut records: Vec<SearchHit> = raw
            .into_iter()
            .filter(|hit| !hit.url.is_empty() && seen.insert(hit.url.clone()))
            .map(|hit| SearchHit {
                score: score(&hit),
                title: hit.title,
                url: hit.url,
                description: hit.description,
            })
            .collect();
        records.sort_by_key(|hit| Reverse(hit.score));
        debug!(hits = records.len(), "ranked search results");
        Extraction {
            records,
            follow_ups: Vec::new(),
        }
    }
}

impl Deduplicate for SearchHit {
    type Key = String;

    fn dedup_key(&self) -> String {
        self.url.clone()
    }

    fn detail_len(&self) -> usize {
        self.description.chars().count()
    }
}

fn score(hit: &RawHit) -> i32 {
    let title = hit.title.to_lowercase();
    let description = hit.description.to_lowercase();
    let mut score = 0;
    for term in KEYWORDS {
        if title.contains(term) {
            score += TITLE_SCORE;
        }
        if description.contains(term) {
            score += SNIPPET_SCORE;
        }
    }
    let host = Url::parse(&hit.url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();
    if TRUSTED_DOMAINS.iter().any(|d| host_within(&host, d)) {
        score += TRUSTED_SCORE;
    }
    score
}

/// Absolute target of a result link, unwrapping `/url?q=` and `uddg=` redirects.
fn result_url(doc: &ParsedDocument, href: &str) -> Option<String> {
    let absolute = doc.url.join(href).ok()?;
    let wrapped = absolute
        .query_pairs()
        .find(|(k, _)| k == "uddg" || (k == "q" && absolute.path() == "/url"))
        .map(|(_, v)| v.into_owned());
    let target = match wrapped {
        Some(inner) => Url::parse(&inner).ok()?,
        None => absolute,
    };
    matches!(target.scheme(), "http" | "https").then(|| target.to_string())
}

fn snippet(result: ElementRef<'_>, selector: &Selector) -> String {
    result
        .select(selector)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

fn hit(doc: &ParsedDocument, title: String, href: &str, description: String) -> Option<RawHit> {
    let url = result_url(doc, href)?;
    let title = clean_text(&title);
    (!title.is_empty()).then_some(RawHit {
        title,
        url,
        description: clean_text(&description),
    })
}

fn google(doc: &ParsedDocument) -> Result<Vec<RawHit>, ExtractionError> {
    Ok(doc
        .select_all(&GOOGLE_RESULT)
        .into_iter()
        .filter_map(|r| {
            let link = r.select(&LINK).next()?;
            let title = r.select(&H3).next().map(element_text)?;
            hit(doc, title, link.value().attr("href")?, snippet(r, &GOOGLE_SNIPPET))
        })
        .collect())
}

fn bing(doc: &ParsedDocument) -> Result<Vec<RawHit>, ExtractionError> {
    Ok(doc
        .select_all(&BING_RESULT)
        .into_iter()
        .filter_map(|r| {
            let link = r.select(&BING_TITLE).next()?;
            let href = link.value().attr("href")?;
            hit(doc, element_text(link), href, snippet(r, &BING_SNIPPET))
        })
        .collect())
}

fn duckduckgo(doc: &ParsedDocument) -> Result<Vec<RawHit>, ExtractionError> {
    Ok(doc
        .select_all(&DDG_RESULT)
        .into_iter()
        .filter_map(|r| {
            let link = r.select(&DDG_TITLE).next()?;
            let href = link.value().attr("href")?;
            hit(doc, element_text(link), href, snippet(r, &DDG_SNIPPET))
        })
        .collect())
}

/// Any outbound link is a candidate.
fn generic(doc: &ParsedDocument) -> Result<Vec<RawHit>, ExtractionError> {
    let own_host = doc.host().to_string();
    Ok(doc
        .select_all(&LINK)
        .into_iter()
        .filter_map(|a| hit(doc, element_text(a), a.value().attr("href")?, String::new()))
        .filter(|h| {
            Url::parse(&h.url)
                .ok()
                .and_then(|u| u.host_str().map(|host| host != own_host))
                .unwrap_or(false)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(url: &str, html: &str) -> Vec<SearchHit> {
        let doc = ParsedDocument::parse(url, html).unwrap();
        let raw = SearchExtractor.extract(&doc).unwrap();
        SearchExtractor.transform(raw, url).records
    }

    #[test]
    fn duckduckgo_results_are_unwrapped_and_ranked() {
        let html = std::fs::read_to_string("tests/fixtures/search_ddg.html").unwrap();
        let hits = ranked("https://html.duckduckgo.com/html/?q=ankh+occult+symbol", &html);
        let urls: Vec<&str> = hits.iter().map(|h| h.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://symbols.example.org/ankh",
                "https://en.wikipedia.org/wiki/Ankh",
                "https://garden.example.com/charms",
            ]
        );
        let scores: Vec<i32> = hits.iter().map(|h| h.score).collect();
        assert_eq!(scores, vec![7, 5, 0]);
    }

    #[test]
    fn google_redirects() {
        let html = r#"<html><body>
            <div class="g"><a href="/url?q=https://www.britannica.com/topic/ankh&amp;sa=U">
              <h3>Ankh | Egyptian sign</h3></a>
              <div class="VwiC3b">The hieroglyph for life.</div></div>
            </body></html>"#;
        let hits = ranked("https://www.google.com/search?q=ankh", html);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://www.britannica.com/topic/ankh");
        assert_eq!(hits[0].title, "Ankh | Egyptian sign");
        assert_eq!(hits[0].score, 3);
    }

    #[test]
    fn generic_keeps_outbound_links() {
        let html = r#"<html><body>
            <a href="/about">About</a>
            <a href="mailto:someone@example.net">Mail</a>
            <a href="https://www.sacred-texts.com/sym/index.htm">Sacred symbols</a>
            </body></html>"#;
        let hits = ranked("https://links.example.org/", html);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, TITLE_SCORE * 2 + TRUSTED_SCORE);
    }
}
