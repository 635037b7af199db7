use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::{mpsc, oneshot, Semaphore};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::DiscoverySettings;
use crate::merge::{reserve_id, Corpus};
use crate::parser::analyzer::SentenceAnalyzer;
use crate::parser::extract::connections::ConnectionExtractor;
use crate::parser::extract::search::SearchExtractor;
use crate::parser::extract::symbols::SymbolExtractor;
use crate::parser::extract::traditions::TraditionExtractor;
use crate::parser::extract::{
    fetch_all, is_wikipedia, Admission, Deduped, Extraction, OpenGate, UrlGate,
};
use crate::records::{Connection, DetailRequest, SourceKind, Symbol, Tradition};
use crate::scraper::Fetcher;
use crate::sources::SourceList;

const DISCOVERY_TERMS: &str = "occult symbol";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
enum JobKind {
    Symbols(Vec<String>),
    Traditions(Vec<String>),
    Connections(Vec<String>),
    /// Search for pages about one symbol, then scan them for connections.
    Discovery(DetailRequest),
}

impl JobKind {
    fn label(&self) -> String {
        match self {
            JobKind::Symbols(urls) => format!("symbols ({} urls)", urls.len()),
            JobKind::Traditions(urls) => format!("traditions ({} urls)", urls.len()),
            JobKind::Connections(urls) => format!("connections ({} urls)", urls.len()),
            JobKind::Discovery(request) => format!("discovery for {}", request.name),
        }
    }
}

enum Outcome {
    Symbols(Extraction<Symbol>),
    Traditions(Extraction<Tradition>),
    Connections(Extraction<Connection>),
}

enum Message {
    Started {
        job: usize,
    },
    Claim {
        kind: SourceKind,
        url: String,
        /// Refuse URLs already fetched under any kind.
        unseen: bool,
        reply: oneshot::Sender<bool>,
    },
    Finished {
        job: usize,
        outcome: Result<Outcome, String>,
    },
}

/// Asks the orchestrator before every fetch.
struct ChannelGate {
    tx: mpsc::Sender<Message>,
}

impl ChannelGate {
    async fn ask(&self, kind: SourceKind, url: &str, unseen: bool) -> bool {
        let (reply, answer) = oneshot::channel();
        let msg = Message::Claim {
            kind,
            url: url.to_string(),
            unseen,
            reply,
        };
        if self.tx.send(msg).await.is_err() {
            return false;
        }
        answer.await.unwrap_or(false)
    }
}

#[async_trait]
impl UrlGate for ChannelGate {
    async fn claim(&self, kind: SourceKind, url: &str) -> bool {
        self.ask(kind, url, false).await
    }

    async fn claim_unseen(&self, kind: SourceKind, url: &str) -> bool {
        self.ask(kind, url, true).await
    }
}

/// What a job needs besides its own inputs.
#[derive(Clone)]
struct JobContext {
    fetcher: Fetcher,
    connections: Option<ConnectionExtractor>,
    search_top_n: usize,
}

/// Everything one run collected.
#[derive(Debug, Clone, Default)]
pub struct ScrapedBatch {
    pub corpus: Corpus,
    pub urls_visited: usize,
    pub failed_jobs: usize,
}

/// Runs scrape jobs on a bounded pool and owns all shared run state:
/// the visited set, cumulative results and the detail queue.
pub struct ScrapeManager {
    fetcher: Fetcher,
    analyzer: Arc<dyn SentenceAnalyzer>,
    settings: DiscoverySettings,
    known_symbols: Vec<(i64, String)>,
    known_ids: HashMap<i64, String>,
    visited: HashSet<(SourceKind, String)>,
    fetched: HashSet<String>,
    symbols: Deduped<Symbol>,
    traditions: Deduped<Tradition>,
    connections: Deduped<Connection>,
    queue: Vec<DetailRequest>,
    queued: HashSet<(SourceKind, String)>,
    states: Vec<JobState>,
}

impl ScrapeManager {
    pub fn new(
        fetcher: Fetcher,
        analyzer: Arc<dyn SentenceAnalyzer>,
        settings: DiscoverySettings,
    ) -> Self {
        Self {
            fetcher,
            analyzer,
            settings,
            known_symbols: Vec::new(),
            known_ids: HashMap::new(),
            visited: HashSet::new(),
            fetched: HashSet::new(),
            symbols: Deduped::default(),
            traditions: Deduped::default(),
            connections: Deduped::default(),
            queue: Vec::new(),
            queued: HashSet::new(),
            states: Vec::new(),
        }
    }

    /// Symbols from an existing dataset, searched for alongside scraped ones.
    pub fn with_known_symbols(mut self, roster: Vec<(i64, String)>) -> Self {
        for (id, name) in &roster {
            self.known_ids.entry(*id).or_insert_with(|| name.clone());
        }
        self.known_symbols = roster;
        self
    }

    pub async fn run(mut self, sources: &[SourceList]) -> Result<ScrapedBatch> {
        let mut first = Vec::new();
        let mut connection_sources = Vec::new();
        for list in sources {
            match list.kind {
                SourceKind::Symbol => first.push(JobKind::Symbols(list.urls.clone())),
                SourceKind::Tradition => first.push(JobKind::Traditions(list.urls.clone())),
                SourceKind::Connection => {
                    connection_sources.push(JobKind::Connections(list.urls.clone()))
                }
                SourceKind::Search => warn!("Search sources are not scraped directly; skipping"),
            }
        }
        self.run_wave("sources", first, None).await?;

        // second pass: stubs first, so their symbols join the roster
        let queue = std::mem::take(&mut self.queue);
        let (discovery, details): (Vec<_>, Vec<_>) = queue
            .into_iter()
            .partition(|r| r.kind == SourceKind::Connection);
        self.queue = discovery;
        let detail_jobs = self.detail_jobs(details);
        self.run_wave("details", detail_jobs, None).await?;

        let leftover = std::mem::take(&mut self.queue);
        let mut jobs = connection_sources;
        jobs.extend(
            leftover
                .into_iter()
                .filter(|r| r.kind == SourceKind::Connection)
                .map(JobKind::Discovery),
        );
        if !jobs.is_empty() {
            let extractor = ConnectionExtractor::new(self.roster(), Arc::clone(&self.analyzer));
            if extractor.roster_len() == 0 {
                warn!("No symbols known; skipping {} connection jobs", jobs.len());
            } else {
                self.run_wave("connections", jobs, Some(extractor)).await?;
            }
        }

        let failed = self.states.iter().filter(|s| **s == JobState::Failed).count();
        info!(
            "Run finished: {} jobs ({} failed), {} symbols, {} traditions, {} connections, {} urls visited",
            self.states.len(),
            failed,
            self.symbols.len(),
            self.traditions.len(),
            self.connections.len(),
            self.visited.len()
        );
        Ok(ScrapedBatch {
            urls_visited: self.visited.len(),
            failed_jobs: failed,
            corpus: Corpus {
                symbols: self.symbols.into_vec(),
                traditions: self.traditions.into_vec(),
                connections: self.connections.into_vec(),
            },
        })
    }

    /// Known symbols first, so an existing id keeps a shared name.
    fn roster(&self) -> Vec<(i64, String)> {
        self.known_symbols
            .iter()
            .cloned()
            .chain(self.symbols.iter().map(|s| (s.id, s.name.clone())))
            .collect()
    }

    /// Unvisited stub URLs per kind, spread over at most `max_workers` jobs.
    fn detail_jobs(&self, requests: Vec<DetailRequest>) -> Vec<JobKind> {
        let workers = self.settings.max_workers.max(1);
        let mut jobs = Vec::new();
        for kind in [SourceKind::Symbol, SourceKind::Tradition] {
            let mut seen = HashSet::new();
            let urls: Vec<String> = requests
                .iter()
                .filter(|r| r.kind == kind && !self.visited.contains(&(kind, r.url.clone())))
                .filter(|r| seen.insert(r.url.clone()))
                .map(|r| r.url.clone())
                .collect();
            if urls.is_empty() {
                continue;
            }
            let per_job = urls.len().div_ceil(workers);
            for chunk in urls.chunks(per_job) {
                jobs.push(match kind {
                    SourceKind::Symbol => JobKind::Symbols(chunk.to_vec()),
                    _ => JobKind::Traditions(chunk.to_vec()),
                });
            }
        }
        jobs
    }

    async fn run_wave(
        &mut self,
        label: &str,
        jobs: Vec<JobKind>,
        connections: Option<ConnectionExtractor>,
    ) -> Result<()> {
        if jobs.is_empty() {
            return Ok(());
        }
        let workers = self.settings.max_workers.max(1);
        info!("Starting {} wave: {} jobs on {} workers", label, jobs.len(), workers);

        let pb = ProgressBar::new(jobs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
                .progress_chars("=> "),
        );

        let semaphore = Arc::new(Semaphore::new(workers));
        let (tx, mut rx) = mpsc::channel::<Message>(workers * 4);
        let ctx = JobContext {
            fetcher: self.fetcher.clone(),
            connections,
            search_top_n: self.settings.search_top_n,
        };

        for kind in jobs {
            let id = self.states.len();
            self.states.push(JobState::Pending);
            let ctx = ctx.clone();
            let sem = Arc::clone(&semaphore);
            let tx = tx.clone();

            // outer task reports the inner one's result, including panics
            tokio::spawn(async move {
                let name = kind.label();
                let worker_tx = tx.clone();
                let handle = tokio::spawn(async move {
                    let _permit = sem
                        .acquire_owned()
                        .await
                        .map_err(|e| format!("worker pool closed: {}", e))?;
                    let _ = worker_tx.send(Message::Started { job: id }).await;
                    let gate = ChannelGate { tx: worker_tx };
                    Ok::<_, String>(run_job(&ctx, kind, &gate).await)
                });
                let outcome = match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(format!("{} panicked: {}", name, e)),
                };
                let _ = tx.send(Message::Finished { job: id, outcome }).await;
            });
        }

        // Drop our copy of tx so rx closes when all spawned tasks finish
        drop(tx);

        while let Some(msg) = rx.recv().await {
            match msg {
                Message::Started { job } => self.states[job] = JobState::Running,
                Message::Claim {
                    kind,
                    url,
                    unseen,
                    reply,
                } => {
                    let fresh = !(unseen && self.fetched.contains(&url))
                        && self.visited.insert((kind, url.clone()));
                    if fresh {
                        self.fetched.insert(url);
                    }
                    let _ = reply.send(fresh);
                }
                Message::Finished { job, outcome } => {
                    match outcome {
                        Ok(outcome) => {
                            self.states[job] = JobState::Completed;
                            self.absorb(outcome);
                        }
                        Err(e) => {
                            self.states[job] = JobState::Failed;
                            warn!("Job {} failed: {}", job, e);
                        }
                    }
                    pb.inc(1);
                }
            }
        }

        pb.finish_and_clear();
        Ok(())
    }

    fn absorb(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Symbols(found) => {
                for mut symbol in found.records {
                    let batch_id = symbol.id;
                    if reserve_id(&mut symbol, &self.known_ids) {
                        debug!(
                            "Symbol id {} belongs to a known symbol; {:?} moved to {}",
                            batch_id, symbol.name, symbol.id
                        );
                    }
                    let name = symbol.name.clone();
                    let page = symbol.source_url.clone().unwrap_or_default();
                    if self.symbols.push(symbol) == Admission::Added {
                        self.consider_discovery(name, &page);
                    }
                }
                self.enqueue(found.follow_ups);
            }
            Outcome::Traditions(found) => {
                for tradition in found.records {
                    self.traditions.push(tradition);
                }
                self.enqueue(found.follow_ups);
            }
            Outcome::Connections(found) => {
                for connection in found.records {
                    self.connections.push(connection);
                }
            }
        }
    }

    /// Past the threshold, symbols from overview pages get a discovery search.
    fn consider_discovery(&mut self, name: String, page: &str) {
        if self.symbols.len() <= self.settings.detail_symbol_threshold || is_detailed_page(page) {
            return;
        }
        let url = search_url(&self.settings.search_url_template, &name);
        self.enqueue(vec![DetailRequest {
            kind: SourceKind::Connection,
            name,
            url,
        }]);
    }

    fn enqueue(&mut self, requests: Vec<DetailRequest>) {
        for request in requests {
            if self.queued.insert(request.queue_key()) {
                debug!(kind = %request.kind, name = %request.name, "queued detail request");
                self.queue.push(request);
            }
        }
    }
}

async fn run_job(ctx: &JobContext, kind: JobKind, gate: &dyn UrlGate) -> Outcome {
    match kind {
        JobKind::Symbols(urls) => {
            Outcome::Symbols(fetch_all(&SymbolExtractor, &ctx.fetcher, &urls, gate).await)
        }
        JobKind::Traditions(urls) => {
            Outcome::Traditions(fetch_all(&TraditionExtractor, &ctx.fetcher, &urls, gate).await)
        }
        JobKind::Connections(urls) => match &ctx.connections {
            Some(extractor) => {
                Outcome::Connections(fetch_all(extractor, &ctx.fetcher, &urls, gate).await)
            }
            None => Outcome::Connections(Extraction::default()),
        },
        JobKind::Discovery(request) => discover(ctx, &request, gate).await,
    }
}

/// Search for the symbol, then scan the best unvisited hits for connections.
async fn discover(ctx: &JobContext, request: &DetailRequest, gate: &dyn UrlGate) -> Outcome {
    let Some(extractor) = &ctx.connections else {
        return Outcome::Connections(Extraction::default());
    };
    let hits = fetch_all(&SearchExtractor, &ctx.fetcher, &[request.url.clone()], gate).await;

    let mut picked = Vec::new();
    for hit in hits.records {
        if picked.len() >= ctx.search_top_n {
            break;
        }
        if gate.claim_unseen(SourceKind::Connection, &hit.url).await {
            picked.push(hit.url);
        }
    }
    info!("Discovery for {}: {} pages to scan", request.name, picked.len());
    Outcome::Connections(fetch_all(extractor, &ctx.fetcher, &picked, &OpenGate).await)
}

/// `.html`/`.htm` pages and wiki articles are already content pages.
fn is_detailed_page(page: &str) -> bool {
    let Ok(url) = Url::parse(page) else {
        return false;
    };
    let path = url.path();
    path.ends_with(".html")
        || path.ends_with(".htm")
        || (url.host_str().is_some_and(is_wikipedia) && path.starts_with("/wiki/"))
}

fn search_url(template: &str, name: &str) -> String {
    let query: String =
        url::form_urlencoded::byte_serialize(format!("{} {}", name, DISCOVERY_TERMS).as_bytes())
            .collect();
    template.replace("{query}", &query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::config::FetchSettings;
    use crate::error::FetchError;
    use crate::parser::analyzer::BasicAnalyzer;
    use crate::scraper::{PageResponse, PageSource};

    /// Serves fixed pages; anything else is a 404.
    struct Pages {
        pages: HashMap<String, String>,
        hits: Mutex<Vec<String>>,
        panic_on: Option<String>,
    }

    impl Pages {
        fn new(pages: &[(&str, String)]) -> Arc<Self> {
            Self::panicking_on(pages, None)
        }

        fn panicking_on(pages: &[(&str, String)], url: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                pages: pages
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.clone()))
                    .collect(),
                hits: Mutex::new(Vec::new()),
                panic_on: url.map(str::to_string),
            })
        }

        fn hits(&self, url: &str) -> usize {
            self.hits.lock().unwrap().iter().filter(|u| *u == url).count()
        }
    }

    #[async_trait]
    impl PageSource for Pages {
        async fn get(&self, url: &str) -> Result<PageResponse, FetchError> {
            self.hits.lock().unwrap().push(url.to_string());
            if self.panic_on.as_deref() == Some(url) {
                panic!("connection reset while reading {}", url);
            }
            Ok(match self.pages.get(url) {
                Some(body) => PageResponse {
                    status: 200,
                    body: body.clone(),
                },
                None => PageResponse {
                    status: 404,
                    body: "not found".into(),
                },
            })
        }

        fn name(&self) -> &str {
            "pages"
        }
    }

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
    }

    fn manager(source: Arc<Pages>, settings: DiscoverySettings) -> ScrapeManager {
        let fetch = FetchSettings {
            retries: 1,
            retry_delay_ms: 0,
            jitter_ms: 0,
            ..FetchSettings::default()
        };
        ScrapeManager::new(Fetcher::new(source, fetch), Arc::new(BasicAnalyzer), settings)
    }

    fn ankh_page(description: &str) -> String {
        format!(
            "<html><head><title>Ankh | Symbol Notes</title></head><body><main>\
             <h2>Ankh</h2><p>{}</p><h2>Contents</h2><p>Index of the other pages here.</p>\
             </main></body></html>",
            description
        )
    }

    #[tokio::test]
    async fn longer_description_wins_across_pages() {
        let short = "The ankh is an ancient Egyptian symbol of life and breath.";
        let long = "The ankh is an ancient Egyptian symbol of life, carried by gods and \
                    pharaohs and painted on tomb walls as a sacred promise of eternity.";
        let source = Pages::new(&[
            ("https://a.example.org/one", ankh_page(short)),
            ("https://b.example.org/two", ankh_page(long)),
        ]);
        let sources = vec![SourceList {
            kind: SourceKind::Symbol,
            urls: vec![
                "https://a.example.org/one".into(),
                "https://b.example.org/two".into(),
            ],
        }];

        let batch = manager(source, DiscoverySettings::default())
            .run(&sources)
            .await
            .unwrap();
        assert_eq!(batch.corpus.symbols.len(), 1);
        assert_eq!(batch.corpus.symbols[0].description, long);
        assert_eq!(batch.urls_visited, 2);
    }

    #[tokio::test]
    async fn category_stubs_get_a_second_pass() {
        let source = Pages::new(&[
            (
                "https://en.wikipedia.org/wiki/Category:Magic_symbols",
                fixture("wikipedia_category.html"),
            ),
            ("https://en.wikipedia.org/wiki/Ankh", fixture("wikipedia_ankh.html")),
        ]);
        let sources = vec![SourceList {
            kind: SourceKind::Symbol,
            urls: vec![
                "https://en.wikipedia.org/wiki/Category:Magic_symbols".into(),
                "https://en.wikipedia.org/wiki/Ankh".into(),
            ],
        }];

        let batch = manager(source.clone(), DiscoverySettings::default())
            .run(&sources)
            .await
            .unwrap();
        let names: Vec<&str> = batch.corpus.symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Ankh"]);
        // stubs were fetched once each and 404'd
        assert_eq!(source.hits("https://en.wikipedia.org/wiki/Hexagram"), 1);
        assert_eq!(source.hits("https://en.wikipedia.org/wiki/Ankh"), 1);
        assert_eq!(batch.urls_visited, 5);
    }

    #[tokio::test]
    async fn discovery_searches_and_scans_connections() {
        let search = "https://search.example.org/?q=Ankh+occult+symbol";
        let results = "<html><body><h1>Results</h1>\
            <p><a href=\"https://symbols.example.org/egypt\">Egyptian amulets</a></p>\
            <p><a href=\"https://symbols.example.org/egypt\">Egyptian amulets again</a></p>\
            <div>Three results were found for your query today.</div>\
            <div>Search tips and more query help are listed below.</div></body></html>";
        let source = Pages::new(&[
            ("https://a.example.org/one", ankh_page(
                "The ankh is an ancient Egyptian symbol of life and breath.",
            )),
            (search, results.to_string()),
            ("https://symbols.example.org/egypt", fixture("connections.html")),
        ]);
        let settings = DiscoverySettings {
            detail_symbol_threshold: 0,
            search_url_template: "https://search.example.org/?q={query}".into(),
            ..DiscoverySettings::default()
        };
        let sources = vec![SourceList {
            kind: SourceKind::Symbol,
            urls: vec!["https://a.example.org/one".into()],
        }];

        let batch = manager(source.clone(), settings)
            .with_known_symbols(vec![(2, "Djed".into())])
            .run(&sources)
            .await
            .unwrap();
        let ankh = batch.corpus.symbols[0].id;
        assert_eq!(batch.corpus.connections.len(), 1);
        assert_eq!(batch.corpus.connections[0].pair(), (ankh.min(2), ankh.max(2)));
        assert_eq!(source.hits("https://symbols.example.org/egypt"), 1);
    }

    #[tokio::test]
    async fn one_crashing_job_leaves_the_others_alone() {
        let source = Pages::panicking_on(
            &[(
                "https://a.example.org/one",
                ankh_page("The ankh is an ancient Egyptian symbol of life and breath."),
            )],
            Some("https://crash.example.org/list"),
        );
        let sources = vec![
            SourceList {
                kind: SourceKind::Symbol,
                urls: vec!["https://crash.example.org/list".into()],
            },
            SourceList {
                kind: SourceKind::Symbol,
                urls: vec![
                    "https://gone.example.org/missing".into(),
                    "https://a.example.org/one".into(),
                ],
            },
        ];

        let batch = manager(source.clone(), DiscoverySettings::default())
            .run(&sources)
            .await
            .unwrap();
        assert_eq!(batch.failed_jobs, 1);
        let names: Vec<&str> = batch.corpus.symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Ankh"]);
        assert_eq!(source.hits("https://crash.example.org/list"), 1);
        assert_eq!(source.hits("https://gone.example.org/missing"), 1);
    }

    #[tokio::test]
    async fn scraped_ids_step_around_known_ones() {
        let djed_url = "https://a.example.org/djed";
        let djed_page = "<html><head><title>Djed | Symbol Notes</title></head><body><main>\
             <h2>Djed</h2><p>The djed is an ancient Egyptian symbol of stability and endurance.</p>\
             <h2>Contents</h2><p>Index of the other pages here.</p></main></body></html>";
        let taken = crate::records::symbol_id("Djed", djed_url);
        let source = Pages::new(&[
            (djed_url, djed_page.to_string()),
            ("https://symbols.example.org/egypt", fixture("connections.html")),
        ]);
        let sources = vec![
            SourceList {
                kind: SourceKind::Symbol,
                urls: vec![djed_url.into()],
            },
            SourceList {
                kind: SourceKind::Connection,
                urls: vec!["https://symbols.example.org/egypt".into()],
            },
        ];

        let batch = manager(source, DiscoverySettings::default())
            .with_known_symbols(vec![(taken, "Ankh".into())])
            .run(&sources)
            .await
            .unwrap();
        let djed = batch.corpus.symbols[0].id;
        assert_ne!(djed, taken);
        assert_eq!(batch.corpus.connections.len(), 1);
        let pair = (taken.min(djed), taken.max(djed));
        assert_eq!(batch.corpus.connections[0].pair(), pair);

        let ankh = Symbol {
            id: taken,
            name: "Ankh".into(),
            description: "Egyptian sign of life.".into(),
            ..Symbol::default()
        };
        let existing = Corpus {
            symbols: vec![ankh],
            ..Corpus::default()
        };
        let (merged, log) = crate::merge::merge(existing, batch.corpus);
        assert_eq!(log.symbol_id_collisions, 0);
        assert_eq!(merged.connections[0].pair(), pair);
    }

    #[tokio::test]
    async fn discovery_skips_pages_already_scraped() {
        let search = "https://search.example.org/?q=Ankh+occult+symbol";
        let results = "<html><body><h1>Results</h1>\
            <p><a href=\"https://a.example.org/one\">Ankh notes</a></p>\
            <p><a href=\"https://symbols.example.org/egypt\">Egyptian amulets</a></p>\
            <div>Two results were found for your query today.</div>\
            <div>Search tips and more query help are listed below.</div></body></html>";
        let source = Pages::new(&[
            ("https://a.example.org/one", ankh_page(
                "The ankh is an ancient Egyptian symbol of life and breath.",
            )),
            (search, results.to_string()),
            ("https://symbols.example.org/egypt", fixture("connections.html")),
        ]);
        let settings = DiscoverySettings {
            detail_symbol_threshold: 0,
            search_url_template: "https://search.example.org/?q={query}".into(),
            ..DiscoverySettings::default()
        };
        let sources = vec![SourceList {
            kind: SourceKind::Symbol,
            urls: vec!["https://a.example.org/one".into()],
        }];

        let batch = manager(source.clone(), settings)
            .with_known_symbols(vec![(2, "Djed".into())])
            .run(&sources)
            .await
            .unwrap();
        assert_eq!(source.hits("https://a.example.org/one"), 1);
        assert_eq!(source.hits("https://symbols.example.org/egypt"), 1);
        assert_eq!(batch.corpus.connections.len(), 1);
    }

    #[test]
    fn detailed_pages_and_search_urls() {
        assert!(is_detailed_page("https://www.sacred-texts.com/sym/ankh.htm"));
        assert!(is_detailed_page("https://en.wikipedia.org/wiki/Ankh"));
        assert!(!is_detailed_page("https://symbols.example.org/list"));
        assert_eq!(
            search_url("https://html.duckduckgo.com/html/?q={query}", "Eye of Horus"),
            "https://html.duckduckgo.com/html/?q=Eye+of+Horus+occult+symbol"
        );
    }
}
