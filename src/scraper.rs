use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::config::FetchSettings;
use crate::error::{ConfigError, FetchError};
use crate::parser::visible_text;

const BLOCK_INDICATORS: &[&str] = &[
    "captcha",
    "robot",
    "automated access",
    "verify you are a human",
    "attention required",
    "security check",
    "ray id",
    "access denied",
    "blocked",
    "too many requests",
    "rate limited",
];
const MIN_PAGE_TEXT: usize = 100;
const MIN_STRUCTURAL_ELEMENTS: usize = 3;

static STRUCTURAL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p, div, h1, h2, h3").unwrap());

/// One HTTP exchange, before any validation.
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub status: u16,
    pub body: String,
}

/// A page that passed status, emptiness and block checks.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub url: String,
    pub body: String,
}

#[async_trait]
pub trait PageSource: Send + Sync {
    async fn get(&self, url: &str) -> Result<PageResponse, FetchError>;
    fn name(&self) -> &str;
}

/// reqwest-backed source with browser-like default headers.
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(settings: &FetchSettings) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder()
            .default_headers(request_headers(settings)?)
            .timeout(settings.timeout())
            .gzip(true);
        if let Some(proxy) = &settings.proxy {
            let proxy = reqwest::Proxy::all(proxy).map_err(|e| ConfigError::Client(e.to_string()))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

fn request_headers(settings: &FetchSettings) -> Result<HeaderMap, ConfigError> {
    let defaults = [
        ("user-agent", settings.user_agent.as_str()),
        (
            "accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
        ("accept-language", "en-US,en;q=0.5"),
        ("connection", "keep-alive"),
        ("upgrade-insecure-requests", "1"),
        ("pragma", "no-cache"),
        ("cache-control", "no-cache"),
    ];
    let overrides = settings
        .headers
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()));

    let mut headers = HeaderMap::new();
    for (name, value) in defaults.into_iter().chain(overrides) {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ConfigError::Client(format!("header {}: {}", name, e)))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| ConfigError::Client(e.to_string()))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

#[async_trait]
impl PageSource for HttpSource {
    async fn get(&self, url: &str) -> Result<PageResponse, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(PageResponse { status, body })
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Retrying fetcher shared by every scrape job.
#[derive(Clone)]
pub struct Fetcher {
    source: Arc<dyn PageSource>,
    settings: FetchSettings,
}

impl Fetcher {
    pub fn new(source: Arc<dyn PageSource>, settings: FetchSettings) -> Self {
        Self { source, settings }
    }

    pub fn http(settings: &FetchSettings) -> Result<Self, ConfigError> {
        Ok(Self::new(Arc::new(HttpSource::new(settings)?), settings.clone()))
    }

    /// Fetch `url`, retrying transient failures with jittered exponential backoff.
    pub async fn fetch(&self, url: &str) -> Result<RawDocument, FetchError> {
        let attempts = self.settings.retries.max(1);
        let mut last = FetchError::Empty;

        for attempt in 1..=attempts {
            if attempt > 1 {
                let delay = self.backoff(attempt - 1);
                warn!(
                    "Fetch of {} failed ({}), attempt {}/{} in {:.1}s",
                    url,
                    last,
                    attempt,
                    attempts,
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
            }
            match self.attempt(url).await {
                Ok(doc) => return Ok(doc),
                Err(e) if e.is_transient() => {
                    debug!(url, attempt, source = self.source.name(), error = %e, "fetch attempt failed");
                    last = e;
                }
                Err(e) => return Err(e),
            }
        }

        Err(FetchError::Unreachable {
            url: url.to_string(),
            attempts,
            last: Box::new(last),
        })
    }

    /// Delay after the `failed`-th attempt: `retry_delay * 2^(failed-1)` plus jitter.
    fn backoff(&self, failed: u32) -> Duration {
        let base = self
            .settings
            .retry_delay_ms
            .saturating_mul(2u64.saturating_pow(failed.saturating_sub(1)));
        let jitter = if self.settings.jitter_ms > 0 {
            fastrand::u64(0..self.settings.jitter_ms)
        } else {
            0
        };
        Duration::from_millis(base.saturating_add(jitter))
    }

    async fn attempt(&self, url: &str) -> Result<RawDocument, FetchError> {
        let timeout = self.settings.timeout();
        let resp = match tokio::time::timeout(timeout, self.source.get(url)).await {
            Ok(resp) => resp?,
            Err(_) => {
                return Err(FetchError::Transport(format!(
                    "timed out after {}s",
                    timeout.as_secs()
                )))
            }
        };
        if !(200..300).contains(&resp.status) {
            return Err(FetchError::Status(resp.status));
        }
        if resp.body.trim().is_empty() {
            return Err(FetchError::Empty);
        }
        if is_blocked(&resp.body) {
            return Err(FetchError::Blocked);
        }
        Ok(RawDocument {
            url: url.to_string(),
            body: resp.body,
        })
    }
}

/// Captcha, rate-limit or access-denied interstitials, and near-empty shells.
pub fn is_blocked(body: &str) -> bool {
    let html = Html::parse_document(body);
    let text = visible_text(&html).to_lowercase();
    if BLOCK_INDICATORS.iter().any(|needle| text.contains(needle)) {
        return true;
    }
    text.trim().chars().count() < MIN_PAGE_TEXT
        && html.select(&STRUCTURAL).count() < MIN_STRUCTURAL_ELEMENTS
}
