use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::Config;
use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub fetch: FetchSettings,
    pub scoring: ScoringSettings,
    pub discovery: DiscoverySettings,
    pub analyzer: AnalyzerSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Total attempts per URL, including the first.
    pub retries: u32,
    pub retry_delay_ms: u64,
    pub jitter_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub proxy: Option<String>,
    /// Extra or replacement request headers.
    pub headers: HashMap<String, String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_delay_ms: 5000,
            jitter_ms: 2000,
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: None,
            headers: HashMap::new(),
        }
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Relationship-strength weights for the enhanced analyzer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub proximity_weight: f64,
    pub verb_weight: f64,
    pub dependency_weight: f64,
    pub dependency_bonus: f64,
    /// Enhanced-path candidates must score strictly above this.
    pub min_strength: f64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            proximity_weight: 0.4,
            verb_weight: 0.4,
            dependency_weight: 0.2,
            dependency_bonus: 0.7,
            min_strength: 0.3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    pub max_workers: usize,
    /// Symbols collected before connection discovery is scheduled.
    pub detail_symbol_threshold: usize,
    /// `{query}` is replaced by the form-encoded search terms.
    pub search_url_template: String,
    pub search_top_n: usize,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            max_workers: 4,
            detail_symbol_threshold: 10,
            search_url_template: "https://html.duckduckgo.com/html/?q={query}".to_string(),
            search_top_n: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerMode {
    Basic,
    #[default]
    Enhanced,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnalyzerSettings {
    pub mode: AnalyzerMode,
    /// Optional extra relationship keywords, one `tier:word` per line.
    pub lexicon: Option<PathBuf>,
}

impl Settings {
    /// Defaults, then `arcana.toml` (or `file`), then `ARCANA_*` env vars
    /// such as `ARCANA_FETCH__RETRIES`.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::layered(file, None)
    }

    /// `env` replaces the process environment when given.
    fn layered(
        file: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        builder = match file {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name("arcana").required(false)),
        };
        let environment = config::Environment::with_prefix("ARCANA")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(env);
        let settings = builder
            .add_source(environment)
            .build()?
            .try_deserialize::<Settings>()?;
        Ok(settings)
    }
}
