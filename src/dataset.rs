use std::path::Path;

use anyhow::{Context, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::merge::{Corpus, MergeLog};
use crate::records::{is_placeholder, Connection, Symbol, Tradition};

const TOP_TRADITIONS: usize = 5;

/// The JSON document read as existing data and written as output.
///
/// Top-level keys this crate does not model (`elements`, `time_periods`, ...)
/// are carried through `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub symbols: Vec<Symbol>,
    #[serde(default)]
    pub traditions: Vec<Tradition>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_log: Option<MergeLog>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Run summary written under `metadata`.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub scrape_date: String,
    pub run_id: String,
    pub total_symbols: usize,
    pub total_traditions: usize,
    pub total_connections: usize,
    pub urls_visited: usize,
}

impl RunMetadata {
    pub fn new(dataset: &Dataset, urls_visited: usize) -> Self {
        let now = chrono::Local::now();
        Self {
            scrape_date: now.to_rfc3339(),
            run_id: now.format("%Y%m%d_%H%M%S").to_string(),
            total_symbols: dataset.symbols.len(),
            total_traditions: dataset.traditions.len(),
            total_connections: dataset.connections.len(),
            urls_visited,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub symbols: usize,
    pub traditions: usize,
    pub connections: usize,
    /// Most common symbol traditions, most frequent first.
    pub top_traditions: Vec<(String, usize)>,
    pub mean_strength: f64,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::DatasetUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::DatasetInvalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Pretty-printed UTF-8 JSON; parent directories are created.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn from_corpus(corpus: Corpus) -> Self {
        Self::default().with_corpus(corpus)
    }

    /// Move the records out, leaving metadata and pass-through keys behind.
    pub fn take_corpus(&mut self) -> Corpus {
        Corpus {
            symbols: std::mem::take(&mut self.symbols),
            traditions: std::mem::take(&mut self.traditions),
            connections: std::mem::take(&mut self.connections),
        }
    }

    pub fn with_corpus(mut self, corpus: Corpus) -> Self {
        self.symbols = corpus.symbols;
        self.traditions = corpus.traditions;
        self.connections = corpus.connections;
        self
    }

    /// `(id, name)` of every symbol, for connection rosters.
    pub fn roster(&self) -> Vec<(i64, String)> {
        self.symbols.iter().map(|s| (s.id, s.name.clone())).collect()
    }

    /// Overwrite the run keys of `metadata`; keys the run does not set stay.
    pub fn stamp(&mut self, run: &RunMetadata) -> Result<()> {
        if let Value::Object(fields) = serde_json::to_value(run)? {
            self.metadata.extend(fields);
        }
        Ok(())
    }

    pub fn stats(&self) -> Stats {
        let top_traditions = self
            .symbols
            .iter()
            .flat_map(|s| s.tradition.split('/'))
            .map(str::trim)
            .filter(|t| !is_placeholder(t))
            .counts()
            .into_iter()
            .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
            .take(TOP_TRADITIONS)
            .map(|(t, n)| (t.to_string(), n))
            .collect();
        let mean_strength = if self.connections.is_empty() {
            0.0
        } else {
            self.connections.iter().map(|c| c.strength).sum::<f64>()
                / self.connections.len() as f64
        };
        Stats {
            symbols: self.symbols.len(),
            traditions: self.traditions.len(),
            connections: self.connections.len(),
            top_traditions,
            mean_strength,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXISTING: &str = r#"{
        "symbols": [
            {"id": 1, "name": "Ankh", "tradition": "Egyptian", "element": "Life",
             "century_origin": -31, "description": "Egyptian sign of life.",
             "usage": "", "visual_elements": []},
            {"id": 2, "name": "Djed", "tradition": "Egyptian/Unknown",
             "description": "Pillar of stability."}
        ],
        "traditions": [
            {"name": "Hermeticism", "start_century": 2, "end_century": 21,
             "region": "North Africa", "major_texts": ["Corpus Hermeticum"],
             "historical_phases": [{"name": "Renaissance revival"}]}
        ],
        "connections": [
            {"source_id": 2, "target_id": 1, "strength": 0.5, "description": "paired amulets"}
        ],
        "metadata": {"curator": "archive team", "total_symbols": 2},
        "elements": ["Fire", "Water"],
        "time_periods": {"ancient": [-30, 5]}
    }"#;

    #[test]
    fn unknown_keys_survive_a_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("existing.json");
        std::fs::write(&input, EXISTING).unwrap();

        let mut data = Dataset::load(&input).unwrap();
        assert_eq!(data.connections[0].source, 2);
        assert_eq!(data.symbols[1].element, "Unknown");
        assert!(data.traditions[0].extra.contains_key("historical_phases"));

        let run = RunMetadata::new(&data, 7);
        data.stamp(&run).unwrap();
        let output = dir.path().join("out/nested/data.json");
        data.save(&output).unwrap();

        let text = std::fs::read_to_string(&output).unwrap();
        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["elements"][1], "Water");
        assert_eq!(json["time_periods"]["ancient"][0], -30);
        assert_eq!(json["metadata"]["curator"], "archive team");
        assert_eq!(json["metadata"]["urls_visited"], 7);
        assert_eq!(json["connections"][0]["source"], 2);
        assert_eq!(json["traditions"][0]["historical_phases"][0]["name"], "Renaissance revival");
        assert!(json.get("merge_log").is_none());
    }

    #[test]
    fn unreadable_or_invalid_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Dataset::load(&dir.path().join("nope.json")),
            Err(ConfigError::DatasetUnreadable { .. })
        ));
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"symbols": "not a list"}"#).unwrap();
        assert!(matches!(Dataset::load(&bad), Err(ConfigError::DatasetInvalid { .. })));
    }

    #[test]
    fn stats_count_split_traditions() {
        let data: Dataset = serde_json::from_str(EXISTING).unwrap();
        let stats = data.stats();
        assert_eq!((stats.symbols, stats.traditions, stats.connections), (2, 1, 1));
        assert_eq!(stats.top_traditions, vec![("Egyptian".to_string(), 2)]);
        assert_eq!(stats.mean_strength, 0.5);
    }
}
