use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;
use crate::records::SourceKind;

/// One entry of a sources file, as written on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub urls: Vec<String>,
}

/// A validated source list.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceList {
    pub kind: SourceKind,
    pub urls: Vec<String>,
}

pub fn load(path: &Path) -> Result<Vec<SourceConfig>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::SourcesUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::SourcesInvalid {
        path: path.to_path_buf(),
        source,
    })
}

/// Keep entries with a known type and at least one URL.
pub fn resolve(entries: Vec<SourceConfig>) -> Result<Vec<SourceList>, ConfigError> {
    let mut lists = Vec::new();
    for entry in entries {
        let kind = match entry.kind.trim().to_lowercase().as_str() {
            "symbol" => SourceKind::Symbol,
            "tradition" => SourceKind::Tradition,
            "connection" => SourceKind::Connection,
            other => {
                warn!("Skipping source entry with unknown type {:?}", other);
                continue;
            }
        };
        let urls: Vec<String> = entry
            .urls
            .into_iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();
        if urls.is_empty() {
            warn!("Skipping {} source entry without URLs", kind);
            continue;
        }
        lists.push(SourceList { kind, urls });
    }
    if lists.is_empty() {
        return Err(ConfigError::NoSources);
    }
    Ok(lists)
}

pub fn default_sources() -> Vec<SourceConfig> {
    let wiki = |page: &str| format!("https://en.wikipedia.org/wiki/{}", page);
    vec![
        SourceConfig {
            kind: "symbol".into(),
            urls: vec![
                wiki("Esoteric_symbols"),
                wiki("Alchemical_symbol"),
                wiki("Sigil_(magic)"),
                wiki("Pentagram"),
                wiki("Ankh"),
                "https://www.sacred-texts.com/sym/index.htm".into(),
            ],
        },
        SourceConfig {
            kind: "tradition".into(),
            urls: vec![
                wiki("Western_esotericism"),
                wiki("Hermeticism"),
                wiki("Alchemy"),
                wiki("Kabbalah"),
                wiki("Ceremonial_magic"),
                "https://www.sacred-texts.com/eso/index.htm".into(),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_and_empty_entries_are_skipped() {
        let entries: Vec<SourceConfig> = serde_json::from_str(
            r#"[
                {"type": "symbol", "urls": ["https://example.org/a", "  "]},
                {"type": "constellation", "urls": ["https://example.org/b"]},
                {"type": "tradition", "urls": []},
                {"type": "Connection", "urls": ["https://example.org/c"]}
            ]"#,
        )
        .unwrap();
        let lists = resolve(entries).unwrap();
        assert_eq!(
            lists,
            vec![
                SourceList {
                    kind: SourceKind::Symbol,
                    urls: vec!["https://example.org/a".into()],
                },
                SourceList {
                    kind: SourceKind::Connection,
                    urls: vec!["https://example.org/c".into()],
                },
            ]
        );
    }

    #[test]
    fn nothing_usable_is_fatal() {
        let entries = vec![SourceConfig {
            kind: "symbol".into(),
            urls: vec![],
        }];
        assert!(matches!(resolve(entries), Err(ConfigError::NoSources)));
    }

    #[test]
    fn bad_files_are_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(load(&missing), Err(ConfigError::SourcesUnreadable { .. })));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{not json").unwrap();
        assert!(matches!(load(&broken), Err(ConfigError::SourcesInvalid { .. })));
    }

    #[test]
    fn defaults_resolve() {
        let lists = resolve(default_sources()).unwrap();
        assert_eq!(lists.len(), 2);
        assert!(lists[0].urls.iter().any(|u| u.ends_with("/Ankh")));
    }
}
