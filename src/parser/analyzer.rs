use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::config::{AnalyzerMode, AnalyzerSettings, ScoringSettings};
use crate::normalize::find_whole_word;

const STRONG: &[&str] = &[
    "represents", "symbolizes", "embodies", "signifies", "connects", "relates", "corresponds",
    "linked", "associated", "derived",
];
const MEDIUM: &[&str] = &[
    "similar", "like", "compared", "parallels", "resembles", "inspired", "influenced",
    "developed", "evolved", "transformed",
];
const WEAK: &[&str] = &["and", "with", "also", "additionally", "moreover", "both", "either"];

const STRONG_SCORE: f64 = 0.8;
const MEDIUM_SCORE: f64 = 0.5;
const WEAK_SCORE: f64 = 0.2;

/// Words that tie two mentions into one clause.
const LINKING: &[&str] = &[
    "is", "was", "are", "were", "as", "of", "from", "to", "with", "into", "becomes", "became",
];
const CLAUSE_BREAKS: &[&str] = &[";", ":", "(", ")", " but ", " while ", " whereas ", " although "];

/// What an analyzer concluded about two mentions in one sentence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Assessment {
    /// Co-occurrence only; strength is derived later.
    CoOccurrence,
    Related(f64),
    Unrelated,
}

pub trait SentenceAnalyzer: Send + Sync {
    fn name(&self) -> &'static str;

    /// `first` precedes `second`; both are byte ranges into `sentence`.
    fn assess(&self, sentence: &str, first: Range<usize>, second: Range<usize>) -> Assessment;
}

pub struct BasicAnalyzer;

impl SentenceAnalyzer for BasicAnalyzer {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn assess(&self, _sentence: &str, _first: Range<usize>, _second: Range<usize>) -> Assessment {
        Assessment::CoOccurrence
    }
}

/// Rule-based scoring: token proximity, relationship-verb tiers and a
/// same-clause check standing in for a dependency parse.
pub struct ClauseAnalyzer {
    tiers: [(Vec<String>, f64); 3],
    weights: ScoringSettings,
}

impl ClauseAnalyzer {
    pub fn try_new(lexicon: Option<&Path>, weights: ScoringSettings) -> Result<Self> {
        let owned = |words: &[&str]| words.iter().map(|w| w.to_string()).collect::<Vec<_>>();
        let mut tiers = [
            (owned(STRONG), STRONG_SCORE),
            (owned(MEDIUM), MEDIUM_SCORE),
            (owned(WEAK), WEAK_SCORE),
        ];
        if let Some(path) = lexicon {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading lexicon {}", path.display()))?;
            for (n, line) in text.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let Some((tier, word)) = line.split_once(':') else {
                    bail!("{}:{}: expected `tier:word`", path.display(), n + 1);
                };
                let slot = match tier.trim() {
                    "strong" => 0,
                    "medium" => 1,
                    "weak" => 2,
                    other => bail!("{}:{}: unknown tier {:?}", path.display(), n + 1, other),
                };
                tiers[slot].0.push(word.trim().to_lowercase());
            }
        }
        Ok(Self { tiers, weights })
    }

    fn verb_score(&self, lower: &str) -> f64 {
        self.tiers
            .iter()
            .find(|(words, _)| words.iter().any(|w| find_whole_word(lower, w).is_some()))
            .map_or(0.0, |(_, score)| *score)
    }

    fn proximity(sentence: &str, first: &Range<usize>, second: &Range<usize>) -> f64 {
        let total = tokens(sentence).count();
        if total == 0 {
            return 0.0;
        }
        let a = tokens(&sentence[..first.start]).count();
        let b = tokens(&sentence[..second.start]).count();
        let distance = a.abs_diff(b) as f64 / total as f64;
        1.0 - distance.min(1.0)
    }

    fn same_clause(lower: &str, first: &Range<usize>, second: &Range<usize>) -> bool {
        if second.start < first.end {
            return false;
        }
        let between = &lower[first.end..second.start];
        if CLAUSE_BREAKS.iter().any(|b| between.contains(b)) {
            return false;
        }
        LINKING
            .iter()
            .chain(STRONG)
            .chain(MEDIUM)
            .any(|w| find_whole_word(between, w).is_some())
    }
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|t| !t.is_empty())
}

impl SentenceAnalyzer for ClauseAnalyzer {
    fn name(&self) -> &'static str {
        "enhanced"
    }

    fn assess(&self, sentence: &str, first: Range<usize>, second: Range<usize>) -> Assessment {
        let mut lower = sentence.to_lowercase();
        if lower.len() != sentence.len() {
            // ranges index `sentence`; keep offsets valid
            lower = sentence.to_string();
        }
        let w = &self.weights;
        let dependency = if Self::same_clause(&lower, &first, &second) {
            w.dependency_bonus
        } else {
            0.0
        };
        let raw = w.proximity_weight * Self::proximity(sentence, &first, &second)
            + w.verb_weight * self.verb_score(&lower)
            + w.dependency_weight * dependency;
        let strength = ((raw.min(1.0)) * 100.0).round() / 100.0;
        if strength > w.min_strength {
            Assessment::Related(strength)
        } else {
            Assessment::Unrelated
        }
    }
}

/// Enhanced analyzer when configured and loadable, basic otherwise.
pub fn select(settings: &AnalyzerSettings, weights: &ScoringSettings) -> Arc<dyn SentenceAnalyzer> {
    if settings.mode == AnalyzerMode::Basic {
        return Arc::new(BasicAnalyzer);
    }
    match ClauseAnalyzer::try_new(settings.lexicon.as_deref(), weights.clone()) {
        Ok(analyzer) => {
            info!("Using enhanced relationship analyzer");
            Arc::new(analyzer)
        }
        Err(e) => {
            warn!("Enhanced analyzer unavailable ({:#}), falling back to basic", e);
            Arc::new(BasicAnalyzer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(sentence: &str, needle: &str) -> Range<usize> {
        let start = sentence.to_lowercase().find(needle).unwrap();
        start..start + needle.len()
    }

    fn enhanced() -> ClauseAnalyzer {
        ClauseAnalyzer::try_new(None, ScoringSettings::default()).unwrap()
    }

    #[test]
    fn related_mentions_score_above_cutoff() {
        let s = "The ankh is closely associated with the djed pillar in Egyptian art.";
        let got = enhanced().assess(s, span(s, "ankh"), span(s, "djed"));
        // proximity 0.5, strong tier 0.8, same clause 0.7
        assert_eq!(got, Assessment::Related(0.66));
    }

    #[test]
    fn distant_mentions_across_clauses_are_dropped() {
        let s = "The ankh appears on temple walls; much later, in a different land and era \
                 entirely, occultists would draw a pentagram.";
        let got = enhanced().assess(s, span(s, "ankh"), span(s, "pentagram"));
        assert_eq!(got, Assessment::Unrelated);
    }

    #[test]
    fn basic_only_reports_co_occurrence() {
        let s = "Ankh and djed.";
        assert_eq!(
            BasicAnalyzer.assess(s, 0..4, 9..13),
            Assessment::CoOccurrence
        );
    }

    #[test]
    fn lexicon_extends_tiers_and_bad_lexicon_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.txt");
        std::fs::write(&good, "# extra words\nstrong: mirrors\n").unwrap();
        let a = ClauseAnalyzer::try_new(Some(&good), ScoringSettings::default()).unwrap();
        assert_eq!(a.verb_score("the sun mirrors the moon"), STRONG_SCORE);

        let bad = dir.path().join("bad.txt");
        std::fs::write(&bad, "mirrors\n").unwrap();
        let settings = AnalyzerSettings {
            mode: AnalyzerMode::Enhanced,
            lexicon: Some(bad),
        };
        assert_eq!(select(&settings, &ScoringSettings::default()).name(), "basic");
    }
}
