//! Text normalizers shared by the extractors: dates, regions, tradition names,
//! and short descriptive phrases.

pub mod century;
pub mod phrases;
pub mod region;
pub mod tradition;

/// Table keys this short must match a whole word ("usa" is not "usage").
const SHORT_KEY: usize = 3;

/// Byte offset of the first occurrence of `needle` in `haystack` that starts
/// at a word boundary. Both are expected to be lowercase.
pub fn find_word_start(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.match_indices(needle).map(|(i, _)| i).find(|&i| {
        haystack[..i]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}

/// Like [`find_word_start`] but the match must also end at a word boundary.
pub fn find_whole_word(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.match_indices(needle).map(|(i, _)| i).find(|&i| {
        let before_ok = haystack[..i]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[i + needle.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

/// Canonical values of every table key found in `text`, ordered by where the
/// key first appears, duplicates removed. Keys match at word starts, short
/// keys only as whole words.
pub fn match_table(text: &str, table: &[(&str, &'static str)]) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    let mut hits: Vec<(usize, usize, &'static str)> = table
        .iter()
        .enumerate()
        .filter_map(|(order, (key, value))| {
            let pos = if key.len() <= SHORT_KEY {
                find_whole_word(&lower, key)
            } else {
                find_word_start(&lower, key)
            };
            pos.map(|pos| (pos, order, *value))
        })
        .collect();
    hits.sort_by_key(|&(pos, order, _)| (pos, order));

    let mut out: Vec<&'static str> = Vec::new();
    for (_, _, value) in hits {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}
