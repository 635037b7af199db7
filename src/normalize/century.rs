use std::sync::LazyLock;

use regex::Regex;

/// Sentinel end century meaning "still practised".
pub const PRESENT_CENTURY: i32 = 21;
/// BCE years off the round hundred fall one century further back.
pub const BCE_OFF_BOUNDARY_SHIFT: i32 = 1;
/// Assumed length of a tradition when only its start century is known.
pub const DEFAULT_SPAN: i32 = 5;
/// Largest century magnitude read from text; bigger numbers are not dates.
pub const MAX_CENTURY: i32 = 100;

const ERA: &str = r"bce|bc|ce|ad|b\.c\.e\.|b\.c\.|c\.e\.|a\.d\.";

static CENTURY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(\d+)(?:st|nd|rd|th)?\s+century(?:\s+({ERA}))?"
    ))
    .unwrap()
});
static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(\d+)\s+({ERA})(?:\W|$)")).unwrap());

static CENTURY_SPAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)(?:st|nd|rd|th)?\s*[-–—]\s*(\d+)(?:st|nd|rd|th)?\s+(?:century|centuries|cent\.)")
        .unwrap()
});
static SINGLE_CENTURY_ERA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(\d+)(?:st|nd|rd|th)?\s+(?:century|cent\.)\s+({ERA})"
    ))
    .unwrap()
});
static YEAR_SPAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(\d+)\s*({ERA})?\s*[-–—]\s*(\d+)\s*({ERA})"
    ))
    .unwrap()
});
static ANY_CENTURY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)(?:st|nd|rd|th)?\s+(?:century|cent\.)").unwrap());
static BCE_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:bce|bc|b\.c\.e\.|b\.c\.)").unwrap());

/// Ordered keyword buckets for text without an explicit date.
const ERA_BUCKETS: &[(&[&str], (i32, i32))] = &[
    (&["modern", "contemporary", "current", "today", "present"], (20, PRESENT_CENTURY)),
    (&["ancient", "antiquity", "classical"], (-5, 5)),
    (&["medieval"], (5, 15)),
    (&["renaissance"], (14, 17)),
];

fn century_number(digits: &str) -> Option<i32> {
    digits.parse::<i32>().ok().filter(|n| *n <= MAX_CENTURY)
}

fn year_number(digits: &str) -> Option<i32> {
    digits.parse::<i32>().ok().filter(|n| *n <= MAX_CENTURY * 100)
}

fn is_bce(era: &str) -> bool {
    era.starts_with('b')
}

/// Convert a year to a signed century.
pub fn year_to_century(year: i32, bce: bool) -> i32 {
    if bce {
        let mut century = -(year / 100);
        if year % 100 > 0 {
            century -= BCE_OFF_BOUNDARY_SHIFT;
        }
        century
    } else {
        year / 100
    }
}

/// Signed century of origin mentioned in `text`, or 0 when none is found.
pub fn parse_century(text: &str) -> i32 {
    if text.trim().is_empty() {
        return 0;
    }
    let text = text.to_lowercase();

    if let Some(caps) = CENTURY_RE.captures(&text) {
        let Some(n) = century_number(&caps[1]) else {
            return 0;
        };
        let bce = caps.get(2).is_some_and(|m| is_bce(m.as_str()));
        return if bce { -n } else { n };
    }

    if let Some(caps) = YEAR_RE.captures(&text) {
        let Some(year) = year_number(&caps[1]) else {
            return 0;
        };
        return year_to_century(year, is_bce(&caps[2]));
    }

    0
}

/// Start and end centuries described by `text`, falling back to coarse era
/// buckets. `None` when nothing date-like is present.
pub fn parse_century_range(text: &str) -> Option<(i32, i32)> {
    if text.trim().is_empty() {
        return None;
    }
    let text = text.to_lowercase();

    if let Some(caps) = CENTURY_SPAN_RE.captures(&text) {
        let start = century_number(&caps[1])?;
        let end = century_number(&caps[2])?;
        let m = caps.get(0)?;
        let window_end = floor_char_boundary(&text, m.start() + 30);
        let sign = if BCE_MARKER_RE.is_match(&text[m.start()..window_end]) {
            -1
        } else {
            1
        };
        return Some((start * sign, end * sign));
    }

    if let Some(caps) = SINGLE_CENTURY_ERA_RE.captures(&text) {
        let n = century_number(&caps[1])?;
        let start = if is_bce(&caps[2]) { -n } else { n };
        return Some(span_from(start));
    }

    if let Some(caps) = YEAR_SPAN_RE.captures(&text) {
        let start_year = year_number(&caps[1])?;
        let end_year = year_number(&caps[3])?;
        let end_bce = is_bce(&caps[4]);
        // "500-300 BCE": a bare start inherits the end's era.
        let start_bce = caps.get(2).map_or(end_bce, |m| is_bce(m.as_str()));
        return Some((
            year_to_century(start_year, start_bce),
            year_to_century(end_year, end_bce),
        ));
    }

    if let Some(caps) = ANY_CENTURY_RE.captures(&text) {
        let n = century_number(&caps[1])?;
        let start = if BCE_MARKER_RE.is_match(&text) { -n } else { n };
        return Some(span_from(start));
    }

    ERA_BUCKETS
        .iter()
        .find(|(terms, _)| terms.iter().any(|t| text.contains(t)))
        .map(|(_, range)| *range)
}

fn span_from(start: i32) -> (i32, i32) {
    if start < 0 {
        (start, start.saturating_add(DEFAULT_SPAN))
    } else {
        (start, start.saturating_add(DEFAULT_SPAN).min(PRESENT_CENTURY))
    }
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
