use super::match_table;
use crate::records::{is_placeholder, UNKNOWN};

const TRADITION_ALIASES: &[(&str, &str)] = &[
    ("ancient egypt", "Egyptian"),
    ("egyptian", "Egyptian"),
    ("egypt", "Egyptian"),
    ("ancient greek", "Greek"),
    ("greco", "Greek"),
    ("greek", "Greek"),
    ("hellenic", "Greek"),
    ("roman", "Roman"),
    ("hebrew", "Judaic"),
    ("jewish", "Judaic"),
    ("judaism", "Judaic"),
    ("kabbalah", "Kabbalah"),
    ("qabbalah", "Kabbalah"),
    ("cabala", "Kabbalah"),
    ("norse", "Norse"),
    ("viking", "Norse"),
    ("scandinavian", "Norse"),
    ("celtic", "Celtic"),
    ("druidic", "Celtic"),
    ("taoist", "Taoist"),
    ("taoism", "Taoist"),
    ("buddhist", "Buddhist"),
    ("buddhism", "Buddhist"),
    ("hindu", "Hindu"),
    ("hermetic", "Hermetic"),
    ("alchemical", "Alchemy"),
    ("alchemy", "Alchemy"),
    ("rosicrucian", "Rosicrucian"),
    ("masonic", "Masonic"),
    ("freemasonry", "Masonic"),
    ("wiccan", "Neo-Pagan"),
    ("wicca", "Neo-Pagan"),
    ("neopagan", "Neo-Pagan"),
    ("pagan", "Neo-Pagan"),
    ("chaos magic", "Chaos Magic"),
    ("thelemic", "Thelema"),
    ("thelema", "Thelema"),
    ("christian", "Christian"),
    ("gnostic", "Gnostic"),
];

/// Canonical tradition name(s) for free text.
///
/// Every alias found contributes its canonical name (joined by `/` in order of
/// appearance); with no alias the input is title-cased.
pub fn normalize_tradition(text: &str) -> String {
    if is_placeholder(text) {
        return UNKNOWN.to_string();
    }
    let matches = match_table(text, TRADITION_ALIASES);
    if matches.is_empty() {
        title_case(text)
    } else {
        matches.join("/")
    }
}

pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_map_to_canonical() {
        assert_eq!(normalize_tradition("Viking age"), "Norse");
        assert_eq!(normalize_tradition("ancient Egyptian religion"), "Egyptian");
        assert_eq!(normalize_tradition("Hermeticism"), "Hermetic");
    }

    #[test]
    fn several_matches_join() {
        assert_eq!(normalize_tradition("Greco-Roman"), "Greek/Roman");
        assert_eq!(normalize_tradition("Jewish and Christian mysticism"), "Judaic/Christian");
    }

    #[test]
    fn fallbacks() {
        assert_eq!(normalize_tradition(""), "Unknown");
        assert_eq!(normalize_tradition("unknown"), "Unknown");
        assert_eq!(normalize_tradition("vodou LINEAGE"), "Vodou Lineage");
    }
}
