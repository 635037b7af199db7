use super::match_table;
use crate::records::UNKNOWN;

const REGIONS: &[(&str, &str)] = &[
    ("egypt", "North Africa"),
    ("north africa", "North Africa"),
    ("greece", "Mediterranean"),
    ("mediterranean", "Mediterranean"),
    ("rome", "Mediterranean"),
    ("italy", "Mediterranean"),
    ("middle east", "Middle East"),
    ("persia", "Middle East"),
    ("mesopotamia", "Middle East"),
    ("israel", "Middle East"),
    ("palestine", "Middle East"),
    ("judea", "Middle East"),
    ("babylon", "Middle East"),
    ("western europe", "Europe"),
    ("central europe", "Europe"),
    ("eastern europe", "Europe"),
    ("europe", "Europe"),
    ("scandinavia", "Scandinavia"),
    ("norse", "Scandinavia"),
    ("nordic", "Scandinavia"),
    ("celtic", "Western Europe"),
    ("britain", "Western Europe"),
    ("ireland", "Western Europe"),
    ("scotland", "Western Europe"),
    ("france", "Western Europe"),
    ("germany", "Central Europe"),
    ("china", "East Asia"),
    ("japan", "East Asia"),
    ("east asia", "East Asia"),
    ("india", "South Asia"),
    ("south asia", "South Asia"),
    ("north america", "North America"),
    ("united states", "North America"),
    ("usa", "North America"),
    ("america", "North America"),
    ("global", "Global"),
];

/// Macro-region(s) for free text, joined by `/`, or `"Unknown"`.
pub fn normalize_region(text: &str) -> String {
    let regions = match_table(text, REGIONS);
    if regions.is_empty() {
        UNKNOWN.to_string()
    } else {
        regions.join("/")
    }
}
