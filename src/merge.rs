use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::normalize::century::PRESENT_CENTURY;
use crate::records::{
    extend_unique, is_placeholder, salted_symbol_id, today, Connection, Symbol, Tradition,
};

/// Symbols, traditions and connections, pre- or post-merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    pub symbols: Vec<Symbol>,
    pub traditions: Vec<Tradition>,
    pub connections: Vec<Connection>,
}

/// Audit record of one merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeLog {
    pub date: String,
    pub symbols_added: usize,
    pub symbols_updated: usize,
    pub traditions_added: usize,
    pub traditions_updated: usize,
    pub connections_added: usize,
    pub connections_updated: usize,
    pub symbol_id_collisions: usize,
}

/// Reconcile a scraped batch against an existing corpus.
///
/// Matching is by id then case-insensitive name for symbols, by lowercase
/// name for traditions and by unordered pair for connections. Populated
/// fields are never downgraded; every change stamps `last_updated`.
///
/// Batch connection endpoints name batch symbols when the batch has a symbol
/// with that id, and existing symbols otherwise. A run scraped against an
/// existing roster reserves its ids first (see [`reserve_id`]), so the two
/// never share an id.
pub fn merge(existing: Corpus, batch: Corpus) -> (Corpus, MergeLog) {
    let date = today();
    let mut log = MergeLog {
        date: date.clone(),
        ..MergeLog::default()
    };

    let mut symbols = existing.symbols;
    let remap = merge_symbols(&mut symbols, batch.symbols, &date, &mut log);
    let traditions = merge_traditions(existing.traditions, batch.traditions, &date, &mut log);
    let connections =
        merge_connections(existing.connections, batch.connections, &remap, &date, &mut log);

    info!(
        "Merged: symbols +{} ~{}, traditions +{} ~{}, connections +{} ~{}",
        log.symbols_added,
        log.symbols_updated,
        log.traditions_added,
        log.traditions_updated,
        log.connections_added,
        log.connections_updated
    );
    (
        Corpus {
            symbols,
            traditions,
            connections,
        },
        log,
    )
}

/// Returns batch id -> corpus id for every incoming symbol whose id changed.
fn merge_symbols(
    symbols: &mut Vec<Symbol>,
    incoming: Vec<Symbol>,
    date: &str,
    log: &mut MergeLog,
) -> HashMap<i64, i64> {
    let mut by_id: HashMap<i64, usize> = HashMap::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();
    for (i, s) in symbols.iter().enumerate() {
        by_id.entry(s.id).or_insert(i);
        by_name.entry(s.name.to_lowercase()).or_insert(i);
    }

    let mut remap = HashMap::new();
    for mut symbol in incoming {
        let batch_id = symbol.id;
        let key = symbol.name.to_lowercase();
        let mut target = None;

        if let Some(&i) = by_id.get(&symbol.id) {
            if symbols[i].name.to_lowercase() == key {
                target = Some(i);
            } else {
                symbol.id = free_id(&symbol, |id| by_id.contains_key(&id));
                warn!(
                    "Symbol id {} is taken by {:?}; {:?} reassigned to {}",
                    batch_id, symbols[i].name, symbol.name, symbol.id
                );
                log.symbol_id_collisions += 1;
            }
        }
        let target = target.or_else(|| by_name.get(&key).copied());

        match target {
            Some(i) => {
                if symbols[i].id != batch_id {
                    remap.insert(batch_id, symbols[i].id);
                }
                if update_symbol(&mut symbols[i], symbol, date) {
                    log.symbols_updated += 1;
                }
            }
            None => {
                if symbol.id != batch_id {
                    remap.insert(batch_id, symbol.id);
                }
                by_id.insert(symbol.id, symbols.len());
                by_name.entry(key).or_insert(symbols.len());
                symbols.push(symbol);
                log.symbols_added += 1;
            }
        }
    }
    remap
}

/// Salted rehash of the symbol's key until it lands on an unused id.
fn free_id(symbol: &Symbol, taken: impl Fn(i64) -> bool) -> i64 {
    let url = symbol.source_url.as_deref().unwrap_or_default();
    (1u32..)
        .map(|salt| salted_symbol_id(&symbol.name, url, salt))
        .find(|id| *id != symbol.id && !taken(*id))
        .unwrap_or(symbol.id)
}

/// Move a freshly scraped symbol off an id that a known symbol of another
/// name already holds. Returns true when the id changed.
pub fn reserve_id(symbol: &mut Symbol, known: &HashMap<i64, String>) -> bool {
    match known.get(&symbol.id) {
        Some(owner) if !owner.eq_ignore_ascii_case(&symbol.name) => {
            symbol.id = free_id(symbol, |id| known.contains_key(&id));
            true
        }
        _ => false,
    }
}

fn distinct(items: &[String]) -> usize {
    items.iter().map(|s| s.to_lowercase()).unique().count()
}

fn longer(current: &str, incoming: &str) -> bool {
    incoming.chars().count() > current.chars().count()
}

fn update_symbol(existing: &mut Symbol, incoming: Symbol, date: &str) -> bool {
    let mut changed = false;

    if longer(&existing.description, &incoming.description) {
        existing.description = incoming.description;
        changed = true;
    }
    if longer(&existing.usage, &incoming.usage) {
        existing.usage = incoming.usage;
        changed = true;
    }
    if distinct(&incoming.visual_elements) > distinct(&existing.visual_elements) {
        existing.visual_elements = incoming.visual_elements;
        changed = true;
    }
    if is_placeholder(&existing.tradition) && !is_placeholder(&incoming.tradition) {
        existing.tradition = incoming.tradition;
        changed = true;
    }
    if is_placeholder(&existing.element) && !is_placeholder(&incoming.element) {
        existing.element = incoming.element;
        changed = true;
    }
    if existing.century_origin == 0 && incoming.century_origin != 0 {
        existing.century_origin = incoming.century_origin;
        changed = true;
    }
    changed |= fill_source(&mut existing.source_url, incoming.source_url);

    if changed {
        existing.last_updated = Some(date.to_string());
    }
    changed
}

fn fill_source(current: &mut Option<String>, incoming: Option<String>) -> bool {
    let missing = current.as_deref().map_or(true, |u| u.trim().is_empty());
    match incoming {
        Some(url) if missing && !url.trim().is_empty() => {
            *current = Some(url);
            true
        }
        _ => false,
    }
}

fn merge_traditions(
    existing: Vec<Tradition>,
    incoming: Vec<Tradition>,
    date: &str,
    log: &mut MergeLog,
) -> Vec<Tradition> {
    let mut out: Vec<Tradition> = Vec::with_capacity(existing.len() + incoming.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    // duplicates already in the corpus fold into their first occurrence
    for tradition in existing {
        match index.get(&tradition.name.to_lowercase()) {
            Some(&i) => {
                update_tradition(&mut out[i], tradition, date);
            }
            None => {
                index.insert(tradition.name.to_lowercase(), out.len());
                out.push(tradition);
            }
        }
    }

    for tradition in incoming {
        match index.get(&tradition.name.to_lowercase()) {
            Some(&i) => {
                if update_tradition(&mut out[i], tradition, date) {
                    log.traditions_updated += 1;
                }
            }
            None => {
                index.insert(tradition.name.to_lowercase(), out.len());
                out.push(tradition);
                log.traditions_added += 1;
            }
        }
    }
    out
}

fn has_placeholder_span(t: &Tradition) -> bool {
    t.start_century == 0 && t.end_century == PRESENT_CENTURY
}

fn union_into(list: &mut Vec<String>, incoming: Vec<String>) -> bool {
    let real: Vec<String> = incoming.into_iter().filter(|s| !is_placeholder(s)).collect();
    if real.is_empty() {
        return false;
    }
    let lone_placeholder = list.len() == 1 && is_placeholder(&list[0]);
    let mut merged = if lone_placeholder { Vec::new() } else { list.clone() };
    let added = extend_unique(&mut merged, real);
    if added == 0 {
        return false;
    }
    *list = merged;
    true
}

fn update_tradition(existing: &mut Tradition, incoming: Tradition, date: &str) -> bool {
    let mut changed = false;
    let dated = !has_placeholder_span(&incoming);

    if longer(&existing.description, &incoming.description) {
        existing.description = incoming.description;
        changed = true;
    }
    if is_placeholder(&existing.region) && !is_placeholder(&incoming.region) {
        existing.region = incoming.region;
        changed = true;
    }
    if has_placeholder_span(existing) && dated {
        existing.start_century = incoming.start_century;
        existing.end_century = incoming.end_century;
        changed = true;
    }
    changed |= union_into(&mut existing.major_texts, incoming.major_texts);
    changed |= union_into(&mut existing.key_figures, incoming.key_figures);
    changed |= union_into(&mut existing.core_concepts, incoming.core_concepts);
    changed |= fill_source(&mut existing.source_url, incoming.source_url);
    for (key, value) in incoming.extra {
        if !existing.extra.contains_key(&key) {
            existing.extra.insert(key, value);
            changed = true;
        }
    }

    if changed {
        existing.last_updated = Some(date.to_string());
    }
    changed
}

fn merge_connections(
    existing: Vec<Connection>,
    incoming: Vec<Connection>,
    remap: &HashMap<i64, i64>,
    date: &str,
    log: &mut MergeLog,
) -> Vec<Connection> {
    let mut out: Vec<Connection> = Vec::with_capacity(existing.len() + incoming.len());
    let mut index: HashMap<(i64, i64), usize> = HashMap::new();

    for connection in existing {
        let connection = connection.normalized();
        if connection.source == connection.target {
            continue;
        }
        match index.get(&connection.pair()) {
            Some(&i) => {
                update_connection(&mut out[i], connection, date);
            }
            None => {
                index.insert(connection.pair(), out.len());
                out.push(connection);
            }
        }
    }

    for mut connection in incoming {
        connection.source = remap.get(&connection.source).copied().unwrap_or(connection.source);
        connection.target = remap.get(&connection.target).copied().unwrap_or(connection.target);
        let connection = connection.normalized();
        if connection.source == connection.target {
            continue;
        }
        match index.get(&connection.pair()) {
            Some(&i) => {
                if update_connection(&mut out[i], connection, date) {
                    log.connections_updated += 1;
                }
            }
            None => {
                index.insert(connection.pair(), out.len());
                out.push(connection);
                log.connections_added += 1;
            }
        }
    }
    out
}

fn update_connection(existing: &mut Connection, incoming: Connection, date: &str) -> bool {
    let mut changed = false;
    if longer(&existing.description, &incoming.description) {
        existing.description = incoming.description;
        changed = true;
    }
    if existing.strength == 0.0 && incoming.strength > 0.0 {
        existing.strength = incoming.strength;
        changed = true;
    }
    changed |= fill_source(&mut existing.source_url, incoming.source_url);
    if changed {
        existing.last_updated = Some(date.to_string());
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::UNKNOWN;

    fn symbol(id: i64, name: &str, description: &str) -> Symbol {
        Symbol {
            id,
            name: name.into(),
            description: description.into(),
            tradition: UNKNOWN.into(),
            element: UNKNOWN.into(),
            ..Symbol::default()
        }
    }

    fn tradition(name: &str, span: (i32, i32), texts: &[&str]) -> Tradition {
        Tradition {
            name: name.into(),
            start_century: span.0,
            end_century: span.1,
            region: UNKNOWN.into(),
            major_texts: texts.iter().map(|t| t.to_string()).collect(),
            ..Tradition::default()
        }
    }

    fn link(source: i64, target: i64, description: &str) -> Connection {
        Connection {
            source,
            target,
            strength: 0.4,
            description: description.into(),
            ..Connection::default()
        }
    }

    #[test]
    fn symbols_match_by_name_and_remap_connections() {
        let mut ankh = symbol(1, "Ankh", "Egyptian sign of life.");
        ankh.element = "Life".into();
        let existing = Corpus {
            symbols: vec![ankh, symbol(2, "Djed", "Pillar of stability in Egyptian art.")],
            ..Corpus::default()
        };
        let mut incoming = symbol(99, "ankh", "The ankh is the Egyptian hieroglyph for life.");
        incoming.tradition = "Egyptian".into();
        incoming.source_url = Some("https://example.org/ankh".into());
        let batch = Corpus {
            symbols: vec![incoming],
            connections: vec![link(99, 2, "ankh beside the djed")],
            ..Corpus::default()
        };

        let (merged, log) = merge(existing, batch);
        assert_eq!(merged.symbols.len(), 2);
        let ankh = &merged.symbols[0];
        assert_eq!(ankh.id, 1);
        assert!(ankh.description.starts_with("The ankh is"));
        assert_eq!(ankh.tradition, "Egyptian");
        assert_eq!(ankh.element, "Life");
        assert_eq!(ankh.source_url.as_deref(), Some("https://example.org/ankh"));
        assert!(ankh.last_updated.is_some());
        assert_eq!(merged.connections[0].pair(), (1, 2));
        assert_eq!((log.symbols_added, log.symbols_updated), (0, 1));
        assert_eq!(log.connections_added, 1);
    }

    #[test]
    fn id_collision_moves_the_batch_symbol_and_its_links() {
        let existing = Corpus {
            symbols: vec![symbol(5, "Ankh", "Egyptian sign of life.")],
            ..Corpus::default()
        };
        let batch = Corpus {
            symbols: vec![symbol(5, "Djed", "Pillar of stability in Egyptian art.")],
            connections: vec![link(5, 7, "djed and something else")],
            ..Corpus::default()
        };

        let (merged, log) = merge(existing, batch);
        assert_eq!(log.symbol_id_collisions, 1);
        assert_eq!(log.symbols_added, 1);
        let djed = &merged.symbols[1];
        assert_ne!(djed.id, 5);
        assert_eq!(merged.symbols[0].description, "Egyptian sign of life.");
        assert_eq!(merged.connections[0].pair(), (7.min(djed.id), 7.max(djed.id)));
    }

    #[test]
    fn reserved_ids_keep_links_on_the_known_symbol() {
        let existing = Corpus {
            symbols: vec![symbol(5, "Ankh", "Egyptian sign of life.")],
            ..Corpus::default()
        };
        let known: HashMap<i64, String> = [(5, "Ankh".to_string())].into_iter().collect();
        let mut djed = symbol(5, "Djed", "Pillar of stability in Egyptian art.");
        assert!(reserve_id(&mut djed, &known));
        let djed_id = djed.id;
        assert_ne!(djed_id, 5);
        let mut ankh_again = symbol(5, "ANKH", "Egyptian sign of life.");
        assert!(!reserve_id(&mut ankh_again, &known));

        let batch = Corpus {
            symbols: vec![djed],
            connections: vec![link(5, 7, "ankh beside the scarab"), link(djed_id, 5, "djed and ankh")],
            ..Corpus::default()
        };
        let (merged, log) = merge(existing, batch);
        assert_eq!(log.symbol_id_collisions, 0);
        assert_eq!(merged.symbols[1].id, djed_id);
        let pairs: Vec<_> = merged.connections.iter().map(Connection::pair).collect();
        assert_eq!(pairs, vec![(5, 7), (5.min(djed_id), 5.max(djed_id))]);
    }

    #[test]
    fn unknown_region_and_span_fill_together() {
        let existing = Corpus {
            traditions: vec![tradition("Thelema", (0, 21), &[])],
            ..Corpus::default()
        };
        let mut incoming = tradition("Thelema", (20, 21), &[]);
        incoming.region = "Europe".into();
        let batch = Corpus {
            traditions: vec![incoming],
            ..Corpus::default()
        };

        let (merged, log) = merge(existing, batch);
        let thelema = &merged.traditions[0];
        assert_eq!(thelema.region, "Europe");
        assert_eq!((thelema.start_century, thelema.end_century), (20, 21));
        assert_eq!(log.traditions_updated, 1);
    }

    #[test]
    fn populated_fields_are_never_downgraded() {
        let mut ankh = symbol(1, "Ankh", "The ankh is the Egyptian hieroglyph for life.");
        ankh.century_origin = -31;
        ankh.visual_elements = vec!["loop".into(), "cross".into()];
        let existing = Corpus {
            symbols: vec![ankh.clone()],
            ..Corpus::default()
        };
        let mut shorter = symbol(1, "Ankh", "Sign of life.");
        shorter.visual_elements = vec!["Loop".into(), "loop".into()];
        let batch = Corpus {
            symbols: vec![shorter],
            ..Corpus::default()
        };

        let (merged, log) = merge(existing, batch);
        assert_eq!(merged.symbols, vec![ankh]);
        assert_eq!(log.symbols_updated, 0);
    }

    #[test]
    fn traditions_fold_and_fill_placeholders() {
        let mut alchemy = tradition("Alchemy", (0, 21), &["Unknown"]);
        alchemy.region = "Europe".into();
        let existing = Corpus {
            traditions: vec![alchemy, tradition("alchemy", (0, 21), &["Turba Philosophorum"])],
            ..Corpus::default()
        };
        let mut incoming = tradition("ALCHEMY", (3, 18), &["Emerald Tablet", "Unknown"]);
        incoming.region = "Middle East".into();
        let batch = Corpus {
            traditions: vec![incoming, tradition("Thelema", (19, 21), &["Unknown"])],
            ..Corpus::default()
        };

        let (merged, log) = merge(existing, batch);
        assert_eq!(merged.traditions.len(), 2);
        let alchemy = &merged.traditions[0];
        assert_eq!(alchemy.name, "Alchemy");
        assert_eq!((alchemy.start_century, alchemy.end_century), (3, 18));
        assert_eq!(alchemy.region, "Europe");
        assert_eq!(alchemy.major_texts, vec!["Turba Philosophorum", "Emerald Tablet"]);
        assert_eq!((log.traditions_added, log.traditions_updated), (1, 1));
    }

    #[test]
    fn connections_are_ordered_and_unique() {
        let existing = Corpus {
            connections: vec![
                link(3, 1, "short"),
                link(1, 3, "a longer existing note"),
                link(4, 4, "self pair"),
            ],
            ..Corpus::default()
        };
        let batch = Corpus {
            connections: vec![
                link(3, 1, "an even longer incoming description"),
                link(2, 2, "another self pair"),
                link(9, 2, "new pair"),
            ],
            ..Corpus::default()
        };

        let (merged, log) = merge(existing, batch);
        let pairs: Vec<(i64, i64)> = merged.connections.iter().map(|c| (c.source, c.target)).collect();
        assert_eq!(pairs, vec![(1, 3), (2, 9)]);
        assert_eq!(merged.connections[0].description, "an even longer incoming description");
        assert_eq!((log.connections_added, log.connections_updated), (1, 1));
    }
}
