//! Event selection over the catalog.

use ahash::AHashSet;

/// Pick the catalog events to export.
///
/// Precedence: when `exclude` is non-empty it is the only filter applied and
/// `include` is ignored; `include` is consulted only when `exclude` is empty.
/// With neither list set every catalog event is kept. Duplicate catalog names
/// are kept once, at their first position.
pub fn select_events(catalog: &[String], include: &[String], exclude: &[String]) -> Vec<String> {
    let mut seen = AHashSet::with_capacity(catalog.len());
    catalog
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .filter(|name| {
            if !exclude.is_empty() {
                !exclude.contains(*name)
            } else if !include.is_empty() {
                include.contains(*name)
            } else {
                true
            }
        })
        .cloned()
        .collect()
}
