//! Schema reconciliation: one column set for records with differing property keys.

use crate::error::ParseError;
use crate::ndjson::parse_records;
use crate::record::EventRecord;
use ahash::AHashSet;

/// Ordered, duplicate-free property keys in order of first appearance.
#[derive(Clone, Debug, Default)]
pub struct HeaderSet {
    keys: Vec<String>,
    seen: AHashSet<String>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `key` if it is new. Returns whether it was added.
    pub fn observe(&mut self, key: &str) -> bool {
        if self.seen.contains(key) {
            return false;
        }
        self.seen.insert(key.to_string());
        self.keys.push(key.to_string());
        true
    }

    pub fn observe_record(&mut self, record: &EventRecord) {
        for key in record.property_keys() {
            self.observe(key);
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn contains(&self, key: &str) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl PartialEq for HeaderSet {
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys
    }
}

impl Eq for HeaderSet {}

impl<'a> FromIterator<&'a EventRecord> for HeaderSet {
    fn from_iter<I: IntoIterator<Item = &'a EventRecord>>(iter: I) -> Self {
        let mut header = HeaderSet::new();
        for record in iter {
            header.observe_record(record);
        }
        header
    }
}

/// Outcome of reconciling one export body.
#[derive(Clone, Debug, PartialEq)]
pub enum Reconciled {
    /// Nothing to emit.
    Empty,
    Records { records: Vec<EventRecord>, header: HeaderSet },
}

impl Reconciled {
    pub fn record_count(&self) -> usize {
        match self {
            Reconciled::Empty => 0,
            Reconciled::Records { records, .. } => records.len(),
        }
    }
}

/// Parse `body` and compute the header union over its records.
pub fn reconcile(body: Option<&str>) -> Result<Reconciled, ParseError> {
    let Some(body) = body else { return Ok(Reconciled::Empty) };
    let records = parse_records(body)?;
    if records.is_empty() {
        return Ok(Reconciled::Empty);
    }
    let header: HeaderSet = records.iter().collect();
    Ok(Reconciled::Records { records, header })
}
