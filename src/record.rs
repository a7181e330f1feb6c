use serde::Deserialize;
use serde_json::{Map, Value};

/// One exported occurrence: `{"event": "...", "properties": {...}}`.
///
/// `properties` keeps the key order of the source line.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct EventRecord {
    pub event: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl EventRecord {
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn property_keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }
}
