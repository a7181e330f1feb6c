#![allow(dead_code)]

use evexport::{Clock, Credentials, Endpoint, LocalZone, RunConfig, Transport, TransportError};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use time::macros::datetime;
use time::{OffsetDateTime, UtcOffset};

pub const API_KEY: &str = "KEY";
pub const API_SECRET: &str = "SECRET";

/// 2023-11-14 10:00:00 UTC: a Tuesday, far from any DST edge.
pub fn fixed_now() -> OffsetDateTime {
    datetime!(2023-11-14 10:00:00 UTC)
}

/// Clock frozen at one instant.
pub struct FixedClock(pub OffsetDateTime);

impl FixedClock {
    pub fn utc() -> Self {
        FixedClock(fixed_now())
    }
    pub fn at_offset(offset: UtcOffset) -> Self {
        FixedClock(fixed_now().to_offset(offset))
    }
}

/// Renders every instant at the clock's own offset.
impl LocalZone for FixedClock {
    fn offset_at(&self, _epoch_seconds: i64) -> UtcOffset {
        self.0.offset()
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

pub fn credentials() -> Credentials {
    Credentials::new(API_KEY, API_SECRET)
}

/// Config pointing at a fresh temp directory (the directory outlives the test).
pub fn temp_config() -> (RunConfig, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.into_path();
    let cfg = RunConfig::default().with_output_root(&root);
    (cfg, root)
}

/// Join JSON values into an export body: one object per line, trailing newline.
pub fn ndjson_body(values: &[Value]) -> String {
    let mut s = String::new();
    for v in values {
        s.push_str(&v.to_string());
        s.push('\n');
    }
    s
}

/// Read a CSV file into rows of cells, header included.
pub fn read_csv(path: &Path) -> Vec<Vec<String>> {
    let f = File::open(path).unwrap();
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(BufReader::new(f));
    rdr.records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

/// One GET seen by the fake transport.
#[derive(Clone, Debug)]
pub struct SeenRequest {
    pub endpoint: Endpoint,
    pub path: String,
    pub query: HashMap<String, String>,
}

impl SeenRequest {
    pub fn resource(&self) -> &str {
        self.path.trim_start_matches("/2.0")
    }
}

#[derive(Clone)]
enum Canned {
    Body(String),
    Status(u16),
}

/// In-memory stand-in for the HTTP transport.
///
/// The catalog answers `/events/names`; export bodies are keyed by the single
/// event in the `event` filter.
#[derive(Default)]
pub struct FakeTransport {
    catalog: Option<Canned>,
    exports: HashMap<String, Canned>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(mut self, names: &[&str]) -> Self {
        self.catalog = Some(Canned::Body(serde_json::to_string(names).unwrap()));
        self
    }

    pub fn with_catalog_body(mut self, body: &str) -> Self {
        self.catalog = Some(Canned::Body(body.to_string()));
        self
    }

    pub fn with_catalog_status(mut self, status: u16) -> Self {
        self.catalog = Some(Canned::Status(status));
        self
    }

    pub fn with_export(mut self, event: &str, body: impl Into<String>) -> Self {
        self.exports.insert(event.to_string(), Canned::Body(body.into()));
        self
    }

    pub fn with_export_status(mut self, event: &str, status: u16) -> Self {
        self.exports.insert(event.to_string(), Canned::Status(status));
        self
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn exports_requested(&self) -> Vec<String> {
        self.seen()
            .into_iter()
            .filter(|r| r.endpoint == Endpoint::Export)
            .filter_map(|r| r.query.get("event").cloned())
            .collect()
    }
}

impl Transport for FakeTransport {
    fn get(&self, endpoint: Endpoint, path_and_query: &str) -> Result<String, TransportError> {
        let (path, query) = path_and_query.split_once('?').unwrap_or((path_and_query, ""));
        let query: HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes()).into_owned().collect();
        let seen = SeenRequest { endpoint, path: path.to_string(), query: query.clone() };
        self.seen.lock().unwrap().push(seen);

        let canned = match endpoint {
            Endpoint::General => self.catalog.clone(),
            Endpoint::Export => query
                .get("event")
                .and_then(|filter| serde_json::from_str::<Vec<String>>(filter).ok())
                .and_then(|events| events.first().cloned())
                .and_then(|event| self.exports.get(&event).cloned()),
        };

        match canned {
            Some(Canned::Body(body)) => Ok(body),
            Some(Canned::Status(status)) => Err(TransportError::Status {
                resource: path.trim_start_matches("/2.0").to_string(),
                status,
                body: "rejected".to_string(),
            }),
            None => Ok(String::new()),
        }
    }
}
