mod config;
mod date;
mod error;
mod paths;
mod signer;
mod transport;
mod query;
mod service;

mod filters;
mod progress;
mod concurrency;
mod util;
mod pipeline;

mod record;
mod ndjson;
mod reconcile;
mod emit;

pub use crate::config::{
    Credentials, RunConfig, DEFAULT_CONFIG_PATH, DEFAULT_CREDENTIALS_PATH, DEFAULT_EXPORT_ENDPOINT,
    DEFAULT_GENERAL_ENDPOINT,
};
pub use crate::date::{date_token, local_timestamp, Clock, DayWindow, LocalZone, SystemClock};
pub use crate::error::{ConfigError, EventError, ParseError, SignError, TransportError, WriteError};
pub use crate::pipeline::{DataExporter, EventOutcome, EventReport, ExportSummary};

// request signing and the export query
pub use crate::signer::{signature_digest, ExpiryPolicy, ParamValue, QueryParams, RequestSigner, SignedQuery};
pub use crate::query::{build_export_request, event_filter_json, ExportRequest, EVENT_NAMES_RESOURCE, EXPORT_RESOURCE};

// transport seam
pub use crate::transport::{ApiResponse, Endpoint, HttpConfig, HttpTransport, ResponseKind, Transport, API_VERSION_PATH};
pub use crate::service::ApiService;

// catalog filtering
pub use crate::filters::select_events;

// reconciliation + emission
pub use crate::record::EventRecord;
pub use crate::ndjson::{body_lines, parse_records};
pub use crate::reconcile::{reconcile, HeaderSet, Reconciled};
pub use crate::emit::{emit, render_cell, render_value, write_rows, EVENT_COLUMN, TIME_FIELD};
pub use crate::paths::{
    export_file_name, export_file_path, log_file_path, plan_export_paths, run_directory, sanitize_event_name,
};

// logging setup for binaries
pub use crate::util::{init_tracing_once, init_tracing_with_file};
