//! Error taxonomy. Configuration errors are fatal to a run; everything wrapped by
//! `EventError` is scoped to a single event and recovered by the orchestrator.

use std::io;
use std::path::PathBuf;

/// Missing, unreadable or invalid configuration/credentials.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {kind} file {}: {source}", .path.display())]
    Read {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse {kind} file {}: {source}", .path.display())]
    Parse {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SignError {
    #[error("parameter `{0}` is reserved and is added by the signer")]
    ReservedParameter(String),
}

/// Failures talking to the remote API.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("cannot load CA certificate {}: {message}", .path.display())]
    Certificate { path: PathBuf, message: String },

    #[error("request for {resource} failed: {source}")]
    Request {
        resource: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request for {resource} returned HTTP {status}: {body}")]
    Status { resource: String, status: u16, body: String },

    #[error("response for {resource} is not valid JSON: {source}")]
    Json {
        resource: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected payload for {resource}: {detail}")]
    UnexpectedPayload { resource: String, detail: String },
}

/// A line of an export body that is not a valid event record.
#[derive(Debug, thiserror::Error)]
#[error("malformed export line {line}: {source}")]
pub struct ParseError {
    /// 1-based line number within the body.
    pub line: usize,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("cannot write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot encode CSV for {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl WriteError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        WriteError::Io { path: path.into(), source }
    }
}

/// Everything that can go wrong while exporting one event.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error(transparent)]
    Sign(#[from] SignError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

impl EventError {
    /// Short stage label used in log lines.
    pub fn stage(&self) -> &'static str {
        match self {
            EventError::Sign(_) => "signing",
            EventError::Transport(_) => "requesting",
            EventError::Parse(_) => "reconciling",
            EventError::Write(_) => "emitting",
        }
    }
}
