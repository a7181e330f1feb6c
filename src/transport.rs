//! Blocking HTTP transport for the two API endpoints.

use crate::config::RunConfig;
use crate::error::TransportError;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Path segment between an endpoint base and a resource.
pub const API_VERSION_PATH: &str = "/2.0";

/// Longest error-body excerpt kept in a `TransportError::Status`.
const ERROR_BODY_LIMIT: usize = 512;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// General queries (event catalog and friends). Answers with JSON.
    General,
    /// Bulk raw-data export. Answers with newline-delimited JSON.
    Export,
}

/// How the caller wants the body handed back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseKind {
    RawText,
    Json,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ApiResponse {
    RawText(String),
    Parsed(Value),
}

impl ApiResponse {
    pub fn into_text(self) -> Option<String> {
        match self {
            ApiResponse::RawText(s) => Some(s),
            ApiResponse::Parsed(_) => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            ApiResponse::Parsed(v) => Some(v),
            ApiResponse::RawText(_) => None,
        }
    }
}

/// Performs an already-signed GET and returns the body text.
///
/// `path_and_query` starts at the version segment, e.g. `/2.0/export?from_date=...`.
/// Implementations are shared across export workers.
pub trait Transport: Send + Sync {
    fn get(&self, endpoint: Endpoint, path_and_query: &str) -> Result<String, TransportError>;
}

#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub general_base: String,
    pub export_base: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Extra PEM root certificate trusted in addition to the system store.
    pub ca_cert_path: Option<PathBuf>,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            general_base: crate::config::DEFAULT_GENERAL_ENDPOINT.to_string(),
            export_base: crate::config::DEFAULT_EXPORT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(10),
            ca_cert_path: None,
            user_agent: format!("evexport/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    pub fn from_run_config(cfg: &RunConfig) -> Self {
        Self {
            general_base: cfg.general_endpoint.clone(),
            export_base: cfg.export_endpoint.clone(),
            timeout: Duration::from_secs(cfg.request_timeout_seconds.max(1)),
            ca_cert_path: cfg.ca_cert_path.clone(),
            ..Self::default()
        }
    }
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
    general_base: String,
    export_base: String,
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str());

        if let Some(path) = &config.ca_cert_path {
            let pem = fs::read(path).map_err(|e| TransportError::Certificate {
                path: path.clone(),
                message: e.to_string(),
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| TransportError::Certificate {
                path: path.clone(),
                message: e.to_string(),
            })?;
            builder = builder.add_root_certificate(cert);
            tracing::info!(path = %path.display(), "trusting additional CA certificate");
        }

        let client = builder.build().map_err(TransportError::ClientBuild)?;
        Ok(Self {
            client,
            general_base: config.general_base.trim_end_matches('/').to_string(),
            export_base: config.export_base.trim_end_matches('/').to_string(),
        })
    }

    fn base(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::General => &self.general_base,
            Endpoint::Export => &self.export_base,
        }
    }
}

impl Transport for HttpTransport {
    fn get(&self, endpoint: Endpoint, path_and_query: &str) -> Result<String, TransportError> {
        let url = format!("{}{}", self.base(endpoint), path_and_query);
        let resource = resource_of(path_and_query).to_string();

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|source| request_error(&resource, source))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|source| request_error(&resource, source))?;
        tracing::debug!(%resource, status = status.as_u16(), bytes = body.len(), "response received");

        if !status.is_success() {
            return Err(TransportError::Status {
                resource,
                status: status.as_u16(),
                body: truncate(&body, ERROR_BODY_LIMIT),
            });
        }
        Ok(body)
    }
}

/// reqwest errors carry the full URL, which holds `api_key` and a valid `sig`.
fn request_error(resource: &str, source: reqwest::Error) -> TransportError {
    TransportError::Request { resource: resource.to_string(), source: source.without_url() }
}

/// Path part of `path_and_query`, without the query. Never contains credentials.
pub fn resource_of(path_and_query: &str) -> &str {
    path_and_query.split('?').next().unwrap_or(path_and_query)
}

fn truncate(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
