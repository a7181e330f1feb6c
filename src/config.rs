use crate::date::DayWindow;
use crate::error::ConfigError;
use crate::signer::ExpiryPolicy;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/Exporter.config.json";
pub const DEFAULT_CREDENTIALS_PATH: &str = "config/MixpanelCredentials.config.json";

pub const DEFAULT_GENERAL_ENDPOINT: &str = "https://mixpanel.com/api";
pub const DEFAULT_EXPORT_ENDPOINT: &str = "https://data.mixpanel.com/api";

/// Run parameters, read once from the exporter config document.
///
/// Keys are the human-readable names used by the config file
/// (`"Output Directory"`, `"From Days Ago"`, ...); snake_case aliases are accepted too.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    #[serde(rename = "Output Directory", alias = "output_root")]
    pub output_root: PathBuf,
    #[serde(rename = "From Days Ago", alias = "from_days_ago")]
    pub from_days_ago: u32,
    #[serde(rename = "To Days Ago", alias = "to_days_ago")]
    pub to_days_ago: u32,
    #[serde(rename = "Create Sub-folders by Date", alias = "subfolders_by_date")]
    pub subfolders_by_date: bool,

    #[serde(rename = "Events To Exclude", alias = "events_to_exclude")]
    pub events_to_exclude: Vec<String>,
    #[serde(rename = "Events To Include", alias = "events_to_include")]
    pub events_to_include: Vec<String>,

    // request expiry
    #[serde(rename = "Scale Request Expiry", alias = "scale_expiry")]
    pub scale_expiry: bool,
    #[serde(rename = "Scale Request Seconds Per Day", alias = "seconds_per_day")]
    pub seconds_per_day: f64,
    #[serde(rename = "Unscaled Request Expiry Seconds", alias = "unscaled_expiry_seconds")]
    pub unscaled_expiry_seconds: i64,
    #[serde(rename = "Max Scaled Request Expiry Seconds", alias = "max_scaled_expiry_seconds")]
    pub max_scaled_expiry_seconds: i64,
    #[serde(rename = "Min Scaled Request Expiry Seconds", alias = "min_scaled_expiry_seconds")]
    pub min_scaled_expiry_seconds: i64,

    // transport
    #[serde(rename = "General Endpoint", alias = "general_endpoint")]
    pub general_endpoint: String,
    #[serde(rename = "Export Endpoint", alias = "export_endpoint")]
    pub export_endpoint: String,
    #[serde(rename = "Request Timeout Seconds", alias = "request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    #[serde(rename = "CA Certificate Path", alias = "ca_cert_path")]
    pub ca_cert_path: Option<PathBuf>,

    // execution
    #[serde(rename = "Concurrency", alias = "concurrency")]
    pub concurrency: usize,
    #[serde(rename = "Progress", alias = "progress")]
    pub progress: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        let expiry = ExpiryPolicy::default();
        Self {
            output_root: PathBuf::new(),
            from_days_ago: 1,
            to_days_ago: 0,
            subfolders_by_date: true,
            events_to_exclude: Vec::new(),
            events_to_include: Vec::new(),
            scale_expiry: expiry.scale,
            seconds_per_day: expiry.seconds_per_day,
            unscaled_expiry_seconds: expiry.unscaled_seconds,
            max_scaled_expiry_seconds: expiry.max_scaled_seconds,
            min_scaled_expiry_seconds: expiry.min_scaled_seconds,
            general_endpoint: DEFAULT_GENERAL_ENDPOINT.to_string(),
            export_endpoint: DEFAULT_EXPORT_ENDPOINT.to_string(),
            request_timeout_seconds: 300,
            ca_cert_path: None,
            concurrency: 1,
            progress: false,
        }
    }
}

impl RunConfig {
    /// Read, normalize and validate the config document at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            kind: "config",
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: RunConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            kind: "config",
            path: path.to_path_buf(),
            source,
        })?;
        let cfg = cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Trim event names and drop empty/duplicate entries, keeping first-seen order.
    pub fn normalize(mut self) -> Self {
        dedup_names(&mut self.events_to_exclude);
        dedup_names(&mut self.events_to_include);
        self.output_root = expand_home(&self.output_root);
        self.concurrency = self.concurrency.max(1);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output_root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("\"Output Directory\" is required".into()));
        }
        if self.to_days_ago > self.from_days_ago {
            return Err(ConfigError::Invalid(format!(
                "\"To Days Ago\" ({}) must not exceed \"From Days Ago\" ({})",
                self.to_days_ago, self.from_days_ago
            )));
        }
        if !self.seconds_per_day.is_finite() || self.seconds_per_day < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "\"Scale Request Seconds Per Day\" must be a non-negative number, got {}",
                self.seconds_per_day
            )));
        }
        if self.unscaled_expiry_seconds <= 0 {
            return Err(ConfigError::Invalid("\"Unscaled Request Expiry Seconds\" must be positive".into()));
        }
        if self.min_scaled_expiry_seconds <= 0 || self.min_scaled_expiry_seconds > self.max_scaled_expiry_seconds {
            return Err(ConfigError::Invalid(format!(
                "scaled expiry bounds must satisfy 0 < min ({}) <= max ({})",
                self.min_scaled_expiry_seconds, self.max_scaled_expiry_seconds
            )));
        }
        if self.general_endpoint.trim().is_empty() || self.export_endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("API endpoints must not be empty".into()));
        }
        Ok(())
    }

    pub fn window(&self) -> DayWindow {
        DayWindow::new(self.from_days_ago, self.to_days_ago)
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy {
            scale: self.scale_expiry,
            seconds_per_day: self.seconds_per_day,
            unscaled_seconds: self.unscaled_expiry_seconds,
            min_scaled_seconds: self.min_scaled_expiry_seconds,
            max_scaled_seconds: self.max_scaled_expiry_seconds,
        }
    }

    pub fn with_output_root(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_root = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_window(mut self, from_days_ago: u32, to_days_ago: u32) -> Self {
        self.from_days_ago = from_days_ago;
        self.to_days_ago = to_days_ago;
        self
    }
    pub fn with_from_days_ago(mut self, days: u32) -> Self {
        self.from_days_ago = days;
        self
    }
    pub fn with_to_days_ago(mut self, days: u32) -> Self {
        self.to_days_ago = days;
        self
    }
    pub fn with_subfolders_by_date(mut self, yes: bool) -> Self {
        self.subfolders_by_date = yes;
        self
    }
    pub fn with_events_to_exclude<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.events_to_exclude = events.into_iter().map(Into::into).collect();
        dedup_names(&mut self.events_to_exclude);
        self
    }
    pub fn with_events_to_include<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.events_to_include = events.into_iter().map(Into::into).collect();
        dedup_names(&mut self.events_to_include);
        self
    }
    pub fn with_expiry_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.scale_expiry = policy.scale;
        self.seconds_per_day = policy.seconds_per_day;
        self.unscaled_expiry_seconds = policy.unscaled_seconds;
        self.min_scaled_expiry_seconds = policy.min_scaled_seconds;
        self.max_scaled_expiry_seconds = policy.max_scaled_seconds;
        self
    }
    pub fn with_endpoints(mut self, general: impl Into<String>, export: impl Into<String>) -> Self {
        self.general_endpoint = general.into();
        self.export_endpoint = export.into();
        self
    }
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
}

/// API key and secret. The secret is only reachable from inside the crate and
/// is redacted from `Debug` output.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    #[serde(rename = "API Key", alias = "api_key")]
    api_key: String,
    #[serde(rename = "API Secret", alias = "api_secret")]
    api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), api_secret: api_secret.into() }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            kind: "credentials",
            path: path.to_path_buf(),
            source,
        })?;
        let creds: Credentials = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            kind: "credentials",
            path: path.to_path_buf(),
            source,
        })?;
        creds.validate()?;
        Ok(creds)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Invalid("\"API Key\" is empty".into()));
        }
        if self.api_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("\"API Secret\" is empty".into()));
        }
        Ok(())
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub(crate) fn api_secret(&self) -> &str {
        &self.api_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key_hint: String = self.api_key.chars().take(4).collect();
        f.debug_struct("Credentials")
            .field("api_key", &format_args!("{key_hint}…"))
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

fn dedup_names(names: &mut Vec<String>) {
    let mut seen = ahash::AHashSet::new();
    names.retain_mut(|n| {
        let trimmed = n.trim();
        if trimmed.len() != n.len() {
            *n = trimmed.to_string();
        }
        !n.is_empty() && seen.insert(n.clone())
    });
}

/// Expand a leading `~/` against `$HOME`.
fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}
