use crate::date::{Clock, DayWindow};
use crate::error::{EventError, TransportError};
use crate::query::{build_export_request, event_names_params, EVENT_NAMES_RESOURCE};
use crate::signer::{QueryParams, RequestSigner};
use crate::transport::{ApiResponse, Endpoint, ResponseKind, Transport, API_VERSION_PATH};
use serde_json::Value;
use std::sync::Arc;

/// Signed access to the analytics API.
pub struct ApiService {
    signer: RequestSigner,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
}

impl ApiService {
    pub fn new(signer: RequestSigner, transport: Arc<dyn Transport>, clock: Arc<dyn Clock>) -> Self {
        Self { signer, transport, clock }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Sign `params`, GET `resource` on `endpoint`, and hand the body back as `kind`.
    ///
    /// The clock is read once here, so every request carries its own expiry.
    pub fn request(
        &self,
        endpoint: Endpoint,
        resource: &str,
        params: &QueryParams,
        window_days: u32,
        kind: ResponseKind,
    ) -> Result<ApiResponse, EventError> {
        let signed = self.signer.sign(resource, params, window_days, self.clock.now())?;
        tracing::info!(resource, params = %params, "requesting resource");

        let path = format!("{API_VERSION_PATH}{resource}?{}", signed.to_query_string());
        let body = self.transport.get(endpoint, &path)?;

        match kind {
            ResponseKind::RawText => Ok(ApiResponse::RawText(body)),
            ResponseKind::Json => {
                let value = serde_json::from_str(&body).map_err(|source| TransportError::Json {
                    resource: resource.to_string(),
                    source,
                })?;
                Ok(ApiResponse::Parsed(value))
            }
        }
    }

    /// Every event name the project knows about. The service caps this list at 255.
    pub fn event_names(&self) -> Result<Vec<String>, EventError> {
        let response = self.request(
            Endpoint::General,
            EVENT_NAMES_RESOURCE,
            &event_names_params(),
            0,
            ResponseKind::Json,
        )?;
        let value = response.into_json().unwrap_or(Value::Null);
        Ok(parse_event_names(&value)?)
    }

    /// Raw NDJSON export for `window`, optionally restricted to `events`.
    /// `None` means the window holds no data.
    pub fn export(&self, window: DayWindow, events: Option<&[String]>) -> Result<Option<String>, EventError> {
        let req = build_export_request(window, events, self.clock.today());
        let body = self
            .request(Endpoint::Export, req.resource, &req.params, req.window_days, ResponseKind::RawText)?
            .into_text()
            .filter(|b| !b.trim().is_empty());
        Ok(body)
    }
}

fn parse_event_names(value: &Value) -> Result<Vec<String>, TransportError> {
    let unexpected = |detail: String| TransportError::UnexpectedPayload {
        resource: EVENT_NAMES_RESOURCE.to_string(),
        detail,
    };
    let items = value
        .as_array()
        .ok_or_else(|| unexpected(format!("expected a JSON array, got {}", json_kind(value))))?;
    items
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| unexpected(format!("expected event names to be strings, got {}", json_kind(v))))
        })
        .collect()
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
