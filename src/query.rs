//! Export query construction: day window → date tokens, event list → `event` parameter.

use crate::date::{date_token, DayWindow};
use crate::signer::QueryParams;
use serde_json::Value;
use time::Date;

pub const EXPORT_RESOURCE: &str = "/export";
pub const EVENT_NAMES_RESOURCE: &str = "/events/names";

pub const FROM_DATE_PARAM: &str = "from_date";
pub const TO_DATE_PARAM: &str = "to_date";
/// Singular even when several events are listed.
pub const EVENT_FILTER_PARAM: &str = "event";

/// Unsigned export request.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportRequest {
    pub resource: &'static str,
    pub params: QueryParams,
    /// Span used by the expiry policy.
    pub window_days: u32,
}

/// Build the `/export` request for `window` as seen from `today`.
///
/// The API has no sub-day granularity and never serves the current day, so
/// `to_days_ago = 0` simply means "up to the latest available data".
/// A non-empty `event_filter` is sent as a JSON array string.
pub fn build_export_request(window: DayWindow, event_filter: Option<&[String]>, today: Date) -> ExportRequest {
    let (from, to) = window.dates(today);
    let mut params = QueryParams::new()
        .with(FROM_DATE_PARAM, date_token(from))
        .with(TO_DATE_PARAM, date_token(to));

    if let Some(events) = event_filter.filter(|e| !e.is_empty()) {
        params.insert(EVENT_FILTER_PARAM, event_filter_json(events));
    }

    ExportRequest { resource: EXPORT_RESOURCE, params, window_days: window.span_days() }
}

/// `["A","B"]`: compact JSON array of event names.
pub fn event_filter_json(events: &[String]) -> String {
    Value::from(events.to_vec()).to_string()
}

/// Catalog request: `type=general` asks for every name ever recorded, not just recent ones.
pub fn event_names_params() -> QueryParams {
    QueryParams::new().with("type", "general")
}
