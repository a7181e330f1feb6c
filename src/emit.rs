//! CSV emission for one event: header union, per-record rows, atomic placement.

use crate::date::{local_timestamp, LocalZone};
use crate::error::WriteError;
use crate::paths::temp_path_for;
use crate::reconcile::HeaderSet;
use crate::record::EventRecord;
use crate::util::{create_with_backoff, remove_with_backoff, replace_file_atomic_backoff};
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::Path;

/// First column of every export file.
pub const EVENT_COLUMN: &str = "event";
/// Property holding the occurrence's Unix timestamp.
pub const TIME_FIELD: &str = "time";

/// Plain string form: strings verbatim, numbers unformatted, `true`/`false`,
/// null as empty. Nested arrays/objects fall back to compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Cell text for `key`. The time field becomes a `YYYY-MM-DD HH:MM:SS` in `zone`
/// when it holds an epoch value; anything else renders as [`render_value`].
pub fn render_cell<Z: LocalZone + ?Sized>(key: &str, value: &Value, zone: &Z) -> String {
    if key == TIME_FIELD {
        if let Some(ts) = epoch_seconds(value).and_then(|secs| local_timestamp(secs, zone)) {
            return ts;
        }
    }
    render_value(value)
}

/// Epoch seconds from a number (fractions truncated) or a numeric string.
fn epoch_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|x| x.is_finite()).map(|x| x.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|x| x.is_finite()).map(|x| x.trunc() as i64))
        }
        _ => None,
    }
}

/// Write header and rows to `out`. Returns the number of data rows.
pub fn write_rows<W: Write, Z: LocalZone + ?Sized>(
    out: &mut csv::Writer<W>,
    records: &[EventRecord],
    header: &HeaderSet,
    zone: &Z,
) -> csv::Result<u64> {
    let mut row: Vec<String> = Vec::with_capacity(header.len() + 1);
    row.push(EVENT_COLUMN.to_string());
    row.extend(header.keys().iter().cloned());
    out.write_record(&row)?;

    let mut written = 0u64;
    for record in records {
        row.clear();
        row.push(record.event.clone());
        for key in header.keys() {
            row.push(match record.property(key) {
                Some(v) => render_cell(key, v, zone),
                None => String::new(),
            });
        }
        out.write_record(&row)?;
        written += 1;
    }
    out.flush()?;
    Ok(written)
}

/// Write `records` for `event_name` to `dest` as CSV.
///
/// Rows go to a hidden temp file next to `dest`, which replaces `dest` only once
/// every row is flushed. On failure the temp file is removed and `dest` is untouched.
pub fn emit<Z: LocalZone + ?Sized>(
    event_name: &str,
    records: &[EventRecord],
    header: &HeaderSet,
    dest: &Path,
    zone: &Z,
) -> Result<u64, WriteError> {
    if let Some(dir) = dest.parent() {
        fs::create_dir_all(dir).map_err(|e| WriteError::io(dir, e))?;
    }
    let tmp = temp_path_for(dest);
    tracing::info!(event = %event_name, path = %dest.display(), "writing CSV file");

    let result = write_temp(&tmp, records, header, zone)
        .and_then(|rows| replace_file_atomic_backoff(&tmp, dest).map(|_| rows).map_err(|e| WriteError::io(dest, e)));

    if result.is_err() {
        if let Err(e) = remove_with_backoff(&tmp, 4, 25) {
            tracing::warn!(path = %tmp.display(), error = %e, "could not remove temporary export file");
        }
    }
    result
}

fn write_temp<Z: LocalZone + ?Sized>(
    tmp: &Path,
    records: &[EventRecord],
    header: &HeaderSet,
    zone: &Z,
) -> Result<u64, WriteError> {
    let file = create_with_backoff(tmp, 16, 50).map_err(|e| WriteError::io(tmp, e))?;
    let mut out = csv::Writer::from_writer(file);
    let rows = write_rows(&mut out, records, header, zone)
        .map_err(|source| WriteError::Csv { path: tmp.to_path_buf(), source })?;
    let file = out.into_inner().map_err(|e| WriteError::io(tmp, e.into_error()))?;
    file.sync_all().map_err(|e| WriteError::io(tmp, e))?;
    Ok(rows)
}
