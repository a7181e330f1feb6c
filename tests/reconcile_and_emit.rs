#[path = "common/mod.rs"]
mod common;

use common::*;
use evexport::{
    emit, reconcile, render_cell, render_value, EventRecord, HeaderSet, LocalZone, Reconciled, WriteError,
};
use serde_json::json;
use std::fs;
use time::macros::offset;
use time::UtcOffset;

fn records_of(r: Reconciled) -> (Vec<EventRecord>, HeaderSet) {
    match r {
        Reconciled::Records { records, header } => (records, header),
        Reconciled::Empty => panic!("expected records"),
    }
}

/// Header is the union of property keys in first-appearance order across records.
#[test]
fn header_is_ordered_union_of_keys() {
    let body = ndjson_body(&[
        json!({"event": "Login", "properties": {"b": 1, "a": 2}}),
        json!({"event": "Login", "properties": {"c": 3, "a": 4}}),
        json!({"event": "Login", "properties": {"d": null, "b": 5, "A": 6}}),
    ]);
    let (records, header) = records_of(reconcile(Some(&body)).unwrap());
    assert_eq!(records.len(), 3);
    // in-record order is preserved, keys are case-sensitive
    assert_eq!(header.keys(), ["b", "a", "c", "d", "A"]);
    assert!(header.contains("A"));
    assert!(!header.contains("e"));
}

#[test]
fn record_without_properties_still_counts() {
    let body = "{\"event\":\"Ping\",\"properties\":{}}\n{\"event\":\"Ping\"}\n{\"event\":\"Ping\",\"properties\":{\"x\":1}}";
    let (records, header) = records_of(reconcile(Some(body)).unwrap());
    assert_eq!(records.len(), 3);
    assert_eq!(header.keys(), ["x"]);
    assert!(records[0].properties.is_empty());
    assert!(records[1].properties.is_empty());
}

#[test]
fn empty_bodies_reconcile_to_empty() {
    assert_eq!(reconcile(None).unwrap(), Reconciled::Empty);
    assert_eq!(reconcile(Some("")).unwrap(), Reconciled::Empty);
    assert_eq!(reconcile(Some("\n\n")).unwrap(), Reconciled::Empty);
}

#[test]
fn crlf_and_trailing_newlines_are_tolerated() {
    let body = "{\"event\":\"E\",\"properties\":{\"a\":1}}\r\n{\"event\":\"E\",\"properties\":{\"b\":2}}\r\n\r\n";
    let (records, header) = records_of(reconcile(Some(body)).unwrap());
    assert_eq!(records.len(), 2);
    assert_eq!(header.keys(), ["a", "b"]);
}

/// One bad line fails the whole body and names the line.
#[test]
fn malformed_line_fails_whole_body() {
    let body = "{\"event\":\"E\",\"properties\":{}}\n{\"event\":\"E\",\"prop\n{\"event\":\"E\",\"properties\":{}}\n";
    let err = reconcile(Some(body)).unwrap_err();
    assert_eq!(err.line, 2);

    // an empty line in the middle is malformed too
    let gap = "{\"event\":\"E\"}\n\n{\"event\":\"E\"}";
    assert_eq!(reconcile(Some(gap)).unwrap_err().line, 2);

    // the body is not one JSON document
    let array = "[{\"event\":\"E\"}]";
    assert_eq!(reconcile(Some(array)).unwrap_err().line, 1);
}

#[test]
fn plain_values_render_without_formatting() {
    assert_eq!(render_value(&json!(null)), "");
    assert_eq!(render_value(&json!(true)), "true");
    assert_eq!(render_value(&json!(false)), "false");
    assert_eq!(render_value(&json!(1234567)), "1234567");
    assert_eq!(render_value(&json!(2.5)), "2.5");
    assert_eq!(render_value(&json!("Paris, FR")), "Paris, FR");
    assert_eq!(render_value(&json!(["a", 1])), r#"["a",1]"#);
}

/// `time = 1609459200` (2021-01-01T00:00:00Z) renders as local wall-clock time.
#[test]
fn time_field_renders_in_local_offset() {
    let v = json!(1609459200);
    assert_eq!(render_cell("time", &v, &UtcOffset::UTC), "2021-01-01 00:00:00");
    assert_eq!(render_cell("time", &v, &offset!(+5:30)), "2021-01-01 05:30:00");
    assert_eq!(render_cell("time", &v, &offset!(-8)), "2020-12-31 16:00:00");

    // fractional and string epochs are truncated to whole seconds
    assert_eq!(render_cell("time", &json!(1609459200.9), &UtcOffset::UTC), "2021-01-01 00:00:00");
    assert_eq!(render_cell("time", &json!("1609459200"), &UtcOffset::UTC), "2021-01-01 00:00:00");

    // other keys keep the raw number; a non-numeric time falls back to plain text
    assert_eq!(render_cell("mp_time", &v, &UtcOffset::UTC), "1609459200");
    assert_eq!(render_cell("time", &json!("soon"), &UtcOffset::UTC), "soon");
    assert_eq!(render_cell("time", &json!(null), &UtcOffset::UTC), "");
}

/// US Eastern around 2021: EDT from 2021-03-14 07:00Z to 2021-11-07 06:00Z, EST otherwise.
struct Eastern2021;

impl LocalZone for Eastern2021 {
    fn offset_at(&self, epoch_seconds: i64) -> UtcOffset {
        if (1_615_705_200..1_636_264_800).contains(&epoch_seconds) {
            offset!(-4)
        } else {
            offset!(-5)
        }
    }
}

/// Each instant uses the offset of its own DST period, not the one in force when the run started.
#[test]
fn time_field_follows_dst_of_each_instant() {
    let zone = Eastern2021;
    // winter instant, summer instant, and either side of the spring-forward edge
    assert_eq!(render_cell("time", &json!(1609459200), &zone), "2020-12-31 19:00:00");
    assert_eq!(render_cell("time", &json!(1625097600), &zone), "2021-06-30 20:00:00");
    assert_eq!(render_cell("time", &json!(1615705199), &zone), "2021-03-14 01:59:59");
    assert_eq!(render_cell("time", &json!(1615705200), &zone), "2021-03-14 03:00:00");

    let (_, root) = temp_config();
    let body = ndjson_body(&[
        json!({"event": "Login", "properties": {"time": 1609459200}}),
        json!({"event": "Login", "properties": {"time": 1625097600}}),
    ]);
    let (records, header) = records_of(reconcile(Some(&body)).unwrap());
    let dest = root.join("Login.2023-11-14.csv");
    emit("Login", &records, &header, &dest, &zone).unwrap();
    assert_eq!(
        read_csv(&dest),
        vec![
            vec!["event", "time"],
            vec!["Login", "2020-12-31 19:00:00"],
            vec!["Login", "2021-06-30 20:00:00"],
        ]
    );
}

/// N lines in → N records → N+1 CSV rows, each with 1 + |header| cells.
#[test]
fn emit_writes_one_row_per_record() {
    let (_, root) = temp_config();
    let body = ndjson_body(&[
        json!({"event": "Login", "properties": {"a": "x", "b": true}}),
        json!({"event": "Login", "properties": {"b": false, "c": 3.25}}),
        json!({"event": "Login", "properties": {"a": "with,comma", "time": 1609459200}}),
        json!({"event": "Login", "properties": {}}),
    ]);
    let (records, header) = records_of(reconcile(Some(&body)).unwrap());
    let dest = root.join("2023-11-14").join("Login.2023-11-14.csv");

    let rows = emit("Login", &records, &header, &dest, &UtcOffset::UTC).unwrap();
    assert_eq!(rows, 4);

    let csv = read_csv(&dest);
    assert_eq!(csv.len(), 5);
    assert_eq!(csv[0], ["event", "a", "b", "c", "time"]);
    for row in &csv {
        assert_eq!(row.len(), 1 + header.len());
    }
    assert_eq!(csv[1], ["Login", "x", "true", "", ""]);
    assert_eq!(csv[2], ["Login", "", "false", "3.25", ""]);
    assert_eq!(csv[3], ["Login", "with,comma", "", "", "2021-01-01 00:00:00"]);
    assert_eq!(csv[4], ["Login", "", "", "", ""]);

    // no temp file left behind
    let leftovers: Vec<_> = fs::read_dir(dest.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temp files left: {leftovers:?}");
}

#[test]
fn emit_overwrites_existing_file() {
    let (_, root) = temp_config();
    let dest = root.join("Login.2023-11-14.csv");
    fs::write(&dest, "stale,contents\nfrom,earlier\nrun,here\n").unwrap();

    let body = ndjson_body(&[json!({"event": "Login", "properties": {"a": 1}})]);
    let (records, header) = records_of(reconcile(Some(&body)).unwrap());
    emit("Login", &records, &header, &dest, &UtcOffset::UTC).unwrap();

    assert_eq!(read_csv(&dest), vec![vec!["event", "a"], vec!["Login", "1"]]);
}

/// When the destination cannot be written, nothing is produced.
#[test]
fn emit_failure_leaves_no_file() {
    let (_, root) = temp_config();
    // a regular file where the run directory should be
    let blocker = root.join("2023-11-14");
    fs::write(&blocker, "not a directory").unwrap();
    let dest = blocker.join("Login.2023-11-14.csv");

    let body = ndjson_body(&[json!({"event": "Login", "properties": {"a": 1}})]);
    let (records, header) = records_of(reconcile(Some(&body)).unwrap());
    let err = emit("Login", &records, &header, &dest, &UtcOffset::UTC).unwrap_err();

    assert!(matches!(err, WriteError::Io { .. }));
    assert!(!dest.exists());
    assert_eq!(fs::read_to_string(&blocker).unwrap(), "not a directory");
}
