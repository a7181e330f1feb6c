use crate::error::ParseError;
use crate::record::EventRecord;

/// Lines of an export body, numbered from 1, with any trailing `\r` removed.
///
/// The body is one JSON object per `\n`-terminated line and is not itself a JSON
/// document. Empty segments left by trailing newlines are dropped; empty lines in
/// the middle are yielded so the parser can reject them.
pub fn body_lines(body: &str) -> impl Iterator<Item = (usize, &str)> {
    let trimmed = body.trim_end_matches(&['\n', '\r'][..]);
    let segments = if trimmed.is_empty() { None } else { Some(trimmed.split('\n')) };
    segments
        .into_iter()
        .flatten()
        .enumerate()
        .map(|(i, line)| (i + 1, line.strip_suffix('\r').unwrap_or(line)))
}

/// Parse every line of `body` into an [`EventRecord`].
/// Any malformed line fails the whole body; nothing is skipped.
pub fn parse_records(body: &str) -> Result<Vec<EventRecord>, ParseError> {
    body_lines(body)
        .map(|(line, text)| serde_json::from_str::<EventRecord>(text).map_err(|source| ParseError { line, source }))
        .collect()
}
