use crate::date::date_token;
use ahash::AHashSet;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use time::Date;

pub const EXPORT_EXTENSION: &str = "csv";

fn illegal_filename_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[/\\:*?"<>|\x00-\x1f]"#).expect("static pattern"))
}

/// `Survey Completed` → `SurveyCompleted`, `app_OPENED` → `AppOpened`.
///
/// A leading lowercase run gets its first letter uppercased; every `_` is
/// dropped and the word after it capitalized (first letter upper, rest lower).
/// Spaces are then removed without changing case, so `sign up` becomes
/// `Signup`. Characters that cannot appear in file names are removed.
pub fn sanitize_event_name(name: &str) -> String {
    let lead = name
        .find(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .unwrap_or(name.len());
    let mut camel = capitalize(&name[..lead]);
    let mut rest = &name[lead..];
    while let Some(pos) = rest.find('_') {
        camel.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let word_end = after.find(|c: char| !c.is_ascii_alphanumeric()).unwrap_or(after.len());
        camel.push_str(&capitalize(&after[..word_end]));
        rest = &after[word_end..];
    }
    camel.push_str(rest);
    camel.retain(|c| c != ' ');

    let cleaned = illegal_filename_chars().replace_all(&camel, "");
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() { "event".to_string() } else { cleaned.to_string() }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Directory a run writes into: `<root>/<YYYY-MM-DD>` or `<root>` itself.
pub fn run_directory(output_root: &Path, run_date: Date, subfolders_by_date: bool) -> PathBuf {
    if subfolders_by_date {
        output_root.join(date_token(run_date))
    } else {
        output_root.to_path_buf()
    }
}

/// `<SanitizedEvent>.<YYYY-MM-DD>.csv`
pub fn export_file_name(event: &str, run_date: Date) -> String {
    format!("{}.{}.{}", sanitize_event_name(event), date_token(run_date), EXPORT_EXTENSION)
}

pub fn export_file_path(output_root: &Path, run_date: Date, event: &str, subfolders_by_date: bool) -> PathBuf {
    run_directory(output_root, run_date, subfolders_by_date).join(export_file_name(event, run_date))
}

/// Destination of every event of a run, in the same order as `events`.
///
/// Distinct events whose sanitized names coincide (compared case-insensitively,
/// as on case-folding file systems) get `-2`, `-3`, ... appended to the stem of
/// the later ones, so no two events share a file.
pub fn plan_export_paths(
    output_root: &Path,
    run_date: Date,
    events: &[String],
    subfolders_by_date: bool,
) -> Vec<PathBuf> {
    let dir = run_directory(output_root, run_date, subfolders_by_date);
    let mut taken = AHashSet::with_capacity(events.len());
    events
        .iter()
        .map(|event| {
            let stem = sanitize_event_name(event);
            let mut name = stem.clone();
            let mut n = 1u32;
            while !taken.insert(name.to_lowercase()) {
                n += 1;
                name = format!("{stem}-{n}");
            }
            dir.join(format!("{name}.{}.{EXPORT_EXTENSION}", date_token(run_date)))
        })
        .collect()
}

/// `<root>/logs/export.<YYYY-MM-DD>.log`
pub fn log_file_path(output_root: &Path, run_date: Date) -> PathBuf {
    output_root.join("logs").join(format!("export.{}.log", date_token(run_date)))
}

/// Hidden sibling that a file is written to before being moved into place.
pub fn temp_path_for(dest: &Path) -> PathBuf {
    let name = dest.file_name().and_then(|n| n.to_str()).unwrap_or("export");
    dest.with_file_name(format!(".{name}.tmp"))
}
