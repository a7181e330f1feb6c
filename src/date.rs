use chrono::TimeZone;
use std::fmt;
use time::{Date, Duration, OffsetDateTime, UtcOffset};

/// Inclusive export window expressed as whole days before "today".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DayWindow {
    pub from_days_ago: u32,
    pub to_days_ago: u32,
}

impl DayWindow {
    pub fn new(from_days_ago: u32, to_days_ago: u32) -> Self {
        Self { from_days_ago, to_days_ago }
    }

    /// `from - to`, saturating at zero. A single-day window spans zero days.
    pub fn span_days(self) -> u32 {
        self.from_days_ago.saturating_sub(self.to_days_ago)
    }

    /// `(from_date, to_date)` relative to `today`.
    pub fn dates(self, today: Date) -> (Date, Date) {
        (days_ago(today, self.from_days_ago), days_ago(today, self.to_days_ago))
    }
}

impl Default for DayWindow {
    fn default() -> Self {
        Self { from_days_ago: 1, to_days_ago: 0 }
    }
}

impl fmt::Display for DayWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{} days ago", self.from_days_ago, self.to_days_ago)
    }
}

pub fn days_ago(today: Date, days: u32) -> Date {
    today.checked_sub(Duration::days(i64::from(days))).unwrap_or(Date::MIN)
}

/// `YYYY-MM-DD`.
pub fn date_token(date: Date) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day())
}

/// Render Unix epoch seconds as `YYYY-MM-DD HH:MM:SS` wall-clock time in `zone`,
/// using the offset in force at that instant.
/// Returns `None` when the instant is outside the representable range.
pub fn local_timestamp<Z: LocalZone + ?Sized>(epoch_seconds: i64, zone: &Z) -> Option<String> {
    let offset = zone.offset_at(epoch_seconds);
    // Shift the instant by the offset and read the UTC fields: no offset arithmetic can overflow.
    let shifted = epoch_seconds.checked_add(i64::from(offset.whole_seconds()))?;
    let dt = OffsetDateTime::from_unix_timestamp(shifted).ok()?;
    Some(format!(
        "{} {:02}:{:02}:{:02}",
        date_token(dt.date()),
        dt.hour(),
        dt.minute(),
        dt.second()
    ))
}

/// Maps an instant to the UTC offset a time zone uses at that instant.
pub trait LocalZone: Send + Sync {
    fn offset_at(&self, epoch_seconds: i64) -> UtcOffset;
}

/// A zone without transitions.
impl LocalZone for UtcOffset {
    fn offset_at(&self, _epoch_seconds: i64) -> UtcOffset {
        *self
    }
}

/// Source of "now" and of the zone stored instants are rendered in.
pub trait Clock: LocalZone {
    fn now(&self) -> OffsetDateTime;

    fn today(&self) -> Date {
        self.now().date()
    }
}

/// Wall clock in the process time zone (`TZ`, else the system zone).
///
/// Offsets are resolved per instant, so timestamps on the far side of a
/// daylight-saving change get that period's offset.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl LocalZone for SystemClock {
    fn offset_at(&self, epoch_seconds: i64) -> UtcOffset {
        let seconds = chrono::Local
            .timestamp_opt(epoch_seconds, 0)
            .single()
            .map(|dt| dt.offset().local_minus_utc())
            .unwrap_or(0);
        UtcOffset::from_whole_seconds(seconds).unwrap_or(UtcOffset::UTC)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        let utc = OffsetDateTime::now_utc();
        utc.to_offset(self.offset_at(utc.unix_timestamp()))
    }
}
