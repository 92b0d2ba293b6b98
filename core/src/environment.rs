//! Injected dependencies: time, confirmation codes and the site calendar.

use crate::confirmation::ConfirmationCode;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, TimeZone, Utc};

/// Clock trait - abstracts time operations for testability
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Source of confirmation codes.
pub trait CodeGenerator: Send + Sync {
    /// A fresh, probably unused code.
    fn next_code(&self) -> ConfirmationCode;
}

/// Codes derived from random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidCodeGenerator;

impl CodeGenerator for UuidCodeGenerator {
    fn next_code(&self) -> ConfirmationCode {
        ConfirmationCode::random()
    }
}

/// The operator's local calendar, used for "today" and dashboard windows.
#[derive(Debug, Clone, Copy)]
pub struct SiteCalendar {
    offset: FixedOffset,
}

impl SiteCalendar {
    /// Calendar at a fixed offset from UTC; `None` if the offset is out of range.
    #[must_use]
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(|offset| Self { offset })
    }

    /// Calendar in UTC.
    #[must_use]
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// The local date at instant `now`.
    #[must_use]
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    /// Local midnight of `date`, as UTC.
    #[must_use]
    pub fn day_start(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(chrono::NaiveTime::MIN);
        // A fixed offset has exactly one mapping for every local time.
        self.offset
            .from_local_datetime(&midnight)
            .single()
            .map_or_else(|| midnight.and_utc(), |local| local.with_timezone(&Utc))
    }

    /// Start instants of the dashboard windows around `now`.
    #[must_use]
    pub fn window(&self, now: DateTime<Utc>) -> StatsWindow {
        let today_start = self.day_start(self.today(now));
        StatsWindow {
            today_start,
            week_start: now - Duration::days(7),
            month_start: now - Duration::days(30),
        }
    }
}

impl Default for SiteCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

/// Lower bounds of the dashboard counting windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsWindow {
    /// Local midnight today
    pub today_start: DateTime<Utc>,
    /// Seven days ago
    pub week_start: DateTime<Utc>,
    /// Thirty days ago
    pub month_start: DateTime<Utc>,
}
