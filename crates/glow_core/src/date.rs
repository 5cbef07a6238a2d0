use std::fmt;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A civil calendar day with no time component. Check-ins that happen on the
/// same local day share a key regardless of hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Day of `instant` in the local calendar of this machine.
    pub fn of(instant: DateTime<Utc>) -> Self {
        Self::in_zone(instant, &Local)
    }

    pub fn in_zone<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> Self {
        Self(instant.with_timezone(tz).date_naive())
    }

    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    pub fn pred(self) -> Option<Self> {
        self.0.pred_opt().map(Self)
    }

    pub fn succ(self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    pub fn day(self) -> u32 {
        self.0.day()
    }
}

impl From<NaiveDate> for DayKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Offset-less date-time layouts, read as wall-clock time.
const LOCAL_LAYOUTS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses a stored instant. Accepts RFC 3339 (`2024-05-01T08:30:00.000Z`),
/// offset-less date-times read in the local zone, and bare `YYYY-MM-DD`
/// dates read as UTC midnight.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    parse_instant_in(raw, &Local)
}

/// Like [`parse_instant`], reading offset-less date-times in `tz`.
pub fn parse_instant_in<Tz: TimeZone>(
    raw: &str,
    tz: &Tz,
) -> Result<DateTime<Utc>, chrono::ParseError> {
    let raw = raw.trim();
    let rfc3339_err = match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => return Ok(parsed.with_timezone(&Utc)),
        Err(err) => err,
    };
    for layout in LOCAL_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, layout) {
            return Ok(wall_clock_to_utc(naive, tz));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    }
    Err(rfc3339_err)
}

fn wall_clock_to_utc<Tz: TimeZone>(naive: NaiveDateTime, tz: &Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // Skipped by a DST jump; keep the wall-clock reading as UTC.
        None => Utc.from_utc_datetime(&naive),
    }
}
