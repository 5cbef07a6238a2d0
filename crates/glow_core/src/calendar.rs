use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::date::DayKey;
use crate::error::GlowError;

/// Column headers for a Sunday-first week grid.
pub const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// A calendar month, stored as its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth(NaiveDate);

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, GlowError> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Self)
            .ok_or(GlowError::InvalidMonth { year, month })
    }

    pub fn containing(day: DayKey) -> Self {
        let date = day.date();
        Self(date - chrono::Duration::days(i64::from(date.day0())))
    }

    pub fn current() -> Self {
        Self::containing(DayKey::today())
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    pub fn days_in_month(self) -> u32 {
        match self.next() {
            Some(next) => (next.0 - self.0).num_days() as u32,
            // December of chrono's last representable year.
            None => 31,
        }
    }

    /// Weekday of the 1st, Sunday = 0.
    pub fn first_weekday(self) -> u32 {
        self.0.weekday().num_days_from_sunday()
    }

    pub fn next(self) -> Option<Self> {
        self.0.checked_add_months(Months::new(1)).map(Self)
    }

    pub fn prev(self) -> Option<Self> {
        self.0.checked_sub_months(Months::new(1)).map(Self)
    }

    pub fn day(self, day: u32) -> Option<DayKey> {
        NaiveDate::from_ymd_opt(self.year(), self.month(), day).map(DayKey::from)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}

impl FromStr for YearMonth {
    type Err = chrono::ParseError;

    /// Parses `YYYY-MM`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d").map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarCell {
    pub day: u32,
    pub date: DayKey,
    pub is_completed: bool,
    pub is_today: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarMonth {
    pub month: YearMonth,
    /// Leading `None`s pad the first week; no trailing padding.
    pub cells: Vec<Option<CalendarCell>>,
}

impl CalendarMonth {
    pub fn completed_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| cell.is_completed)
            .count()
    }

    /// Cells chunked into 7-column rows.
    pub fn weeks(&self) -> impl Iterator<Item = &[Option<CalendarCell>]> {
        self.cells.chunks(WEEKDAY_LABELS.len())
    }
}

pub fn build_month(month: YearMonth, completed: &HashSet<DayKey>, today: DayKey) -> CalendarMonth {
    let padding = month.first_weekday() as usize;
    let total = month.days_in_month();
    let mut cells: Vec<Option<CalendarCell>> = Vec::with_capacity(padding + total as usize);
    cells.extend(std::iter::repeat(None).take(padding));

    for day in 1..=total {
        let Some(date) = month.day(day) else {
            continue;
        };
        cells.push(Some(CalendarCell {
            day,
            date,
            is_completed: completed.contains(&date),
            is_today: date == today,
        }));
    }

    CalendarMonth { month, cells }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> DayKey {
        DayKey::from_ymd(y, m, d).unwrap()
    }

    #[test]
    fn thirty_day_month_starting_wednesday_has_three_blanks() {
        let month = YearMonth::new(2023, 11).unwrap();
        assert_eq!(month.first_weekday(), 3);
        let grid = build_month(month, &HashSet::new(), day(2023, 11, 15));

        assert_eq!(grid.cells.len(), 33);
        assert!(grid.cells[..3].iter().all(Option::is_none));
        let days: Vec<u32> = grid.cells[3..]
            .iter()
            .map(|cell| cell.expect("day cell").day)
            .collect();
        assert_eq!(days, (1..=30).collect::<Vec<_>>());
    }

    #[test]
    fn cells_flag_completion_and_today() {
        let completed: HashSet<DayKey> = [day(2024, 5, 1), day(2024, 5, 3), day(2024, 4, 30)]
            .into_iter()
            .collect();
        let grid = build_month(YearMonth::new(2024, 5).unwrap(), &completed, day(2024, 5, 3));
        let cells: Vec<CalendarCell> = grid.cells.iter().flatten().copied().collect();

        assert_eq!(cells.len(), 31);
        assert!(cells[0].is_completed && !cells[0].is_today);
        assert!(!cells[1].is_completed);
        assert!(cells[2].is_completed && cells[2].is_today);
        assert_eq!(grid.completed_count(), 2);
    }

    #[test]
    fn month_starting_sunday_has_no_padding() {
        let grid = build_month(YearMonth::new(2024, 9).unwrap(), &HashSet::new(), day(2024, 1, 1));
        assert!(grid.cells[0].is_some());
        assert_eq!(grid.weeks().count(), 5);
    }

    #[test]
    fn leap_february_and_navigation() {
        let feb = YearMonth::new(2024, 2).unwrap();
        assert_eq!(feb.days_in_month(), 29);
        assert_eq!(YearMonth::new(2023, 2).unwrap().days_in_month(), 28);
        assert_eq!(YearMonth::new(1900, 2).unwrap().days_in_month(), 28);
        assert_eq!(YearMonth::new(2000, 2).unwrap().days_in_month(), 29);
        assert_eq!(YearMonth::new(2024, 12).unwrap().days_in_month(), 31);
        assert_eq!(YearMonth::new(2024, 4).unwrap().days_in_month(), 30);
        assert_eq!(feb.prev(), YearMonth::new(2024, 1).ok());
        assert_eq!(
            YearMonth::new(2024, 12).unwrap().next(),
            YearMonth::new(2025, 1).ok()
        );
        assert_eq!(YearMonth::containing(day(2024, 2, 17)), feb);
    }

    #[test]
    fn parses_and_displays_year_month() {
        let parsed: YearMonth = "2024-05".parse().unwrap();
        assert_eq!(parsed, YearMonth::new(2024, 5).unwrap());
        assert_eq!(parsed.to_string(), "2024-05");
        assert!("2024-13".parse::<YearMonth>().is_err());
        assert!(matches!(
            YearMonth::new(2024, 0),
            Err(GlowError::InvalidMonth { month: 0, .. })
        ));
    }
}
