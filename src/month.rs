// 📅 Month Anchor - Year-month values and half-open month windows
//
// A forecast always starts on the first day of a month and covers
// FORECAST_WINDOW consecutive months. MonthAnchor is that first day,
// kept as (year, month) so it can never point at any other day.

use crate::error::{ForecastError, ForecastResult};
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of months in every forecast
pub const FORECAST_WINDOW: usize = 12;

/// Highest day-of-month any calendar rule may resolve to (valid in every month)
pub const DAY_CAP: u32 = 28;

/// Supported year range for anchors
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 9998;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthAnchor {
    year: i32,
    month: u32,
}

impl MonthAnchor {
    /// Create an anchor for a calendar month (1 = January)
    pub fn new(year: i32, month: u32) -> ForecastResult<Self> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(ForecastError::YearOutOfRange {
                year,
                min: MIN_YEAR,
                max: MAX_YEAR,
            });
        }
        if !(1..=12).contains(&month) {
            return Err(ForecastError::InvalidMonth(format!("{:04}-{:02}", year, month)));
        }
        Ok(MonthAnchor { year, month })
    }

    /// Anchor for the month containing `date` (normalizes to the first day)
    pub fn from_date(date: NaiveDate) -> ForecastResult<Self> {
        MonthAnchor::new(date.year(), date.month())
    }

    /// Anchor for the current local month
    pub fn current() -> Self {
        let today = Local::now().date_naive();
        MonthAnchor {
            year: today.year().clamp(MIN_YEAR, MAX_YEAR),
            month: today.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Month of year, 1 = January
    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of this month
    pub fn first_day(&self) -> NaiveDate {
        self.day(1)
    }

    /// A day inside this month; days above DAY_CAP are pulled back to it
    pub fn day(&self, day: u32) -> NaiveDate {
        let day = day.clamp(1, DAY_CAP);
        // year is bounded at construction and day <= 28, so the date always exists
        NaiveDate::from_ymd_opt(self.year, self.month, day)
            .expect("month anchor resolves to a valid date")
    }

    /// The anchor `months` months later
    pub fn offset(&self, months: u16) -> MonthAnchor {
        let index = self.year * 12 + (self.month as i32 - 1) + months as i32;
        MonthAnchor {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn next(&self) -> MonthAnchor {
        self.offset(1)
    }

    /// The anchor one month earlier (saturates at MIN_YEAR January)
    pub fn previous(&self) -> MonthAnchor {
        if self.month == 1 {
            if self.year <= MIN_YEAR {
                return *self;
            }
            MonthAnchor { year: self.year - 1, month: 12 }
        } else {
            MonthAnchor { year: self.year, month: self.month - 1 }
        }
    }

    /// Half-open date window `[first day, first day of next month)`
    pub fn window(&self) -> (NaiveDate, NaiveDate) {
        (self.first_day(), self.next().first_day())
    }

    /// Check if a date falls inside this month's window
    pub fn contains(&self, date: NaiveDate) -> bool {
        let (start, end) = self.window();
        date >= start && date < end
    }

    /// The FORECAST_WINDOW consecutive months starting at this anchor
    pub fn forecast_months(&self) -> Vec<MonthAnchor> {
        (0..FORECAST_WINDOW as u16).map(|i| self.offset(i)).collect()
    }

    /// Sortable key, e.g. "2026-03"
    pub fn key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    /// Short display label, e.g. "Mar 2026"
    pub fn label(&self) -> String {
        self.first_day().format("%b %Y").to_string()
    }

    /// Long display label, e.g. "March 2026"
    pub fn long_label(&self) -> String {
        self.first_day().format("%B %Y").to_string()
    }
}

impl fmt::Display for MonthAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthAnchor {
    type Err = ForecastError;

    /// Accepts "YYYY-MM" or a full "YYYY-MM-DD" date (any day of the month)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let date = match trimmed.len() {
            7 => NaiveDate::parse_from_str(&format!("{}-01", trimmed), "%Y-%m-%d"),
            10 => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"),
            _ => return Err(ForecastError::InvalidMonth(s.to_string())),
        }
        .map_err(|_| ForecastError::InvalidMonth(s.to_string()))?;

        MonthAnchor::from_date(date)
    }
}

impl TryFrom<String> for MonthAnchor {
    type Error = ForecastError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MonthAnchor> for String {
    fn from(anchor: MonthAnchor) -> Self {
        anchor.to_string()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(s: &str) -> MonthAnchor {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_year_month() {
        let m = anchor("2026-03");
        assert_eq!(m.year(), 2026);
        assert_eq!(m.month(), 3);
        assert_eq!(m.first_day(), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    }

    #[test]
    fn test_parse_full_date_normalizes() {
        assert_eq!(anchor("2026-03-17"), anchor("2026-03"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("2026".parse::<MonthAnchor>().is_err());
        assert!("2026-13".parse::<MonthAnchor>().is_err());
        assert!("march".parse::<MonthAnchor>().is_err());
        assert!(matches!(
            "0500-01".parse::<MonthAnchor>(),
            Err(ForecastError::YearOutOfRange { year: 500, .. })
        ));
    }

    #[test]
    fn test_offset_crosses_year() {
        let m = anchor("2026-11");
        assert_eq!(m.offset(1), anchor("2026-12"));
        assert_eq!(m.offset(2), anchor("2027-01"));
        assert_eq!(m.offset(11), anchor("2027-10"));
    }

    #[test]
    fn test_previous() {
        assert_eq!(anchor("2027-01").previous(), anchor("2026-12"));
        assert_eq!(anchor("2026-05").previous(), anchor("2026-04"));
    }

    #[test]
    fn test_window_is_half_open() {
        let feb = anchor("2028-02");
        assert!(feb.contains(NaiveDate::from_ymd_opt(2028, 2, 1).unwrap()));
        assert!(feb.contains(NaiveDate::from_ymd_opt(2028, 2, 29).unwrap()));
        assert!(!feb.contains(NaiveDate::from_ymd_opt(2028, 3, 1).unwrap()));
        assert!(!feb.contains(NaiveDate::from_ymd_opt(2028, 1, 31).unwrap()));
    }

    #[test]
    fn test_day_is_capped() {
        let oct = anchor("2026-10");
        assert_eq!(oct.day(31), NaiveDate::from_ymd_opt(2026, 10, 28).unwrap());
    }

    #[test]
    fn test_forecast_months() {
        let months = anchor("2026-06").forecast_months();
        assert_eq!(months.len(), FORECAST_WINDOW);
        assert_eq!(months[0], anchor("2026-06"));
        assert_eq!(months[11], anchor("2027-05"));
        for pair in months.windows(2) {
            assert_eq!(pair[0].next(), pair[1]);
        }
    }

    #[test]
    fn test_labels() {
        let m = anchor("2026-03");
        assert_eq!(m.key(), "2026-03");
        assert_eq!(m.label(), "Mar 2026");
        assert_eq!(m.long_label(), "March 2026");
    }

    #[test]
    fn test_serde_as_string() {
        let m = anchor("2026-09");
        assert_eq!(serde_json::to_string(&m).unwrap(), "\"2026-09\"");
        let back: MonthAnchor = serde_json::from_str("\"2026-09\"").unwrap();
        assert_eq!(back, m);
    }
}
