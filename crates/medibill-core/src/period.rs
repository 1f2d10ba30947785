//! # Statistics Periods
//!
//! Named reporting windows resolved against an explicit "now".
//!
//! ```text
//!   period        start                              end (inclusive)
//!   ──────────    ─────────────────────────────────  ──────────────────────────
//!   today         today 00:00                        now
//!   yesterday     yesterday 00:00                    today 00:00 − 1ns
//!   this_week     first day of week 00:00            now
//!   this_month    1st of month 00:00                 now
//!   last_month    1st of previous month 00:00        1st of month 00:00 − 1ns
//!   this_year     1 Jan 00:00                        now
//!   custom        startDate 00:00                    endDate 23:59:59.999999999
//! ```
//!
//! All boundaries are UTC.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::validation::ValidationResult;

/// A named reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsPeriod {
    Today,
    Yesterday,
    ThisWeek,
    ThisMonth,
    LastMonth,
    ThisYear,
    Custom,
}

impl StatsPeriod {
    pub const ALL: [StatsPeriod; 7] = [
        StatsPeriod::Today,
        StatsPeriod::Yesterday,
        StatsPeriod::ThisWeek,
        StatsPeriod::ThisMonth,
        StatsPeriod::LastMonth,
        StatsPeriod::ThisYear,
        StatsPeriod::Custom,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            StatsPeriod::Today => "today",
            StatsPeriod::Yesterday => "yesterday",
            StatsPeriod::ThisWeek => "this_week",
            StatsPeriod::ThisMonth => "this_month",
            StatsPeriod::LastMonth => "last_month",
            StatsPeriod::ThisYear => "this_year",
            StatsPeriod::Custom => "custom",
        }
    }

    /// Resolves the window to concrete inclusive bounds.
    ///
    /// `custom` requires a `(start_date, end_date)` pair with start ≤ end;
    /// the other periods ignore it.
    pub fn resolve(
        &self,
        now: DateTime<Utc>,
        week_start: Weekday,
        custom: Option<(NaiveDate, NaiveDate)>,
    ) -> ValidationResult<DateRange> {
        let today = now.date_naive();
        let one_ns = Duration::nanoseconds(1);

        let range = match self {
            StatsPeriod::Today => DateRange::new(start_of(today), now),
            StatsPeriod::Yesterday => {
                DateRange::new(start_of(today - Duration::days(1)), start_of(today) - one_ns)
            }
            StatsPeriod::ThisWeek => {
                let back = (today.weekday().num_days_from_monday() + 7
                    - week_start.num_days_from_monday())
                    % 7;
                DateRange::new(start_of(today - Duration::days(back as i64)), now)
            }
            StatsPeriod::ThisMonth => DateRange::new(start_of(first_of_month(today)), now),
            StatsPeriod::LastMonth => {
                let this_month = first_of_month(today);
                let last_month = first_of_month(this_month - Duration::days(1));
                DateRange::new(start_of(last_month), start_of(this_month) - one_ns)
            }
            StatsPeriod::ThisYear => {
                let jan_first = today - Duration::days(today.ordinal0() as i64);
                DateRange::new(start_of(jan_first), now)
            }
            StatsPeriod::Custom => {
                let (start, end) = custom.ok_or_else(|| {
                    ValidationError::required("startDate and endDate")
                })?;
                if start > end {
                    return Err(ValidationError::invalid_format(
                        "endDate",
                        "must not be before startDate",
                    ));
                }
                DateRange::new(start_of(start), start_of(end + Duration::days(1)) - one_ns)
            }
        };

        Ok(range)
    }
}

impl Default for StatsPeriod {
    fn default() -> Self {
        StatsPeriod::ThisMonth
    }
}

impl fmt::Display for StatsPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts `this_week`, `this-week` and `thisWeek` spellings.
impl FromStr for StatsPeriod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        StatsPeriod::ALL
            .iter()
            .find(|p| p.as_str().replace('_', "") == key)
            .copied()
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "period".to_string(),
                allowed: StatsPeriod::ALL.iter().map(|p| p.to_string()).collect(),
            })
    }
}

/// Inclusive UTC date-time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        DateRange { start, end }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// Parses a week-start name (`monday`, `sun`, ...).
pub fn parse_week_start(value: &str) -> ValidationResult<Weekday> {
    value.trim().parse::<Weekday>().map_err(|_| {
        ValidationError::invalid_format("weekStart", "must be a weekday name such as monday")
    })
}

fn start_of(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.day0() as i64)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // Wednesday
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 18, 15, 45, 0).unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn resolve(period: StatsPeriod) -> DateRange {
        period.resolve(now(), Weekday::Mon, None).unwrap()
    }

    #[test]
    fn test_today_and_yesterday() {
        assert_eq!(resolve(StatsPeriod::Today), DateRange::new(at(2026, 3, 18), now()));

        let yesterday = resolve(StatsPeriod::Yesterday);
        assert_eq!(yesterday.start, at(2026, 3, 17));
        assert_eq!(yesterday.end, at(2026, 3, 18) - Duration::nanoseconds(1));
        assert!(!yesterday.contains(at(2026, 3, 18)));
    }

    #[test]
    fn test_week_start_is_configurable() {
        assert_eq!(resolve(StatsPeriod::ThisWeek).start, at(2026, 3, 16));

        let sunday_weeks = StatsPeriod::ThisWeek.resolve(now(), Weekday::Sun, None).unwrap();
        assert_eq!(sunday_weeks.start, at(2026, 3, 15));

        let same_day = StatsPeriod::ThisWeek.resolve(now(), Weekday::Wed, None).unwrap();
        assert_eq!(same_day.start, at(2026, 3, 18));
    }

    #[test]
    fn test_month_boundaries() {
        assert_eq!(resolve(StatsPeriod::ThisMonth).start, at(2026, 3, 1));

        let last = resolve(StatsPeriod::LastMonth);
        assert_eq!(last.start, at(2026, 2, 1));
        assert_eq!(last.end, at(2026, 3, 1) - Duration::nanoseconds(1));
    }

    #[test]
    fn test_last_month_in_january() {
        let jan = Utc.with_ymd_and_hms(2027, 1, 5, 8, 0, 0).unwrap();
        let last = StatsPeriod::LastMonth.resolve(jan, Weekday::Mon, None).unwrap();
        assert_eq!(last.start, at(2026, 12, 1));
        assert_eq!(resolve(StatsPeriod::ThisYear).start, at(2026, 1, 1));
    }

    #[test]
    fn test_custom_range() {
        let start = NaiveDate::from_ymd_opt(2026, 2, 10).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 2, 12).unwrap();
        let range = StatsPeriod::Custom.resolve(now(), Weekday::Mon, Some((start, end))).unwrap();

        assert_eq!(range.start, at(2026, 2, 10));
        assert!(range.contains(Utc.with_ymd_and_hms(2026, 2, 12, 23, 59, 59).unwrap()));
        assert!(!range.contains(at(2026, 2, 13)));

        assert!(StatsPeriod::Custom.resolve(now(), Weekday::Mon, Some((end, start))).is_err());
        assert!(StatsPeriod::Custom.resolve(now(), Weekday::Mon, None).is_err());
    }

    #[test]
    fn test_parse_period_spellings() {
        assert_eq!("this-month".parse::<StatsPeriod>().unwrap(), StatsPeriod::ThisMonth);
        assert_eq!("this_week".parse::<StatsPeriod>().unwrap(), StatsPeriod::ThisWeek);
        assert_eq!("lastMonth".parse::<StatsPeriod>().unwrap(), StatsPeriod::LastMonth);
        assert!("fortnight".parse::<StatsPeriod>().is_err());
    }

    #[test]
    fn test_parse_week_start() {
        assert_eq!(parse_week_start("sunday").unwrap(), Weekday::Sun);
        assert_eq!(parse_week_start("Mon").unwrap(), Weekday::Mon);
        assert!(parse_week_start("someday").is_err());
    }
}
