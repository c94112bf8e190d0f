//! Reporting period expansion: a day, a Monday-start week, or a full
//! calendar month anchored at a date.

use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    Month,
}

impl Period {
    pub fn parse(s: &str) -> CoreResult<Self> {
        match s {
            "day" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            other => Err(CoreError::Validation(format!(
                "unknown period '{other}', expected day|week|month"
            ))),
        }
    }
}

/// Concrete calendar dates covered by a period.
pub fn expand(period: Period, anchor: NaiveDate) -> Vec<NaiveDate> {
    match period {
        Period::Day => vec![anchor],
        Period::Week => {
            let monday = anchor.week(Weekday::Mon).first_day();
            (0..7).map(|offset| monday + Duration::days(offset)).collect()
        }
        Period::Month => {
            let first = anchor.with_day(1).unwrap_or(anchor);
            let next_month = first.checked_add_months(Months::new(1)).unwrap_or(first);
            let mut dates = Vec::with_capacity(31);
            let mut current = first;
            while current < next_month {
                dates.push(current);
                current += Duration::days(1);
            }
            dates
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn day_is_just_the_anchor() {
        assert_eq!(expand(Period::Day, d(2025, 6, 18)), vec![d(2025, 6, 18)]);
    }

    #[test]
    fn week_starts_on_monday() {
        // 2025-06-18 is a Wednesday
        let dates = expand(Period::Week, d(2025, 6, 18));
        assert_eq!(dates.len(), 7);
        assert_eq!(dates[0], d(2025, 6, 16));
        assert_eq!(dates[6], d(2025, 6, 22));
    }

    #[test]
    fn week_anchored_on_monday_keeps_monday_first() {
        let dates = expand(Period::Week, d(2025, 6, 16));
        assert_eq!(dates[0], d(2025, 6, 16));
    }

    #[test]
    fn month_covers_whole_calendar_month() {
        let june = expand(Period::Month, d(2025, 6, 18));
        assert_eq!(june.len(), 30);
        assert_eq!(june[0], d(2025, 6, 1));
        assert_eq!(june[29], d(2025, 6, 30));

        let feb_leap = expand(Period::Month, d(2024, 2, 10));
        assert_eq!(feb_leap.len(), 29);
    }

    #[test]
    fn period_parse_rejects_unknown() {
        assert!(Period::parse("year").is_err());
        assert_eq!(Period::parse("week").unwrap(), Period::Week);
    }
}
