//! Date and calendar-month utilities, grounded on the subset of
//! `original_source/util/dateutils.py` actually exercised by the quote
//! parsers (the W-week/ISO-week machinery in that module is dead for this
//! subsystem and was not ported).

use crate::error::{CoreError, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Spreadsheet epoch used by Excel and most suppliers' workbooks.
fn excel_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("valid epoch date")
}

/// A handful of suppliers (SFE among them) publish serial dates one day
/// ahead of the usual Excel epoch; callers select this explicitly.
fn sfe_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 31).expect("valid epoch date")
}

pub fn excel_number_to_datetime(number: f64) -> NaiveDateTime {
    excel_number_to_datetime_with_epoch(number, excel_epoch())
}

pub fn sfe_excel_number_to_datetime(number: f64) -> NaiveDateTime {
    excel_number_to_datetime_with_epoch(number, sfe_epoch())
}

fn excel_number_to_datetime_with_epoch(number: f64, epoch: NaiveDate) -> NaiveDateTime {
    let days = number.trunc() as i64;
    let frac_seconds = (number.fract() * 86_400.0).round() as i64;
    epoch.and_hms_opt(0, 0, 0).unwrap() + chrono::Duration::days(days)
        + chrono::Duration::seconds(frac_seconds)
}

pub fn excel_datetime_to_number(dt: NaiveDateTime) -> f64 {
    let epoch = excel_epoch().and_hms_opt(0, 0, 0).unwrap();
    let delta = dt - epoch;
    delta.num_seconds() as f64 / 86_400.0
}

/// Accepts the handful of textual date formats seen across supplier
/// files, trying each in turn.
pub fn parse_datetime(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();
    const FORMATS: &[&str] = &[
        "%m/%d/%Y",
        "%m/%d/%y",
        "%Y-%m-%d",
        "%B %d, %Y",
        "%b %d, %Y",
        "%m-%d-%Y",
    ];
    for fmt in FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
            return Ok(d.and_hms_opt(0, 0, 0).unwrap());
        }
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt);
    }
    Err(CoreError::format(format!("could not parse date: {text}")))
}

pub fn date_to_datetime(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap()
}

pub fn get_end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(23, 59, 59).unwrap()
}

/// A calendar month, used for `start_from`/`start_until` arithmetic
/// (`(Month(start_from) + 1).first` in the original AEP parser).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn containing(date: NaiveDate) -> Self {
        Month {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("valid calendar month")
    }

    pub fn next(&self) -> Month {
        if self.month == 12 {
            Month {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Month {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl std::ops::Add<u32> for Month {
    type Output = Month;

    fn add(self, months: u32) -> Month {
        let mut m = self;
        for _ in 0..months {
            m = m.next();
        }
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excel_serial_43191_is_2018_03_01() {
        let dt = excel_number_to_datetime(43191.0);
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2018, 3, 1).unwrap());
    }

    #[test]
    fn excel_round_trip() {
        let original = 43191.0;
        let dt = excel_number_to_datetime(original);
        let back = excel_datetime_to_number(dt);
        assert!((back - original).abs() < 1e-6);
    }

    #[test]
    fn month_plus_one_rolls_year() {
        let m = Month::containing(NaiveDate::from_ymd_opt(2018, 12, 5).unwrap());
        let next = m + 1;
        assert_eq!(next.first(), NaiveDate::from_ymd_opt(2019, 1, 1).unwrap());
    }

    #[test]
    fn parse_datetime_handles_slash_format() {
        let dt = parse_datetime("5/4/2016").unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2016, 5, 4).unwrap());
    }
}
