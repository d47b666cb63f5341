//! Reporting period: Indonesian month name plus a bounded year.

use chrono::Datelike;
use std::{fmt, str::FromStr};

pub const MONTHS: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

pub const YEAR_MIN: u16 = 2020;
pub const YEAR_MAX: u16 = 2100;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PeriodError {
    #[error("unknown month `{0}` (expected Januari..Desember or 1-12)")]
    UnknownMonth(String),
    #[error("year {0} is outside {YEAR_MIN}-{YEAR_MAX}")]
    YearOutOfRange(i64),
}

/// Calendar month, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Month(u8);

impl Month {
    pub fn from_number(n: u32) -> Option<Self> {
        u8::try_from(n).ok().filter(|n| (1..=12).contains(n)).map(Month)
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        MONTHS[usize::from(self.0 - 1)]
    }

    pub fn current() -> Self {
        Month::from_number(chrono::Local::now().month()).unwrap_or(Month(1))
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Month {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<u32>() {
            return Month::from_number(n).ok_or_else(|| PeriodError::UnknownMonth(s.to_owned()));
        }
        MONTHS
            .iter()
            .position(|m| m.eq_ignore_ascii_case(s))
            .and_then(|i| u32::try_from(i + 1).ok())
            .and_then(Month::from_number)
            .ok_or_else(|| PeriodError::UnknownMonth(s.to_owned()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub month: Month,
    pub year: u16,
}

impl Period {
    pub fn new(month: Month, year: i64) -> Result<Self, PeriodError> {
        let year = u16::try_from(year)
            .ok()
            .filter(|y| (YEAR_MIN..=YEAR_MAX).contains(y))
            .ok_or(PeriodError::YearOutOfRange(year))?;
        Ok(Self { month, year })
    }

    /// Today's month and year, the year clamped into the accepted range.
    pub fn current() -> Self {
        let year = chrono::Local::now().year().clamp(YEAR_MIN.into(), YEAR_MAX.into());
        Self {
            month: Month::current(),
            year: u16::try_from(year).unwrap_or(YEAR_MIN),
        }
    }
}
