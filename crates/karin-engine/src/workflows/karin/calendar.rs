use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How a statutory term counts its days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayCountMode {
    /// Monday to Friday, excluding configured holidays.
    Administrative,
    /// Every calendar day counts.
    Calendar,
}

impl DayCountMode {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Administrative => "días hábiles",
            Self::Calendar => "días corridos",
        }
    }
}

/// Date arithmetic for statutory terms.
///
/// The calendar never reads the system clock; callers pass every date in.
#[derive(Debug, Clone, Default)]
pub struct BusinessCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl BusinessCalendar {
    /// Weekend-only calendar.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_holidays<I>(holidays: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    pub fn holidays(&self) -> impl Iterator<Item = &NaiveDate> {
        self.holidays.iter()
    }

    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    /// Move `n` days forward from `start`. `n == 0` returns `start` untouched.
    /// Saturates at [`NaiveDate::MAX`]; use [`Self::checked_add_days`] to detect it.
    pub fn add_days(&self, start: NaiveDate, n: u32, mode: DayCountMode) -> NaiveDate {
        self.checked_add_days(start, n, mode).unwrap_or(NaiveDate::MAX)
    }

    /// Like [`Self::add_days`], but `None` when the result is past the
    /// representable date range.
    pub fn checked_add_days(
        &self,
        start: NaiveDate,
        n: u32,
        mode: DayCountMode,
    ) -> Option<NaiveDate> {
        match mode {
            DayCountMode::Calendar => start.checked_add_days(Days::new(u64::from(n))),
            DayCountMode::Administrative => {
                let mut current = start;
                let mut added = 0;
                while added < n {
                    current = current.succ_opt()?;
                    if self.is_business_day(current) {
                        added += 1;
                    }
                }
                Some(current)
            }
        }
    }

    /// Signed number of days from `from` to `to`.
    ///
    /// In administrative mode this counts business days in `(from, to]`, so
    /// `count_days(d, add_days(d, n))` is always `n`. Reversed bounds yield the
    /// negated count, which callers use to express days overdue.
    pub fn count_days(&self, from: NaiveDate, to: NaiveDate, mode: DayCountMode) -> i64 {
        match mode {
            DayCountMode::Calendar => (to - from).num_days(),
            DayCountMode::Administrative => {
                if to < from {
                    return -self.count_days(to, from, mode);
                }
                from.iter_days()
                    .skip(1)
                    .take_while(|day| *day <= to)
                    .filter(|day| self.is_business_day(*day))
                    .count() as i64
            }
        }
    }
}
