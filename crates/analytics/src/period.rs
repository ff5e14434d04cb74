//! Calendar windows in UTC.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc};
use domain::DomainError;

/// Longest range the daily receipt covers, in days.
pub const MAX_DAILY_RANGE_DAYS: i64 = 7;

/// A half-open `[from, to)` window of instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl Window {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at < self.to
    }
}

pub fn start_of(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// The whole UTC day `date`.
pub fn day(date: NaiveDate) -> Result<Window, DomainError> {
    let next = date.checked_add_days(Days::new(1)).ok_or_else(out_of_range)?;
    Ok(Window {
        from: start_of(date),
        to: start_of(next),
    })
}

/// The calendar month containing `date`.
pub fn month(date: NaiveDate) -> Result<Window, DomainError> {
    let first = first_of_month(date)?;
    let next = first
        .checked_add_months(Months::new(1))
        .ok_or_else(out_of_range)?;
    Ok(Window {
        from: start_of(first),
        to: start_of(next),
    })
}

/// The calendar month before the one containing `date`.
pub fn previous_month(date: NaiveDate) -> Result<Window, DomainError> {
    let last_month = first_of_month(date)?
        .checked_sub_months(Months::new(1))
        .ok_or_else(out_of_range)?;
    month(last_month)
}

fn first_of_month(date: NaiveDate) -> Result<NaiveDate, DomainError> {
    date.with_day(1).ok_or_else(out_of_range)
}

/// An inclusive range of whole days, at most [`MAX_DAILY_RANGE_DAYS`] long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    from: NaiveDate,
    to: NaiveDate,
}

impl DayRange {
    /// Validates `from..=to`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, DomainError> {
        if from > to {
            return Err(DomainError::InvalidInput(
                "range start must not be after its end".to_string(),
            ));
        }
        if (to - from).num_days() + 1 > MAX_DAILY_RANGE_DAYS {
            return Err(DomainError::InvalidInput(format!(
                "range must not span more than {MAX_DAILY_RANGE_DAYS} days"
            )));
        }
        Ok(Self { from, to })
    }

    /// The seven days ending with `today`.
    pub fn last_week(today: NaiveDate) -> Result<Self, DomainError> {
        let from = today
            .checked_sub_days(Days::new(MAX_DAILY_RANGE_DAYS as u64 - 1))
            .ok_or_else(out_of_range)?;
        Self::new(from, today)
    }

    /// Fills in whichever bound is missing, defaulting to the week ending
    /// `today`.
    pub fn resolve(
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, DomainError> {
        match (from, to) {
            (Some(from), Some(to)) => Self::new(from, to),
            (None, None) => Self::last_week(today),
            (Some(from), None) => {
                let to = from
                    .checked_add_days(Days::new(MAX_DAILY_RANGE_DAYS as u64 - 1))
                    .ok_or_else(out_of_range)?;
                Self::new(from, to.min(today).max(from))
            }
            (None, Some(to)) => Self::last_week(to),
        }
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let to = self.to;
        self.from.iter_days().take_while(move |d| *d <= to)
    }

    pub fn window(&self) -> Result<Window, DomainError> {
        Ok(Window {
            from: start_of(self.from),
            to: day(self.to)?.to,
        })
    }
}

fn out_of_range() -> DomainError {
    DomainError::InvalidInput("date is out of range".to_string())
}
