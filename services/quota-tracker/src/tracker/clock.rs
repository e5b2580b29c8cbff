use std::sync::Mutex;

use chrono::{Days, Local, NaiveDate};

/// Source of "today". The ledger rolls over whenever this changes.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date of the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    day: Mutex<NaiveDate>,
}

impl ManualClock {
    pub fn new(day: NaiveDate) -> Self {
        Self {
            day: Mutex::new(day),
        }
    }

    pub fn set(&self, day: NaiveDate) {
        *self.day.lock().unwrap_or_else(|err| err.into_inner()) = day;
    }

    pub fn advance_days(&self, days: u64) {
        let mut day = self.day.lock().unwrap_or_else(|err| err.into_inner());
        *day = day.checked_add_days(Days::new(days)).unwrap_or(*day);
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        *self.day.lock().unwrap_or_else(|err| err.into_inner())
    }
}
