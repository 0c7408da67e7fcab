//! Time source for loan dates and fines

use std::sync::atomic::{AtomicI32, Ordering};

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock, stored as days from the common era
#[derive(Debug)]
pub struct FixedClock {
    days: AtomicI32,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            days: AtomicI32::new(today.num_days_from_ce()),
        }
    }

    pub fn set(&self, today: NaiveDate) {
        self.days.store(today.num_days_from_ce(), Ordering::SeqCst);
    }

    pub fn advance_days(&self, days: i32) {
        self.days.fetch_add(days, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.today().and_time(NaiveTime::MIN).and_utc()
    }

    fn today(&self) -> NaiveDate {
        NaiveDate::from_num_days_from_ce_opt(self.days.load(Ordering::SeqCst))
            .unwrap_or(NaiveDate::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_advances() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.today(), start);
        clock.advance_days(5);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(clock.now().date_naive(), clock.today());
        clock.set(start);
        assert_eq!(clock.today(), start);
    }
}
