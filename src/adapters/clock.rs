//! Settable clock for tests and simulations.

use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;
use std::sync::Mutex;

use crate::domain::foundation::Timestamp;

/// A `mockable::Clock` that only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn at(now: Timestamp) -> Self {
        Self::new(*now.as_datetime())
    }

    pub fn set(&self, now: Timestamp) {
        if let Ok(mut guard) = self.0.lock() {
            *guard = *now.as_datetime();
        }
    }

    pub fn advance_days(&self, days: i64) {
        self.advance(TimeDelta::days(days));
    }

    pub fn advance_hours(&self, hours: i64) {
        self.advance(TimeDelta::hours(hours));
    }

    fn advance(&self, delta: TimeDelta) {
        if let Ok(mut guard) = self.0.lock() {
            *guard += delta;
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        match self.0.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
