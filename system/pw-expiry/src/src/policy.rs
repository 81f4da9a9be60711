//! Decides whether a login warning issued now is worth anything.
//!
//! A warning is only useful when the user sees it (`days <= warning`) and the
//! database already lets them change the password (`days >= min`). With
//! `warning` above `min` there is a stretch of days where the user is warned
//! but a change would still be refused.

use chrono::prelude::*;

use crate::expiration::{DayCount, ExpirableLogin, ExpirationInfo};

const NANOS_PER_DAY: i64 = 86_400_000_000_000;
const MILLIS_PER_DAY: i64 = 86_400_000;

/// Days elapsed since the last password change, any partial day counted as
/// a full one.
pub fn days_since_change(info: &ExpirationInfo, now: DateTime<Local>) -> i64 {
    let elapsed = now - info.password_last_changed;
    match elapsed.num_nanoseconds() {
        Some(ns) => -(-ns).div_euclid(NANOS_PER_DAY),
        // beyond ~292 years of nanoseconds
        None => -(-elapsed.num_milliseconds()).div_euclid(MILLIS_PER_DAY),
    }
}

pub fn should_warn_at(info: &ExpirationInfo, now: DateTime<Local>) -> bool {
    match info.max {
        DayCount::Never => false,
        DayCount::Finite(_) => {
            let days = days_since_change(info, now);
            days <= info.warning && days >= info.min
        }
    }
}

pub fn should_warn_now(info: &ExpirationInfo) -> bool {
    should_warn_at(info, Local::now())
}

impl ExpirableLogin {
    pub fn should_warn_at(&self, now: DateTime<Local>) -> bool {
        should_warn_at(&self.expiration, now)
    }

    pub fn should_warn_now(&self) -> bool {
        should_warn_now(&self.expiration)
    }
}
