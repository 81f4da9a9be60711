use chrono::prelude::*;
use chrono::Duration;
use std::time::UNIX_EPOCH;
use tracing::debug;

use crate::account_db::{AccountDatabase, AccountPolicyRecord};

/// Day field value meaning "unset" (last change, inactive, expire).
pub const UNSET_DAY: i64 = -1;
/// `max` value meaning "password never expires".
pub const NEVER_EXPIRES_MAX: i64 = 99999;

/// Bound applied to day counts before date arithmetic, roughly 5000 years.
const MAX_DAY_COUNT: i64 = 2_000_000;

/// A day-count field with its sentinel decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayCount {
    Finite(i64),
    Never,
}

impl DayCount {
    /// Absolute day fields, `-1` is never.
    pub fn from_day_field(v: i64) -> Self {
        if v == UNSET_DAY {
            DayCount::Never
        } else {
            DayCount::Finite(v)
        }
    }

    /// The `max` field, `99999` is never.
    pub fn from_max_field(v: i64) -> Self {
        if v == NEVER_EXPIRES_MAX {
            DayCount::Never
        } else {
            DayCount::Finite(v)
        }
    }

    pub fn finite(self) -> Option<i64> {
        match self {
            DayCount::Finite(v) => Some(v),
            DayCount::Never => None,
        }
    }
}

/// 1970-01-01 00:00:00 in the local time zone, the date used for "never".
pub fn never_marker() -> DateTime<Local> {
    Local
        .with_ymd_and_hms(1970, 1, 1, 0, 0, 0)
        .earliest()
        .unwrap_or_else(|| DateTime::<Local>::from(UNIX_EPOCH))
}

pub fn is_never(dt: &DateTime<Local>) -> bool {
    *dt == never_marker()
}

fn days(v: i64) -> Duration {
    Duration::days(v.clamp(-MAX_DAY_COUNT, MAX_DAY_COUNT))
}

pub fn time_from_epoch(v: DayCount) -> DateTime<Local> {
    match v {
        DayCount::Never => never_marker(),
        DayCount::Finite(v) => never_marker() + days(v),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpirationInfo {
    pub password_last_changed: DateTime<Local>,
    pub password_inactive: DateTime<Local>,
    pub password_expires: DateTime<Local>,
    pub account_expired: DateTime<Local>,
    pub min: i64,
    pub max: DayCount,
    pub warning: i64,
    /// Account expiry is set; this, not password expiry, selects accounts
    /// for the report.
    pub expirable: bool,
}

impl ExpirationInfo {
    pub fn from_record(r: &AccountPolicyRecord) -> Self {
        let password_last_changed = time_from_epoch(DayCount::from_day_field(r.last_change));
        let max = DayCount::from_max_field(r.max);

        // inactivity only counts once the password can expire
        let (password_expires, password_inactive) = match max {
            DayCount::Never => (never_marker(), never_marker()),
            DayCount::Finite(max) => (
                password_last_changed + days(max),
                time_from_epoch(DayCount::from_day_field(r.inactive)),
            ),
        };

        ExpirationInfo {
            password_last_changed,
            password_inactive,
            password_expires,
            account_expired: time_from_epoch(DayCount::from_day_field(r.expire)),
            min: r.min,
            max,
            warning: r.warn,
            expirable: r.expire > UNSET_DAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpirableLogin {
    pub login: String,
    pub expiration: ExpirationInfo,
}

impl ExpirableLogin {
    pub fn from_record(r: &AccountPolicyRecord) -> Self {
        ExpirableLogin {
            login: r.login.clone(),
            expiration: ExpirationInfo::from_record(r),
        }
    }
}

/// `None` when the database holds no entry for `login`.
pub fn lookup_expiration<D>(db: &D, login: &str) -> Option<ExpirationInfo>
where
    D: AccountDatabase + ?Sized,
{
    let record = db.lookup(login);
    if record.is_none() {
        debug!("{} has no shadow entry", login);
    }
    record.as_ref().map(ExpirationInfo::from_record)
}
