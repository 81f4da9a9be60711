pub mod account_db;
pub use account_db::{
    open_database, AccountDatabase, AccountPolicyRecord, MemoryDatabase, ShadowFile,
    SystemShadow,
};

pub mod config;
pub use config::PwExpiryConfig;

pub mod error;
pub use error::ExpiryError;

pub mod expiration;
pub use expiration::{
    is_never, lookup_expiration, never_marker, time_from_epoch, DayCount, ExpirableLogin,
    ExpirationInfo,
};

pub mod policy;
pub use policy::{days_since_change, should_warn_at, should_warn_now};

pub mod report;
pub use report::{
    build_report, check_login, list_expirable_logins, write_report, ReportEntry, ReportFormat,
    ReportOptions,
};
