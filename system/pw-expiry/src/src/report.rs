use anyhow::{anyhow, Result};
use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::str::FromStr;
use tracing::{debug, info, instrument, warn};

use crate::account_db::AccountDatabase;
use crate::error::ExpiryError;
use crate::expiration::{is_never, ExpirableLogin};

const DATE_FORMAT: &str = "%b %d, %Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Text,
    Json,
}

impl Default for ReportFormat {
    fn default() -> Self {
        ReportFormat::Text
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            _ => Err(format!("unknown format {} (text|json)", s)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    /// keep accounts without an account expiry too
    pub include_all: bool,
    pub only_notify: bool,
    /// fail instead of reporting nothing when the database is unreadable
    pub strict: bool,
    pub now: DateTime<Local>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions {
            include_all: false,
            only_notify: false,
            strict: false,
            now: Local::now(),
        }
    }
}

/// One account as printed; `None` dates are "never".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub login: String,
    pub last_change: Option<DateTime<Local>>,
    pub password_expires: Option<DateTime<Local>>,
    pub password_inactive: Option<DateTime<Local>>,
    pub account_expires: Option<DateTime<Local>>,
    pub warning: i64,
    pub min: i64,
    pub max: Option<i64>,
    pub expirable: bool,
    pub notify_now: bool,
}

fn unless_never(dt: DateTime<Local>) -> Option<DateTime<Local>> {
    if is_never(&dt) {
        None
    } else {
        Some(dt)
    }
}

impl ReportEntry {
    pub fn new(login: &ExpirableLogin, now: DateTime<Local>) -> Self {
        let exp = &login.expiration;
        ReportEntry {
            login: login.login.clone(),
            last_change: unless_never(exp.password_last_changed),
            password_expires: unless_never(exp.password_expires),
            password_inactive: unless_never(exp.password_inactive),
            account_expires: unless_never(exp.account_expired),
            warning: exp.warning,
            min: exp.min,
            max: exp.max.finite(),
            expirable: exp.expirable,
            notify_now: login.should_warn_at(now),
        }
    }
}

/// Accounts with an account expiry set (every account with `include_all`),
/// in database order.
#[instrument(skip(db))]
pub fn list_expirable_logins<D>(
    db: &D,
    include_all: bool,
) -> Result<Vec<ExpirableLogin>, ExpiryError>
where
    D: AccountDatabase + ?Sized,
{
    let logins: Vec<ExpirableLogin> = db
        .list_all()?
        .iter()
        .map(ExpirableLogin::from_record)
        .filter(|l| {
            if !include_all && !l.expiration.expirable {
                debug!("{} account never expires, skipped", l.login);
                return false;
            }
            true
        })
        .collect();

    info!("{} account(s) selected", logins.len());
    Ok(logins)
}

pub fn build_report<D>(db: &D, opts: &ReportOptions) -> Result<Vec<ReportEntry>, ExpiryError>
where
    D: AccountDatabase + ?Sized,
{
    let logins = match list_expirable_logins(db, opts.include_all) {
        Ok(logins) => logins,
        Err(e) if !opts.strict => {
            warn!("{}, reporting no accounts", e);
            Vec::new()
        }
        Err(e) => return Err(e),
    };

    Ok(logins
        .iter()
        .map(|l| ReportEntry::new(l, opts.now))
        .filter(|e| !opts.only_notify || e.notify_now)
        .collect())
}

/// A single account regardless of its account expiry, `None` without a
/// shadow entry.
pub fn check_login<D>(db: &D, login: &str, now: DateTime<Local>) -> Option<ReportEntry>
where
    D: AccountDatabase + ?Sized,
{
    db.lookup(login)
        .map(|r| ReportEntry::new(&ExpirableLogin::from_record(&r), now))
}

fn format_date(dt: &Option<DateTime<Local>>) -> String {
    dt.map_or("Never".to_string(), |d| d.format(DATE_FORMAT).to_string())
}

pub fn write_text<W: Write>(out: &mut W, entries: &[ReportEntry]) -> Result<()> {
    for e in entries {
        writeln!(out, "Login: {}", e.login)?;
        writeln!(out, "Last password change: {}", format_date(&e.last_change))?;
        writeln!(out, "Password expires: {}", format_date(&e.password_expires))?;
        writeln!(out, "Warning: {}", e.warning)?;
        writeln!(out, "Min password change allowed: {}", e.min)?;
        writeln!(out, "Is it effective to notify now?  {}", e.notify_now)?;
        writeln!(out)?;
    }
    Ok(())
}

pub fn write_json<W: Write>(out: &mut W, entries: &[ReportEntry], color: bool) -> Result<()> {
    let value = serde_json::to_value(entries)?;
    let s = if color {
        colored_json::to_colored_json(&value, colored_json::ColorMode::On)
            .or_else(|e| Err(anyhow!(e)))?
    } else {
        serde_json::to_string_pretty(&value)?
    };
    writeln!(out, "{}", s)?;
    Ok(())
}

pub fn write_report<W: Write>(
    out: &mut W,
    entries: &[ReportEntry],
    format: ReportFormat,
    color: bool,
) -> Result<()> {
    match format {
        ReportFormat::Text => write_text(out, entries),
        ReportFormat::Json => write_json(out, entries, color),
    }
}
