//! This module provides read-only access to the password aging fields of
//! `/etc/shadow`, either through the libc `getspnam(3)` query or by parsing a
//! shadow-format line directly.
//!
//! Root permission is necessary to query the system shadow database.
//!
//! The libc functions hand back a pointer into static storage, so every call
//! into libc goes through a process-wide lock and the fields are copied out
//! before the lock is released. The encrypted password is never copied.
//!
//! # Examples
//!
//! Print the aging fields of one account:
//!
//! ```no_run
//! use shadow::Shadow;
//!
//! if let Some(entry) = Shadow::from_name("root") {
//!     println!("{:?}", entry);
//! }
//! ```
//!
//! Parse an offline copy of a shadow record:
//!
//! ```
//! use shadow::Shadow;
//!
//! let entry = Shadow::from_line("alice:!:19000:0:90:7:::").unwrap();
//! assert_eq!(entry.max, 90);
//! assert_eq!(entry.inactive, -1);
//! ```

extern crate libc;

use std::ffi::CStr;
use std::ffi::CString;
use std::sync::Mutex;

/// Value libc stores for an empty numeric field.
pub const FIELD_UNSET: i64 = -1;

static LIBC_LOCK: Mutex<()> = Mutex::new(());

/// Aging fields of an entry in `/etc/shadow`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shadow {
    /// user login name
    pub name: String,
    /// last password change, days since 1970-01-01
    pub last_change: i64,
    /// days until change allowed
    pub min: i64,
    /// days before change required
    pub max: i64,
    /// days warning for expiration
    pub warn: i64,
    /// days before account inactive
    pub inactive: i64,
    /// date when account expires, days since 1970-01-01
    pub expire: i64,
}

impl Shadow {
    unsafe fn from_ptr(spwd: *const libc::spwd) -> Shadow {
        Shadow {
            name: CStr::from_ptr((*spwd).sp_namp)
                .to_string_lossy()
                .into_owned(),
            last_change: i64::from((*spwd).sp_lstchg),
            min: i64::from((*spwd).sp_min),
            max: i64::from((*spwd).sp_max),
            warn: i64::from((*spwd).sp_warn),
            inactive: i64::from((*spwd).sp_inact),
            expire: i64::from((*spwd).sp_expire),
        }
    }

    /// Gets a `Shadow` entry for the given username, or returns `None`.
    ///
    /// `None` covers both "no such entry" and "not permitted to read the
    /// shadow database", which libc does not tell apart here.
    pub fn from_name(user: &str) -> Option<Shadow> {
        let c_user = CString::new(user).ok()?;

        let _guard = LIBC_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let spwd = unsafe { libc::getspnam(c_user.as_ptr()) };

        if spwd.is_null() {
            None
        } else {
            Some(unsafe { Shadow::from_ptr(spwd) })
        }
    }

    /// Parses one shadow(5) record.
    ///
    /// Empty numeric fields become [`FIELD_UNSET`]. Returns `None` when the
    /// line has fewer than eight fields, an empty login or a field that is
    /// not an integer.
    pub fn from_line(line: &str) -> Option<Shadow> {
        let mut fields = line.trim_end_matches(['\r', '\n']).split(':');

        let name = fields.next().filter(|n| !n.is_empty())?.to_owned();
        // encrypted password, skipped
        fields.next()?;

        let mut numbers = [FIELD_UNSET; 6];
        for slot in numbers.iter_mut() {
            *slot = parse_field(fields.next()?)?;
        }
        let [last_change, min, max, warn, inactive, expire] = numbers;

        Some(Shadow {
            name,
            last_change,
            min,
            max,
            warn,
            inactive,
            expire,
        })
    }
}

fn parse_field(field: &str) -> Option<i64> {
    let field = field.trim();
    if field.is_empty() {
        Some(FIELD_UNSET)
    } else {
        field.parse().ok()
    }
}

/// Returns the login name of a shadow line, the text before the first
/// colon, or `None` when the line has no colon or an empty name.
pub fn login_of(line: &str) -> Option<&str> {
    line.split_once(':')
        .map(|(login, _)| login)
        .filter(|login| !login.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_record() {
        let s = Shadow::from_line("bob:$6$salt$hash:19500:1:60:14:5:20000:").unwrap();
        assert_eq!(
            s,
            Shadow {
                name: "bob".into(),
                last_change: 19500,
                min: 1,
                max: 60,
                warn: 14,
                inactive: 5,
                expire: 20000,
            }
        );
    }

    #[test]
    fn empty_fields_are_unset() {
        let s = Shadow::from_line("daemon:*:19000:0:99999:7:::").unwrap();
        assert_eq!(s.max, 99999);
        assert_eq!(s.inactive, FIELD_UNSET);
        assert_eq!(s.expire, FIELD_UNSET);

        let s = Shadow::from_line("nobody:*::::::\n").unwrap();
        assert_eq!(s.last_change, FIELD_UNSET);
        assert_eq!(s.min, FIELD_UNSET);
    }

    #[test]
    fn reject_short_or_garbage() {
        assert!(Shadow::from_line("alice").is_none());
        assert!(Shadow::from_line("alice:x:1:2").is_none());
        assert!(Shadow::from_line(":x:1:2:3:4:5:6:").is_none());
        assert!(Shadow::from_line("alice:x:abc:0:90:7:::").is_none());
    }

    #[test]
    fn login_before_first_colon() {
        assert_eq!(login_of("alice:x:1:2:3"), Some("alice"));
        assert_eq!(login_of("alice:"), Some("alice"));
        assert_eq!(login_of("no-colon-here"), None);
        assert_eq!(login_of(":x:"), None);
    }

    #[test]
    fn unknown_name_or_nul_is_none() {
        assert!(Shadow::from_name("no\0such").is_none());
        assert!(Shadow::from_name("pw-expiry-test-no-such-user").is_none());
    }
}
