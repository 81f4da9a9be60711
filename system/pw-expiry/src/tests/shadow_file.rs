use chrono::Duration;
use std::io::Write;
use tempfile::NamedTempFile;

use pw_expiry::{
    build_report, check_login, is_never, list_expirable_logins, lookup_expiration,
    time_from_epoch, AccountDatabase, DayCount, ExpiryError, ReportOptions, ShadowFile,
    SystemShadow,
};

const SHADOW: &str = "\
root:*:19000:0:99999:7:::
daemon:*:19000:0:99999:7:::

this line has no colon
alice:$6$abc$def:19000:0:90:7::20500:
bob:!:19000:10:90:7:5:20500:
carol:!:19000:0:99999:7:5:20500:
dave:!:oops:0:90:7::20500:
";

fn shadow_file() -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(SHADOW.as_bytes()).unwrap();
    f
}

fn day(d: i64) -> chrono::DateTime<chrono::Local> {
    time_from_epoch(DayCount::Finite(d))
}

#[test]
fn malformed_lines_are_skipped() {
    let f = shadow_file();
    let db = ShadowFile::new(f.path());

    assert_eq!(
        db.list_logins().unwrap(),
        vec!["root", "daemon", "alice", "bob", "carol", "dave"]
    );

    let records: Vec<String> = db.list_all().unwrap().into_iter().map(|r| r.login).collect();
    assert_eq!(records, vec!["root", "daemon", "alice", "bob", "carol"]);
}

#[test]
fn expirable_accounts_in_file_order() {
    let f = shadow_file();
    let db = ShadowFile::new(f.path());

    let logins: Vec<String> = list_expirable_logins(&db, false)
        .unwrap()
        .into_iter()
        .map(|l| l.login)
        .collect();
    assert_eq!(logins, vec!["alice", "bob", "carol"]);
}

#[test]
fn lookup_from_file() {
    let f = shadow_file();
    let db = ShadowFile::new(f.path());

    let alice = lookup_expiration(&db, "alice").unwrap();
    assert_eq!(alice.password_expires, day(19000) + Duration::days(90));
    assert!(is_never(&alice.password_inactive));

    let carol = lookup_expiration(&db, "carol").unwrap();
    assert!(is_never(&carol.password_expires));
    assert!(is_never(&carol.password_inactive));

    assert!(lookup_expiration(&db, "dave").is_none());
    assert!(lookup_expiration(&db, "mallory").is_none());
}

#[test]
fn report_at_fixed_time() {
    let f = shadow_file();
    let db = ShadowFile::new(f.path());
    let opts = ReportOptions {
        now: day(19003) + Duration::hours(1),
        ..Default::default()
    };

    let entries = build_report(&db, &opts).unwrap();
    let notify: Vec<(&str, bool)> = entries
        .iter()
        .map(|e| (e.login.as_str(), e.notify_now))
        .collect();
    assert_eq!(notify, vec![("alice", true), ("bob", false), ("carol", false)]);

    let only = ReportOptions {
        only_notify: true,
        ..opts
    };
    assert_eq!(build_report(&db, &only).unwrap().len(), 1);
}

#[test]
fn check_reports_non_expirable_account() {
    let f = shadow_file();
    let db = ShadowFile::new(f.path());

    let root = check_login(&db, "root", day(19001)).unwrap();
    assert!(!root.expirable);
    assert!(!root.notify_now);
    assert!(check_login(&db, "mallory", day(19001)).is_none());
}

#[test]
fn unreadable_database() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("shadow");

    for db in [
        Box::new(ShadowFile::new(&missing)) as Box<dyn AccountDatabase>,
        Box::new(SystemShadow::new(&missing)) as Box<dyn AccountDatabase>,
    ] {
        assert!(build_report(db.as_ref(), &ReportOptions::default())
            .unwrap()
            .is_empty());

        let strict = ReportOptions {
            strict: true,
            ..Default::default()
        };
        assert!(matches!(
            build_report(db.as_ref(), &strict),
            Err(ExpiryError::NotFound { .. })
        ));
    }
}

#[test]
fn directory_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = ShadowFile::new(dir.path());

    assert!(matches!(db.list_logins(), Err(ExpiryError::Io { .. })));
}

#[test]
fn non_utf8_line_skips_only_that_record() {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(b"alice:!:19000:0:90:7::20500:\n\xff\xfe:bad\nbob:!:19000:0:90:7::20500:\n")
        .unwrap();

    let db = ShadowFile::new(f.path());
    assert_eq!(db.list_logins().unwrap(), vec!["alice", "bob"]);
    assert!(lookup_expiration(&db, "bob").is_some());

    let entries = build_report(&db, &ReportOptions::default()).unwrap();
    let logins: Vec<&str> = entries.iter().map(|e| e.login.as_str()).collect();
    assert_eq!(logins, vec!["alice", "bob"]);

    let strict = ReportOptions {
        strict: true,
        ..Default::default()
    };
    assert_eq!(build_report(&db, &strict).unwrap().len(), 2);

    let system = SystemShadow::new(f.path());
    assert_eq!(system.list_logins().unwrap(), vec!["alice", "bob"]);
}
