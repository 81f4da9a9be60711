use shadow::Shadow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::ExpiryError;

pub const DEFAULT_SHADOW_PATH: &str = "/etc/shadow";

/// Raw aging fields of one account, sentinels (`-1`, `99999`) untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountPolicyRecord {
    pub login: String,
    pub last_change: i64,
    pub min: i64,
    pub max: i64,
    pub warn: i64,
    pub inactive: i64,
    pub expire: i64,
}

impl From<Shadow> for AccountPolicyRecord {
    fn from(s: Shadow) -> Self {
        AccountPolicyRecord {
            login: s.name,
            last_change: s.last_change,
            min: s.min,
            max: s.max,
            warn: s.warn,
            inactive: s.inactive,
            expire: s.expire,
        }
    }
}

/// Read-only view of an account database.
pub trait AccountDatabase {
    /// Record for `login`, `None` when the database has no entry for it.
    fn lookup(&self, login: &str) -> Option<AccountPolicyRecord>;

    /// Every login in database order.
    fn list_logins(&self) -> Result<Vec<String>, ExpiryError>;

    /// Every record that can be looked up, in database order.
    fn list_all(&self) -> Result<Vec<AccountPolicyRecord>, ExpiryError> {
        Ok(self
            .list_logins()?
            .iter()
            .filter_map(|login| self.lookup(login))
            .collect())
    }
}

/// The host database: logins are enumerated from the shadow file, records
/// come from `getspnam(3)`.
///
/// `getspnam(3)` always answers from the host's configured database, never
/// from `path`, so `path` should name that same file. Use [`ShadowFile`] (or
/// [`open_database`]) for any other file.
#[derive(Debug, Clone)]
pub struct SystemShadow {
    path: PathBuf,
}

impl SystemShadow {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SystemShadow { path: path.into() }
    }
}

impl Default for SystemShadow {
    fn default() -> Self {
        SystemShadow::new(DEFAULT_SHADOW_PATH)
    }
}

impl AccountDatabase for SystemShadow {
    fn lookup(&self, login: &str) -> Option<AccountPolicyRecord> {
        Shadow::from_name(login).map(AccountPolicyRecord::from)
    }

    fn list_logins(&self) -> Result<Vec<String>, ExpiryError> {
        let lines = read_lines(&self.path)?;
        Ok(logins_of(&self.path, &lines))
    }
}

/// A shadow-format file answered without libc, e.g. an offline copy.
#[derive(Debug, Clone)]
pub struct ShadowFile {
    path: PathBuf,
}

impl ShadowFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ShadowFile { path: path.into() }
    }
}

impl AccountDatabase for ShadowFile {
    fn lookup(&self, login: &str) -> Option<AccountPolicyRecord> {
        let lines = match read_lines(&self.path) {
            Ok(lines) => lines,
            Err(e) => {
                debug!("lookup {} - {}", login, e);
                return None;
            }
        };

        lines
            .iter()
            .map(|(_, l)| l.trim())
            .find(|l| shadow::login_of(l) == Some(login))
            .and_then(Shadow::from_line)
            .map(AccountPolicyRecord::from)
    }

    fn list_logins(&self) -> Result<Vec<String>, ExpiryError> {
        let lines = read_lines(&self.path)?;
        Ok(logins_of(&self.path, &lines))
    }

    fn list_all(&self) -> Result<Vec<AccountPolicyRecord>, ExpiryError> {
        let lines = read_lines(&self.path)?;

        let mut records = Vec::new();
        for (idx, line) in &lines {
            let (idx, line) = (*idx, line.trim());
            if shadow::login_of(line).is_none() {
                skip_line(&self.path, idx, line);
                continue;
            }
            match Shadow::from_line(line) {
                Some(s) => records.push(s.into()),
                None => debug!("{:?}:{} unparsable aging fields", self.path, idx + 1),
            }
        }
        Ok(records)
    }
}

/// Database for a configured shadow path, with `shadow_file` taking
/// precedence. Only the default path goes through libc; any other path is
/// read as a [`ShadowFile`] so listing and lookups agree.
pub fn open_database(
    shadow_file: Option<&str>,
    shadow_path: &str,
) -> Box<dyn AccountDatabase + Send> {
    match shadow_file {
        Some(path) => Box::new(ShadowFile::new(path)),
        None if Path::new(shadow_path) == Path::new(DEFAULT_SHADOW_PATH) => {
            Box::new(SystemShadow::new(shadow_path))
        }
        None => {
            debug!("{} is not the system database, read as a file", shadow_path);
            Box::new(ShadowFile::new(shadow_path))
        }
    }
}

/// In-memory database, records kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    records: Vec<AccountPolicyRecord>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: AccountPolicyRecord) {
        match self.records.iter_mut().find(|r| r.login == record.login) {
            Some(r) => *r = record,
            None => self.records.push(record),
        }
    }
}

impl FromIterator<AccountPolicyRecord> for MemoryDatabase {
    fn from_iter<I: IntoIterator<Item = AccountPolicyRecord>>(iter: I) -> Self {
        let mut db = MemoryDatabase::new();
        for r in iter {
            db.insert(r);
        }
        db
    }
}

impl AccountDatabase for MemoryDatabase {
    fn lookup(&self, login: &str) -> Option<AccountPolicyRecord> {
        self.records.iter().find(|r| r.login == login).cloned()
    }

    fn list_logins(&self) -> Result<Vec<String>, ExpiryError> {
        Ok(self.records.iter().map(|r| r.login.clone()).collect())
    }
}

/// Reads the whole file as `(index, line)` pairs; the handle is closed
/// before returning, on success and on a read error halfway through.
/// Lines that are not UTF-8 are skipped, the rest keep their index.
fn read_lines(path: &Path) -> Result<Vec<(usize, String)>, ExpiryError> {
    let file = File::open(path).map_err(|e| ExpiryError::from_io(path, e))?;

    let mut lines = Vec::new();
    for (idx, raw) in BufReader::new(file).split(b'\n').enumerate() {
        let raw = raw.map_err(|e| ExpiryError::from_io(path, e))?;
        match String::from_utf8(raw) {
            Ok(line) => lines.push((idx, line)),
            Err(_) => warn!("{:?}:{} not UTF-8, record skipped", path, idx + 1),
        }
    }
    Ok(lines)
}

fn logins_of(path: &Path, lines: &[(usize, String)]) -> Vec<String> {
    lines
        .iter()
        .filter_map(|(idx, line)| {
            let line = line.trim();
            let login = shadow::login_of(line);
            if login.is_none() {
                skip_line(path, *idx, line);
            }
            login.map(str::to_owned)
        })
        .collect()
}

fn skip_line(path: &Path, idx: usize, line: &str) {
    if line.is_empty() {
        debug!("{:?}:{} blank line", path, idx + 1);
    } else {
        warn!("{:?}:{} malformed record skipped", path, idx + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(login: &str, expire: i64) -> AccountPolicyRecord {
        AccountPolicyRecord {
            login: login.into(),
            last_change: 19000,
            min: 0,
            max: 90,
            warn: 7,
            inactive: -1,
            expire,
        }
    }

    #[test]
    fn memory_lookup_and_order() {
        let db: MemoryDatabase = vec![record("carol", -1), record("alice", 20000)]
            .into_iter()
            .collect();

        assert_eq!(db.lookup("alice"), Some(record("alice", 20000)));
        assert_eq!(db.lookup("mallory"), None);
        assert_eq!(db.list_logins().unwrap(), vec!["carol", "alice"]);
    }

    #[test]
    fn memory_insert_replaces() {
        let mut db = MemoryDatabase::new();
        db.insert(record("alice", -1));
        db.insert(record("alice", 20000));

        assert_eq!(db.list_all().unwrap(), vec![record("alice", 20000)]);
    }

    #[test]
    fn logins_skip_malformed() {
        let lines: Vec<(usize, String)> = [
            "root:*:19000::::::",
            "",
            "garbage",
            "  bob:x:1:2:3:4:5:6:  ",
        ]
        .iter()
        .enumerate()
        .map(|(idx, s)| (idx, s.to_string()))
        .collect();

        assert_eq!(
            logins_of(Path::new("/tmp/shadow"), &lines),
            vec!["root", "bob"]
        );
    }

    #[test]
    fn non_default_path_is_read_as_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        let line = b"pwexp-file-only:!:19000:0:90:7::20000:\n";
        std::io::Write::write_all(&mut f, line).unwrap();
        let path = f.path().to_str().unwrap();

        let db = open_database(None, path);
        assert_eq!(db.list_logins().unwrap(), vec!["pwexp-file-only"]);
        assert_eq!(db.lookup("pwexp-file-only").unwrap().max, 90);

        let db = open_database(Some(path), DEFAULT_SHADOW_PATH);
        assert!(db.lookup("pwexp-file-only").is_some());
    }

    #[test]
    fn shadow_from_record() {
        let s = Shadow::from_line("alice:!:19000:1:90:7:3:20000:").unwrap();
        let r = AccountPolicyRecord::from(s);
        assert_eq!(r.login, "alice");
        assert_eq!((r.min, r.max, r.warn, r.inactive), (1, 90, 7, 3));
    }
}
