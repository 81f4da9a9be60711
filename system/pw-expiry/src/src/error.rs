use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExpiryError {
    #[error("account database {path:?} not found")]
    NotFound { path: PathBuf },

    #[error("permission denied reading account database {path:?}")]
    PermissionDenied { path: PathBuf },

    #[error("account database {path:?} unreadable - {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {path:?} - {reason}")]
    Config { path: PathBuf, reason: String },
}

impl ExpiryError {
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => ExpiryError::NotFound { path },
            io::ErrorKind::PermissionDenied => ExpiryError::PermissionDenied { path },
            _ => ExpiryError::Io { path, source },
        }
    }
}
