use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::error::{Result, StorageError};

/// Opens connections on demand; injected into every adapter
pub trait ConnectionFactory: Send + Sync {
    fn connect(&self) -> Result<ScopedConnection>;

    fn describe(&self) -> String;
}

/// Connection released when the scope ends, on every exit path
pub struct ScopedConnection {
    conn: Connection,
    label: String,
}

impl ScopedConnection {
    pub fn new(conn: Connection, label: impl Into<String>) -> Self {
        Self {
            conn,
            label: label.into(),
        }
    }
}

impl Deref for ScopedConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl DerefMut for ScopedConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

impl Drop for ScopedConnection {
    fn drop(&mut self) {
        debug!(db = %self.label, "Released connection");
    }
}

/// File-backed SQLite database
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    path: PathBuf,
    must_exist: bool,
    busy_timeout: Duration,
}

impl SqliteConnector {
    /// Opens (and creates when absent) the database at `path`
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            must_exist: false,
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// Refuse to create the file; a missing database is a connectivity error
    pub fn must_exist(mut self, must_exist: bool) -> Self {
        self.must_exist = must_exist;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection> {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if !self.must_exist {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|err| {
                    StorageError::connectivity(format!(
                        "Cannot create directory {}: {}",
                        parent.display(),
                        err
                    ))
                    .with_source(err)
                })?;
            }
        }

        Connection::open_with_flags(&self.path, flags).map_err(|err| {
            StorageError::connectivity(format!("Cannot open {}: {}", self.path.display(), err))
                .with_source(err)
        })
    }
}

impl ConnectionFactory for SqliteConnector {
    fn connect(&self) -> Result<ScopedConnection> {
        let conn = self.open()?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", true)?;

        debug!(path = %self.path.display(), "Opened connection");
        Ok(ScopedConnection::new(conn, self.path.display().to_string()))
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_creates_database_and_enables_foreign_keys() {
        let dir = tempfile::tempdir().unwrap();
        let connector = SqliteConnector::file(dir.path().join("nested").join("dw.sqlite"));

        let conn = connector.connect().unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
        assert!(connector.path().exists());
    }

    #[test]
    fn test_must_exist_reports_connectivity() {
        let dir = tempfile::tempdir().unwrap();
        let connector = SqliteConnector::file(dir.path().join("missing.sqlite")).must_exist(true);

        let err = connector.connect().err().unwrap();
        assert!(err.is_connectivity());
        assert!(!dir.path().join("missing.sqlite").exists());
    }

    #[test]
    fn test_describe() {
        let connector = SqliteConnector::file("dw.sqlite");
        assert_eq!(connector.describe(), "sqlite:dw.sqlite");
    }
}
