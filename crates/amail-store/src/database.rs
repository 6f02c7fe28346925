//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] configured for
//! multi-process access to a single file:
//!
//! - foreign keys enforced,
//! - WAL journaling, so readers and the writer do not block each other,
//! - a 5 second busy timeout, so a writer that collides with another
//!   process's write lock waits instead of failing at once.
//!
//! [`Database::close`] makes a best-effort passive checkpoint so that many
//! short-lived processes do not leave an ever-growing WAL behind.

use std::path::{Path, PathBuf};
use std::time::Duration;

use amail_shared::constants::{BUSY_TIMEOUT_MS, DB_FILE, PROJECT_DIR};
use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::migrations;

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

/// Walk from `start` up through its ancestors looking for a `.amail`
/// directory and return the directory that contains it.
pub fn find_project_root(start: &Path) -> Result<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(PROJECT_DIR).is_dir())
        .map(Path::to_path_buf)
        .ok_or_else(|| StoreError::NotInProject {
            start: start.to_path_buf(),
        })
}

/// Location of the database file for a project root.
pub fn db_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_DIR).join(DB_FILE)
}

impl Database {
    /// Open (or create) the database file at `path` and configure the
    /// connection. The schema is not touched; call [`Database::init`].
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Busy timeout first: switching to WAL may itself have to wait for
        // another process.
        conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        if !mode.eq_ignore_ascii_case("wal") {
            tracing::warn!(mode = %mode, "database did not switch to WAL mode");
        }

        tracing::debug!(path = %path.display(), "opened database");

        Ok(Self { conn })
    }

    /// Open the project database found from `start`, creating the schema if
    /// needed. Returns the handle and the project root.
    pub fn open_project(start: &Path) -> Result<(Self, PathBuf)> {
        let root = find_project_root(start)?;
        let mut db = Self::open(&db_path(&root))?;
        db.init()?;
        Ok((db, root))
    }

    /// Create tables and indexes if they do not exist. Safe to call on
    /// every process start.
    pub fn init(&mut self) -> Result<()> {
        migrations::run_migrations(&mut self.conn)
    }

    /// Fold the WAL back into the main file without waiting on readers or
    /// writers. Returns `(busy, log_frames, checkpointed_frames)`.
    pub fn checkpoint(&self) -> Result<(i64, i64, i64)> {
        let result = self
            .conn
            .query_row("PRAGMA wal_checkpoint(PASSIVE)", [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?;
        Ok(result)
    }

    /// Checkpoint (best effort) and release the connection.
    ///
    /// A failed checkpoint is logged and otherwise ignored; the next process
    /// to open the file pays for it instead.
    pub fn close(self) -> Result<()> {
        match self.checkpoint() {
            Ok((busy, log, done)) => {
                tracing::debug!(busy, log, done, "checkpointed WAL on close");
            }
            Err(e) => {
                tracing::warn!(error = %e, "WAL checkpoint on close skipped");
            }
        }

        self.conn.close().map_err(|(_, e)| StoreError::from(e))
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return a mutable reference to the underlying connection.
    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::open(&dir.path().join("mail.db")).expect("should open");
        db.init().expect("should init");
        (dir, db)
    }

    #[test]
    fn open_and_init() {
        let (_dir, mut db) = open_temp();
        assert!(db.path().is_some());
        // second init is a no-op
        db.init().unwrap();

        let tables: i64 = db
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'table' AND name IN ('messages', 'recipients')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }

    #[test]
    fn required_indexes_exist() {
        let (_dir, db) = open_temp();
        for index in ["idx_inbox", "idx_thread", "idx_messages_created"] {
            let found: i64 = db
                .conn()
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?1",
                    [index],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(found, 1, "missing index {index}");
        }
    }

    #[test]
    fn connection_pragmas() {
        let (_dir, db) = open_temp();

        let mode: String = db
            .conn()
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");

        let timeout: i64 = db
            .conn()
            .pragma_query_value(None, "busy_timeout", |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 5000);

        let fk: i64 = db
            .conn()
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn close_checkpoints_wal() {
        let (dir, db) = open_temp();
        db.conn()
            .execute(
                "INSERT INTO messages (id, from_id, subject, body, created_at)
                 VALUES ('m1', 'pm', 's', 'b', '2026-01-01T00:00:00.000000000Z')",
                [],
            )
            .unwrap();
        db.close().unwrap();

        // last connection out folds the log back and removes it
        assert!(!dir.path().join("mail.db-wal").exists());

        let db = Database::open(&dir.path().join("mail.db")).unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn checkpoint_with_concurrent_reader_does_not_block() {
        let (dir, db) = open_temp();
        let reader = Database::open(&dir.path().join("mail.db")).unwrap();
        let tx = reader.conn().unchecked_transaction().unwrap();
        let _: i64 = tx
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .unwrap();

        db.conn()
            .execute(
                "INSERT INTO messages (id, from_id, subject, body, created_at)
                 VALUES ('m1', 'pm', 's', 'b', '2026-01-01T00:00:00.000000000Z')",
                [],
            )
            .unwrap();

        // PASSIVE never waits on the open read transaction
        assert!(db.checkpoint().is_ok());
        drop(tx);
        reader.close().unwrap();
        db.close().unwrap();
    }

    #[test]
    fn finds_project_root_from_nested_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(PROJECT_DIR)).unwrap();
        let nested = dir.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();

        let root = find_project_root(&nested).unwrap();
        assert_eq!(root, dir.path());
        assert_eq!(db_path(&root), dir.path().join(".amail").join("mail.db"));
    }

    #[test]
    fn missing_project_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            find_project_root(dir.path()),
            Err(StoreError::NotInProject { .. })
        ));
    }

    #[test]
    fn open_project_initialises_schema() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(PROJECT_DIR)).unwrap();

        let (db, root) = Database::open_project(dir.path()).unwrap();
        assert_eq!(root, dir.path());
        assert_eq!(db.count_unread("dev").unwrap(), 0);
        db.close().unwrap();
    }
}
