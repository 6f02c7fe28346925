//! Schema migrations.
//!
//! Guarded by `PRAGMA user_version`. An up-to-date file is detected with a
//! plain read, so opening never takes the write lock. Only when a migration
//! is due is the version re-read and bumped inside one IMMEDIATE
//! transaction: when several processes open a fresh database at once, the
//! loser of the race waits on the busy timeout, then sees the new version
//! and does nothing.

pub mod v001_initial;

use rusqlite::{Connection, TransactionBehavior};

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Apply every migration newer than the file's `user_version`.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let current = user_version(conn)?;
    if current >= CURRENT_VERSION {
        tracing::debug!(version = current, "schema up to date");
        return Ok(());
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let current = user_version(&tx)?;
    if current >= CURRENT_VERSION {
        tracing::debug!(version = current, "schema migrated by another process");
        return Ok(());
    }

    tracing::info!(
        current_version = current,
        target_version = CURRENT_VERSION,
        "migrating mailbox schema"
    );

    if current < 1 {
        v001_initial::up(&tx).map_err(|e| StoreError::Migration(e.to_string()))?;
        tx.pragma_update(None, "user_version", 1)?;
    }

    tx.commit()?;
    Ok(())
}

fn user_version(conn: &Connection) -> Result<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
