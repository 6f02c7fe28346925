//! # amail-store
//!
//! Per-project mailbox storage backed by SQLite.
//!
//! A [`Database`] wraps one `rusqlite::Connection` to `.amail/mail.db`.
//! Many short-lived CLI processes and a long-lived watcher open the same
//! file at once, so every handle runs in WAL mode with a bounded busy wait
//! and attempts a passive checkpoint when it is closed.
//!
//! Messages are immutable once sent. Everything a recipient can change
//! (read, archived, notified, deleted) lives in the per-recipient row.

pub mod database;
pub mod inbox;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod recipients;
pub mod threads;

mod error;

#[cfg(test)]
mod testing;

pub use database::{db_path, find_project_root, Database};
pub use error::{Result, StoreError};
pub use models::*;
pub use threads::{reply_recipients, ReplyError};
