//! Fixtures shared by the unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::database::Database;
use crate::models::Message;

/// Fresh, initialised database in a scratch directory. Keep the `TempDir`
/// alive for as long as the handle is used.
pub fn temp_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let mut db = Database::open(&dir.path().join("mail.db")).unwrap();
    db.init().unwrap();
    (dir, db)
}

pub fn at(offset_secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap() + Duration::seconds(offset_secs)
}

/// A top-level message with a fixed id and a deterministic timestamp.
pub fn message(id: &str, from: &str, offset_secs: i64) -> Message {
    let mut msg = Message::compose(from, format!("subject {id}"), format!("body {id}"));
    msg.id = id.to_string();
    msg.created_at = at(offset_secs);
    msg
}

pub fn to(roles: &[&str]) -> Vec<String> {
    roles.iter().map(|r| r.to_string()).collect()
}
