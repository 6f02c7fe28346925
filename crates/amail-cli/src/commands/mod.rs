//! Command handlers.
//!
//! Each sub-module groups related commands. Handlers take the output mode
//! as a value and print their own results.

pub mod compose;
pub mod info;
pub mod init;
pub mod mailbox;

use std::path::{Path, PathBuf};

use amail_shared::types::short_id;
use amail_shared::{identity, MessageType, Priority, ProjectConfig, RecipientStatus};
use amail_store::{find_project_root, Database, InboxMessage};
use serde::Serialize;

use crate::cli::Command;
use crate::error::CliError;
use crate::output::OutputMode;
use crate::watch;

pub type CliResult<T> = Result<T, CliError>;

pub fn run(command: Command, mode: OutputMode) -> CliResult<()> {
    match command {
        Command::Init { agents } => init::init(mode, &agents),
        Command::Send {
            to,
            subject,
            body,
            priority,
            msg_type,
        } => compose::send(mode, &to, subject, body, priority, msg_type),
        Command::Reply {
            id,
            body,
            all,
            priority,
            msg_type,
        } => compose::reply(mode, &id, body, all, priority, msg_type),
        Command::Inbox { all, from } => mailbox::inbox(mode, all, from.as_deref()),
        Command::Read { id, latest } => mailbox::read(mode, id.as_deref(), latest),
        Command::MarkRead { id, all } => mailbox::mark_read(mode, id.as_deref(), all),
        Command::Archive { id } => mailbox::archive(mode, &id),
        Command::Delete { id } => mailbox::delete(mode, &id),
        Command::Thread { id } => mailbox::thread(mode, &id),
        Command::Count => mailbox::count(mode),
        Command::Check { notify } => mailbox::check(mode, notify),
        Command::Watch { interval } => watch::watch(mode, interval),
        Command::List => info::list(mode),
        Command::Stats => info::stats(mode),
        Command::Whoami => info::whoami(mode),
        Command::Use { role } => info::use_role(&role),
        Command::Version => info::version(mode),
    }
}

// ---------------------------------------------------------------------------
// Project session
// ---------------------------------------------------------------------------

/// An open project: database handle plus its config.
pub struct Project {
    pub db: Database,
    pub root: PathBuf,
    pub config: ProjectConfig,
}

impl Project {
    /// Find the project from the working directory and open it.
    pub fn open() -> CliResult<Self> {
        Self::open_at(&std::env::current_dir()?)
    }

    /// The config is loaded first, so a bad config never leaves an
    /// unclosed database handle behind.
    fn open_at(start: &Path) -> CliResult<Self> {
        let root = find_project_root(start)?;
        let config = ProjectConfig::load_project(&root)?;
        let (db, root) = Database::open_project(&root)?;
        Ok(Self { db, root, config })
    }

    /// The caller's role, or [`amail_shared::error::IdentityError::NotSet`].
    pub fn identity(&self) -> CliResult<String> {
        Ok(identity::require(&self.config)?.identity)
    }

    /// Run `f` against the project, then close the database whatever `f`
    /// returned.
    pub fn with<T>(mut self, f: impl FnOnce(&mut Project) -> CliResult<T>) -> CliResult<T> {
        let result = f(&mut self);
        if let Err(e) = self.db.close() {
            tracing::warn!(error = %e, "closing database failed");
        }
        result
    }
}

/// Open the project, resolve the caller and run `f`.
pub fn with_identity<T>(f: impl FnOnce(&mut Project, &str) -> CliResult<T>) -> CliResult<T> {
    Project::open()?.with(|project| {
        let me = project.identity()?;
        f(project, &me)
    })
}

/// Resolve a full or short id in `me`'s inbox; nothing found is an error
/// here.
pub fn find_in_inbox(db: &Database, prefix: &str, me: &str) -> CliResult<InboxMessage> {
    if let Some(exact) = db.get_message_for_recipient(prefix, me)? {
        return Ok(exact);
    }
    db.find_in_inbox_by_prefix(prefix, me)?
        .ok_or_else(|| CliError::NotFound(prefix.to_string()))
}

// ---------------------------------------------------------------------------
// JSON views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MessageJson {
    pub id: String,
    pub short_id: String,
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub priority: Priority,
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RecipientStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_id: Option<String>,
    pub created_at: String,
}

impl MessageJson {
    /// Listing form, without the body.
    pub fn summary(msg: &InboxMessage) -> Self {
        Self {
            id: msg.id.clone(),
            short_id: short_id(&msg.id).to_string(),
            from: msg.from_id.clone(),
            to: msg.to_ids.clone(),
            subject: msg.subject.clone(),
            body: None,
            priority: msg.priority,
            msg_type: msg.msg_type,
            status: msg.status,
            thread_id: msg.thread_id.clone(),
            reply_to_id: msg.reply_to_id.clone(),
            created_at: msg.created_at.to_rfc3339(),
        }
    }

    pub fn full(msg: &InboxMessage) -> Self {
        Self {
            body: Some(msg.body.clone()),
            ..Self::summary(msg)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageList {
    pub messages: Vec<MessageJson>,
    pub count: usize,
}

impl MessageList {
    pub fn summaries(messages: &[InboxMessage]) -> Self {
        Self {
            messages: messages.iter().map(MessageJson::summary).collect(),
            count: messages.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use amail_store::Message;

    use super::*;

    #[test]
    fn test_message_json_shape() {
        let mut msg = Message::compose("pm", "Deploy", "ship it").with_priority(Priority::High);
        msg.id = "0123456789abcdef".to_string();
        let inbox = InboxMessage {
            message: msg,
            to_ids: vec!["dev".to_string(), "qa".to_string()],
            status: Some(RecipientStatus::Unread),
            read_at: None,
        };

        let summary = serde_json::to_value(MessageJson::summary(&inbox)).unwrap();
        assert_eq!(summary["short_id"], "01234567");
        assert_eq!(summary["to"], serde_json::json!(["dev", "qa"]));
        assert_eq!(summary["priority"], "high");
        assert_eq!(summary["type"], "message");
        assert_eq!(summary["status"], "unread");
        assert!(summary.get("body").is_none());
        assert!(summary.get("thread_id").is_none());

        let full = serde_json::to_value(MessageJson::full(&inbox)).unwrap();
        assert_eq!(full["body"], "ship it");
    }

    #[test]
    fn test_bad_config_is_reported_before_opening_the_database() {
        let dir = tempfile::tempdir().unwrap();
        let amail_dir = dir.path().join(amail_shared::constants::PROJECT_DIR);
        std::fs::create_dir(&amail_dir).unwrap();
        std::fs::write(amail_dir.join("config.toml"), "[agents\nroles = 1").unwrap();

        assert!(matches!(
            Project::open_at(dir.path()),
            Err(CliError::Config(_))
        ));
        assert!(!amail_store::db_path(dir.path()).exists());
    }

    #[test]
    fn test_open_at_finds_root_from_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(amail_shared::constants::PROJECT_DIR)).unwrap();
        let nested = dir.path().join("src/deep");
        std::fs::create_dir_all(&nested).unwrap();

        let project = Project::open_at(&nested).unwrap();
        assert_eq!(project.root, dir.path());
        project.with(|p| Ok(p.db.count_unread("dev")?)).unwrap();
        assert!(amail_store::db_path(dir.path()).exists());
    }
}
