//! `send` and `reply`.

use amail_shared::types::short_id;
use amail_shared::{MessageType, Priority, ProjectConfig};
use amail_store::{reply_recipients, Database, InboxMessage, Message};
use serde::Serialize;

use super::{with_identity, CliResult};
use crate::error::CliError;
use crate::output::{print_json, OutputMode};

#[derive(Debug, Serialize)]
struct SentJson {
    id: String,
    short_id: String,
    to: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_id: Option<String>,
}

impl SentJson {
    fn new(msg: &Message, to: Vec<String>) -> Self {
        Self {
            id: msg.id.clone(),
            short_id: short_id(&msg.id).to_string(),
            to,
            thread_id: msg.thread_id.clone(),
        }
    }
}

pub fn send(
    mode: OutputMode,
    to: &str,
    subject: String,
    body: String,
    priority: Priority,
    msg_type: MessageType,
) -> CliResult<()> {
    with_identity(|project, me| {
        let recipients = resolve_recipients(to, me, &project.config)?;
        let msg = Message::compose(me, subject, body)
            .with_priority(priority)
            .with_type(msg_type);

        project.db.send_message(&msg, &recipients)?;

        if mode.is_json() {
            print_json(SentJson::new(&msg, recipients))
        } else {
            println!("{}", sent_notice(&msg, &recipients));
            Ok(())
        }
    })
}

pub fn reply(
    mode: OutputMode,
    prefix: &str,
    body: String,
    all: bool,
    priority: Priority,
    msg_type: MessageType,
) -> CliResult<()> {
    with_identity(|project, me| {
        let parent = find_reply_target(&project.db, prefix, me)?;
        let recipients = reply_recipients(&parent, me, all)?;
        let msg = Message::reply_to(&parent, me, body)
            .with_priority(priority)
            .with_type(msg_type);

        project.db.send_message(&msg, &recipients)?;

        if mode.is_json() {
            print_json(SentJson::new(&msg, recipients))
        } else {
            println!("{}", sent_notice(&msg, &recipients));
            Ok(())
        }
    })
}

/// Confirmation line; ids are shown in their short form.
fn sent_notice(msg: &Message, recipients: &[String]) -> String {
    let mut line = format!("✓ Sent {} to: {}", short_id(&msg.id), recipients.join(", "));
    if let Some(thread_id) = &msg.thread_id {
        line.push_str(&format!(" (thread: {})", short_id(thread_id)));
    }
    line
}

/// A message `me` received, or failing that one `me` sent.
fn find_reply_target(db: &Database, prefix: &str, me: &str) -> CliResult<InboxMessage> {
    if let Some(found) = db.find_in_inbox_by_prefix(prefix, me)? {
        return Ok(found);
    }
    db.find_sent_by_prefix(prefix, me)?
        .ok_or_else(|| CliError::NotFound(prefix.to_string()))
}

/// Expand a comma-separated list of roles and `@groups` into distinct
/// recipients, first occurrence wins, with the sender removed.
pub fn resolve_recipients(
    to: &str,
    me: &str,
    config: &ProjectConfig,
) -> CliResult<Vec<String>> {
    let mut recipients: Vec<String> = Vec::new();

    for part in to.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let members = if part.starts_with('@') {
            config
                .resolve_group(part, me)
                .ok_or_else(|| CliError::InvalidArgument(format!("unknown group: {part}")))?
        } else if config.is_valid_role(part) {
            vec![part.to_string()]
        } else {
            return Err(CliError::InvalidArgument(format!(
                "unknown recipient: {part} (valid roles: {})",
                config.all_roles().join(", ")
            )));
        };

        for member in members {
            if !recipients.contains(&member) {
                recipients.push(member);
            }
        }
    }

    if recipients.is_empty() {
        return Err(CliError::InvalidArgument("no recipients resolved".to_string()));
    }

    recipients.retain(|r| r != me);
    if recipients.is_empty() {
        return Err(CliError::InvalidArgument("cannot send to self only".to_string()));
    }
    Ok(recipients)
}
