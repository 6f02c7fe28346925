//! Reading and managing one's own inbox.

use amail_shared::notify::{truncate, ShellNotifier};
use amail_shared::types::short_id;
use amail_store::InboxMessage;
use chrono::{Local, Utc};
use serde::Serialize;

use super::{find_in_inbox, with_identity, CliResult, MessageJson, MessageList, Project};
use crate::error::CliError;
use crate::format::{priority_label, subject_or_placeholder, time_ago};
use crate::output::{print_json, OutputMode, Table};
use crate::watch;

const RULE_WIDTH: usize = 60;

#[derive(Debug, Serialize)]
struct Changed {
    id: String,
    short_id: String,
}

impl Changed {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            short_id: short_id(id).to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Count {
    count: usize,
}

pub fn inbox(mode: OutputMode, all: bool, from: Option<&str>) -> CliResult<()> {
    with_identity(|project, me| {
        let messages = match from {
            Some(sender) => project.db.get_inbox_from(me, sender, all)?,
            None => project.db.get_inbox(me, all)?,
        };

        if mode.is_json() {
            return print_json(MessageList::summaries(&messages));
        }

        if messages.is_empty() {
            println!("{}", if all { "No messages." } else { "No unread messages." });
        } else {
            print!("{}", render_inbox(&messages));
        }
        Ok(())
    })
}

fn render_inbox(messages: &[InboxMessage]) -> String {
    let now = Utc::now();
    let mut table = Table::new(&["ID", "FROM", "SUBJECT", "TO", "PRIORITY", "TIME"]);

    for msg in messages {
        let marker = if msg.is_unread() { "*" } else { "" };
        table.add_row(vec![
            format!("{marker}{}", short_id(&msg.id)),
            msg.from_id.clone(),
            truncate(subject_or_placeholder(&msg.subject), 30),
            truncate(&msg.to_ids.join(","), 20),
            priority_label(msg.priority),
            time_ago(msg.created_at, now),
        ]);
    }
    table.render()
}

pub fn read(mode: OutputMode, prefix: Option<&str>, latest: bool) -> CliResult<()> {
    with_identity(|project, me| {
        let msg = if latest {
            match project.db.get_latest_unread(me)? {
                Some(msg) => msg,
                None if mode.is_json() => {
                    return print_json(Option::<MessageJson>::None);
                }
                None => {
                    println!("No unread messages.");
                    return Ok(());
                }
            }
        } else {
            let prefix = prefix.ok_or_else(|| {
                CliError::InvalidArgument("message ID required (or use --latest)".to_string())
            })?;
            find_in_inbox(&project.db, prefix, me)?
        };

        if mode.is_json() {
            print_json(MessageJson::full(&msg))?;
        } else {
            print!("{}", render_message(&msg));
        }

        if msg.is_unread() {
            project.db.mark_read(&msg.id, me)?;
        }
        Ok(())
    })
}

/// Header block, rule, blank line, body.
fn render_message(msg: &InboxMessage) -> String {
    let rule = "-".repeat(RULE_WIDTH);
    let local = msg.created_at.with_timezone(&Local);
    let mut out = String::new();

    out.push_str(&format!("{rule}\n"));
    out.push_str(&format!("ID:       {}\n", msg.id));
    out.push_str(&format!("From:     {}\n", msg.from_id));
    out.push_str(&format!("To:       {}\n", msg.to_ids.join(", ")));
    out.push_str(&format!("Subject:  {}\n", msg.subject));
    out.push_str(&format!("Priority: {}\n", msg.priority));
    out.push_str(&format!("Type:     {}\n", msg.msg_type));
    out.push_str(&format!(
        "Time:     {} ({})\n",
        local.format("%Y-%m-%d %H:%M:%S"),
        time_ago(msg.created_at, Utc::now())
    ));
    if let Some(thread_id) = &msg.thread_id {
        out.push_str(&format!("Thread:   {thread_id}\n"));
    }
    out.push_str(&format!("{rule}\n\n{}\n\n", msg.body));
    out
}

pub fn mark_read(mode: OutputMode, prefix: Option<&str>, all: bool) -> CliResult<()> {
    with_identity(|project, me| {
        if all {
            let count = project.db.mark_all_read(me)?;
            return if mode.is_json() {
                print_json(Count { count })
            } else {
                println!("✓ Marked {count} messages as read");
                Ok(())
            };
        }

        let prefix = prefix.ok_or_else(|| {
            CliError::InvalidArgument("message ID required (or use --all)".to_string())
        })?;
        let msg = find_in_inbox(&project.db, prefix, me)?;
        project.db.mark_read(&msg.id, me)?;

        report_change(mode, &msg.id, "Marked", " as read")
    })
}

pub fn archive(mode: OutputMode, prefix: &str) -> CliResult<()> {
    with_identity(|project, me| {
        let msg = find_in_inbox(&project.db, prefix, me)?;
        project.db.archive(&msg.id, me)?;
        report_change(mode, &msg.id, "Archived", "")
    })
}

pub fn delete(mode: OutputMode, prefix: &str) -> CliResult<()> {
    with_identity(|project, me| {
        let msg = find_in_inbox(&project.db, prefix, me)?;
        project.db.delete(&msg.id, me)?;
        report_change(mode, &msg.id, "Deleted", "")
    })
}

fn report_change(mode: OutputMode, id: &str, verb: &str, suffix: &str) -> CliResult<()> {
    if mode.is_json() {
        print_json(Changed::new(id))
    } else {
        println!("✓ {verb} {}{suffix}", short_id(id));
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ThreadJson {
    thread_id: String,
    subject: String,
    messages: Vec<MessageJson>,
    count: usize,
}

/// Threads are readable by anyone in the project, so no identity is needed.
pub fn thread(mode: OutputMode, prefix: &str) -> CliResult<()> {
    Project::open()?.with(|project| {
        let msg = match project.db.get_message(prefix)? {
            Some(msg) => msg,
            None => project
                .db
                .find_message_by_prefix(prefix)?
                .ok_or_else(|| CliError::NotFound(prefix.to_string()))?,
        };
        let root = msg.thread_root().to_string();
        let messages = project.db.get_thread(&root)?;

        if mode.is_json() {
            return print_json(ThreadJson {
                subject: messages
                    .first()
                    .map(|m| m.subject.clone())
                    .unwrap_or_default(),
                thread_id: root,
                count: messages.len(),
                messages: messages.iter().map(MessageJson::full).collect(),
            });
        }

        print!("{}", render_thread(&messages));
        Ok(())
    })
}

fn render_thread(messages: &[InboxMessage]) -> String {
    let Some(first) = messages.first() else {
        return "No messages in thread.\n".to_string();
    };

    let now = Utc::now();
    let mut out = format!(
        "Thread: {} ({} messages)\n{}\n",
        subject_or_placeholder(&first.subject),
        messages.len(),
        "=".repeat(RULE_WIDTH)
    );
    for msg in messages {
        out.push_str(&format!(
            "\n[{}] {} -> {} ({})\n{}\n",
            short_id(&msg.id),
            msg.from_id,
            msg.to_ids.join(", "),
            time_ago(msg.created_at, now),
            msg.body
        ));
    }
    out
}

/// Status-bar friendly: never fails, prints 0 when anything goes wrong.
pub fn count(mode: OutputMode) -> CliResult<()> {
    let count = match unread_count() {
        Ok(count) => count,
        Err(e) => {
            tracing::debug!(error = %e, "count unavailable, reporting 0");
            0
        }
    };

    if mode.is_json() {
        print_json(Count { count })
    } else {
        println!("{count}");
        Ok(())
    }
}

fn unread_count() -> CliResult<usize> {
    with_identity(|project, me| Ok(project.db.count_unread(me)?))
}

pub fn check(mode: OutputMode, notify: bool) -> CliResult<()> {
    with_identity(|project, me| {
        let messages = project.db.get_inbox(me, false)?;

        if notify {
            notify_all(project, me, &messages)?;
        }

        if mode.is_json() {
            return print_json(MessageList::summaries(&messages));
        }

        if messages.is_empty() {
            println!("No unread messages.");
            return Ok(());
        }

        println!("{} unread message(s)\n", messages.len());
        let now = Utc::now();
        for msg in &messages {
            if notify {
                println!("Notified: [{}] {} - {}", short_id(&msg.id), msg.from_id, msg.subject);
            } else {
                println!(
                    "  [{}] {}: {} ({})",
                    short_id(&msg.id),
                    msg.from_id,
                    msg.subject,
                    time_ago(msg.created_at, now)
                );
            }
        }
        if !notify {
            println!("\nUse --notify to trigger notifications");
        }
        Ok(())
    })
}

/// Fire notifications for every listed message and record them as notified,
/// so a running watcher does not repeat them.
fn notify_all(project: &Project, me: &str, messages: &[InboxMessage]) -> CliResult<()> {
    for msg in messages {
        watch::dispatch(&project.config, &ShellNotifier, msg);
        project.db.mark_notified(&msg.id, me)?;
    }
    Ok(())
}
