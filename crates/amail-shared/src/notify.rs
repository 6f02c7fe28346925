//! Shell notification dispatch.
//!
//! Commands come from the project config and may reference message fields
//! with `{from}`, `{subject}` and friends. Field values never enter the
//! command text: each placeholder becomes a reference to an `AMAIL_*`
//! environment variable that is set on the child process, so hostile
//! subjects cannot inject shell syntax.

use std::process::Command;

use chrono::{DateTime, Local, Utc};

use crate::constants::NOTIFY_BODY_MAX_CHARS;
use crate::error::NotifyError;

/// Flat snapshot of a message handed to notification commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: String,
    pub from: String,
    /// Recipients, comma-joined.
    pub to: String,
    pub subject: String,
    pub body: String,
    pub priority: String,
    pub msg_type: String,
    pub timestamp: DateTime<Utc>,
}

/// Placeholder name -> environment variable.
const PLACEHOLDERS: &[(&str, &str)] = &[
    ("id", "AMAIL_ID"),
    ("from", "AMAIL_FROM"),
    ("to", "AMAIL_TO"),
    ("subject", "AMAIL_SUBJECT"),
    ("body", "AMAIL_BODY"),
    ("priority", "AMAIL_PRIORITY"),
    ("type", "AMAIL_TYPE"),
    ("timestamp", "AMAIL_TIMESTAMP"),
];

impl Notification {
    fn env(&self) -> [(&'static str, String); 8] {
        [
            ("AMAIL_ID", self.id.clone()),
            ("AMAIL_FROM", self.from.clone()),
            ("AMAIL_TO", self.to.clone()),
            ("AMAIL_SUBJECT", self.subject.clone()),
            ("AMAIL_BODY", one_line(&self.body, NOTIFY_BODY_MAX_CHARS)),
            ("AMAIL_PRIORITY", self.priority.clone()),
            ("AMAIL_TYPE", self.msg_type.clone()),
            (
                "AMAIL_TIMESTAMP",
                self.timestamp.with_timezone(&Local).format("%H:%M:%S").to_string(),
            ),
        ]
    }
}

/// Something that can deliver a notification.
pub trait Notifier {
    /// Run every command for `msg`, returning the failures.
    fn notify(&self, commands: &[String], msg: &Notification) -> Vec<NotifyError>;
}

/// Runs each command through `sh -c`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellNotifier;

impl Notifier for ShellNotifier {
    fn notify(&self, commands: &[String], msg: &Notification) -> Vec<NotifyError> {
        dispatch_all(commands, msg)
    }
}

/// Run one command with the message fields in its environment.
pub fn dispatch(command: &str, msg: &Notification) -> Result<(), NotifyError> {
    let script = substitute_placeholders(command);
    let status = Command::new("sh")
        .arg("-c")
        .arg(&script)
        .envs(msg.env())
        .status()
        .map_err(|source| NotifyError::Spawn {
            command: command.to_string(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(NotifyError::Failed {
            command: command.to_string(),
            status: status.to_string(),
        })
    }
}

/// Run every command; one failing does not stop the rest.
pub fn dispatch_all(commands: &[String], msg: &Notification) -> Vec<NotifyError> {
    commands
        .iter()
        .filter_map(|cmd| dispatch(cmd, msg).err())
        .inspect(|e| tracing::warn!(error = %e, "notification command failed"))
        .collect()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
}

/// Rewrite `{name}` placeholders into variable references that expand
/// correctly in whatever quoting context they appear in.
fn substitute_placeholders(template: &str) -> String {
    let mut out = String::with_capacity(template.len() + 32);
    let mut quote = Quote::None;
    let mut rest = template;

    while let Some(c) = rest.chars().next() {
        if c == '{' {
            if let Some((var, len)) = match_placeholder(rest) {
                match quote {
                    Quote::None => out.push_str(&format!("\"${var}\"")),
                    Quote::Double => out.push_str(&format!("${{{var}}}")),
                    // close the single-quoted run, expand, reopen
                    Quote::Single => out.push_str(&format!("'\"${var}\"'")),
                }
                rest = &rest[len..];
                continue;
            }
        }

        out.push(c);
        rest = &rest[c.len_utf8()..];

        match (quote, c) {
            (Quote::None, '\'') => quote = Quote::Single,
            (Quote::Single, '\'') => quote = Quote::None,
            (Quote::None, '"') => quote = Quote::Double,
            (Quote::Double, '"') => quote = Quote::None,
            (Quote::None | Quote::Double, '\\') => {
                if let Some(next) = rest.chars().next() {
                    out.push(next);
                    rest = &rest[next.len_utf8()..];
                }
            }
            _ => {}
        }
    }

    out
}

fn match_placeholder(s: &str) -> Option<(&'static str, usize)> {
    let end = s.find('}')?;
    let name = &s[1..end];
    PLACEHOLDERS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, var)| (*var, end + 1))
}

/// Collapse newlines and truncate to `max_chars` (counting chars, not bytes).
pub fn one_line(s: &str, max_chars: usize) -> String {
    let flat = s.replace('\r', "").replace('\n', " ");
    truncate(&flat, max_chars)
}

/// Truncate to `max_chars`, ending in `...` when something was cut.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars <= 3 {
        return s.chars().take(max_chars).collect();
    }
    let mut out: String = s.chars().take(max_chars - 3).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Notification {
        Notification {
            id: "abc123".to_string(),
            from: "pm".to_string(),
            to: "dev,qa".to_string(),
            subject: "It's $HOME; `whoami`".to_string(),
            body: "line one\nline two".to_string(),
            priority: "urgent".to_string(),
            msg_type: "notification".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_substitution_by_quote_context() {
        assert_eq!(substitute_placeholders("echo {from}"), "echo \"$AMAIL_FROM\"");
        assert_eq!(
            substitute_placeholders("echo \"from {from}\""),
            "echo \"from ${AMAIL_FROM}\""
        );
        assert_eq!(
            substitute_placeholders("echo 'from {from}'"),
            "echo 'from '\"$AMAIL_FROM\"''"
        );
    }

    #[test]
    fn test_unknown_placeholders_are_left_alone() {
        assert_eq!(substitute_placeholders("echo {nope} {"), "echo {nope} {");
        assert_eq!(substitute_placeholders("awk '{print $1}'"), "awk '{print $1}'");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 100), "short");
        assert_eq!(truncate("exactly ten", 11), "exactly ten");
        assert_eq!(truncate("this is a longer string", 10), "this is...");
        assert_eq!(truncate("héllo wörld", 8), "héllo...");
        assert_eq!(truncate("abcdef", 2), "ab");
        assert_eq!(one_line("with\nnewlines\r\nhere", 100), "with newlines here");
    }

    #[cfg(unix)]
    #[test]
    fn test_dispatch_passes_values_through_environment() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let cmd = format!(
            "printf '%s|%s|%s' '{{subject}}' \"{{to}}\" {{body}} > '{}'",
            out.display()
        );

        dispatch(&cmd, &sample()).unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written, "It's $HOME; `whoami`|dev,qa|line one line two");
    }

    #[cfg(unix)]
    #[test]
    fn test_dispatch_all_collects_failures() {
        let commands = vec!["true".to_string(), "false".to_string(), "true".to_string()];
        let errors = dispatch_all(&commands, &sample());
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], NotifyError::Failed { ref command, .. } if command == "false"));

        let commands = vec!["true".to_string(), "true".to_string()];
        assert!(ShellNotifier.notify(&commands, &sample()).is_empty());
    }
}
