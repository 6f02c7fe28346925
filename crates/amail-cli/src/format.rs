//! Human-friendly renderings shared by the text output of several commands.

use amail_shared::constants::USER_ROLE;
use amail_shared::{Priority, ProjectConfig};
use chrono::{DateTime, Local, Utc};

/// "just now", "5 min ago", "3 hours ago", "2 days ago", then a date.
pub fn time_ago(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(at);
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "just now".to_string()
    } else if hours < 1 {
        plural(minutes, "min")
    } else if days < 1 {
        plural(hours, "hour")
    } else if days < 7 {
        plural(days, "day")
    } else {
        at.with_timezone(&Local).format("%b %-d").to_string()
    }
}

fn plural(n: i64, unit: &str) -> String {
    match (n, unit) {
        (1, _) => format!("1 {unit} ago"),
        (_, "min") => format!("{n} min ago"),
        _ => format!("{n} {unit}s ago"),
    }
}

/// Priority column for listings; the two loud levels get a marker.
pub fn priority_label(priority: Priority) -> String {
    match priority {
        Priority::Urgent => "🚨 urgent".to_string(),
        Priority::High => "! high".to_string(),
        other => other.to_string(),
    }
}

pub fn subject_or_placeholder(subject: &str) -> &str {
    if subject.is_empty() {
        "(no subject)"
    } else {
        subject
    }
}

/// Roles for help text, marking the reserved one.
pub fn format_roles(config: &ProjectConfig) -> String {
    config
        .all_roles()
        .iter()
        .map(|role| {
            if role == USER_ROLE {
                format!("{role} (reserved)")
            } else {
                role.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
