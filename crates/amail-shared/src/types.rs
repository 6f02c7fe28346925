use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{MESSAGE_ID_BYTES, SHORT_ID_LEN};
use crate::error::ParseEnumError;

/// Generate a fresh random message id (16 lowercase hex chars).
pub fn generate_message_id() -> String {
    let bytes: [u8; MESSAGE_ID_BYTES] = rand::random();
    hex::encode(bytes)
}

/// First [`SHORT_ID_LEN`] characters of an id, or the whole id if shorter.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Implements `as_str`, `Display` and `FromStr` for a unit-only enum from a
/// single table of spellings.
macro_rules! string_enum {
    ($ty:ident, $kind:literal, $expected:literal, { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $s),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok($ty::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                        expected: $expected,
                    }),
                }
            }
        }
    };
}

/// Delivery priority; selects which notification commands fire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

string_enum!(Priority, "priority", "low, normal, high, or urgent", {
    Low => "low",
    Normal => "normal",
    High => "high",
    Urgent => "urgent",
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Message,
    Request,
    Response,
    Notification,
}

string_enum!(MessageType, "type", "message, request, response, or notification", {
    Message => "message",
    Request => "request",
    Response => "response",
    Notification => "notification",
});

/// Per-recipient state of a delivered message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientStatus {
    #[default]
    Unread,
    Read,
    Archived,
}

string_enum!(RecipientStatus, "status", "unread, read, or archived", {
    Unread => "unread",
    Read => "read",
    Archived => "archived",
});
