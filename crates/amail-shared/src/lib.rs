//! # amail-shared
//!
//! Types and collaborators shared by the amail store and command line:
//! message enums and ids, the per-project TOML configuration, identity
//! resolution and shell notification dispatch.

pub mod config;
pub mod constants;
pub mod error;
pub mod identity;
pub mod notify;
pub mod types;

pub use config::ProjectConfig;
pub use types::{MessageType, Priority, RecipientStatus};
