//! Who is running this command.
//!
//! Roles are a convention, not a credential: the identity is whatever the
//! environment says it is. Resolution order is `$AMAIL_IDENTITY`, then the
//! tmux session mapping in the project config, then nothing.

use std::fmt;
use std::process::Command;

use crate::config::ProjectConfig;
use crate::constants::{ENV_IDENTITY, ENV_TMUX};
use crate::error::IdentityError;

/// Where a resolved identity came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    EnvVar,
    TmuxSession(String),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::EnvVar => write!(f, "environment variable (${ENV_IDENTITY})"),
            Source::TmuxSession(session) => write!(f, "tmux session mapping ({session})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub identity: String,
    pub source: Source,
}

/// Resolve the identity from the live process environment.
pub fn resolve(config: &ProjectConfig) -> Option<Resolution> {
    let env_identity = std::env::var(ENV_IDENTITY).ok();
    resolve_from(env_identity.as_deref(), tmux_session().as_deref(), config)
}

/// Like [`resolve`], but an unresolved identity is an error.
pub fn require(config: &ProjectConfig) -> Result<Resolution, IdentityError> {
    resolve(config).ok_or(IdentityError::NotSet)
}

/// Resolution chain over explicit inputs.
pub fn resolve_from(
    env_identity: Option<&str>,
    tmux_session: Option<&str>,
    config: &ProjectConfig,
) -> Option<Resolution> {
    if let Some(id) = env_identity.filter(|id| !id.is_empty()) {
        return Some(Resolution {
            identity: id.to_string(),
            source: Source::EnvVar,
        });
    }

    let session = tmux_session.filter(|s| !s.is_empty())?;
    let role = config.identity.tmux.get(session)?;
    Some(Resolution {
        identity: role.clone(),
        source: Source::TmuxSession(session.to_string()),
    })
}

pub fn in_tmux() -> bool {
    std::env::var_os(ENV_TMUX).is_some_and(|v| !v.is_empty())
}

/// Current tmux session name, if running inside tmux.
pub fn tmux_session() -> Option<String> {
    if !in_tmux() {
        return None;
    }

    let output = Command::new("tmux")
        .args(["display-message", "-p", "#S"])
        .output()
        .map_err(|e| tracing::debug!(error = %e, "tmux not available"))
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let session = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!session.is_empty()).then_some(session)
}

/// Shell line that sets the identity for the current shell, meant for
/// `source <(amail use <role>)`.
pub fn export_command(role: &str) -> Result<String, IdentityError> {
    let quoted =
        shlex::try_quote(role).map_err(|_| IdentityError::Unquotable(role.to_string()))?;
    Ok(format!("export {ENV_IDENTITY}={quoted}"))
}
