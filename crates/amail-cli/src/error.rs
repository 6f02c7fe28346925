use amail_shared::error::{ConfigError, IdentityError};
use amail_store::{ReplyError, StoreError};
use thiserror::Error;

/// Everything a command can fail with. Each variant maps to a stable code
/// for JSON output.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to load config: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Reply(#[from] ReplyError),

    #[error("message not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("amail already initialized in this directory")]
    AlreadyInitialized,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Machine-readable code carried in the JSON error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Store(StoreError::AmbiguousPrefix { .. }) => "ambiguous_prefix",
            CliError::Store(StoreError::NotInProject { .. }) => "not_in_project",
            CliError::Store(e) if e.is_busy() => "busy",
            CliError::Identity(IdentityError::NotSet) => "identity_not_set",
            CliError::NotFound(_) => "not_found",
            CliError::InvalidArgument(_) | CliError::Reply(_) | CliError::AlreadyInitialized => {
                "invalid_argument"
            }
            _ => "error",
        }
    }
}
