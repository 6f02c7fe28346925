use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("identity not set. Use 'source <(amail use <role>)' or set $AMAIL_IDENTITY")]
    NotSet,

    #[error("role cannot be exported to a shell: {0:?}")]
    Unquotable(String),
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("failed to run notification command `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("notification command `{command}` exited with {status}")]
    Failed { command: String, status: String },
}

/// A string that is not one of an enum's accepted spellings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value} (must be {expected})")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}
