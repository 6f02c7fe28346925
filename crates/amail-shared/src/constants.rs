/// Project-local directory holding the database and config
pub const PROJECT_DIR: &str = ".amail";

/// Database file name inside [`PROJECT_DIR`]
pub const DB_FILE: &str = "mail.db";

/// Config file name inside [`PROJECT_DIR`]
pub const CONFIG_FILE: &str = "config.toml";

/// Reserved role for the human operator
pub const USER_ROLE: &str = "user";

/// How long a writer waits on another writer's lock before giving up (ms)
pub const BUSY_TIMEOUT_MS: u64 = 5_000;

/// Random bytes per message id (hex-encoded to twice as many characters)
pub const MESSAGE_ID_BYTES: usize = 8;

/// Characters of a message id shown to humans
pub const SHORT_ID_LEN: usize = 8;

/// Default watcher polling interval in seconds
pub const DEFAULT_WATCH_INTERVAL_SECS: u64 = 2;

/// Maximum body length passed to notification commands (chars)
pub const NOTIFY_BODY_MAX_CHARS: usize = 100;

/// Environment variables
pub const ENV_IDENTITY: &str = "AMAIL_IDENTITY";
pub const ENV_WATCH_INTERVAL: &str = "AMAIL_WATCH_INTERVAL";
pub const ENV_TMUX: &str = "TMUX";

/// Built-in recipient groups
pub const GROUP_ALL: &str = "all";
pub const GROUP_AGENTS: &str = "agents";
pub const GROUP_OTHERS: &str = "others";
