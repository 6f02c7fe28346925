//! Project configuration loaded from `.amail/config.toml`.
//!
//! Every section is optional; a project with no config file at all behaves
//! as if it had an empty role list and the default notification command.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    CONFIG_FILE, DEFAULT_WATCH_INTERVAL_SECS, ENV_WATCH_INTERVAL, GROUP_AGENTS, GROUP_ALL,
    GROUP_OTHERS, PROJECT_DIR, USER_ROLE,
};
use crate::error::ConfigError;

/// Notification command used when the config does not name one.
pub const DEFAULT_NOTIFY_COMMAND: &str = "echo '📬 New message from {from}: {subject}'";

/// Key of the fallback entry in the `[notify]` table.
pub const DEFAULT_NOTIFY_KEY: &str = "default";

/// Per-project configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Agent roles defined for the project. The reserved `user` role is
    /// always valid and never listed here.
    pub agents: AgentsConfig,

    /// Custom recipient groups, addressed as `@name`.
    pub groups: BTreeMap<String, Vec<String>>,

    /// Identity mappings.
    pub identity: IdentityConfig,

    /// Watcher settings.
    pub watch: WatchConfig,

    /// Notification commands keyed by priority name, plus `default`.
    pub notify: BTreeMap<String, NotifyConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// tmux session name -> role
    pub tmux: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Polling interval in seconds.
    /// Env: `AMAIL_WATCH_INTERVAL`
    /// Default: `2`
    pub interval: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_WATCH_INTERVAL_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    pub commands: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        let mut notify = BTreeMap::new();
        notify.insert(
            DEFAULT_NOTIFY_KEY.to_string(),
            NotifyConfig {
                commands: vec![DEFAULT_NOTIFY_COMMAND.to_string()],
            },
        );

        Self {
            agents: AgentsConfig::default(),
            groups: BTreeMap::new(),
            identity: IdentityConfig::default(),
            watch: WatchConfig::default(),
            notify,
        }
    }
}

/// Path of the config file for a project root.
pub fn config_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_DIR).join(CONFIG_FILE)
}

impl ProjectConfig {
    /// Load the config at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load the config for a project root and apply environment overrides.
    pub fn load_project(project_root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(&config_path(project_root))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse config text. Tables present in the text replace the defaults,
    /// except that the `default` notification entry survives a `[notify]`
    /// table that does not define it.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(text)?;
        if !config.notify.contains_key(DEFAULT_NOTIFY_KEY) {
            config.notify.insert(
                DEFAULT_NOTIFY_KEY.to_string(),
                NotifyConfig {
                    commands: vec![DEFAULT_NOTIFY_COMMAND.to_string()],
                },
            );
        }
        Ok(config)
    }

    /// Override settings from environment variables.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(ENV_WATCH_INTERVAL) {
            match val.trim().parse::<u64>() {
                Ok(secs) => self.watch.interval = secs,
                Err(_) => {
                    tracing::warn!(value = %val, "Invalid {ENV_WATCH_INTERVAL}, using config value");
                }
            }
        }
    }

    /// All defined roles followed by the reserved `user` role.
    pub fn all_roles(&self) -> Vec<String> {
        let mut roles = self.agents.roles.clone();
        roles.push(USER_ROLE.to_string());
        roles
    }

    pub fn is_valid_role(&self, role: &str) -> bool {
        role == USER_ROLE || self.agents.roles.iter().any(|r| r == role)
    }

    /// Resolve `@name` to its members. Returns `None` for anything that is
    /// not an `@`-prefixed, known group.
    ///
    /// Built-ins: `@all` (roles + user), `@agents` (roles only) and
    /// `@others` (everyone except `current`). Built-ins shadow custom groups
    /// of the same name.
    pub fn resolve_group(&self, name: &str, current: &str) -> Option<Vec<String>> {
        let group = name.strip_prefix('@')?;

        match group {
            GROUP_ALL => Some(self.all_roles()),
            GROUP_AGENTS => Some(self.agents.roles.clone()),
            GROUP_OTHERS => Some(
                self.all_roles()
                    .into_iter()
                    .filter(|r| r != current)
                    .collect(),
            ),
            custom => self.groups.get(custom).cloned(),
        }
    }

    /// Notification commands for a priority, falling back to `default`.
    pub fn notify_commands(&self, priority: &str) -> &[String] {
        self.notify
            .get(priority)
            .or_else(|| self.notify.get(DEFAULT_NOTIFY_KEY))
            .map(|n| n.commands.as_slice())
            .unwrap_or(&[])
    }

    /// Commented config written by `amail init`.
    pub fn template(roles: &[String]) -> String {
        let quoted: Vec<String> = roles
            .iter()
            .map(|r| toml::Value::String(r.clone()).to_string())
            .collect();

        format!(
            r#"# amail project configuration

[agents]
roles = [{roles}]

[groups]
# Define custom groups
# engineers = ["dev", "qa"]
# leads = ["pm", "dev"]

[identity.tmux]
# Map tmux session names to roles
# "myproject-dev" = "dev"
# "myproject-pm" = "pm"

[watch]
interval = {interval}  # polling interval in seconds

[notify.default]
commands = [
  "{default_cmd}"
]

[notify.high]
commands = [
  "echo '📬 {{from}}: {{subject}}'"
]

[notify.urgent]
commands = [
  "echo '🚨 URGENT from {{from}}: {{subject}}'"
]
"#,
            roles = quoted.join(", "),
            interval = DEFAULT_WATCH_INTERVAL_SECS,
            default_cmd = DEFAULT_NOTIFY_COMMAND,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ProjectConfig {
        ProjectConfig::parse(
            r#"
[agents]
roles = ["pm", "dev", "qa"]

[groups]
engineers = ["dev", "qa"]
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.watch.interval, 2);
        assert_eq!(config.notify_commands("normal"), [DEFAULT_NOTIFY_COMMAND]);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[agents\nroles = ").unwrap();
        assert!(matches!(
            ProjectConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_template_quotes_unusual_roles() {
        let roles = vec![
            "bell\u{7}".to_string(),
            "say \"hi\"".to_string(),
            "back\\slash".to_string(),
            "héllo".to_string(),
        ];
        let config = ProjectConfig::parse(&ProjectConfig::template(&roles)).unwrap();
        assert_eq!(config.agents.roles, roles);
    }

    #[test]
    fn test_template_parses() {
        let roles = vec!["pm".to_string(), "dev".to_string()];
        let config = ProjectConfig::parse(&ProjectConfig::template(&roles)).unwrap();
        assert_eq!(config.agents.roles, roles);
        assert_eq!(config.watch.interval, 2);
        assert_eq!(
            config.notify_commands("urgent"),
            ["echo '🚨 URGENT from {from}: {subject}'"]
        );
        assert_eq!(config.notify_commands("low"), [DEFAULT_NOTIFY_COMMAND]);
    }

    #[test]
    fn test_notify_table_keeps_default_entry() {
        let config = ProjectConfig::parse(
            r#"
[notify.urgent]
commands = ["say urgent"]
"#,
        )
        .unwrap();
        assert_eq!(config.notify_commands("urgent"), ["say urgent"]);
        assert_eq!(config.notify_commands("normal"), [DEFAULT_NOTIFY_COMMAND]);
    }

    #[test]
    fn test_empty_default_disables_notifications() {
        let config = ProjectConfig::parse("[notify.default]\ncommands = []\n").unwrap();
        assert!(config.notify_commands("normal").is_empty());
    }

    #[test]
    fn test_roles() {
        let config = sample();
        assert_eq!(config.all_roles(), ["pm", "dev", "qa", "user"]);
        assert!(config.is_valid_role("dev"));
        assert!(config.is_valid_role("user"));
        assert!(!config.is_valid_role("ops"));
    }

    #[test]
    fn test_resolve_groups() {
        let config = sample();
        assert_eq!(
            config.resolve_group("@all", "dev").unwrap(),
            ["pm", "dev", "qa", "user"]
        );
        assert_eq!(
            config.resolve_group("@agents", "dev").unwrap(),
            ["pm", "dev", "qa"]
        );
        assert_eq!(
            config.resolve_group("@others", "dev").unwrap(),
            ["pm", "qa", "user"]
        );
        assert_eq!(
            config.resolve_group("@engineers", "pm").unwrap(),
            ["dev", "qa"]
        );
        assert!(config.resolve_group("@nobody", "pm").is_none());
        assert!(config.resolve_group("engineers", "pm").is_none());
    }

    #[test]
    fn test_load_reads_project_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(PROJECT_DIR)).unwrap();
        std::fs::write(
            config_path(dir.path()),
            "[identity.tmux]\n\"proj-dev\" = \"dev\"\n\n[groups]\nengineers = [\"dev\", \"qa\"]\n",
        )
        .unwrap();

        let loaded = ProjectConfig::load(&config_path(dir.path())).unwrap();
        assert_eq!(loaded.identity.tmux["proj-dev"], "dev");
        assert_eq!(loaded.groups["engineers"], ["dev", "qa"]);
    }
}
