//! Project and identity introspection: `list`, `stats`, `whoami`, `use`,
//! `version`.

use std::collections::BTreeMap;

use amail_shared::constants::{ENV_IDENTITY, GROUP_AGENTS, GROUP_ALL, GROUP_OTHERS};
use amail_shared::identity::{self, Resolution};
use amail_shared::ProjectConfig;
use amail_store::find_project_root;
use serde::Serialize;

use super::{CliResult, Project};
use crate::format::format_roles;
use crate::output::{print_json, OutputMode, Table};

/// Config of the enclosing project, without opening the database.
fn project_config() -> CliResult<ProjectConfig> {
    let root = find_project_root(&std::env::current_dir()?)?;
    Ok(ProjectConfig::load_project(&root)?)
}

#[derive(Debug, Serialize)]
struct ListJson {
    roles: Vec<String>,
    groups: BTreeMap<String, Vec<String>>,
    builtin_groups: Vec<String>,
}

pub fn list(mode: OutputMode) -> CliResult<()> {
    let config = project_config()?;
    let builtin: Vec<String> = [GROUP_ALL, GROUP_AGENTS, GROUP_OTHERS]
        .iter()
        .map(|g| format!("@{g}"))
        .collect();

    if mode.is_json() {
        return print_json(ListJson {
            roles: config.all_roles(),
            groups: config.groups.clone(),
            builtin_groups: builtin,
        });
    }

    println!("Roles: {}", format_roles(&config));
    println!("\nGroups:");
    println!("  @all     all roles including user");
    println!("  @agents  all agent roles");
    println!("  @others  everyone except you");
    for (name, members) in &config.groups {
        println!("  @{name}  {}", members.join(", "));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct RoleStats {
    role: String,
    unread: usize,
    total: usize,
}

#[derive(Debug, Serialize)]
struct StatsJson {
    roles: Vec<RoleStats>,
    unread: usize,
    total: usize,
}

pub fn stats(mode: OutputMode) -> CliResult<()> {
    Project::open()?.with(|project| {
        let mut roles = Vec::new();
        for role in project.config.all_roles() {
            let total = project.db.count_inbox(&role)?;
            if total == 0 {
                continue;
            }
            let unread = project.db.count_unread(&role)?;
            roles.push(RoleStats { role, unread, total });
        }
        let stats = StatsJson {
            unread: roles.iter().map(|r| r.unread).sum(),
            total: roles.iter().map(|r| r.total).sum(),
            roles,
        };

        if mode.is_json() {
            return print_json(stats);
        }

        if stats.roles.is_empty() {
            println!("No messages yet.");
            return Ok(());
        }
        let mut table = Table::new(&["ROLE", "UNREAD", "TOTAL"]);
        for row in &stats.roles {
            table.add_row(vec![
                row.role.clone(),
                row.unread.to_string(),
                row.total.to_string(),
            ]);
        }
        print!("{}", table.render());
        println!("\nTotal: {} unread of {}", stats.unread, stats.total);
        Ok(())
    })
}

#[derive(Debug, Serialize)]
struct WhoamiJson {
    identity: Option<String>,
    source: Option<String>,
    env_var: Option<String>,
    tmux_session: Option<String>,
}

pub fn whoami(mode: OutputMode) -> CliResult<()> {
    let config = project_config()?;
    let resolution = identity::resolve(&config);
    let env_var = std::env::var(ENV_IDENTITY).ok().filter(|v| !v.is_empty());
    let session = identity::tmux_session();

    if mode.is_json() {
        return print_json(WhoamiJson {
            identity: resolution.as_ref().map(|r| r.identity.clone()),
            source: resolution.as_ref().map(|r| r.source.to_string()),
            env_var,
            tmux_session: session,
        });
    }

    print!("{}", render_whoami(resolution.as_ref(), session.as_deref(), &config));
    Ok(())
}

fn render_whoami(
    resolution: Option<&Resolution>,
    session: Option<&str>,
    config: &ProjectConfig,
) -> String {
    if let Some(res) = resolution {
        let mut out = format!("You are: {}\nSource:  {}\n", res.identity, res.source);
        if !config.is_valid_role(&res.identity) {
            out.push_str(&format!(
                "Warning: '{}' is not a configured role ({})\n",
                res.identity,
                config.all_roles().join(", ")
            ));
        }
        return out;
    }

    let tmux = match session {
        Some(name) if config.identity.tmux.contains_key(name) => format!("session '{name}'"),
        Some(name) => format!("session '{name}' has no mapping in [identity.tmux]"),
        None => "not in tmux".to_string(),
    };
    format!(
        "Identity not set.\n\nTried:\n  1. ${ENV_IDENTITY}: not set\n  2. tmux: {tmux}\n\n\
         Set it with: source <(amail use <role>)\n"
    )
}

/// Prints the export line in every output mode so `source <(amail use dev)`
/// keeps working when stdout is a pipe.
pub fn use_role(role: &str) -> CliResult<()> {
    match project_config() {
        Ok(config) if !config.is_valid_role(role) => {
            eprintln!(
                "# Warning: '{role}' is not a configured role (valid roles: {})",
                config.all_roles().join(", ")
            );
        }
        Ok(_) => {}
        Err(e) => tracing::debug!(error = %e, "no project config, skipping role check"),
    }

    println!("{}", identity::export_command(role)?);
    Ok(())
}

#[derive(Debug, Serialize)]
struct VersionJson {
    version: &'static str,
}

pub fn version(mode: OutputMode) -> CliResult<()> {
    let version = env!("CARGO_PKG_VERSION");
    if mode.is_json() {
        print_json(VersionJson { version })
    } else {
        println!("amail {version}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use amail_shared::identity::Source;

    use super::*;

    fn config() -> ProjectConfig {
        ProjectConfig::parse(
            r#"
[agents]
roles = ["pm", "dev"]

[identity.tmux]
"proj-dev" = "dev"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_whoami_resolved() {
        let res = Resolution {
            identity: "dev".to_string(),
            source: Source::TmuxSession("proj-dev".to_string()),
        };
        let out = render_whoami(Some(&res), Some("proj-dev"), &config());
        assert_eq!(
            out,
            "You are: dev\nSource:  tmux session mapping (proj-dev)\n"
        );

        let stranger = Resolution {
            identity: "ops".to_string(),
            source: Source::EnvVar,
        };
        let out = render_whoami(Some(&stranger), None, &config());
        assert!(out.contains("Warning: 'ops' is not a configured role (pm, dev, user)"));
    }

    #[test]
    fn test_whoami_unresolved_shows_chain() {
        let out = render_whoami(None, Some("scratch"), &config());
        assert!(out.starts_with("Identity not set."));
        assert!(out.contains("1. $AMAIL_IDENTITY: not set"));
        assert!(out.contains("session 'scratch' has no mapping"));

        let out = render_whoami(None, None, &config());
        assert!(out.contains("2. tmux: not in tmux"));
    }
}
