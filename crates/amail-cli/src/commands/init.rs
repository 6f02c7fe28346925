use std::path::{Path, PathBuf};

use amail_shared::config::config_path;
use amail_shared::constants::{PROJECT_DIR, USER_ROLE};
use amail_shared::ProjectConfig;
use amail_store::{db_path, Database};
use serde::Serialize;

use super::CliResult;
use crate::error::CliError;
use crate::output::{print_json, OutputMode};

#[derive(Debug, Serialize)]
struct InitJson {
    root: PathBuf,
    roles: Vec<String>,
}

pub fn init(mode: OutputMode, agents: &[String]) -> CliResult<()> {
    let root = std::env::current_dir()?;
    let roles = init_project(&root, agents)?;

    if mode.is_json() {
        return print_json(InitJson { root, roles });
    }

    println!("✓ Initialized amail in {}", root.join(PROJECT_DIR).display());
    if roles.is_empty() {
        println!("\nNo agent roles yet; add them under [agents] in .amail/config.toml");
    } else {
        println!("\nRoles: {} (+ {USER_ROLE})", roles.join(", "));
    }
    println!("\nNext steps:");
    println!("  source <(amail use <role>)   # set your identity");
    println!("  amail send <role> \"subject\" \"body\"");
    println!("  amail inbox");
    Ok(())
}

/// Create `.amail/` under `root` with a config template and an initialised
/// database. Returns the agent roles written to the config.
fn init_project(root: &Path, agents: &[String]) -> CliResult<Vec<String>> {
    let dir = root.join(PROJECT_DIR);
    if dir.exists() {
        return Err(CliError::AlreadyInitialized);
    }
    std::fs::create_dir_all(&dir)?;

    let roles = agent_roles(agents);
    std::fs::write(config_path(root), ProjectConfig::template(&roles))?;

    let mut db = Database::open(&db_path(root))?;
    db.init()?;
    db.close()?;

    tracing::info!(root = %root.display(), roles = roles.len(), "initialized project");
    Ok(roles)
}

/// Trimmed, de-duplicated roles without the reserved user role.
fn agent_roles(agents: &[String]) -> Vec<String> {
    let mut roles: Vec<String> = Vec::new();
    for role in agents.iter().map(|r| r.trim()) {
        if role.is_empty() || role == USER_ROLE || roles.iter().any(|r| r == role) {
            continue;
        }
        roles.push(role.to_string());
    }
    roles
}
