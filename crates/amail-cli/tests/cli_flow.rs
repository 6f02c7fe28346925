//! End-to-end runs of the `amail` binary against a scratch project.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;

fn amail_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_amail"))
}

struct Project {
    tmp: tempfile::TempDir,
}

impl Project {
    fn init(agents: &str) -> Self {
        let tmp = tempfile::tempdir().expect("tempdir");
        let project = Self { tmp };
        let out = project.run(None, &["--json", "init", "--agents", agents]);
        assert!(out.status.success(), "init failed: {}", stderr(&out));
        project
    }

    fn root(&self) -> &Path {
        self.tmp.path()
    }

    fn run(&self, identity: Option<&str>, args: &[&str]) -> Output {
        run_in(self.root(), identity, args)
    }

    /// Run with `--json` and return the parsed envelope.
    fn json(&self, identity: &str, args: &[&str]) -> Value {
        let mut full = vec!["--json"];
        full.extend_from_slice(args);
        let out = self.run(Some(identity), &full);
        serde_json::from_slice(&out.stdout).unwrap_or_else(|e| {
            panic!(
                "stdout of {args:?} is not JSON ({e}): {}\nstderr: {}",
                String::from_utf8_lossy(&out.stdout),
                stderr(&out)
            )
        })
    }
}

fn run_in(cwd: &Path, identity: Option<&str>, args: &[&str]) -> Output {
    let mut cmd = Command::new(amail_bin());
    cmd.args(args)
        .current_dir(cwd)
        .env_remove("TMUX")
        .env_remove("AMAIL_WATCH_INTERVAL")
        .env_remove("RUST_LOG");
    match identity {
        Some(id) => cmd.env("AMAIL_IDENTITY", id),
        None => cmd.env_remove("AMAIL_IDENTITY"),
    };
    cmd.output().expect("spawn amail")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn send_reply_and_read_through_a_thread() {
    let project = Project::init("pm,dev,qa");

    let sent = project.json("pm", &["send", "dev,qa", "Deploy", "ship it", "-p", "high"]);
    assert_eq!(sent["success"], true);
    assert_eq!(sent["data"]["to"], serde_json::json!(["dev", "qa"]));
    let root_id = sent["data"]["id"].as_str().unwrap().to_string();

    let inbox = project.json("dev", &["inbox"]);
    assert_eq!(inbox["data"]["count"], 1);
    let listed = &inbox["data"]["messages"][0];
    assert_eq!(listed["from"], "pm");
    assert_eq!(listed["priority"], "high");
    assert_eq!(listed["status"], "unread");

    let short = &root_id[..8];
    let reply = project.json("dev", &["reply", short, "on it", "--all"]);
    assert_eq!(reply["data"]["to"], serde_json::json!(["pm", "qa"]));
    assert_eq!(reply["data"]["thread_id"], root_id.as_str());

    let thread = project.json("qa", &["thread", short]);
    assert_eq!(thread["data"]["count"], 2);
    assert_eq!(thread["data"]["messages"][0]["id"], root_id.as_str());
    assert_eq!(thread["data"]["messages"][1]["subject"], "RE: Deploy");

    let read = project.json("dev", &["read", short]);
    assert_eq!(read["data"]["body"], "ship it");
    assert_eq!(project.json("dev", &["count"])["data"]["count"], 0);
    assert_eq!(project.json("qa", &["count"])["data"]["count"], 2);

    let out = project.run(Some("qa"), &["--text", "count"]);
    assert_eq!(stdout(&out).trim(), "2");
}

#[test]
fn errors_carry_codes() {
    let project = Project::init("pm,dev");

    let missing = project.json("dev", &["read", "ffffffff"]);
    assert_eq!(missing["success"], false);
    assert_eq!(missing["error"]["code"], "not_found");

    let unknown = project.json("pm", &["send", "ops", "s", "b"]);
    assert_eq!(unknown["error"]["code"], "invalid_argument");

    let out = project.run(None, &["--json", "inbox"]);
    assert!(!out.status.success());
    let body: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(body["error"]["code"], "identity_not_set");

    let again = project.run(None, &["--json", "init"]);
    assert!(!again.status.success());
}

#[test]
fn delete_only_touches_own_copy() {
    let project = Project::init("pm,dev,qa");
    let sent = project.json("pm", &["send", "@others", "Standup", "10am"]);
    let id = sent["data"]["id"].as_str().unwrap().to_string();

    assert_eq!(project.json("dev", &["delete", &id])["success"], true);
    assert_eq!(project.json("dev", &["inbox", "-a"])["data"]["count"], 0);
    assert_eq!(project.json("qa", &["inbox"])["data"]["count"], 1);
    assert_eq!(project.json("user", &["inbox"])["data"]["count"], 1);
}

#[test]
fn use_prints_export_line_even_when_piped() {
    let project = Project::init("pm,dev");
    let out = project.run(None, &["use", "dev"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out), "export AMAIL_IDENTITY=dev\n");

    let out = project.run(None, &["use", "ops"]);
    assert_eq!(stdout(&out), "export AMAIL_IDENTITY=ops\n");
    assert!(stderr(&out).contains("# Warning: 'ops' is not a configured role"));
}

#[test]
fn count_outside_a_project_is_zero() {
    let tmp = tempfile::tempdir().unwrap();
    let out = run_in(tmp.path(), Some("dev"), &["--text", "count"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out).trim(), "0");
}

#[test]
fn thread_rejects_ambiguous_prefix() {
    let project = Project::init("pm,dev");
    {
        let (mut db, _) = amail_store::Database::open_project(project.root()).unwrap();
        for (id, from, to) in [
            ("abc123aaaaaaaaaa", "pm", "dev"),
            ("abc123bbbbbbbbbb", "dev", "pm"),
        ] {
            let mut msg = amail_store::Message::compose(from, "s", "b");
            msg.id = id.to_string();
            db.send_message(&msg, &[to.to_string()]).unwrap();
        }
        db.close().unwrap();
    }

    let ambiguous = project.json("pm", &["thread", "abc123"]);
    assert_eq!(ambiguous["success"], false);
    assert_eq!(ambiguous["error"]["code"], "ambiguous_prefix");

    let exact = project.json("pm", &["thread", "abc123bbbbbbbbbb"]);
    assert_eq!(exact["data"]["thread_id"], "abc123bbbbbbbbbb");
    let unique = project.json("pm", &["thread", "abc123a"]);
    assert_eq!(unique["data"]["count"], 1);
}
