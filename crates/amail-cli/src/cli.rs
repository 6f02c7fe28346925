use amail_shared::{MessageType, Priority};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "amail",
    version,
    about = "Per-project mailbox for coding agents and their human"
)]
pub struct Cli {
    /// Force JSON output
    #[arg(long, global = true, conflicts_with = "text")]
    pub json: bool,

    /// Force human-readable output
    #[arg(long, global = true)]
    pub text: bool,

    /// Debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create .amail/ with a config template and an empty database
    Init {
        /// Comma-separated agent roles
        #[arg(long, value_delimiter = ',')]
        agents: Vec<String>,
    },

    /// Send a message to roles or @groups (comma-separated)
    Send {
        to: String,
        subject: String,
        body: String,
        #[arg(short, long, default_value = "normal")]
        priority: Priority,
        #[arg(short = 't', long = "type", default_value = "message")]
        msg_type: MessageType,
    },

    /// Reply to the sender, or with --all to everyone on the message
    Reply {
        id: String,
        body: String,
        /// Sender plus all original recipients, minus you
        #[arg(long)]
        all: bool,
        #[arg(short, long, default_value = "normal")]
        priority: Priority,
        #[arg(short = 't', long = "type", default_value = "response")]
        msg_type: MessageType,
    },

    /// List unread messages, newest first
    Inbox {
        /// Include read and archived messages
        #[arg(short, long)]
        all: bool,
        /// Only messages from this role
        #[arg(long)]
        from: Option<String>,
    },

    /// Show a message and mark it read
    Read {
        id: Option<String>,
        /// The most recent unread message
        #[arg(long, conflicts_with = "id")]
        latest: bool,
    },

    /// Mark one message, or with --all every unread message, as read
    MarkRead {
        id: Option<String>,
        #[arg(long, conflicts_with = "id")]
        all: bool,
    },

    /// Hide a message from the default inbox listing
    Archive { id: String },

    /// Remove a message from your inbox (other recipients keep it)
    Delete { id: String },

    /// Show the whole thread a message belongs to, oldest first
    Thread { id: String },

    /// Print the unread count; prints 0 on any error
    Count,

    /// List unread messages, optionally firing notifications for them
    Check {
        #[arg(long)]
        notify: bool,
    },

    /// Poll for new messages and run notification commands
    Watch {
        /// Seconds between polls
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Show roles and groups
    List,

    /// Per-role message counts
    Stats,

    /// Show the resolved identity and where it came from
    Whoami,

    /// Print a shell line that sets your identity: source <(amail use dev)
    Use { role: String },

    /// Print the version
    Version,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_send_flags() {
        let cli = Cli::try_parse_from([
            "amail", "send", "dev,@qa", "subject", "body", "-p", "urgent", "-t", "request",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Command::Send {
                to,
                priority,
                msg_type,
                ..
            } => {
                assert_eq!(to, "dev,@qa");
                assert_eq!(priority, Priority::Urgent);
                assert_eq!(msg_type, MessageType::Request);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_reply_defaults_to_response() {
        let cli = Cli::try_parse_from(["amail", "reply", "abc123", "ok"]).unwrap();
        match cli.command {
            Command::Reply {
                all,
                priority,
                msg_type,
                ..
            } => {
                assert!(!all);
                assert_eq!(priority, Priority::Normal);
                assert_eq!(msg_type, MessageType::Response);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(Cli::try_parse_from(["amail", "send", "dev", "s", "b", "-p", "asap"]).is_err());
        assert!(Cli::try_parse_from(["amail", "--json", "--text", "count"]).is_err());
        assert!(Cli::try_parse_from(["amail", "read", "abc", "--latest"]).is_err());
    }

    #[test]
    fn test_init_agents_list() {
        let cli = Cli::try_parse_from(["amail", "init", "--agents", "pm,dev,qa"]).unwrap();
        match cli.command {
            Command::Init { agents } => assert_eq!(agents, ["pm", "dev", "qa"]),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
