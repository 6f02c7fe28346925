//! `amail watch`: poll the inbox and run notification commands for each
//! new arrival.
//!
//! A row counts as new until its `notified_at` is set, so a restarted
//! watcher (or a concurrent `check --notify`) never repeats a notification.

use std::future::Future;
use std::time::Duration;

use amail_shared::constants::DEFAULT_WATCH_INTERVAL_SECS;
use amail_shared::notify::{Notification, Notifier, ShellNotifier};
use amail_shared::ProjectConfig;
use amail_store::{Database, InboxMessage, StoreError};
use anyhow::Context;
use chrono::Local;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::commands::{CliResult, MessageJson, Project};
use crate::output::OutputMode;

pub fn watch(mode: OutputMode, interval: Option<u64>) -> CliResult<()> {
    Project::open()?.with(|project| {
        let me = project.identity()?;
        let period = effective_interval(interval, &project.config);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;

        if !mode.is_json() {
            println!(
                "Watching for messages as {me} in {} (every {}s, Ctrl-C to stop)",
                project.root.display(),
                period.as_secs()
            );
        }
        info!(identity = %me, interval_secs = period.as_secs(), "watcher started");

        runtime.block_on(watch_loop(
            &project.db,
            &project.config,
            &me,
            &ShellNotifier,
            period,
            shutdown_signal(),
            |msg| announce(mode, msg),
        ));

        info!("watcher stopped");
        Ok(())
    })
}

/// `--interval` if positive, else the config value, else the default.
pub fn effective_interval(flag: Option<u64>, config: &ProjectConfig) -> Duration {
    let secs = flag.filter(|s| *s > 0).unwrap_or(config.watch.interval);
    let secs = if secs < 1 {
        DEFAULT_WATCH_INTERVAL_SECS
    } else {
        secs
    };
    Duration::from_secs(secs)
}

/// Tick until `shutdown` resolves. A failed tick is logged and retried on
/// the next one.
pub async fn watch_loop<S, F>(
    db: &Database,
    config: &ProjectConfig,
    me: &str,
    notifier: &dyn Notifier,
    period: Duration,
    shutdown: S,
    mut on_arrival: F,
) where
    S: Future<Output = ()>,
    F: FnMut(&InboxMessage),
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                match poll_once(db, config, me, notifier) {
                    Ok(arrived) => {
                        for msg in &arrived {
                            on_arrival(msg);
                        }
                    }
                    Err(e) => warn!(error = %e, "poll failed"),
                }
            }
        }
    }
}

/// Notify for every unnotified message, oldest first, and stamp each one.
/// Stamping happens whether or not the commands succeeded.
pub fn poll_once(
    db: &Database,
    config: &ProjectConfig,
    me: &str,
    notifier: &dyn Notifier,
) -> Result<Vec<InboxMessage>, StoreError> {
    let pending = db.get_unnotified(me)?;
    for msg in &pending {
        dispatch(config, notifier, msg);
        db.mark_notified(&msg.id, me)?;
    }
    Ok(pending)
}

/// Run the commands configured for the message's priority.
pub fn dispatch(config: &ProjectConfig, notifier: &dyn Notifier, msg: &InboxMessage) {
    let commands = config.notify_commands(msg.priority.as_str());
    if commands.is_empty() {
        return;
    }

    let failures = notifier.notify(commands, &notification(msg));
    if !failures.is_empty() {
        warn!(
            id = %msg.id,
            failed = failures.len(),
            total = commands.len(),
            "some notification commands failed"
        );
    }
}

pub fn notification(msg: &InboxMessage) -> Notification {
    Notification {
        id: msg.id.clone(),
        from: msg.from_id.clone(),
        to: msg.to_ids.join(","),
        subject: msg.subject.clone(),
        body: msg.body.clone(),
        priority: msg.priority.as_str().to_string(),
        msg_type: msg.msg_type.as_str().to_string(),
        timestamp: msg.created_at,
    }
}

fn announce(mode: OutputMode, msg: &InboxMessage) {
    if mode.is_json() {
        match serde_json::to_string(&MessageJson::summary(msg)) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "could not encode arrival"),
        }
    } else {
        println!(
            "[{}] New message from {}: {}",
            Local::now().format("%H:%M:%S"),
            msg.from_id,
            msg.subject
        );
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl-C"),
        _ = terminate => info!("received SIGTERM"),
    }
}
