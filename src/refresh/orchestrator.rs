// src/refresh/orchestrator.rs

//! One refresh run from picking classifications to the final notification.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::PluginConfig;
use crate::error::RefreshResult;
use crate::history::HistorySource;
use crate::notify::{Notification, Notifier, REFRESH_TITLE};
use crate::zspace::{MediaIndexApi, Session};

use super::categories::determine_categories;
use super::poll::{refresh_category, RefreshOutcome, Sleeper, TokioSleeper};

/// Action name of the remote "refresh now" command.
pub const REFRESH_ACTION: &str = "zsp_media_refresh";

/// Inbound command event, e.g. from a chat bot.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RemoteCommand {
    pub action: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    NothingToRefresh,
    /// Another run was still in progress.
    AlreadyRunning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFailure {
    pub category: String,
    pub error: String,
}

/// What a run did.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    pub refreshed: Vec<RefreshOutcome>,
    /// Target names absent from the server's directory.
    pub skipped: Vec<String>,
    pub failed: Vec<CategoryFailure>,
    pub notifications_sent: usize,
}

impl RunReport {
    fn new(status: RunStatus) -> Self {
        Self {
            status,
            refreshed: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            notifications_sent: 0,
        }
    }
}

/// Clears the running flag when dropped.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct RefreshOrchestrator {
    config: Arc<PluginConfig>,
    history: Arc<dyn HistorySource>,
    api: Arc<dyn MediaIndexApi>,
    notifier: Arc<dyn Notifier>,
    sleeper: Arc<dyn Sleeper>,
    running: AtomicBool,
}

impl RefreshOrchestrator {
    pub fn new(
        config: Arc<PluginConfig>,
        history: Arc<dyn HistorySource>,
        api: Arc<dyn MediaIndexApi>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            history,
            api,
            notifier,
            sleeper: Arc::new(TokioSleeper),
            running: AtomicBool::new(false),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run one refresh. Errors abort the run; per-classification failures do not.
    pub async fn run(&self) -> RefreshResult<RunReport> {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            log::warn!("Refresh: previous run still in progress, skipping this trigger");
            return Ok(RunReport::new(RunStatus::AlreadyRunning));
        };

        let selection = determine_categories(&self.config, self.history.as_ref()).await?;
        if selection.is_empty() {
            log::info!("Refresh: nothing to refresh");
            return Ok(RunReport::new(RunStatus::NothingToRefresh));
        }

        let (_, cookie) = self.config.remote()?;
        let session = Session::from_cookie(cookie)?;
        log::debug!("Refresh: authenticated as {:?}", session);

        let directory = self.api.list_classifications(&session).await?;
        let ids: HashMap<&str, &str> = directory
            .iter()
            .map(|c| (c.name.as_str(), c.id.as_str()))
            .collect();
        let targets = selection.resolve(&directory);

        let notify = self.config.notify;
        let aggregate = self.config.notify_aggregate;
        let mut report = RunReport::new(RunStatus::Completed);
        let mut combined = String::new();

        for name in targets {
            let Some(id) = ids.get(name.as_str()) else {
                log::info!(
                    "Refresh: classification {} is not on the server, skipping",
                    name
                );
                report.skipped.push(name);
                continue;
            };

            match refresh_category(
                self.api.as_ref(),
                self.sleeper.as_ref(),
                &session,
                &name,
                id,
                self.config.poll_interval(),
            )
            .await
            {
                Ok(outcome) => {
                    if notify && aggregate {
                        combined.push_str(&outcome.message());
                    } else if notify
                        && self
                            .deliver(Notification::new(REFRESH_TITLE, outcome.message()))
                            .await
                    {
                        report.notifications_sent += 1;
                    }
                    report.refreshed.push(outcome);
                }
                Err(e) => {
                    log::error!("Refresh: classification {} failed: {}", name, e);
                    report.failed.push(CategoryFailure {
                        category: name,
                        error: e.to_string(),
                    });
                }
            }
        }

        if notify && aggregate {
            if combined.is_empty() {
                combined.push_str("No classification was refreshed\n");
            }
            if self.deliver(Notification::new(REFRESH_TITLE, combined)).await {
                report.notifications_sent += 1;
            }
        }

        log::info!(
            "Refresh: done, {} refreshed, {} skipped, {} failed",
            report.refreshed.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Scheduler entry point: run and log, never fail.
    pub async fn trigger(&self) {
        if let Err(e) = self.run().await {
            log::error!("Refresh: run aborted: {}", e);
        }
    }

    /// Handle an inbound command. Returns false if the command is not ours.
    pub async fn handle_command(&self, command: &RemoteCommand) -> bool {
        if command.action != REFRESH_ACTION {
            return false;
        }
        let ack = |text: &str| {
            Notification::new(text, "").to(command.channel.clone(), command.user.clone())
        };
        self.deliver(ack("Media refresh started ...")).await;
        self.trigger().await;
        self.deliver(ack("Media refresh finished!")).await;
        true
    }

    async fn deliver(&self, notification: Notification) -> bool {
        match self.notifier.send(notification).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Refresh: failed to send notification: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_guard_is_exclusive_and_released() {
        let flag = AtomicBool::new(false);
        {
            let first = RunGuard::acquire(&flag);
            assert!(first.is_some());
            assert!(RunGuard::acquire(&flag).is_none());
        }
        assert!(RunGuard::acquire(&flag).is_some());
    }

    #[test]
    fn test_remote_command_parses_event() {
        let cmd: RemoteCommand = serde_json::from_str(
            r#"{"action": "zsp_media_refresh", "channel": "telegram", "user": "7"}"#,
        )
        .unwrap();
        assert_eq!(cmd.action, REFRESH_ACTION);
        assert_eq!(cmd.channel.as_deref(), Some("telegram"));

        let bare: RemoteCommand = serde_json::from_str(r#"{"action": "other"}"#).unwrap();
        assert_eq!(bare.user, None);
    }
}
