// src/refresh/poll.rs

//! Rescan one classification and wait for the task to leave the running state.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

use crate::error::RemoteApiError;
use crate::zspace::{MediaIndexApi, Session, TaskStatusReply};

/// Waits between polls.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Result of a rescan that reached a terminal status.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub category: String,
    pub task_id: String,
    /// Last reply seen; may be a failure code, it is not interpreted.
    pub final_reply: TaskStatusReply,
    pub started_at: DateTime<Local>,
    pub elapsed: Duration,
    /// Number of times the task was seen still running.
    pub waits: u32,
}

impl RefreshOutcome {
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed.as_secs()
    }

    /// Operator-facing summary.
    pub fn message(&self) -> String {
        format!(
            "Classification: {} refreshed\nStarted: {}\nElapsed: {} s\n",
            self.category,
            self.started_at.format("%Y-%m-%d %H:%M:%S"),
            self.elapsed_secs()
        )
    }
}

/// Submit a rescan for `classification_id` and poll until it is no longer running.
///
/// There is no upper bound on the number of polls.
pub async fn refresh_category(
    api: &dyn MediaIndexApi,
    sleeper: &dyn Sleeper,
    session: &Session,
    category: &str,
    classification_id: &str,
    poll_interval: Duration,
) -> Result<RefreshOutcome, RemoteApiError> {
    let task_id = api.submit_rescan(session, classification_id).await?;
    let started_at = Local::now();
    let started = Instant::now();
    log::info!(
        "Refresh: classification {} rescan started, task {}",
        category,
        task_id
    );

    let mut waits = 0u32;
    loop {
        let reply = api
            .rescan_status(session, classification_id, &task_id)
            .await?;
        if reply.is_in_progress() {
            waits += 1;
            log::info!(
                "Refresh: classification {} still rescanning, waiting {}s (task {})",
                category,
                poll_interval.as_secs(),
                task_id
            );
            sleeper.sleep(poll_interval).await;
            continue;
        }

        log::info!(
            "Refresh: classification {} rescan finished, task {}, code {}, status {:?}",
            category,
            task_id,
            reply.code,
            reply.task_status
        );
        return Ok(RefreshOutcome {
            category: category.to_string(),
            task_id,
            final_reply: reply,
            started_at,
            elapsed: started.elapsed(),
            waits,
        });
    }
}
