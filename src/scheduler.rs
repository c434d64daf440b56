// src/scheduler.rs

//! Cron and run-once wiring for the refresh job.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::refresh::RefreshOrchestrator;

/// Delay before the run-once job fires after start-up.
pub const RUN_ONCE_DELAY: Duration = Duration::from_secs(3);

/// Accept crontab's five fields by prepending a seconds field.
pub fn to_scheduler_cron(expr: &str) -> String {
    let expr = expr.trim();
    if expr.split_whitespace().count() == 5 {
        format!("0 {}", expr)
    } else {
        expr.to_string()
    }
}

/// A started scheduler and what it was given to do.
pub struct RefreshSchedule {
    scheduler: JobScheduler,
    recurring: bool,
    run_once_done: Option<Arc<Notify>>,
}

impl RefreshSchedule {
    /// True when a cron job was registered.
    pub fn is_recurring(&self) -> bool {
        self.recurring
    }

    pub fn has_run_once(&self) -> bool {
        self.run_once_done.is_some()
    }

    /// Resolves once the run-once job has finished. Pending forever if there is none.
    pub async fn run_once_finished(&self) {
        match &self.run_once_done {
            Some(done) => done.notified().await,
            None => std::future::pending().await,
        }
    }

    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        self.scheduler.shutdown().await?;
        Ok(())
    }
}

/// Schedule the refresh according to the orchestrator's configuration.
///
/// Returns `None` when nothing is scheduled. A bad cron expression is logged
/// and skipped so a run-once request still goes ahead. Cron times are read in
/// the host's local timezone.
pub async fn start_scheduler(
    orchestrator: Arc<RefreshOrchestrator>,
) -> anyhow::Result<Option<RefreshSchedule>> {
    start_scheduler_with_delay(orchestrator, RUN_ONCE_DELAY).await
}

pub async fn start_scheduler_with_delay(
    orchestrator: Arc<RefreshOrchestrator>,
    run_once_delay: Duration,
) -> anyhow::Result<Option<RefreshSchedule>> {
    let config = orchestrator.config().clone();
    if !config.enabled && !config.run_once {
        log::info!("Scheduler: refresh is disabled");
        return Ok(None);
    }

    let scheduler = JobScheduler::new().await?;
    let mut run_once_done = None;
    let mut recurring = false;

    if config.run_once {
        log::info!("Scheduler: running refresh once in {:?}", run_once_delay);
        let done = Arc::new(Notify::new());
        let orch = orchestrator.clone();
        let signal = done.clone();
        let job = Job::new_one_shot_async(run_once_delay, move |_uuid, _l| {
            let orch = orch.clone();
            let signal = signal.clone();
            Box::pin(async move {
                orch.trigger().await;
                signal.notify_one();
            })
        })?;
        scheduler.add(job).await?;
        run_once_done = Some(done);
    }

    if let Some(cron) = config.cron.as_deref().filter(|c| config.enabled && !c.trim().is_empty()) {
        let expr = to_scheduler_cron(cron);
        let orch = orchestrator.clone();
        let job = Job::new_async_tz(expr.as_str(), chrono::Local, move |_uuid, _l| {
            let orch = orch.clone();
            Box::pin(async move {
                log::info!("Scheduler: running scheduled refresh");
                orch.trigger().await;
            })
        });
        match job {
            Ok(job) => {
                scheduler.add(job).await?;
                recurring = true;
                log::info!("Scheduler: refresh scheduled with cron `{}` (local time)", cron);
            }
            Err(e) => log::error!("Scheduler: invalid cron expression `{}`: {}", cron, e),
        }
    }

    if !recurring && run_once_done.is_none() {
        log::info!("Scheduler: no refresh jobs configured");
        return Ok(None);
    }

    scheduler.start().await?;
    Ok(Some(RefreshSchedule {
        scheduler,
        recurring,
        run_once_done,
    }))
}
