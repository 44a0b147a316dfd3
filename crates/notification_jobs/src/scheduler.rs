use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use notification_services::EmailSender;
use notification_store::{NotificationError, NotificationStore};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

/// Sweep intervals and limits.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often the email retry sweep runs (default: 1 hour)
    pub retry_interval: Duration,

    /// Only notifications newer than this are retried (default: 7 days)
    pub retry_lookback: Duration,

    /// Maximum notifications retried per sweep (default: 100)
    pub retry_batch_limit: u32,

    /// Notifications younger than this may still have their first send in
    /// flight and are left alone (default: 10 seconds, the email send timeout)
    pub retry_min_age: Duration,

    /// How often the cleanup sweep runs (default: 24 hours)
    pub cleanup_interval: Duration,

    /// Read notifications older than this are deleted (default: 30 days)
    pub cleanup_max_age: Duration,

    /// Run one retry sweep as soon as the scheduler starts (default: false)
    pub retry_on_startup: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_secs(60 * 60),
            retry_lookback: Duration::from_secs(7 * 24 * 60 * 60),
            retry_batch_limit: 100,
            retry_min_age: Duration::from_secs(10),
            cleanup_interval: Duration::from_secs(24 * 60 * 60),
            cleanup_max_age: Duration::from_secs(30 * 24 * 60 * 60),
            retry_on_startup: false,
        }
    }
}

/// Outcome of one retry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryReport {
    /// Notifications picked up by the sweep
    pub attempted: usize,
    /// Emails handed off
    pub sent: usize,
    /// Emails that failed again
    pub failed: usize,
}

/// Background sweeps over the notification store.
///
/// Both sweeps are idempotent and take no locks beyond the store's own, so
/// they can overlap with request traffic and with each other.
pub struct NotificationScheduler {
    store: Arc<dyn NotificationStore>,
    email: Arc<dyn EmailSender>,
    config: SchedulerConfig,
}

impl NotificationScheduler {
    /// Create a new scheduler
    pub fn new(
        store: Arc<dyn NotificationStore>,
        email: Arc<dyn EmailSender>,
        config: Option<SchedulerConfig>,
    ) -> Self {
        Self {
            store,
            email,
            config: config.unwrap_or_default(),
        }
    }

    /// Retries emails that have not gone out yet.
    ///
    /// A failed send is counted and skipped; only failing to query the store
    /// aborts the sweep.
    pub async fn run_retry_sweep(&self) -> Result<RetryReport, NotificationError> {
        let now = Utc::now();
        let since = before(now, self.config.retry_lookback, "retry lookback");
        let until = before(now, self.config.retry_min_age, "retry minimum age");
        let pending = self
            .store
            .find_unsent_email(since, until, self.config.retry_batch_limit)
            .await?;

        let mut report = RetryReport {
            attempted: pending.len(),
            ..RetryReport::default()
        };
        if pending.is_empty() {
            debug!("No unsent notification emails to retry");
            return Ok(report);
        }

        for notification in pending {
            let sent = self
                .email
                .send(
                    &notification.user_id,
                    &notification.title,
                    &notification.message,
                    notification.notification_type,
                )
                .await;

            if !sent {
                report.failed += 1;
                continue;
            }

            report.sent += 1;
            if let Err(e) = self.store.mark_email_sent(&notification.id).await {
                error!(
                    "Email for notification {} went out but could not be recorded: {}",
                    notification.id, e
                );
            }
        }

        info!(
            "Email retry sweep: {} attempted, {} sent, {} failed",
            report.attempted, report.sent, report.failed
        );
        Ok(report)
    }

    /// Deletes read notifications older than the configured age. Returns how many were removed.
    pub async fn run_cleanup_sweep(&self) -> Result<u64, NotificationError> {
        let cutoff = before(Utc::now(), self.config.cleanup_max_age, "cleanup max age");
        let stale = self.store.find_older_than(cutoff, true).await?;
        if stale.is_empty() {
            debug!("No old read notifications to clean up");
            return Ok(0);
        }

        let ids: Vec<_> = stale.iter().map(|n| n.id).collect();
        let deleted = self.store.delete_many(&ids).await?;

        info!("Cleaned up {} old read notifications", deleted);
        Ok(deleted)
    }

    /// Spawns both sweep loops.
    pub fn start(self: Arc<Self>) -> SchedulerHandle {
        info!(
            "Starting notification scheduler (retry every {:?}, cleanup every {:?})",
            self.config.retry_interval, self.config.cleanup_interval
        );

        let retry = {
            let scheduler = Arc::clone(&self);
            tokio::spawn(async move { scheduler.retry_loop().await })
        };
        let cleanup = tokio::spawn(async move { self.cleanup_loop().await });

        SchedulerHandle {
            tasks: vec![retry, cleanup],
        }
    }

    async fn retry_loop(&self) {
        if self.config.retry_on_startup {
            self.retry_once().await;
        }

        let period = self.config.retry_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.retry_once().await;
        }
    }

    async fn retry_once(&self) {
        if let Err(e) = self.run_retry_sweep().await {
            error!("Email retry sweep failed: {}", e);
        }
    }

    async fn cleanup_loop(&self) {
        let period = self.config.cleanup_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_cleanup_sweep().await {
                error!("Notification cleanup sweep failed: {}", e);
            }
        }
    }
}

/// Keeps the sweep tasks alive; stopping or dropping it aborts them.
pub struct SchedulerHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Aborts both sweeps and waits for them to wind down.
    pub async fn stop(mut self) {
        info!("Stopping notification scheduler");
        for task in self.tasks.drain(..) {
            task.abort();
            match task.await {
                Err(e) if !e.is_cancelled() => warn!("Scheduler task ended abnormally: {}", e),
                _ => {}
            }
        }
        info!("Notification scheduler stopped");
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// `now - age`, clamped to the earliest representable time when `age` reaches past it.
fn before(now: DateTime<Utc>, age: Duration, what: &str) -> DateTime<Utc> {
    chrono::Duration::from_std(age)
        .ok()
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or_else(|| {
            warn!("{} of {:?} is out of range, clamping", what, age);
            DateTime::<Utc>::MIN_UTC
        })
}
