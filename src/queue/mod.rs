mod cron_queue;

pub use cron_queue::CronQueue;

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cron::Schedule;
use futures::future::BoxFuture;
use uuid::Uuid;

/// The three per-user recurring queue kinds. The rendered queue name
/// `{user_id}-{kind}` is the only join key between relational state and the
/// substrate's scheduling state, so it must be reconstructible from
/// `(user_id, kind)` alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueKind {
    AutoWordReminder,
    WordReminder,
    Email,
}

impl QueueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoWordReminder => "auto-word-reminder-queue",
            Self::WordReminder => "word-reminder-queue",
            Self::Email => "email-queue",
        }
    }
}

pub fn queue_name(user_id: i32, kind: QueueKind) -> String {
    format!("{user_id}-{}", kind.as_str())
}

/// One dequeued job handed to a registered worker.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub data: serde_json::Value,
}

/// Substrate-level hints for a registered worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkOptions {
    /// How often the worker should poll its queue. Advisory: adapters that
    /// deliver eagerly may only log it.
    pub poll_interval: Option<Duration>,
}

pub type WorkHandler = std::sync::Arc<dyn Fn(Vec<Job>) -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
    #[error("invalid cron expression: {0}")]
    InvalidCron(#[from] cron::error::Error),
    #[error("cron expression `{0}` never fires")]
    NeverFires(String),
}

/// Injected job queue substrate: named queues, cron schedules, delayed
/// one-shot jobs, and per-queue worker registration with at-least-once
/// delivery. A queue has at most one registered worker at a time; `work`
/// replaces any previous registration and `off_work` removes it. `schedule`
/// replaces the queue's single cron schedule. `purge_queue` clears pending
/// scheduled entries; reconfiguring a schedule requires purge + off_work
/// together to avoid orphaned stale firings.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn create_queue(&self, name: &str) -> Result<(), QueueError>;

    async fn schedule(
        &self,
        name: &str,
        cron_expr: &str,
        payload: serde_json::Value,
    ) -> Result<(), QueueError>;

    async fn send_after(
        &self,
        name: &str,
        payload: serde_json::Value,
        when: DateTime<Utc>,
    ) -> Result<(), QueueError>;

    async fn work(
        &self,
        name: &str,
        options: WorkOptions,
        handler: WorkHandler,
    ) -> Result<(), QueueError>;

    async fn purge_queue(&self, name: &str) -> Result<(), QueueError>;

    async fn off_work(&self, name: &str) -> Result<(), QueueError>;

    /// Wake the queue's worker for an early poll. Pending jobs that are
    /// already due are delivered immediately; a notify with nothing due is a
    /// no-op.
    async fn notify_worker(&self, name: &str) -> Result<(), QueueError>;

    /// Acknowledge a job so it is not delivered again.
    async fn complete(&self, name: &str, job_id: Uuid) -> Result<(), QueueError>;
}

/// Reminder expressions arrive in five-field cron form; the scheduling stack
/// expects a seconds field.
pub fn normalize_cron(expr: &str) -> String {
    if expr.split_whitespace().count() == 5 {
        format!("0 {expr}")
    } else {
        expr.to_string()
    }
}

/// Time until the expression's next fire, rounded to whole seconds. Used as
/// the worker poll hint so a firing is observed promptly relative to the
/// reminder cadence.
pub fn time_to_next_fire(expr: &str, now: DateTime<Utc>) -> Result<Duration, QueueError> {
    let schedule = Schedule::from_str(&normalize_cron(expr))?;
    let next = schedule
        .after(&now)
        .next()
        .ok_or_else(|| QueueError::NeverFires(expr.to_string()))?;
    let millis = (next - now).num_milliseconds().max(0);
    Ok(Duration::from_secs(((millis as f64) / 1000.0).round() as u64))
}
