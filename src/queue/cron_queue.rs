use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex as AsyncMutex;
use tokio_cron_scheduler::{Job as SchedulerJob, JobScheduler};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{normalize_cron, Job, JobQueue, QueueError, WorkHandler, WorkOptions};

struct PendingJob {
    scheduler_id: Option<Uuid>,
    when: DateTime<Utc>,
    payload: serde_json::Value,
}

#[derive(Default)]
struct QueueState {
    worker: Option<WorkHandler>,
    cron_job: Option<Uuid>,
    pending: HashMap<Uuid, PendingJob>,
}

type QueueMap = Arc<Mutex<HashMap<String, QueueState>>>;

/// In-process [`JobQueue`] adapter over `tokio-cron-scheduler`.
///
/// Each named queue holds at most one cron schedule and one worker; one-shot
/// jobs are tracked in a pending map keyed by job id so that `complete`,
/// `purge_queue`, and `notify_worker` can address them before they fire.
pub struct CronQueue {
    scheduler: AsyncMutex<JobScheduler>,
    queues: QueueMap,
}

impl CronQueue {
    pub async fn new() -> Result<Self, QueueError> {
        let scheduler = JobScheduler::new().await?;
        scheduler.start().await?;
        Ok(Self {
            scheduler: AsyncMutex::new(scheduler),
            queues: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub async fn shutdown(&self) -> Result<(), QueueError> {
        let mut scheduler = self.scheduler.lock().await;
        scheduler.shutdown().await?;
        Ok(())
    }

    fn worker_for(queues: &QueueMap, name: &str) -> Option<WorkHandler> {
        let guard = queues.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.get(name).and_then(|state| state.worker.clone())
    }

    /// Cron tick: hand the schedule's payload to the queue's worker, if any.
    async fn fire_cron(queues: QueueMap, name: String, job_id: Uuid, payload: serde_json::Value) {
        match Self::worker_for(&queues, &name) {
            Some(worker) => worker(vec![Job { id: job_id, data: payload }]).await,
            None => debug!(queue = %name, "cron fired with no registered worker"),
        }
    }

    /// One-shot delivery: drop the job from the pending map first so a
    /// completed, purged, or already-notified job is not delivered twice.
    async fn deliver_pending(queues: QueueMap, name: String, job_id: Uuid) {
        let (worker, payload) = {
            let mut guard = queues.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let Some(state) = guard.get_mut(&name) else {
                return;
            };
            let Some(pending) = state.pending.remove(&job_id) else {
                return;
            };
            (state.worker.clone(), pending.payload)
        };
        match worker {
            Some(worker) => worker(vec![Job { id: job_id, data: payload }]).await,
            None => warn!(queue = %name, %job_id, "dropping job: no registered worker"),
        }
    }
}

#[async_trait::async_trait]
impl JobQueue for CronQueue {
    async fn create_queue(&self, name: &str) -> Result<(), QueueError> {
        let mut guard = self.queues.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn schedule(
        &self,
        name: &str,
        cron_expr: &str,
        payload: serde_json::Value,
    ) -> Result<(), QueueError> {
        let normalized = normalize_cron(cron_expr);
        let queues = Arc::clone(&self.queues);
        let queue = name.to_string();
        let job = SchedulerJob::new_async(normalized.as_str(), move |job_id, _sched| {
            let queues = Arc::clone(&queues);
            let queue = queue.clone();
            let payload = payload.clone();
            Box::pin(async move {
                CronQueue::fire_cron(queues, queue, job_id, payload).await;
            })
        })?;

        let scheduler = self.scheduler.lock().await;
        let scheduler_id = scheduler.add(job).await?;

        let replaced = {
            let mut guard = self.queues.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let state = guard.entry(name.to_string()).or_default();
            state.cron_job.replace(scheduler_id)
        };
        if let Some(old) = replaced {
            scheduler.remove(&old).await?;
        }
        debug!(queue = %name, cron = %normalized, "schedule installed");
        Ok(())
    }

    async fn send_after(
        &self,
        name: &str,
        payload: serde_json::Value,
        when: DateTime<Utc>,
    ) -> Result<(), QueueError> {
        let job_id = Uuid::new_v4();
        {
            let mut guard = self.queues.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let state = guard.entry(name.to_string()).or_default();
            state.pending.insert(
                job_id,
                PendingJob {
                    scheduler_id: None,
                    when,
                    payload,
                },
            );
        }

        let delay = (when - Utc::now()).to_std().unwrap_or_default();
        let queues = Arc::clone(&self.queues);
        let queue = name.to_string();
        let job = SchedulerJob::new_one_shot_async(delay, move |_sched_id, _sched| {
            let queues = Arc::clone(&queues);
            let queue = queue.clone();
            Box::pin(async move {
                CronQueue::deliver_pending(queues, queue, job_id).await;
            })
        })?;

        let scheduler = self.scheduler.lock().await;
        let scheduler_id = scheduler.add(job).await?;

        let mut guard = self.queues.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(pending) = guard
            .get_mut(name)
            .and_then(|state| state.pending.get_mut(&job_id))
        {
            pending.scheduler_id = Some(scheduler_id);
        }
        Ok(())
    }

    async fn work(
        &self,
        name: &str,
        options: WorkOptions,
        handler: WorkHandler,
    ) -> Result<(), QueueError> {
        let mut guard = self.queues.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let state = guard.entry(name.to_string()).or_default();
        state.worker = Some(handler);
        debug!(
            queue = %name,
            poll_secs = options.poll_interval.map(|i| i.as_secs()),
            "worker registered"
        );
        Ok(())
    }

    async fn purge_queue(&self, name: &str) -> Result<(), QueueError> {
        let (cron_job, scheduler_ids) = {
            let mut guard = self.queues.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let Some(state) = guard.get_mut(name) else {
                return Ok(());
            };
            let ids: Vec<Uuid> = state
                .pending
                .drain()
                .filter_map(|(_, pending)| pending.scheduler_id)
                .collect();
            (state.cron_job.take(), ids)
        };

        let scheduler = self.scheduler.lock().await;
        if let Some(id) = cron_job {
            scheduler.remove(&id).await?;
        }
        for id in scheduler_ids {
            scheduler.remove(&id).await?;
        }
        Ok(())
    }

    async fn off_work(&self, name: &str) -> Result<(), QueueError> {
        let mut guard = self.queues.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(state) = guard.get_mut(name) {
            state.worker = None;
        }
        Ok(())
    }

    async fn notify_worker(&self, name: &str) -> Result<(), QueueError> {
        let now = Utc::now();
        let due: Vec<Uuid> = {
            let guard = self.queues.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            match guard.get(name) {
                Some(state) => state
                    .pending
                    .iter()
                    .filter(|(_, pending)| pending.when <= now)
                    .map(|(id, _)| *id)
                    .collect(),
                None => return Ok(()),
            }
        };
        for job_id in due {
            Self::deliver_pending(Arc::clone(&self.queues), name.to_string(), job_id).await;
        }
        Ok(())
    }

    async fn complete(&self, name: &str, job_id: Uuid) -> Result<(), QueueError> {
        let scheduler_id = {
            let mut guard = self.queues.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            guard
                .get_mut(name)
                .and_then(|state| state.pending.remove(&job_id))
                .and_then(|pending| pending.scheduler_id)
        };
        if let Some(id) = scheduler_id {
            let scheduler = self.scheduler.lock().await;
            scheduler.remove(&id).await?;
        }
        Ok(())
    }
}
