use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::{ServiceError, WordReminderService, WordSelection};
use crate::db::{AutoWordReminderParams, Queries, SelectionCriteria, WordReminderFields};
use crate::models::{AutoWordReminder, WordReminder};
use crate::queue::{queue_name, Job, JobQueue, QueueKind, WorkHandler, WorkOptions};

/// Payload of a regeneration job; the configuration itself is re-read on
/// every firing so updates take effect on the very next cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoWordReminderJob {
    pub auto_word_reminder_id: i32,
}

/// Owns the recurring regeneration loop: on each firing it samples a fresh
/// word batch, creates a new word reminder cycle, and schedules its own next
/// firing.
#[derive(Clone)]
pub struct AutoWordReminderService {
    queries: Queries,
    queue: Arc<dyn JobQueue>,
    selection: WordSelection,
    word_reminders: WordReminderService,
}

impl AutoWordReminderService {
    pub fn new(
        queries: Queries,
        queue: Arc<dyn JobQueue>,
        word_reminders: WordReminderService,
    ) -> Self {
        let selection = WordSelection::new(Arc::clone(&queries.user_words));
        Self {
            queries,
            queue,
            selection,
            word_reminders,
        }
    }

    pub async fn create(
        &self,
        user_id: i32,
        params: AutoWordReminderParams,
        create_now: bool,
    ) -> Result<(AutoWordReminder, String), ServiceError> {
        let auto_word_reminder = self
            .queries
            .auto_word_reminders
            .create(user_id, &params)
            .await?;
        let queue = self.provision(&auto_word_reminder).await?;
        if create_now {
            self.run_cycle(&auto_word_reminder).await?;
            self.queue.notify_worker(&queue).await?;
        }
        info!(
            auto_word_reminder_id = auto_word_reminder.id,
            user_id,
            queue = %queue,
            create_now,
            "auto word reminder created"
        );
        Ok((auto_word_reminder, queue))
    }

    /// Applies a configuration change: updates the row, then atomically (from
    /// the caller's perspective) purges the old queue state and installs the
    /// new schedule and worker before returning. With `create_now`, one
    /// regeneration cycle runs synchronously and the fresh worker is woken
    /// rather than left to its first poll.
    pub async fn configure(
        &self,
        id: i32,
        params: AutoWordReminderParams,
        create_now: bool,
    ) -> Result<(AutoWordReminder, String), ServiceError> {
        let auto_word_reminder = self
            .queries
            .auto_word_reminders
            .update_by_id(id, &params)
            .await?;
        let queue = self.provision(&auto_word_reminder).await?;
        if create_now {
            self.run_cycle(&auto_word_reminder).await?;
            self.queue.notify_worker(&queue).await?;
        }
        info!(
            auto_word_reminder_id = id,
            queue = %queue,
            create_now,
            "auto word reminder reconfigured"
        );
        Ok((auto_word_reminder, queue))
    }

    /// A user holds at most one auto word reminder at a time.
    pub async fn get_for_user(
        &self,
        user_id: i32,
    ) -> Result<Option<AutoWordReminder>, ServiceError> {
        let mut rows = self.queries.auto_word_reminders.get_by_user_id(user_id).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.remove(0))
        })
    }

    pub async fn delete(
        &self,
        id: i32,
    ) -> Result<Option<(AutoWordReminder, String)>, ServiceError> {
        let Some(auto_word_reminder) = self.queries.auto_word_reminders.delete_by_id(id).await?
        else {
            return Ok(None);
        };
        let queue = queue_name(auto_word_reminder.user_id, QueueKind::AutoWordReminder);
        self.queue.purge_queue(&queue).await?;
        self.queue.off_work(&queue).await?;
        info!(auto_word_reminder_id = id, queue = %queue, "auto word reminder deleted");
        Ok(Some((auto_word_reminder, queue)))
    }

    /// Reinstalls the regeneration schedule and worker for an
    /// already-persisted configuration. Used when resuming after a restart.
    pub async fn resume(
        &self,
        auto_word_reminder: &AutoWordReminder,
    ) -> Result<String, ServiceError> {
        self.provision(auto_word_reminder).await
    }

    /// Provisions the user's regeneration queue: purge pending firings,
    /// install the cron schedule, and register this service as the single
    /// consumer. The worker poll hint is the cycle duration in whole
    /// seconds, bounding how promptly a manual wake is observed.
    async fn provision(
        &self,
        auto_word_reminder: &AutoWordReminder,
    ) -> Result<String, ServiceError> {
        let queue = queue_name(auto_word_reminder.user_id, QueueKind::AutoWordReminder);
        self.queue.create_queue(&queue).await?;
        self.queue.purge_queue(&queue).await?;

        let payload = serde_json::to_value(AutoWordReminderJob {
            auto_word_reminder_id: auto_word_reminder.id,
        })?;
        self.queue
            .schedule(&queue, &auto_word_reminder.reminder, payload)
            .await?;

        self.queue.off_work(&queue).await?;
        let poll_interval =
            Duration::from_secs(((auto_word_reminder.duration as f64) / 1000.0).round() as u64);
        let service = self.clone();
        let queue_owned = queue.clone();
        let auto_id = auto_word_reminder.id;
        let handler: WorkHandler = Arc::new(move |jobs| {
            let service = service.clone();
            let queue = queue_owned.clone();
            Box::pin(async move { service.handle_firing(&queue, auto_id, jobs).await })
        });
        self.queue
            .work(
                &queue,
                WorkOptions {
                    poll_interval: Some(poll_interval),
                },
                handler,
            )
            .await?;
        Ok(queue)
    }

    /// Worker entry point; failures are logged, never propagated into the
    /// substrate.
    pub async fn handle_firing(&self, queue: &str, auto_id: i32, jobs: Vec<Job>) {
        if let Err(err) = self.fire(queue, auto_id, jobs).await {
            error!(queue, auto_word_reminder_id = auto_id, error = %err, "regeneration failed");
        }
    }

    async fn fire(&self, queue: &str, auto_id: i32, jobs: Vec<Job>) -> Result<(), ServiceError> {
        match jobs.into_iter().next() {
            // empty poll: time's up, regenerate from the stored configuration
            None => {
                if let Some(auto_word_reminder) =
                    self.queries.auto_word_reminders.get_by_id(auto_id).await?
                {
                    self.run_cycle(&auto_word_reminder).await?;
                }
            }
            Some(job) => {
                let payload: AutoWordReminderJob = serde_json::from_value(job.data.clone())?;
                let Some(auto_word_reminder) = self
                    .queries
                    .auto_word_reminders
                    .get_by_id(payload.auto_word_reminder_id)
                    .await?
                else {
                    // deleted after this job was scheduled
                    self.queue.complete(queue, job.id).await?;
                    return Ok(());
                };
                self.run_cycle(&auto_word_reminder).await?;
            }
        }
        Ok(())
    }

    /// One regeneration: sample a batch, create the next word reminder cycle
    /// (which also swaps the word reminder queue's worker, so only one live
    /// consumer exists per user), and schedule the next regeneration at the
    /// cycle's expiry.
    async fn run_cycle(
        &self,
        auto_word_reminder: &AutoWordReminder,
    ) -> Result<(WordReminder, String), ServiceError> {
        let criteria = SelectionCriteria {
            count: auto_word_reminder.word_count,
            learned: auto_word_reminder.has_learned_words,
            order: auto_word_reminder.sort_mode,
        };
        let batch = self
            .selection
            .select_batch(auto_word_reminder.user_id, &criteria)
            .await?;

        let finish = Utc::now() + chrono::Duration::milliseconds(auto_word_reminder.duration);
        let fields = WordReminderFields {
            reminder: auto_word_reminder.reminder.clone(),
            is_active: auto_word_reminder.is_active,
            has_reminder_onload: auto_word_reminder.has_reminder_onload,
            finish,
        };
        let (word_reminder, word_reminder_queue) = self
            .word_reminders
            .create(auto_word_reminder.user_id, fields, &batch)
            .await?;

        let payload = serde_json::to_value(AutoWordReminderJob {
            auto_word_reminder_id: auto_word_reminder.id,
        })?;
        let queue = queue_name(auto_word_reminder.user_id, QueueKind::AutoWordReminder);
        self.queue.send_after(&queue, payload, finish).await?;

        info!(
            auto_word_reminder_id = auto_word_reminder.id,
            word_reminder_id = word_reminder.id,
            words = batch.len(),
            next_cycle = %finish,
            "regeneration cycle complete"
        );
        Ok((word_reminder, word_reminder_queue))
    }
}
