use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::{Notifier, ServiceError};
use crate::db::{Queries, WordReminderFields};
use crate::models::{UserWord, WordReminder, WordReminderStatus, WordReminderWithWords};
use crate::push::PushSender;
use crate::queue::{
    queue_name, time_to_next_fire, Job, JobQueue, QueueKind, WorkHandler, WorkOptions,
};

/// Payload carried by every scheduled word reminder job. The `reminder`
/// expression is a denormalized copy of the row's schedule acting as a
/// fencing token: a firing whose copy no longer matches the row was enqueued
/// before a reschedule and must be discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordReminderJob {
    pub word_reminder_id: i32,
    pub reminder: String,
}

/// Owns the lifecycle of a single reminder cycle: creation, firing,
/// expiry-driven deactivation, and queue teardown.
#[derive(Clone)]
pub struct WordReminderService {
    queries: Queries,
    queue: Arc<dyn JobQueue>,
    notifier: Notifier,
}

impl WordReminderService {
    pub fn new(queries: Queries, queue: Arc<dyn JobQueue>, push: Arc<dyn PushSender>) -> Self {
        let notifier = Notifier::new(&queries, push);
        Self {
            queries,
            queue,
            notifier,
        }
    }

    /// Persists the reminder and its word set, then provisions the user's
    /// word reminder queue: one worker and one cron schedule carrying the
    /// fencing payload. Returns the row together with the queue name it was
    /// scheduled on.
    pub async fn create(
        &self,
        user_id: i32,
        fields: WordReminderFields,
        word_batch: &[UserWord],
    ) -> Result<(WordReminder, String), ServiceError> {
        let word_reminder = self.queries.word_reminders.create(user_id, &fields).await?;
        for user_word in word_batch {
            self.queries
                .junctions
                .create(user_word.id, word_reminder.id)
                .await?;
        }

        let queue = queue_name(user_id, QueueKind::WordReminder);
        self.queue.create_queue(&queue).await?;
        self.install_worker(&queue, &word_reminder.reminder).await?;
        self.schedule_firings(&queue, &word_reminder).await?;

        info!(
            word_reminder_id = word_reminder.id,
            user_id,
            queue = %queue,
            words = word_batch.len(),
            "word reminder created"
        );
        Ok((word_reminder, queue))
    }

    pub async fn get(&self, id: i32) -> Result<Option<WordReminderWithWords>, ServiceError> {
        Ok(self.queries.junctions.get_by_word_reminder_id(id).await?)
    }

    /// Updates the row, replaces its word set, and swaps the queue state:
    /// pending firings are purged and the worker plus schedule are
    /// reinstalled under the new cron expression.
    pub async fn update(
        &self,
        id: i32,
        fields: WordReminderFields,
        new_word_batch: &[UserWord],
    ) -> Result<(WordReminder, String), ServiceError> {
        let word_reminder = self.queries.word_reminders.update_by_id(id, &fields).await?;
        self.queries
            .junctions
            .delete_all_by_word_reminder_id(id)
            .await?;
        for user_word in new_word_batch {
            self.queries.junctions.create(user_word.id, id).await?;
        }

        let queue = queue_name(word_reminder.user_id, QueueKind::WordReminder);
        self.queue.purge_queue(&queue).await?;
        self.install_worker(&queue, &word_reminder.reminder).await?;
        self.schedule_firings(&queue, &word_reminder).await?;

        info!(word_reminder_id = id, queue = %queue, "word reminder rescheduled");
        Ok((word_reminder, queue))
    }

    /// Deletes the word set first, then the row; tears down the queue worker
    /// only if the deleted row was active.
    pub async fn delete(&self, id: i32) -> Result<Option<(WordReminder, String)>, ServiceError> {
        self.queries
            .junctions
            .delete_all_by_word_reminder_id(id)
            .await?;
        let Some(word_reminder) = self.queries.word_reminders.delete_by_id(id).await? else {
            return Ok(None);
        };

        let queue = queue_name(word_reminder.user_id, QueueKind::WordReminder);
        if word_reminder.is_active {
            self.queue.purge_queue(&queue).await?;
            self.queue.off_work(&queue).await?;
        }

        info!(word_reminder_id = id, queue = %queue, "word reminder deleted");
        Ok(Some((word_reminder, queue)))
    }

    /// Bulk delete; the queue is being retired, so the worker is always torn
    /// down regardless of individual active flags.
    pub async fn delete_all_for_user(
        &self,
        user_id: i32,
    ) -> Result<(Vec<WordReminder>, String), ServiceError> {
        self.queries.junctions.delete_all_by_user_id(user_id).await?;
        let deleted = self
            .queries
            .word_reminders
            .delete_all_by_user_id(user_id)
            .await?;

        let queue = queue_name(user_id, QueueKind::WordReminder);
        self.queue.purge_queue(&queue).await?;
        self.queue.off_work(&queue).await?;

        info!(user_id, deleted = deleted.len(), queue = %queue, "word reminders deleted");
        Ok((deleted, queue))
    }

    /// Reinstalls the worker and schedule for an already-persisted reminder,
    /// without touching rows. Used when resuming after a restart.
    pub async fn resume(&self, word_reminder: &WordReminder) -> Result<String, ServiceError> {
        let queue = queue_name(word_reminder.user_id, QueueKind::WordReminder);
        self.queue.create_queue(&queue).await?;
        self.install_worker(&queue, &word_reminder.reminder).await?;
        self.schedule_firings(&queue, word_reminder).await?;
        Ok(queue)
    }

    /// Registers this service as the queue's single consumer, replacing any
    /// previous worker. The poll hint is the time to the expression's next
    /// fire.
    async fn install_worker(&self, queue: &str, reminder: &str) -> Result<(), ServiceError> {
        let poll_interval = time_to_next_fire(reminder, Utc::now())?;
        self.queue.off_work(queue).await?;

        let service = self.clone();
        let queue_owned = queue.to_string();
        let handler: WorkHandler = Arc::new(move |jobs| {
            let service = service.clone();
            let queue = queue_owned.clone();
            Box::pin(async move { service.handle_firing(&queue, jobs).await })
        });
        self.queue
            .work(
                queue,
                WorkOptions {
                    poll_interval: Some(poll_interval),
                },
                handler,
            )
            .await?;
        Ok(())
    }

    async fn schedule_firings(
        &self,
        queue: &str,
        word_reminder: &WordReminder,
    ) -> Result<(), ServiceError> {
        let payload = serde_json::to_value(WordReminderJob {
            word_reminder_id: word_reminder.id,
            reminder: word_reminder.reminder.clone(),
        })?;
        self.queue
            .schedule(queue, &word_reminder.reminder, payload)
            .await?;
        Ok(())
    }

    /// Worker entry point; failures are logged, never propagated into the
    /// substrate.
    pub async fn handle_firing(&self, queue: &str, jobs: Vec<Job>) {
        for job in jobs {
            if let Err(err) = self.fire(queue, &job).await {
                error!(queue, job_id = %job.id, error = %err, "word reminder firing failed");
            }
        }
    }

    async fn fire(&self, queue: &str, job: &Job) -> Result<(), ServiceError> {
        let payload: WordReminderJob = serde_json::from_value(job.data.clone())?;
        let Some(word_reminder) = self
            .queries
            .word_reminders
            .get_by_id(payload.word_reminder_id)
            .await?
        else {
            // deleted after this job was scheduled
            self.queue.complete(queue, job.id).await?;
            return Ok(());
        };

        if word_reminder.reminder != payload.reminder {
            // the row was rescheduled after this job was enqueued
            debug!(
                word_reminder_id = word_reminder.id,
                job_reminder = %payload.reminder,
                current = %word_reminder.reminder,
                "stale firing discarded"
            );
            self.queue.complete(queue, job.id).await?;
            return Ok(());
        }

        match word_reminder.status_at(Utc::now()) {
            WordReminderStatus::Expired => {
                self.queue.complete(queue, job.id).await?;
                let fields = WordReminderFields {
                    reminder: word_reminder.reminder.clone(),
                    is_active: false,
                    has_reminder_onload: word_reminder.has_reminder_onload,
                    finish: word_reminder.finish,
                };
                self.queries
                    .word_reminders
                    .update_by_id(word_reminder.id, &fields)
                    .await?;
                info!(
                    word_reminder_id = word_reminder.id,
                    "word reminder expired, deactivated"
                );
            }
            WordReminderStatus::Active => {
                self.notifier.dispatch(&word_reminder).await?;
            }
            WordReminderStatus::Pending | WordReminderStatus::Deactivated => {}
        }
        Ok(())
    }
}
