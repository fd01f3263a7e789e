use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::db::Queries;
use crate::models::WordReminderStatus;
use crate::push::PushSender;
use crate::queue::JobQueue;
use crate::services::{AutoWordReminderService, ServiceError, WordReminderService, WordSelection};

/// Shared application state: the wired-up scheduling services. The HTTP
/// layer wraps these directly in request handlers.
#[derive(Clone)]
pub struct AppState {
    queries: Queries,
    queue: Arc<dyn JobQueue>,
    word_reminders: WordReminderService,
    auto_word_reminders: AutoWordReminderService,
    selection: WordSelection,
}

impl AppState {
    pub fn new(queries: Queries, queue: Arc<dyn JobQueue>, push: Arc<dyn PushSender>) -> Self {
        let word_reminders =
            WordReminderService::new(queries.clone(), Arc::clone(&queue), push);
        let auto_word_reminders = AutoWordReminderService::new(
            queries.clone(),
            Arc::clone(&queue),
            word_reminders.clone(),
        );
        let selection = WordSelection::new(Arc::clone(&queries.user_words));
        Self {
            queries,
            queue,
            word_reminders,
            auto_word_reminders,
            selection,
        }
    }

    pub fn word_reminders(&self) -> &WordReminderService {
        &self.word_reminders
    }

    pub fn auto_word_reminders(&self) -> &AutoWordReminderService {
        &self.auto_word_reminders
    }

    pub fn selection(&self) -> &WordSelection {
        &self.selection
    }

    pub fn queue(&self) -> Arc<dyn JobQueue> {
        Arc::clone(&self.queue)
    }

    pub fn queries(&self) -> &Queries {
        &self.queries
    }

    /// Reinstalls workers and schedules for everything persisted before a
    /// restart: every auto word reminder's regeneration queue, and every
    /// still-active word reminder cycle. Individual failures are logged and
    /// skipped so one bad row does not block the rest.
    pub async fn resume_schedules(&self) -> Result<(), ServiceError> {
        let now = Utc::now();

        for auto_word_reminder in self.queries.auto_word_reminders.get_all().await? {
            if let Err(err) = self.auto_word_reminders.resume(&auto_word_reminder).await {
                warn!(
                    auto_word_reminder_id = auto_word_reminder.id,
                    error = %err,
                    "failed to resume regeneration schedule"
                );
            }
        }

        let mut resumed = 0;
        // expired-but-still-flagged-active rows are resumed too: their next
        // firing is what deactivates them
        for word_reminder in self.queries.word_reminders.get_all_active().await? {
            match self.word_reminders.resume(&word_reminder).await {
                Ok(_) => resumed += 1,
                Err(err) => warn!(
                    word_reminder_id = word_reminder.id,
                    status = ?word_reminder.status_at(now),
                    error = %err,
                    "failed to resume word reminder schedule"
                ),
            }
        }

        info!(resumed, "schedules resumed");
        Ok(())
    }
}
