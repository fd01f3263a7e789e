pub mod auto_word_reminders;
pub mod notifier;
pub mod word_reminders;
pub mod word_selection;

pub use auto_word_reminders::{AutoWordReminderJob, AutoWordReminderService};
pub use notifier::{Notifier, NotificationPayload};
pub use word_reminders::{WordReminderJob, WordReminderService};
pub use word_selection::WordSelection;

use crate::queue::QueueError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
    #[error("invalid job payload: {0}")]
    Payload(#[from] serde_json::Error),
}
