use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::ServiceError;
use crate::db::{Queries, SubscriptionQueries, UserWordsWordRemindersQueries};
use crate::models::WordReminder;
use crate::push::{PushSender, ONLOAD_TTL_SECS};

/// The JSON body of a word reminder push message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub id: i32,
    pub words: String,
}

/// Builds and sends the push notification for an active, non-expired word
/// reminder. Delivery is best-effort and never fails the firing.
#[derive(Clone)]
pub struct Notifier {
    junctions: Arc<dyn UserWordsWordRemindersQueries>,
    subscriptions: Arc<dyn SubscriptionQueries>,
    push: Arc<dyn PushSender>,
}

impl Notifier {
    pub fn new(queries: &Queries, push: Arc<dyn PushSender>) -> Self {
        Self {
            junctions: Arc::clone(&queries.junctions),
            subscriptions: Arc::clone(&queries.subscriptions),
            push,
        }
    }

    /// TTL policy: two days when the user wants a queued notification to
    /// surface on their next browser open; otherwise discard immediately if
    /// the client is offline at fire time.
    pub fn ttl_for(has_reminder_onload: bool) -> u32 {
        if has_reminder_onload {
            ONLOAD_TTL_SECS
        } else {
            0
        }
    }

    pub async fn dispatch(&self, word_reminder: &WordReminder) -> Result<(), ServiceError> {
        let Some(with_words) = self
            .junctions
            .get_by_word_reminder_id(word_reminder.id)
            .await?
        else {
            debug!(word_reminder_id = word_reminder.id, "no words attached, skipping");
            return Ok(());
        };

        let words: Vec<&str> = with_words
            .user_words
            .iter()
            .filter_map(|word| word.details.first().map(|detail| detail.word.as_str()))
            .collect();
        let payload = NotificationPayload {
            id: word_reminder.id,
            words: words.join(", "),
        };

        let Some(subscription) = self
            .subscriptions
            .get_by_user_id(word_reminder.user_id)
            .await?
        else {
            debug!(
                user_id = word_reminder.user_id,
                "no push subscription, skipping notification"
            );
            return Ok(());
        };

        let body = serde_json::to_vec(&payload)?;
        let ttl = Self::ttl_for(word_reminder.has_reminder_onload);
        if let Err(err) = self.push.send(&subscription, &body, ttl).await {
            if err.is_gone() {
                self.subscriptions.delete_by_id(subscription.id).await?;
                info!(
                    subscription_id = subscription.id,
                    user_id = word_reminder.user_id,
                    "subscription gone (410), deleted"
                );
            } else {
                warn!(
                    user_id = word_reminder.user_id,
                    error = %err,
                    "push delivery failed"
                );
            }
        }
        Ok(())
    }
}
