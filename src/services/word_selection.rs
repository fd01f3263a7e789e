use std::sync::Arc;

use tracing::debug;

use super::ServiceError;
use crate::db::{SelectionCriteria, UserWordQueries};
use crate::models::UserWord;

/// Samples a batch of the user's saved words for a new reminder cycle.
#[derive(Clone)]
pub struct WordSelection {
    user_words: Arc<dyn UserWordQueries>,
}

impl WordSelection {
    pub fn new(user_words: Arc<dyn UserWordQueries>) -> Self {
        Self { user_words }
    }

    /// Returns up to `criteria.count` words matching the learned filter, in
    /// the requested order. A short (or empty) batch is not an error; the
    /// reminder cycle simply carries fewer words.
    pub async fn select_batch(
        &self,
        user_id: i32,
        criteria: &SelectionCriteria,
    ) -> Result<Vec<UserWord>, ServiceError> {
        let batch = self.user_words.get_user_words(user_id, criteria).await?;
        if (batch.len() as i32) < criteria.count {
            debug!(
                user_id,
                requested = criteria.count,
                selected = batch.len(),
                "short word batch"
            );
        }
        Ok(batch)
    }
}
