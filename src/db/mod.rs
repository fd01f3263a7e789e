pub mod auto_word_reminders;
pub mod subscriptions;
pub mod user_words;
pub mod user_words_word_reminders;
pub mod word_reminders;
pub mod words;

pub use auto_word_reminders::{
    AutoWordReminderParams, AutoWordReminderQueries, PgAutoWordReminderQueries,
};
pub use subscriptions::{PgSubscriptionQueries, SubscriptionQueries};
pub use user_words::{PgUserWordQueries, SelectionCriteria, UserWordQueries};
pub use user_words_word_reminders::{
    PgUserWordsWordRemindersQueries, UserWordsWordRemindersQueries,
};
pub use word_reminders::{PgWordReminderQueries, WordReminderFields, WordReminderQueries};
pub use words::{PgWordQueries, WordQueries};

use std::sync::Arc;

use sqlx::PgPool;

/// The narrow persistence collaborators the scheduling core depends on,
/// bundled for injection. Tests swap in in-memory fakes.
#[derive(Clone)]
pub struct Queries {
    pub word_reminders: Arc<dyn WordReminderQueries>,
    pub auto_word_reminders: Arc<dyn AutoWordReminderQueries>,
    pub user_words: Arc<dyn UserWordQueries>,
    pub words: Arc<dyn WordQueries>,
    pub subscriptions: Arc<dyn SubscriptionQueries>,
    pub junctions: Arc<dyn UserWordsWordRemindersQueries>,
}

impl Queries {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            word_reminders: Arc::new(PgWordReminderQueries::new(pool.clone())),
            auto_word_reminders: Arc::new(PgAutoWordReminderQueries::new(pool.clone())),
            user_words: Arc::new(PgUserWordQueries::new(pool.clone())),
            words: Arc::new(PgWordQueries::new(pool.clone())),
            subscriptions: Arc::new(PgSubscriptionQueries::new(pool.clone())),
            junctions: Arc::new(PgUserWordsWordRemindersQueries::new(pool)),
        }
    }
}
