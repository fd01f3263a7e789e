use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One delivery cycle of word reminders. `reminder` is a cron expression
/// describing how often the cycle fires; `finish` is the absolute expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordReminder {
    pub id: i32,
    pub user_id: i32,
    pub reminder: String,
    pub is_active: bool,
    pub has_reminder_onload: bool,
    pub finish: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Derived lifecycle state of a [`WordReminder`] at a given instant.
///
/// The firing branches of the scheduled worker dispatch on this instead of
/// re-deriving `(is_active, finish, now)` checks at each call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordReminderStatus {
    /// Created and scheduled, but not activated yet.
    Pending,
    /// Active with its expiry still in the future.
    Active,
    /// Past its expiry while still flagged active; the next firing must
    /// deactivate it.
    Expired,
    /// Deactivated, terminal for this cycle.
    Deactivated,
}

impl WordReminderStatus {
    pub fn of(is_active: bool, finish: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        match (is_active, finish <= now) {
            (true, true) => Self::Expired,
            (true, false) => Self::Active,
            (false, true) => Self::Deactivated,
            (false, false) => Self::Pending,
        }
    }
}

impl WordReminder {
    pub fn status_at(&self, now: DateTime<Utc>) -> WordReminderStatus {
        WordReminderStatus::of(self.is_active, self.finish, now)
    }
}

/// Junction row associating a user's saved word with a word reminder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserWordsWordReminders {
    pub id: i32,
    pub user_word_id: i32,
    pub word_reminder_id: i32,
}

/// Selection order used when sampling a fresh word batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    Newest,
    Oldest,
    Random,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::Random => "random",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "oldest" => Self::Oldest,
            "random" => Self::Random,
            _ => Self::Newest,
        }
    }
}

/// Recurring configuration that periodically samples a fresh word batch and
/// spins up a new [`WordReminder`] cycle. `duration` is in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoWordReminder {
    pub id: i32,
    pub user_id: i32,
    pub is_active: bool,
    pub has_reminder_onload: bool,
    pub has_learned_words: bool,
    pub sort_mode: SortMode,
    pub word_count: i32,
    pub reminder: String,
    pub duration: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Web Push endpoint plus its crypto keys; one active subscription per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i32,
    pub user_id: i32,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

/// One dictionary entry of a word. `word` is the canonical display string;
/// the remaining dictionary payload is carried opaquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detail {
    pub word: String,
    #[serde(default)]
    pub phonetics: Vec<serde_json::Value>,
    #[serde(default)]
    pub meanings: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    pub id: i32,
    pub details: Vec<Detail>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserWord {
    pub id: i32,
    pub user_id: i32,
    pub word_id: i32,
    pub learned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A word attached to a reminder, as returned by the junction aggregate
/// query: the word's dictionary details plus the user's learned flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachedWord {
    pub id: i32,
    pub learned: bool,
    pub details: Vec<Detail>,
}

/// A word reminder joined with its full word set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordReminderWithWords {
    #[serde(flatten)]
    pub word_reminder: WordReminder,
    pub user_words: Vec<AttachedWord>,
}
