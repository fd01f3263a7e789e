#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use word_reminder_backend::db::{
    AutoWordReminderParams, AutoWordReminderQueries, Queries, SelectionCriteria,
    SubscriptionQueries, UserWordQueries, UserWordsWordRemindersQueries, WordReminderFields,
    WordReminderQueries, WordQueries,
};
use word_reminder_backend::models::{
    AttachedWord, AutoWordReminder, Detail, SortMode, Subscription, UserWord,
    UserWordsWordReminders, Word, WordReminder, WordReminderWithWords,
};
use word_reminder_backend::push::{PushError, PushSender};
use word_reminder_backend::queue::{Job, JobQueue, QueueError, WorkHandler, WorkOptions};
use word_reminder_backend::state::AppState;

/// Ordered log of collaborator calls, shared across fakes so tests can
/// assert cross-entity ordering (e.g. junctions deleted before the row).
pub type Journal = Arc<Mutex<Vec<String>>>;

// ---------------------------------------------------------------------------
// queue fake

#[derive(Default)]
pub struct RecordingQueue {
    pub calls: Mutex<Vec<String>>,
    pub workers: Mutex<HashMap<String, WorkHandler>>,
    pub schedules: Mutex<HashMap<String, (String, serde_json::Value)>>,
    pub sent_after: Mutex<Vec<(String, serde_json::Value, DateTime<Utc>)>>,
    pub completed: Mutex<Vec<(String, Uuid)>>,
}

impl RecordingQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn worker_count(&self, name: &str) -> usize {
        usize::from(self.workers.lock().unwrap().contains_key(name))
    }

    pub fn schedule_for(&self, name: &str) -> Option<(String, serde_json::Value)> {
        self.schedules.lock().unwrap().get(name).cloned()
    }

    /// Deliver a job batch to the queue's registered worker, as the
    /// substrate would on a firing.
    pub async fn fire(&self, name: &str, jobs: Vec<Job>) {
        let worker = self
            .workers
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("no worker registered on {name}"));
        worker(jobs).await;
    }

    fn record(&self, entry: String) {
        self.calls.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl JobQueue for RecordingQueue {
    async fn create_queue(&self, name: &str) -> Result<(), QueueError> {
        self.record(format!("create_queue {name}"));
        Ok(())
    }

    async fn schedule(
        &self,
        name: &str,
        cron_expr: &str,
        payload: serde_json::Value,
    ) -> Result<(), QueueError> {
        self.record(format!("schedule {name}"));
        self.schedules
            .lock()
            .unwrap()
            .insert(name.to_string(), (cron_expr.to_string(), payload));
        Ok(())
    }

    async fn send_after(
        &self,
        name: &str,
        payload: serde_json::Value,
        when: DateTime<Utc>,
    ) -> Result<(), QueueError> {
        self.record(format!("send_after {name}"));
        self.sent_after
            .lock()
            .unwrap()
            .push((name.to_string(), payload, when));
        Ok(())
    }

    async fn work(
        &self,
        name: &str,
        _options: WorkOptions,
        handler: WorkHandler,
    ) -> Result<(), QueueError> {
        self.record(format!("work {name}"));
        self.workers
            .lock()
            .unwrap()
            .insert(name.to_string(), handler);
        Ok(())
    }

    async fn purge_queue(&self, name: &str) -> Result<(), QueueError> {
        self.record(format!("purge_queue {name}"));
        self.schedules.lock().unwrap().remove(name);
        self.sent_after
            .lock()
            .unwrap()
            .retain(|(queue, _, _)| queue != name);
        Ok(())
    }

    async fn off_work(&self, name: &str) -> Result<(), QueueError> {
        self.record(format!("off_work {name}"));
        self.workers.lock().unwrap().remove(name);
        Ok(())
    }

    async fn notify_worker(&self, name: &str) -> Result<(), QueueError> {
        self.record(format!("notify_worker {name}"));
        Ok(())
    }

    async fn complete(&self, name: &str, job_id: Uuid) -> Result<(), QueueError> {
        self.record(format!("complete {name}"));
        self.completed
            .lock()
            .unwrap()
            .push((name.to_string(), job_id));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// push fake

#[derive(Default)]
pub struct FakePush {
    pub sent: Mutex<Vec<(i32, Vec<u8>, u32)>>,
    pub fail_status: Mutex<Option<u16>>,
}

impl FakePush {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_with(&self, status: u16) {
        *self.fail_status.lock().unwrap() = Some(status);
    }

    pub fn sent_payloads(&self) -> Vec<(i32, serde_json::Value, u32)> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(id, body, ttl)| (*id, serde_json::from_slice(body).unwrap(), *ttl))
            .collect()
    }
}

#[async_trait]
impl PushSender for FakePush {
    async fn send(
        &self,
        subscription: &Subscription,
        payload: &[u8],
        ttl_secs: u32,
    ) -> Result<(), PushError> {
        if let Some(status) = *self.fail_status.lock().unwrap() {
            return Err(PushError {
                status_code: Some(status),
                message: "injected failure".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((subscription.id, payload.to_vec(), ttl_secs));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// in-memory persistence fakes

#[derive(Default)]
pub struct MemDb {
    pub journal: Journal,
    pub word_reminders: Mutex<HashMap<i32, WordReminder>>,
    pub word_reminder_updates: Mutex<Vec<(i32, WordReminderFields)>>,
    pub junctions: Mutex<Vec<UserWordsWordReminders>>,
    pub user_words: Mutex<Vec<UserWord>>,
    pub words: Mutex<HashMap<i32, Word>>,
    pub autos: Mutex<HashMap<i32, AutoWordReminder>>,
    pub subscriptions: Mutex<Vec<Subscription>>,
    next_word_reminder_id: Mutex<i32>,
    next_junction_id: Mutex<i32>,
    next_auto_id: Mutex<i32>,
}

impl MemDb {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    fn log(&self, entry: String) {
        self.journal.lock().unwrap().push(entry);
    }

    pub fn seed_word(&self, id: i32, text: &str) {
        self.words.lock().unwrap().insert(
            id,
            Word {
                id,
                details: vec![Detail {
                    word: text.to_string(),
                    phonetics: vec![],
                    meanings: vec![],
                }],
                created_at: Utc::now(),
            },
        );
    }

    pub fn seed_user_word(&self, id: i32, user_id: i32, word_id: i32, learned: bool) -> UserWord {
        let user_word = UserWord {
            id,
            user_id,
            word_id,
            learned,
            // stagger creation times so Newest/Oldest ordering is stable
            created_at: Utc::now() - Duration::minutes(i64::from(1000 - id)),
            updated_at: Utc::now(),
        };
        self.user_words.lock().unwrap().push(user_word.clone());
        user_word
    }

    pub fn seed_subscription(&self, id: i32, user_id: i32) {
        self.subscriptions.lock().unwrap().push(Subscription {
            id,
            user_id,
            endpoint: format!("https://push.example/{id}"),
            p256dh: "p256dh-key".to_string(),
            auth: "auth-key".to_string(),
        });
    }
}

#[async_trait]
impl WordReminderQueries for MemDb {
    async fn create(
        &self,
        user_id: i32,
        fields: &WordReminderFields,
    ) -> Result<WordReminder, sqlx::Error> {
        let mut next = self.next_word_reminder_id.lock().unwrap();
        *next += 1;
        let id = *next;
        drop(next);

        let now = Utc::now();
        let word_reminder = WordReminder {
            id,
            user_id,
            reminder: fields.reminder.clone(),
            is_active: fields.is_active,
            has_reminder_onload: fields.has_reminder_onload,
            finish: fields.finish,
            created_at: now,
            updated_at: now,
        };
        self.word_reminders
            .lock()
            .unwrap()
            .insert(id, word_reminder.clone());
        self.log(format!("word_reminders.create {id}"));
        Ok(word_reminder)
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<WordReminder>, sqlx::Error> {
        Ok(self.word_reminders.lock().unwrap().get(&id).cloned())
    }

    async fn update_by_id(
        &self,
        id: i32,
        fields: &WordReminderFields,
    ) -> Result<WordReminder, sqlx::Error> {
        self.word_reminder_updates
            .lock()
            .unwrap()
            .push((id, fields.clone()));
        let mut rows = self.word_reminders.lock().unwrap();
        let row = rows.get_mut(&id).ok_or(sqlx::Error::RowNotFound)?;
        row.reminder = fields.reminder.clone();
        row.is_active = fields.is_active;
        row.has_reminder_onload = fields.has_reminder_onload;
        row.finish = fields.finish;
        row.updated_at = Utc::now();
        let updated = row.clone();
        drop(rows);
        self.log(format!("word_reminders.update_by_id {id}"));
        Ok(updated)
    }

    async fn delete_by_id(&self, id: i32) -> Result<Option<WordReminder>, sqlx::Error> {
        let removed = self.word_reminders.lock().unwrap().remove(&id);
        self.log(format!("word_reminders.delete_by_id {id}"));
        Ok(removed)
    }

    async fn delete_all_by_user_id(&self, user_id: i32) -> Result<Vec<WordReminder>, sqlx::Error> {
        let mut rows = self.word_reminders.lock().unwrap();
        let ids: Vec<i32> = rows
            .values()
            .filter(|row| row.user_id == user_id)
            .map(|row| row.id)
            .collect();
        let deleted = ids.iter().filter_map(|id| rows.remove(id)).collect();
        drop(rows);
        self.log(format!("word_reminders.delete_all_by_user_id {user_id}"));
        Ok(deleted)
    }

    async fn get_all_active(&self) -> Result<Vec<WordReminder>, sqlx::Error> {
        Ok(self
            .word_reminders
            .lock()
            .unwrap()
            .values()
            .filter(|row| row.is_active)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserWordsWordRemindersQueries for MemDb {
    async fn create(
        &self,
        user_word_id: i32,
        word_reminder_id: i32,
    ) -> Result<UserWordsWordReminders, sqlx::Error> {
        let mut junctions = self.junctions.lock().unwrap();
        if let Some(existing) = junctions
            .iter()
            .find(|j| j.user_word_id == user_word_id && j.word_reminder_id == word_reminder_id)
        {
            return Ok(existing.clone());
        }
        let mut next = self.next_junction_id.lock().unwrap();
        *next += 1;
        let junction = UserWordsWordReminders {
            id: *next,
            user_word_id,
            word_reminder_id,
        };
        drop(next);
        junctions.push(junction.clone());
        drop(junctions);
        self.log(format!("junctions.create {user_word_id}:{word_reminder_id}"));
        Ok(junction)
    }

    async fn delete_all_by_word_reminder_id(
        &self,
        word_reminder_id: i32,
    ) -> Result<Vec<UserWordsWordReminders>, sqlx::Error> {
        let mut junctions = self.junctions.lock().unwrap();
        let (deleted, kept): (Vec<_>, Vec<_>) = junctions
            .drain(..)
            .partition(|j| j.word_reminder_id == word_reminder_id);
        *junctions = kept;
        drop(junctions);
        self.log(format!(
            "junctions.delete_all_by_word_reminder_id {word_reminder_id}"
        ));
        Ok(deleted)
    }

    async fn delete_all_by_user_id(
        &self,
        user_id: i32,
    ) -> Result<Vec<UserWordsWordReminders>, sqlx::Error> {
        let user_word_ids: Vec<i32> = self
            .user_words
            .lock()
            .unwrap()
            .iter()
            .filter(|uw| uw.user_id == user_id)
            .map(|uw| uw.id)
            .collect();
        let mut junctions = self.junctions.lock().unwrap();
        let (deleted, kept): (Vec<_>, Vec<_>) = junctions
            .drain(..)
            .partition(|j| user_word_ids.contains(&j.user_word_id));
        *junctions = kept;
        drop(junctions);
        self.log(format!("junctions.delete_all_by_user_id {user_id}"));
        Ok(deleted)
    }

    async fn get_by_word_reminder_id(
        &self,
        word_reminder_id: i32,
    ) -> Result<Option<WordReminderWithWords>, sqlx::Error> {
        let Some(word_reminder) = self
            .word_reminders
            .lock()
            .unwrap()
            .get(&word_reminder_id)
            .cloned()
        else {
            return Ok(None);
        };

        let junctions: Vec<UserWordsWordReminders> = self
            .junctions
            .lock()
            .unwrap()
            .iter()
            .filter(|j| j.word_reminder_id == word_reminder_id)
            .cloned()
            .collect();
        if junctions.is_empty() {
            return Ok(None);
        }

        let user_words = self.user_words.lock().unwrap();
        let words = self.words.lock().unwrap();
        let attached = junctions
            .iter()
            .filter_map(|j| {
                let user_word = user_words.iter().find(|uw| uw.id == j.user_word_id)?;
                let word = words.get(&user_word.word_id)?;
                Some(AttachedWord {
                    id: user_word.id,
                    learned: user_word.learned,
                    details: word.details.clone(),
                })
            })
            .collect();

        Ok(Some(WordReminderWithWords {
            word_reminder,
            user_words: attached,
        }))
    }
}

#[async_trait]
impl UserWordQueries for MemDb {
    async fn get_user_words(
        &self,
        user_id: i32,
        criteria: &SelectionCriteria,
    ) -> Result<Vec<UserWord>, sqlx::Error> {
        let mut matching: Vec<UserWord> = self
            .user_words
            .lock()
            .unwrap()
            .iter()
            .filter(|uw| uw.user_id == user_id && uw.learned == criteria.learned)
            .cloned()
            .collect();
        match criteria.order {
            SortMode::Newest => matching.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortMode::Oldest => matching.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortMode::Random => {}
        }
        matching.truncate(criteria.count.max(0) as usize);
        Ok(matching)
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<UserWord>, sqlx::Error> {
        Ok(self
            .user_words
            .lock()
            .unwrap()
            .iter()
            .find(|uw| uw.id == id)
            .cloned())
    }
}

#[async_trait]
impl WordQueries for MemDb {
    async fn get_by_id(&self, id: i32) -> Result<Option<Word>, sqlx::Error> {
        Ok(self.words.lock().unwrap().get(&id).cloned())
    }
}

#[async_trait]
impl SubscriptionQueries for MemDb {
    async fn get_by_user_id(&self, user_id: i32) -> Result<Option<Subscription>, sqlx::Error> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .find(|sub| sub.user_id == user_id)
            .cloned())
    }

    async fn delete_by_id(&self, id: i32) -> Result<Option<Subscription>, sqlx::Error> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let position = subscriptions.iter().position(|sub| sub.id == id);
        let removed = position.map(|idx| subscriptions.remove(idx));
        drop(subscriptions);
        self.log(format!("subscriptions.delete_by_id {id}"));
        Ok(removed)
    }
}

#[async_trait]
impl AutoWordReminderQueries for MemDb {
    async fn create(
        &self,
        user_id: i32,
        params: &AutoWordReminderParams,
    ) -> Result<AutoWordReminder, sqlx::Error> {
        let mut next = self.next_auto_id.lock().unwrap();
        *next += 1;
        let id = *next;
        drop(next);

        let now = Utc::now();
        let auto = AutoWordReminder {
            id,
            user_id,
            is_active: params.is_active,
            has_reminder_onload: params.has_reminder_onload,
            has_learned_words: params.has_learned_words,
            sort_mode: params.sort_mode,
            word_count: params.word_count,
            reminder: params.reminder.clone(),
            duration: params.duration,
            created_at: now,
            updated_at: now,
        };
        self.autos.lock().unwrap().insert(id, auto.clone());
        self.log(format!("auto_word_reminders.create {id}"));
        Ok(auto)
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<AutoWordReminder>, sqlx::Error> {
        Ok(self.autos.lock().unwrap().get(&id).cloned())
    }

    async fn get_by_user_id(&self, user_id: i32) -> Result<Vec<AutoWordReminder>, sqlx::Error> {
        Ok(self
            .autos
            .lock()
            .unwrap()
            .values()
            .filter(|auto| auto.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_by_id(
        &self,
        id: i32,
        params: &AutoWordReminderParams,
    ) -> Result<AutoWordReminder, sqlx::Error> {
        let mut autos = self.autos.lock().unwrap();
        let auto = autos.get_mut(&id).ok_or(sqlx::Error::RowNotFound)?;
        auto.is_active = params.is_active;
        auto.has_reminder_onload = params.has_reminder_onload;
        auto.has_learned_words = params.has_learned_words;
        auto.sort_mode = params.sort_mode;
        auto.word_count = params.word_count;
        auto.reminder = params.reminder.clone();
        auto.duration = params.duration;
        auto.updated_at = Utc::now();
        let updated = auto.clone();
        drop(autos);
        self.log(format!("auto_word_reminders.update_by_id {id}"));
        Ok(updated)
    }

    async fn delete_by_id(&self, id: i32) -> Result<Option<AutoWordReminder>, sqlx::Error> {
        let removed = self.autos.lock().unwrap().remove(&id);
        self.log(format!("auto_word_reminders.delete_by_id {id}"));
        Ok(removed)
    }

    async fn get_all(&self) -> Result<Vec<AutoWordReminder>, sqlx::Error> {
        Ok(self.autos.lock().unwrap().values().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// wiring

pub fn queries(db: &Arc<MemDb>) -> Queries {
    Queries {
        word_reminders: db.clone(),
        auto_word_reminders: db.clone(),
        user_words: db.clone(),
        words: db.clone(),
        subscriptions: db.clone(),
        junctions: db.clone(),
    }
}

pub fn setup() -> (Arc<MemDb>, Arc<RecordingQueue>, Arc<FakePush>, AppState) {
    let db = MemDb::new();
    let queue = RecordingQueue::new();
    let push = FakePush::new();
    let state = AppState::new(queries(&db), queue.clone(), push.clone());
    (db, queue, push, state)
}

pub fn reminder_fields(
    reminder: &str,
    is_active: bool,
    has_reminder_onload: bool,
    finish: DateTime<Utc>,
) -> WordReminderFields {
    WordReminderFields {
        reminder: reminder.to_string(),
        is_active,
        has_reminder_onload,
        finish,
    }
}

pub fn auto_params(reminder: &str, word_count: i32, duration_ms: i64) -> AutoWordReminderParams {
    AutoWordReminderParams {
        is_active: true,
        has_reminder_onload: true,
        has_learned_words: false,
        sort_mode: SortMode::Newest,
        word_count,
        reminder: reminder.to_string(),
        duration: duration_ms,
    }
}

pub fn job(payload: serde_json::Value) -> Job {
    Job {
        id: Uuid::new_v4(),
        data: payload,
    }
}
