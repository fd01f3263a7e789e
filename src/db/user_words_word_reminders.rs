use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::models::{AttachedWord, UserWordsWordReminders, WordReminder, WordReminderWithWords};

#[async_trait]
pub trait UserWordsWordRemindersQueries: Send + Sync {
    /// Idempotent: returns the existing row when the pair is already present.
    async fn create(
        &self,
        user_word_id: i32,
        word_reminder_id: i32,
    ) -> Result<UserWordsWordReminders, sqlx::Error>;
    async fn delete_all_by_word_reminder_id(
        &self,
        word_reminder_id: i32,
    ) -> Result<Vec<UserWordsWordReminders>, sqlx::Error>;
    async fn delete_all_by_user_id(
        &self,
        user_id: i32,
    ) -> Result<Vec<UserWordsWordReminders>, sqlx::Error>;
    /// The reminder joined with its aggregated word set (`learned` flag plus
    /// dictionary details per word).
    async fn get_by_word_reminder_id(
        &self,
        word_reminder_id: i32,
    ) -> Result<Option<WordReminderWithWords>, sqlx::Error>;
}

pub struct PgUserWordsWordRemindersQueries {
    pool: PgPool,
}

impl PgUserWordsWordRemindersQueries {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_junction(row: &PgRow) -> Result<UserWordsWordReminders, sqlx::Error> {
    Ok(UserWordsWordReminders {
        id: row.try_get("id")?,
        user_word_id: row.try_get("user_word_id")?,
        word_reminder_id: row.try_get("word_reminder_id")?,
    })
}

#[async_trait]
impl UserWordsWordRemindersQueries for PgUserWordsWordRemindersQueries {
    async fn create(
        &self,
        user_word_id: i32,
        word_reminder_id: i32,
    ) -> Result<UserWordsWordReminders, sqlx::Error> {
        let existing = sqlx::query(
            r#"
            SELECT id, user_word_id, word_reminder_id
            FROM user_words_word_reminders
            WHERE user_word_id = $1 AND word_reminder_id = $2
            "#,
        )
        .bind(user_word_id)
        .bind(word_reminder_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = existing {
            return map_junction(&row);
        }

        let row = sqlx::query(
            r#"
            INSERT INTO user_words_word_reminders (user_word_id, word_reminder_id)
            VALUES ($1, $2)
            RETURNING id, user_word_id, word_reminder_id
            "#,
        )
        .bind(user_word_id)
        .bind(word_reminder_id)
        .fetch_one(&self.pool)
        .await?;

        map_junction(&row)
    }

    async fn delete_all_by_word_reminder_id(
        &self,
        word_reminder_id: i32,
    ) -> Result<Vec<UserWordsWordReminders>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            DELETE FROM user_words_word_reminders
            WHERE word_reminder_id = $1
            RETURNING id, user_word_id, word_reminder_id
            "#,
        )
        .bind(word_reminder_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_junction).collect()
    }

    async fn delete_all_by_user_id(
        &self,
        user_id: i32,
    ) -> Result<Vec<UserWordsWordReminders>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            DELETE FROM user_words_word_reminders
            USING user_words
            WHERE user_words.id = user_words_word_reminders.user_word_id
              AND user_words.user_id = $1
            RETURNING user_words_word_reminders.id,
                      user_words_word_reminders.user_word_id,
                      user_words_word_reminders.word_reminder_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_junction).collect()
    }

    async fn get_by_word_reminder_id(
        &self,
        word_reminder_id: i32,
    ) -> Result<Option<WordReminderWithWords>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT word_reminders.id,
                   word_reminders.user_id,
                   word_reminders.reminder,
                   word_reminders.is_active,
                   word_reminders.has_reminder_onload,
                   word_reminders.finish,
                   word_reminders.created_at,
                   word_reminders.updated_at,
                   JSON_AGG(
                     JSON_BUILD_OBJECT(
                       'id', user_words.id,
                       'learned', user_words.learned,
                       'details', words.details
                     )
                   ) AS user_words
            FROM user_words_word_reminders
            JOIN user_words ON user_words.id = user_words_word_reminders.user_word_id
            JOIN words ON words.id = user_words.word_id
            JOIN word_reminders ON word_reminders.id = user_words_word_reminders.word_reminder_id
            WHERE word_reminders.id = $1
            GROUP BY word_reminders.id
            "#,
        )
        .bind(word_reminder_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let word_reminder = WordReminder {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            reminder: row.try_get("reminder")?,
            is_active: row.try_get("is_active")?,
            has_reminder_onload: row.try_get("has_reminder_onload")?,
            finish: row.try_get("finish")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        };
        let Json(user_words): Json<Vec<AttachedWord>> = row.try_get("user_words")?;

        Ok(Some(WordReminderWithWords {
            word_reminder,
            user_words,
        }))
    }
}
