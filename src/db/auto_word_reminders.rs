use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::models::{AutoWordReminder, SortMode};

/// Configuration fields of an auto word reminder; used on both create and
/// update. `duration` is in milliseconds.
#[derive(Debug, Clone)]
pub struct AutoWordReminderParams {
    pub is_active: bool,
    pub has_reminder_onload: bool,
    pub has_learned_words: bool,
    pub sort_mode: SortMode,
    pub word_count: i32,
    pub reminder: String,
    pub duration: i64,
}

#[async_trait]
pub trait AutoWordReminderQueries: Send + Sync {
    async fn create(
        &self,
        user_id: i32,
        params: &AutoWordReminderParams,
    ) -> Result<AutoWordReminder, sqlx::Error>;
    async fn get_by_id(&self, id: i32) -> Result<Option<AutoWordReminder>, sqlx::Error>;
    async fn get_by_user_id(&self, user_id: i32) -> Result<Vec<AutoWordReminder>, sqlx::Error>;
    async fn update_by_id(
        &self,
        id: i32,
        params: &AutoWordReminderParams,
    ) -> Result<AutoWordReminder, sqlx::Error>;
    async fn delete_by_id(&self, id: i32) -> Result<Option<AutoWordReminder>, sqlx::Error>;
    /// Every configuration, across users. Used to resume regeneration
    /// schedules after a restart.
    async fn get_all(&self) -> Result<Vec<AutoWordReminder>, sqlx::Error>;
}

pub struct PgAutoWordReminderQueries {
    pool: PgPool,
}

impl PgAutoWordReminderQueries {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_auto_word_reminder(row: &PgRow) -> Result<AutoWordReminder, sqlx::Error> {
    let sort_mode: String = row.try_get("sort_mode")?;
    Ok(AutoWordReminder {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        is_active: row.try_get("is_active")?,
        has_reminder_onload: row.try_get("has_reminder_onload")?,
        has_learned_words: row.try_get("has_learned_words")?,
        sort_mode: SortMode::from_str(&sort_mode),
        word_count: row.try_get("word_count")?,
        reminder: row.try_get("reminder")?,
        duration: row.try_get("duration")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl AutoWordReminderQueries for PgAutoWordReminderQueries {
    async fn create(
        &self,
        user_id: i32,
        params: &AutoWordReminderParams,
    ) -> Result<AutoWordReminder, sqlx::Error> {
        let row = sqlx::query(
            r#"
            INSERT INTO auto_word_reminders
              (user_id, is_active, has_reminder_onload, has_learned_words,
               sort_mode, word_count, reminder, duration)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(params.is_active)
        .bind(params.has_reminder_onload)
        .bind(params.has_learned_words)
        .bind(params.sort_mode.as_str())
        .bind(params.word_count)
        .bind(&params.reminder)
        .bind(params.duration)
        .fetch_one(&self.pool)
        .await?;

        map_auto_word_reminder(&row)
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<AutoWordReminder>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM auto_word_reminders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_auto_word_reminder).transpose()
    }

    async fn get_by_user_id(&self, user_id: i32) -> Result<Vec<AutoWordReminder>, sqlx::Error> {
        let rows = sqlx::query("SELECT * FROM auto_word_reminders WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_auto_word_reminder).collect()
    }

    async fn update_by_id(
        &self,
        id: i32,
        params: &AutoWordReminderParams,
    ) -> Result<AutoWordReminder, sqlx::Error> {
        let row = sqlx::query(
            r#"
            UPDATE auto_word_reminders
            SET is_active = $2, has_reminder_onload = $3, has_learned_words = $4,
                sort_mode = $5, word_count = $6, reminder = $7, duration = $8,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(params.is_active)
        .bind(params.has_reminder_onload)
        .bind(params.has_learned_words)
        .bind(params.sort_mode.as_str())
        .bind(params.word_count)
        .bind(&params.reminder)
        .bind(params.duration)
        .fetch_one(&self.pool)
        .await?;

        map_auto_word_reminder(&row)
    }

    async fn delete_by_id(&self, id: i32) -> Result<Option<AutoWordReminder>, sqlx::Error> {
        let row = sqlx::query("DELETE FROM auto_word_reminders WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_auto_word_reminder).transpose()
    }

    async fn get_all(&self) -> Result<Vec<AutoWordReminder>, sqlx::Error> {
        let rows = sqlx::query("SELECT * FROM auto_word_reminders")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_auto_word_reminder).collect()
    }
}
