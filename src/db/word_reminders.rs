use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::models::WordReminder;

/// Mutable fields of a word reminder row; also the shape used on create
/// (together with `user_id`).
#[derive(Debug, Clone)]
pub struct WordReminderFields {
    pub reminder: String,
    pub is_active: bool,
    pub has_reminder_onload: bool,
    pub finish: DateTime<Utc>,
}

#[async_trait]
pub trait WordReminderQueries: Send + Sync {
    async fn create(
        &self,
        user_id: i32,
        fields: &WordReminderFields,
    ) -> Result<WordReminder, sqlx::Error>;
    async fn get_by_id(&self, id: i32) -> Result<Option<WordReminder>, sqlx::Error>;
    async fn update_by_id(
        &self,
        id: i32,
        fields: &WordReminderFields,
    ) -> Result<WordReminder, sqlx::Error>;
    async fn delete_by_id(&self, id: i32) -> Result<Option<WordReminder>, sqlx::Error>;
    async fn delete_all_by_user_id(&self, user_id: i32) -> Result<Vec<WordReminder>, sqlx::Error>;
    /// Every still-active reminder, across users. Used to resume schedules
    /// after a restart.
    async fn get_all_active(&self) -> Result<Vec<WordReminder>, sqlx::Error>;
}

pub struct PgWordReminderQueries {
    pool: PgPool,
}

impl PgWordReminderQueries {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn map_word_reminder(row: &PgRow) -> Result<WordReminder, sqlx::Error> {
    Ok(WordReminder {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        reminder: row.try_get("reminder")?,
        is_active: row.try_get("is_active")?,
        has_reminder_onload: row.try_get("has_reminder_onload")?,
        finish: row.try_get("finish")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl WordReminderQueries for PgWordReminderQueries {
    async fn create(
        &self,
        user_id: i32,
        fields: &WordReminderFields,
    ) -> Result<WordReminder, sqlx::Error> {
        let row = sqlx::query(
            r#"
            INSERT INTO word_reminders (user_id, reminder, is_active, has_reminder_onload, finish)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&fields.reminder)
        .bind(fields.is_active)
        .bind(fields.has_reminder_onload)
        .bind(fields.finish)
        .fetch_one(&self.pool)
        .await?;

        map_word_reminder(&row)
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<WordReminder>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM word_reminders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_word_reminder).transpose()
    }

    async fn update_by_id(
        &self,
        id: i32,
        fields: &WordReminderFields,
    ) -> Result<WordReminder, sqlx::Error> {
        let row = sqlx::query(
            r#"
            UPDATE word_reminders
            SET reminder = $2, is_active = $3, has_reminder_onload = $4, finish = $5,
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&fields.reminder)
        .bind(fields.is_active)
        .bind(fields.has_reminder_onload)
        .bind(fields.finish)
        .fetch_one(&self.pool)
        .await?;

        map_word_reminder(&row)
    }

    async fn delete_by_id(&self, id: i32) -> Result<Option<WordReminder>, sqlx::Error> {
        let row = sqlx::query("DELETE FROM word_reminders WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_word_reminder).transpose()
    }

    async fn delete_all_by_user_id(&self, user_id: i32) -> Result<Vec<WordReminder>, sqlx::Error> {
        let rows = sqlx::query("DELETE FROM word_reminders WHERE user_id = $1 RETURNING *")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_word_reminder).collect()
    }

    async fn get_all_active(&self) -> Result<Vec<WordReminder>, sqlx::Error> {
        let rows = sqlx::query("SELECT * FROM word_reminders WHERE is_active = TRUE")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_word_reminder).collect()
    }
}
