use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::models::{SortMode, UserWord};

/// Selection criteria for sampling a word batch. `learned` restricts to
/// words whose learned flag matches exactly.
#[derive(Debug, Clone, Copy)]
pub struct SelectionCriteria {
    pub count: i32,
    pub learned: bool,
    pub order: SortMode,
}

#[async_trait]
pub trait UserWordQueries: Send + Sync {
    /// Returns up to `criteria.count` matching words; fewer (including zero)
    /// is not an error.
    async fn get_user_words(
        &self,
        user_id: i32,
        criteria: &SelectionCriteria,
    ) -> Result<Vec<UserWord>, sqlx::Error>;
    async fn get_by_id(&self, id: i32) -> Result<Option<UserWord>, sqlx::Error>;
}

pub struct PgUserWordQueries {
    pool: PgPool,
}

impl PgUserWordQueries {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_user_word(row: &PgRow) -> Result<UserWord, sqlx::Error> {
    Ok(UserWord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        word_id: row.try_get("word_id")?,
        learned: row.try_get("learned")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl UserWordQueries for PgUserWordQueries {
    async fn get_user_words(
        &self,
        user_id: i32,
        criteria: &SelectionCriteria,
    ) -> Result<Vec<UserWord>, sqlx::Error> {
        let order_clause = match criteria.order {
            SortMode::Newest => "created_at DESC",
            SortMode::Oldest => "created_at ASC",
            SortMode::Random => "RANDOM()",
        };

        let query = format!(
            r#"
            SELECT * FROM user_words
            WHERE user_id = $1 AND learned = $2
            ORDER BY {order_clause}
            LIMIT $3
            "#
        );

        let rows = sqlx::query(&query)
            .bind(user_id)
            .bind(criteria.learned)
            .bind(criteria.count)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_user_word).collect()
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<UserWord>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM user_words WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_user_word).transpose()
    }
}
