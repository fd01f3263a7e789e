use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::models::{Detail, Word};

#[async_trait]
pub trait WordQueries: Send + Sync {
    async fn get_by_id(&self, id: i32) -> Result<Option<Word>, sqlx::Error>;
}

pub struct PgWordQueries {
    pool: PgPool,
}

impl PgWordQueries {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WordQueries for PgWordQueries {
    async fn get_by_id(&self, id: i32) -> Result<Option<Word>, sqlx::Error> {
        let row = sqlx::query("SELECT id, details, created_at FROM words WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let Json(details): Json<Vec<Detail>> = row.try_get("details")?;

        Ok(Some(Word {
            id: row.try_get("id")?,
            details,
            created_at: row.try_get("created_at")?,
        }))
    }
}
