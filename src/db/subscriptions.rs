use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::models::Subscription;

#[async_trait]
pub trait SubscriptionQueries: Send + Sync {
    /// One active subscription per user in this design.
    async fn get_by_user_id(&self, user_id: i32) -> Result<Option<Subscription>, sqlx::Error>;
    async fn delete_by_id(&self, id: i32) -> Result<Option<Subscription>, sqlx::Error>;
}

pub struct PgSubscriptionQueries {
    pool: PgPool,
}

impl PgSubscriptionQueries {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_subscription(row: &PgRow) -> Result<Subscription, sqlx::Error> {
    Ok(Subscription {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        endpoint: row.try_get("endpoint")?,
        p256dh: row.try_get("p256dh")?,
        auth: row.try_get("auth")?,
    })
}

#[async_trait]
impl SubscriptionQueries for PgSubscriptionQueries {
    async fn get_by_user_id(&self, user_id: i32) -> Result<Option<Subscription>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM subscriptions WHERE user_id = $1 LIMIT 1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_subscription).transpose()
    }

    async fn delete_by_id(&self, id: i32) -> Result<Option<Subscription>, sqlx::Error> {
        let row = sqlx::query("DELETE FROM subscriptions WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_subscription).transpose()
    }
}
