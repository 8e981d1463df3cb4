//! Ban list.

use chrono::Utc;
use sqlx::SqlitePool;
use teloxide::types::UserId;

use crate::database::models::BanRecord;
use crate::database::Database;
use crate::error::BotResult;

#[derive(Clone)]
pub struct BanRepository {
    pool: SqlitePool,
}

impl BanRepository {
    pub fn new(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }

    /// Ban a user, replacing any earlier reason.
    pub async fn ban(&self, user_id: UserId, reason: &str) -> BotResult<()> {
        sqlx::query(
            "INSERT INTO banned_users (user_id, banned_at, reason) VALUES (?1, ?2, ?3) \
             ON CONFLICT(user_id) DO UPDATE SET banned_at = excluded.banned_at, reason = excluded.reason",
        )
        .bind(user_id.0 as i64)
        .bind(Utc::now())
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns `true` if the user was banned.
    pub async fn unban(&self, user_id: UserId) -> BotResult<bool> {
        let removed = sqlx::query("DELETE FROM banned_users WHERE user_id = ?1")
            .bind(user_id.0 as i64)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(removed > 0)
    }

    pub async fn get(&self, user_id: UserId) -> BotResult<Option<BanRecord>> {
        let record = sqlx::query_as::<_, BanRecord>(
            "SELECT user_id, banned_at, reason FROM banned_users WHERE user_id = ?1",
        )
        .bind(user_id.0 as i64)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn is_banned(&self, user_id: UserId) -> BotResult<bool> {
        Ok(self.get(user_id).await?.is_some())
    }
}
