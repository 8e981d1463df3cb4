//! Append-only log of messages the admin sent through the bot.

use chrono::Utc;
use sqlx::SqlitePool;
use teloxide::types::UserId;

#[cfg(test)]
use crate::database::models::AdminMessage;
use crate::database::Database;
use crate::error::BotResult;

#[derive(Clone)]
pub struct AdminLogRepository {
    pool: SqlitePool,
}

impl AdminLogRepository {
    pub fn new(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }

    /// Append an entry. `recipient == None` records a broadcast.
    pub async fn append(
        &self,
        sender: UserId,
        recipient: Option<UserId>,
        body: &str,
        delivered: usize,
        failed: usize,
    ) -> BotResult<i64> {
        let id = sqlx::query(
            "INSERT INTO admin_messages (sender_id, recipient_id, sent_at, body, delivered, failed) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(sender.0 as i64)
        .bind(recipient.map(|r| r.0 as i64))
        .bind(Utc::now())
        .bind(body)
        .bind(delivered as i64)
        .bind(failed as i64)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(id)
    }

    /// Most recent entries first.
    #[cfg(test)]
    pub async fn recent(&self, limit: i64) -> BotResult<Vec<AdminMessage>> {
        let entries = sqlx::query_as::<_, AdminMessage>(
            "SELECT id, sender_id, recipient_id, sent_at, body, delivered, failed \
             FROM admin_messages ORDER BY id DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::memory_db;

    #[tokio::test]
    async fn entries_come_back_newest_first() {
        let db = memory_db().await;
        let log = AdminLogRepository::new(&db);

        log.append(UserId(1), Some(UserId(2)), "hello", 1, 0).await.unwrap();
        log.append(UserId(1), None, "news", 3, 1).await.unwrap();

        let entries = log.recent(10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_broadcast());
        assert_eq!(entries[0].delivered, 3);
        assert_eq!(entries[1].recipient_id, Some(2));
    }
}
