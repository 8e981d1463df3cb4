//! Per-user pending conversational action.

use chrono::Utc;
use sqlx::SqlitePool;
use teloxide::types::UserId;

use crate::database::models::PendingAction;
use crate::database::Database;
use crate::error::BotResult;

#[derive(Clone)]
pub struct PendingActionRepository {
    pool: SqlitePool,
}

impl PendingActionRepository {
    pub fn new(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }

    pub async fn get(&self, user_id: UserId) -> BotResult<Option<PendingAction>> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT action FROM pending_actions WHERE user_id = ?1")
                .bind(user_id.0 as i64)
                .fetch_optional(&self.pool)
                .await?;

        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(Into::into)
    }

    /// Replace whatever the user was doing with `action`.
    pub async fn set(&self, user_id: UserId, action: &PendingAction) -> BotResult<()> {
        let json = serde_json::to_string(action)?;

        sqlx::query(
            "INSERT INTO pending_actions (user_id, action, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(user_id) DO UPDATE SET action = excluded.action, updated_at = excluded.updated_at",
        )
        .bind(user_id.0 as i64)
        .bind(json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn clear(&self, user_id: UserId) -> BotResult<()> {
        sqlx::query("DELETE FROM pending_actions WHERE user_id = ?1")
            .bind(user_id.0 as i64)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::memory_db;

    #[tokio::test]
    async fn set_replace_clear() {
        let db = memory_db().await;
        let pending = PendingActionRepository::new(&db);
        let admin = UserId(1);

        assert_eq!(pending.get(admin).await.unwrap(), None);

        pending.set(admin, &PendingAction::AwaitTarget).await.unwrap();
        pending
            .set(admin, &PendingAction::AwaitDirectText { target: 9 })
            .await
            .unwrap();
        assert_eq!(
            pending.get(admin).await.unwrap(),
            Some(PendingAction::AwaitDirectText { target: 9 })
        );

        pending.clear(admin).await.unwrap();
        assert_eq!(pending.get(admin).await.unwrap(), None);
    }
}
