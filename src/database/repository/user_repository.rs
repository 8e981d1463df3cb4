//! User repository.
//!
//! Records are created on first contact and refreshed on every later
//! message. Nothing here touches `referral_count`; crediting lives in the
//! referral repository so the counter and the ledger move together.

use chrono::Utc;
use sqlx::SqlitePool;
use teloxide::types::UserId;
use tracing::debug;

use crate::database::models::{Contact, UserRecord, UserStats};
use crate::database::Database;
use crate::error::BotResult;

const USER_COLUMNS: &str = "user_id, first_name, username, custom_username, referral_count, \
     verified, referred_by, joined_at, last_check, last_seen";

/// Repository for user records.
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }

    /// Insert the user if unseen, otherwise refresh their profile.
    ///
    /// Returns `true` when this call created the record.
    pub async fn ensure(&self, contact: &Contact) -> BotResult<bool> {
        let now = Utc::now();
        let id = contact.id.0 as i64;

        let created = sqlx::query(
            "INSERT INTO users (user_id, first_name, username, joined_at, last_seen) \
             VALUES (?1, ?2, ?3, ?4, ?4) \
             ON CONFLICT(user_id) DO NOTHING",
        )
        .bind(id)
        .bind(&contact.first_name)
        .bind(&contact.username)
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected()
            == 1;

        if created {
            debug!("Created user record {}", id);
            return Ok(true);
        }

        sqlx::query("UPDATE users SET first_name = ?2, username = ?3, last_seen = ?4 WHERE user_id = ?1")
            .bind(id)
            .bind(&contact.first_name)
            .bind(&contact.username)
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(false)
    }

    /// Get user by ID.
    pub async fn get(&self, user_id: UserId) -> BotResult<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"
        ))
        .bind(user_id.0 as i64)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn exists(&self, user_id: UserId) -> BotResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE user_id = ?1")
            .bind(user_id.0 as i64)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    /// Record who referred this user, unless a referrer is already set.
    ///
    /// Returns `true` if the referrer was stored.
    pub async fn set_referred_by(&self, user_id: UserId, referrer: UserId) -> BotResult<bool> {
        let updated = sqlx::query(
            "UPDATE users SET referred_by = ?2 WHERE user_id = ?1 AND referred_by IS NULL",
        )
        .bind(user_id.0 as i64)
        .bind(referrer.0 as i64)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated == 1)
    }

    /// Store the outcome of a membership check.
    ///
    /// A positive result also stamps `last_check`; a negative one clears it.
    pub async fn set_verified(&self, user_id: UserId, verified: bool) -> BotResult<()> {
        let last_check = verified.then(Utc::now);

        sqlx::query("UPDATE users SET verified = ?2, last_check = ?3 WHERE user_id = ?1")
            .bind(user_id.0 as i64)
            .bind(verified)
            .bind(last_check)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn set_custom_username(&self, user_id: UserId, username: &str) -> BotResult<()> {
        sqlx::query("UPDATE users SET custom_username = ?2 WHERE user_id = ?1")
            .bind(user_id.0 as i64)
            .bind(username)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// IDs of every known user, oldest first.
    pub async fn all_ids(&self) -> BotResult<Vec<UserId>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT user_id FROM users ORDER BY joined_at, user_id")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().map(|id| UserId(id as u64)).collect())
    }

    /// Every record, oldest first.
    pub async fn all(&self) -> BotResult<Vec<UserRecord>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY joined_at, user_id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// One page of users, best referrers first.
    pub async fn page(&self, offset: i64, limit: i64) -> BotResult<Vec<UserRecord>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             ORDER BY referral_count DESC, joined_at, user_id \
             LIMIT ?1 OFFSET ?2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn count(&self) -> BotResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(total)
    }

    /// Aggregate statistics. `mining_threshold` is the referral count that
    /// unlocks the mining section.
    pub async fn stats(&self, mining_threshold: i64) -> BotResult<UserStats> {
        let (total, verified, total_referrals, mining_access): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), \
                    COALESCE(SUM(verified), 0), \
                    COALESCE(SUM(referral_count), 0), \
                    COALESCE(SUM(referral_count >= ?1), 0) \
             FROM users",
        )
        .bind(mining_threshold)
        .fetch_one(&self.pool)
        .await?;

        let top_referrer: Option<(String, i64)> = sqlx::query_as(
            "SELECT first_name, referral_count FROM users \
             WHERE referral_count > 0 \
             ORDER BY referral_count DESC, joined_at \
             LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(UserStats {
            total,
            verified,
            total_referrals,
            top_referrer,
            mining_access,
        })
    }
}
