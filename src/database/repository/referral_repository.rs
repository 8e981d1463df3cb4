//! Referral credit ledger.
//!
//! `referral_credits` has one row per referred user that already produced a
//! credit. The ledger insert and the referrer's counter increment share a
//! transaction, so a referred user can credit their referrer at most once no
//! matter how often their start or verify events are replayed.

use chrono::Utc;
use sqlx::SqlitePool;
use teloxide::types::UserId;
use tracing::{debug, warn};

use crate::database::Database;
use crate::error::BotResult;

/// A referral credit that was just granted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferralCredit {
    pub referrer: UserId,
    pub referred: UserId,
    /// Referrer's count after the increment.
    pub referrer_total: i64,
}

#[derive(Clone)]
pub struct ReferralRepository {
    pool: SqlitePool,
}

impl ReferralRepository {
    pub fn new(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }

    /// Credit the referrer stored on `referred`'s record, if any and if not
    /// already credited.
    ///
    /// Returns `None` when there is nothing to credit.
    pub async fn credit_pending(&self, referred: UserId) -> BotResult<Option<ReferralCredit>> {
        let referred_id = referred.0 as i64;
        let mut tx = self.pool.begin().await?;

        let referrer_id: Option<i64> =
            sqlx::query_scalar::<_, Option<i64>>("SELECT referred_by FROM users WHERE user_id = ?1")
                .bind(referred_id)
                .fetch_optional(&mut *tx)
                .await?
                .flatten();

        let Some(referrer_id) = referrer_id else {
            return Ok(None);
        };

        let inserted = sqlx::query(
            "INSERT INTO referral_credits (referred_id, referrer_id, credited_at) \
             VALUES (?1, ?2, ?3) \
             ON CONFLICT(referred_id) DO NOTHING",
        )
        .bind(referred_id)
        .bind(referrer_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            debug!("Referral of {} was already credited", referred_id);
            return Ok(None);
        }

        let total: Option<i64> = sqlx::query_scalar(
            "UPDATE users SET referral_count = referral_count + 1 \
             WHERE user_id = ?1 \
             RETURNING referral_count",
        )
        .bind(referrer_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(referrer_total) = total else {
            // Dropping the transaction rolls the ledger row back.
            warn!("Referrer {} of user {} has no record", referrer_id, referred_id);
            return Ok(None);
        };

        tx.commit().await?;

        Ok(Some(ReferralCredit {
            referrer: UserId(referrer_id as u64),
            referred,
            referrer_total,
        }))
    }

    #[cfg(test)]
    pub async fn is_credited(&self, referred: UserId) -> BotResult<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM referral_credits WHERE referred_id = ?1")
                .bind(referred.0 as i64)
                .fetch_optional(&self.pool)
                .await?;

        Ok(found.is_some())
    }

    /// Number of ledger rows naming `referrer`.
    #[cfg(test)]
    pub async fn credited_count(&self, referrer: UserId) -> BotResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM referral_credits WHERE referrer_id = ?1")
                .bind(referrer.0 as i64)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::UserRepository;
    use crate::testing::{contact, memory_db};

    #[tokio::test]
    async fn credits_once_per_referred_user() {
        let db = memory_db().await;
        let users = UserRepository::new(&db);
        let ledger = ReferralRepository::new(&db);

        users.ensure(&contact(1, "Ana")).await.unwrap();
        users.ensure(&contact(2, "Ben")).await.unwrap();
        users.set_referred_by(UserId(2), UserId(1)).await.unwrap();

        let credit = ledger.credit_pending(UserId(2)).await.unwrap().unwrap();
        assert_eq!(credit.referrer, UserId(1));
        assert_eq!(credit.referrer_total, 1);

        assert_eq!(ledger.credit_pending(UserId(2)).await.unwrap(), None);
        assert_eq!(ledger.credit_pending(UserId(2)).await.unwrap(), None);

        let ana = users.get(UserId(1)).await.unwrap().unwrap();
        assert_eq!(ana.referral_count, 1);
        assert_eq!(ledger.credited_count(UserId(1)).await.unwrap(), 1);
        assert!(ledger.is_credited(UserId(2)).await.unwrap());
    }

    #[tokio::test]
    async fn nothing_to_credit_without_referrer() {
        let db = memory_db().await;
        let users = UserRepository::new(&db);
        let ledger = ReferralRepository::new(&db);

        users.ensure(&contact(2, "Ben")).await.unwrap();
        assert_eq!(ledger.credit_pending(UserId(2)).await.unwrap(), None);
        assert_eq!(ledger.credit_pending(UserId(404)).await.unwrap(), None);
        assert!(!ledger.is_credited(UserId(2)).await.unwrap());
    }

    #[tokio::test]
    async fn missing_referrer_rolls_back_ledger_row() {
        let db = memory_db().await;
        let users = UserRepository::new(&db);
        let ledger = ReferralRepository::new(&db);

        users.ensure(&contact(2, "Ben")).await.unwrap();
        users.set_referred_by(UserId(2), UserId(77)).await.unwrap();

        assert_eq!(ledger.credit_pending(UserId(2)).await.unwrap(), None);
        assert!(!ledger.is_credited(UserId(2)).await.unwrap());
    }

    #[tokio::test]
    async fn count_matches_ledger_for_many_referrals() {
        let db = memory_db().await;
        let users = UserRepository::new(&db);
        let ledger = ReferralRepository::new(&db);
        users.ensure(&contact(1, "Ana")).await.unwrap();

        for id in 10..15 {
            users.ensure(&contact(id, "Friend")).await.unwrap();
            users.set_referred_by(UserId(id), UserId(1)).await.unwrap();
            ledger.credit_pending(UserId(id)).await.unwrap();
            ledger.credit_pending(UserId(id)).await.unwrap();
        }

        let ana = users.get(UserId(1)).await.unwrap().unwrap();
        assert_eq!(ana.referral_count, 5);
        assert_eq!(ledger.credited_count(UserId(1)).await.unwrap(), 5);
    }
}
