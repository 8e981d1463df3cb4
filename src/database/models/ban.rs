//! Ban records.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Clone, Debug, PartialEq, Eq, FromRow)]
pub struct BanRecord {
    pub user_id: i64,
    pub banned_at: DateTime<Utc>,
    pub reason: String,
}
