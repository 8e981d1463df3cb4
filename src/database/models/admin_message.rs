//! Admin message log entries.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// One outbound admin message, or one broadcast (no recipient).
#[derive(Clone, Debug, PartialEq, Eq, FromRow)]
pub struct AdminMessage {
    pub id: i64,
    pub sender_id: i64,
    pub recipient_id: Option<i64>,
    pub sent_at: DateTime<Utc>,
    pub body: String,
    pub delivered: i64,
    pub failed: i64,
}

impl AdminMessage {
    pub fn is_broadcast(&self) -> bool {
        self.recipient_id.is_none()
    }
}
