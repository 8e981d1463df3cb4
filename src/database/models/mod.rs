//! Database models.

#[cfg(test)]
pub mod admin_message;
pub mod ban;
pub mod pending;
pub mod user;

#[cfg(test)]
pub use admin_message::AdminMessage;
pub use ban::BanRecord;
pub use pending::PendingAction;
pub use user::{Contact, UserRecord, UserStats};
