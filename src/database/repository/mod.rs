//! Repository module - data access layer, one repository per table.

mod admin_log_repository;
mod ban_repository;
mod pending_repository;
mod referral_repository;
mod user_repository;

pub use admin_log_repository::AdminLogRepository;
pub use ban_repository::BanRepository;
pub use pending_repository::PendingActionRepository;
pub use referral_repository::{ReferralCredit, ReferralRepository};
pub use user_repository::UserRepository;
