//! Admin tools.
//!
//! Every operation takes the caller's id and refuses anyone but the
//! configured admin before touching storage or sending anything.

mod backup;
mod broadcast;
mod export;

use std::path::PathBuf;

use teloxide::types::UserId;
use tracing::{info, warn};

pub use backup::BackupManager;
pub use broadcast::{BroadcastReport, deliver_all};
pub use export::users_to_csv;

use crate::database::{AdminLogRepository, BanRepository, Database, UserRecord, UserRepository, UserStats};
use crate::error::{BotError, BotResult};
use crate::notify::Notifier;
use crate::utils::html_escape;

/// Longest text the admin can send in one message.
pub const MAX_ADMIN_MESSAGE: usize = 4000;

/// Users per page in the admin user listing.
pub const USERS_PER_PAGE: i64 = 20;

/// One page of the known-user directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserPage {
    /// Zero-based.
    pub page: i64,
    pub pages: i64,
    pub total: i64,
    pub users: Vec<UserRecord>,
}

#[derive(Clone)]
pub struct AdminTools {
    admin_id: UserId,
    db: Database,
    users: UserRepository,
    bans: BanRepository,
    log: AdminLogRepository,
    backups: BackupManager,
    mining_threshold: i64,
}

impl AdminTools {
    pub fn new(db: &Database, admin_id: UserId, backups: BackupManager, mining_threshold: i64) -> Self {
        Self {
            admin_id,
            db: db.clone(),
            users: UserRepository::new(db),
            bans: BanRepository::new(db),
            log: AdminLogRepository::new(db),
            backups,
            mining_threshold,
        }
    }

    pub fn admin_id(&self) -> UserId {
        self.admin_id
    }

    pub fn authorize(&self, caller: UserId) -> BotResult<()> {
        if caller == self.admin_id {
            Ok(())
        } else {
            warn!("User {} tried to use an admin command", caller);
            Err(BotError::PermissionDenied(caller))
        }
    }

    /// Send `text` to every known user and log the outcome.
    pub async fn broadcast(&self, caller: UserId, notifier: &dyn Notifier, text: &str) -> BotResult<BroadcastReport> {
        self.authorize(caller)?;
        let text = validate_message(text)?;

        let recipients = self.users.all_ids().await?;
        let html = format!("👑 <b>Message from Admin</b>\n\n{}", html_escape(text));
        let report = deliver_all(notifier, &recipients, &html).await;

        self.log
            .append(caller, None, text, report.delivered, report.failed.len())
            .await?;
        Ok(report)
    }

    /// Send `text` to one user and log it.
    pub async fn send_to(&self, caller: UserId, notifier: &dyn Notifier, target: UserId, text: &str) -> BotResult<()> {
        self.authorize(caller)?;
        let text = validate_message(text)?;

        let html = format!(
            "💬 <b>Reply from Admin</b>\n\n📝 {}\n\nNeed more help? Use <code>/request your question</code>",
            html_escape(text)
        );
        let result = notifier.notify(target, &html).await;

        let delivered = usize::from(result.is_ok());
        self.log
            .append(caller, Some(target), text, delivered, 1 - delivered)
            .await?;

        result
    }

    /// Ban a user. Delivery of the notice to the user is best-effort.
    pub async fn ban(&self, caller: UserId, notifier: &dyn Notifier, target: UserId, reason: &str) -> BotResult<()> {
        self.authorize(caller)?;
        if target == self.admin_id {
            return Err(BotError::InvalidInput("The admin cannot be banned".into()));
        }

        let reason = match reason.trim() {
            "" => "No reason provided",
            reason => reason,
        };
        self.bans.ban(target, reason).await?;
        info!("User {} banned by {}: {}", target, caller, reason);

        let notice = format!(
            "🚫 Your account has been banned\nReason: {}\n\nContact admin if you believe this is an error.",
            html_escape(reason)
        );
        if let Err(e) = notifier.notify(target, &notice).await {
            warn!("Could not tell {} about the ban: {}", target, e);
        }
        Ok(())
    }

    /// Lift a ban. Returns `false` if the user was not banned.
    pub async fn unban(&self, caller: UserId, notifier: &dyn Notifier, target: UserId) -> BotResult<bool> {
        self.authorize(caller)?;

        let removed = self.bans.unban(target).await?;
        if removed {
            info!("User {} unbanned by {}", target, caller);
            let notice = "✅ Your account has been unbanned. You can now use the bot again.";
            if let Err(e) = notifier.notify(target, notice).await {
                warn!("Could not tell {} about the unban: {}", target, e);
            }
        }
        Ok(removed)
    }

    pub async fn stats(&self, caller: UserId) -> BotResult<UserStats> {
        self.authorize(caller)?;
        self.users.stats(self.mining_threshold).await
    }

    /// List known users, best referrers first.
    pub async fn list_users(&self, caller: UserId, page: i64) -> BotResult<UserPage> {
        self.authorize(caller)?;

        let total = self.users.count().await?;
        let pages = ((total + USERS_PER_PAGE - 1) / USERS_PER_PAGE).max(1);
        let page = page.clamp(0, pages - 1);
        let users = self.users.page(page * USERS_PER_PAGE, USERS_PER_PAGE).await?;

        Ok(UserPage { page, pages, total, users })
    }

    /// CSV of every user record and the number of rows.
    pub async fn export_csv(&self, caller: UserId) -> BotResult<(String, usize)> {
        self.authorize(caller)?;
        let records = self.users.all().await?;
        Ok((users_to_csv(&records), records.len()))
    }

    pub async fn backup(&self, caller: UserId) -> BotResult<PathBuf> {
        self.authorize(caller)?;
        self.backups.create(&self.db).await
    }
}

fn validate_message(text: &str) -> BotResult<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(BotError::InvalidInput("Message is empty".into()));
    }
    if text.chars().count() > MAX_ADMIN_MESSAGE {
        return Err(BotError::InvalidInput(format!(
            "Message too long (max {MAX_ADMIN_MESSAGE} characters)"
        )));
    }
    Ok(text)
}
