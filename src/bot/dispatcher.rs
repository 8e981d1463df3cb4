//! Message dispatcher setup.
//!
//! Builds the dispatcher with the admission gate, user tracking and all
//! command and callback handlers.

use std::sync::Arc;

use teloxide::adaptors::Throttle;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, User, UserId};
use tracing::{debug, warn};

use super::rate_limit::RateLimiter;
use crate::admin::{AdminTools, BackupManager};
use crate::catalog::catalog;
use crate::config::Config;
use crate::database::{BanRepository, Contact, Database, PendingActionRepository, UserRepository};
use crate::error::BotResult;
use crate::membership::{MembershipChecker, MembershipVerifier};
use crate::plugins;
use crate::referral::ReferralEngine;

/// Bot type with Throttle adaptor for automatic rate limiting.
pub type ThrottledBot = Throttle<Bot>;

/// Dispatcher type. Every update maps to the same key, so updates are
/// handled one at a time.
pub type BotDispatcher = Dispatcher<ThrottledBot, anyhow::Error, ()>;

/// Backups kept on disk.
const BACKUPS_KEPT: usize = 5;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<Config>,

    /// User records.
    pub users: Arc<UserRepository>,

    /// Banned users.
    pub bans: Arc<BanRepository>,

    /// Multi-message flows in progress.
    pub pending: Arc<PendingActionRepository>,

    /// Referral start/verify flow.
    pub referrals: ReferralEngine,

    /// Channel membership gate.
    pub verifier: MembershipVerifier,

    /// Admin-only operations.
    pub admin: AdminTools,

    /// Bot username (without @) for referral links.
    pub bot_username: String,
}

impl AppState {
    /// Create a new application state.
    pub fn new(bot: &ThrottledBot, config: Arc<Config>, db: &Database, bot_username: String) -> Self {
        // Membership lookups bypass the throttle queue.
        let checker: Arc<dyn MembershipChecker> = Arc::new(bot.inner().clone());
        Self::with_checker(checker, config, db, bot_username)
    }

    /// Create the state around an arbitrary membership checker.
    pub fn with_checker(
        checker: Arc<dyn MembershipChecker>,
        config: Arc<Config>,
        db: &Database,
        bot_username: String,
    ) -> Self {
        let verifier = MembershipVerifier::new(
            checker,
            config.required_channels.clone(),
            config.membership_recheck,
        );
        let referrals = ReferralEngine::new(db, verifier.clone());
        let admin = AdminTools::new(
            db,
            config.admin_id,
            BackupManager::new(&config.backup_dir, BACKUPS_KEPT),
            catalog().mining.referrals_needed,
        );

        Self {
            users: Arc::new(UserRepository::new(db)),
            bans: Arc::new(BanRepository::new(db)),
            pending: Arc::new(PendingActionRepository::new(db)),
            referrals,
            verifier,
            admin,
            config,
            bot_username,
        }
    }

    /// Check if a user is the bot admin.
    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.config.is_admin(user_id)
    }
}

/// Why an update was turned away before reaching a handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Blocked {
    Maintenance,
    Banned,
    RateLimited,
    /// The ban lookup failed; the update is dropped.
    Unavailable,
}

impl Blocked {
    pub fn notice(self) -> &'static str {
        match self {
            Self::Maintenance => "🔧 <b>Bot is under maintenance</b>\n\nPlease try again later. We'll be back soon!",
            Self::Banned => "🚫 Your account is banned.\n\nContact admin if you believe this is an error.",
            Self::RateLimited => "⚠️ Too many requests. Please wait 1 minute.",
            Self::Unavailable => "❌ Something went wrong. Please try again later.",
        }
    }
}

/// Decide whether `user` may be served. The admin always is.
///
/// `counted` updates consume the user's rate budget.
pub async fn admission(
    state: &AppState,
    limiter: &RateLimiter,
    user: UserId,
    counted: bool,
) -> BotResult<Option<Blocked>> {
    if state.is_admin(user) {
        return Ok(None);
    }
    if state.config.maintenance_mode {
        return Ok(Some(Blocked::Maintenance));
    }
    if state.bans.is_banned(user).await? {
        return Ok(Some(Blocked::Banned));
    }
    if counted && !limiter.check(user) {
        return Ok(Some(Blocked::RateLimited));
    }
    Ok(None)
}

/// Whether the sender's record was created by the current update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FirstContact(pub bool);

/// Build the dispatcher with all handlers.
pub fn build_dispatcher(bot: ThrottledBot, state: AppState) -> BotDispatcher {
    let limiter = RateLimiter::per_minute(state.config.rate_limit_per_minute);

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state, limiter])
        .distribution_function(|_| Some(()))
        .enable_ctrlc_handler()
        .build()
}

/// Build the handler schema.
fn schema() -> UpdateHandler<anyhow::Error> {
    // Private chats only; the sender is injected as `User` from here on.
    let message_handler = Update::filter_message()
        .filter(|msg: Message| msg.chat.is_private())
        .filter_map(|msg: Message| msg.from.clone().filter(|user| !user.is_bot))
        .branch(dptree::filter_map_async(gate_message).endpoint(reject_message))
        .map_async(track_user)
        .branch(plugins::command_handler())
        .branch(plugins::unknown_command_handler())
        .branch(plugins::text_handler());

    let callback_handler = Update::filter_callback_query()
        .branch(dptree::filter_map_async(gate_callback).endpoint(reject_callback))
        .branch(plugins::callback_handler());

    dptree::entry()
        .branch(message_handler)
        .branch(callback_handler)
}

/// [`admission`] for the dispatcher: a failed check blocks the update.
async fn gate(state: &AppState, limiter: &RateLimiter, user: UserId, counted: bool) -> Option<Blocked> {
    match admission(state, limiter, user, counted).await {
        Ok(blocked) => blocked,
        Err(e) => {
            warn!("Admission check for user {} failed: {}", user, e);
            Some(Blocked::Unavailable)
        }
    }
}

async fn gate_message(user: User, state: AppState, limiter: RateLimiter) -> Option<Blocked> {
    gate(&state, &limiter, user.id, true).await
}

async fn gate_callback(q: CallbackQuery, state: AppState, limiter: RateLimiter) -> Option<Blocked> {
    gate(&state, &limiter, q.from.id, false).await
}

async fn reject_message(bot: ThrottledBot, msg: Message, blocked: Blocked) -> anyhow::Result<()> {
    debug!("Rejected message in chat {}: {:?}", msg.chat.id, blocked);
    bot.send_message(msg.chat.id, blocked.notice())
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

async fn reject_callback(bot: ThrottledBot, q: CallbackQuery, blocked: Blocked) -> anyhow::Result<()> {
    debug!("Rejected callback from {}: {:?}", q.from.id, blocked);
    // Alerts are plain text.
    let text = blocked.notice().replace("<b>", "").replace("</b>", "");
    bot.answer_callback_query(&q.id).text(text).show_alert(true).await?;
    Ok(())
}

/// Record the sender (runs before all handlers).
async fn track_user(user: User, state: AppState) -> FirstContact {
    match state.users.ensure(&Contact::from(&user)).await {
        Ok(created) => FirstContact(created),
        Err(e) => {
            warn!("Failed to track user {}: {}", user.id, e);
            FirstContact(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StaticChecker, app_state, memory_db};

    const ADMIN: UserId = UserId(1);

    #[tokio::test]
    async fn banned_users_are_blocked_but_admin_is_not() {
        let state = app_state(memory_db().await, StaticChecker::with_members([]), |_| None);
        let limiter = RateLimiter::per_minute(10);

        state.bans.ban(UserId(5), "spam").await.unwrap();

        assert_eq!(
            admission(&state, &limiter, UserId(5), false).await.unwrap(),
            Some(Blocked::Banned)
        );
        assert_eq!(admission(&state, &limiter, UserId(6), true).await.unwrap(), None);
        assert_eq!(admission(&state, &limiter, ADMIN, true).await.unwrap(), None);
    }

    #[tokio::test]
    async fn rate_limit_applies_to_counted_updates_only() {
        let state = app_state(memory_db().await, StaticChecker::with_members([]), |_| None);
        let limiter = RateLimiter::per_minute(2);
        let user = UserId(9);

        assert_eq!(admission(&state, &limiter, user, true).await.unwrap(), None);
        assert_eq!(admission(&state, &limiter, user, true).await.unwrap(), None);
        assert_eq!(
            admission(&state, &limiter, user, true).await.unwrap(),
            Some(Blocked::RateLimited)
        );
        // Button presses are not counted.
        assert_eq!(admission(&state, &limiter, user, false).await.unwrap(), None);

        for _ in 0..5 {
            assert_eq!(admission(&state, &limiter, ADMIN, true).await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn maintenance_blocks_everyone_but_admin() {
        let state = app_state(memory_db().await, StaticChecker::with_members([]), |key| {
            (key == "MAINTENANCE_MODE").then(|| "true".to_string())
        });
        let limiter = RateLimiter::per_minute(10);

        assert_eq!(
            admission(&state, &limiter, UserId(2), false).await.unwrap(),
            Some(Blocked::Maintenance)
        );
        assert_eq!(admission(&state, &limiter, ADMIN, false).await.unwrap(), None);
    }

    #[tokio::test]
    async fn storage_failure_drops_the_update() {
        let db = memory_db().await;
        let state = app_state(db.clone(), StaticChecker::with_members([]), |_| None);
        let limiter = RateLimiter::per_minute(10);
        db.close().await;

        assert!(admission(&state, &limiter, UserId(5), true).await.is_err());
        assert_eq!(gate(&state, &limiter, UserId(5), true).await, Some(Blocked::Unavailable));
        assert_eq!(gate(&state, &limiter, ADMIN, true).await, None);
    }

    #[tokio::test]
    async fn state_wires_channels_and_admin() {
        let state = app_state(memory_db().await, StaticChecker::with_members([]), |_| None);
        assert_eq!(state.verifier.channels().len(), 2);
        assert!(state.is_admin(ADMIN));
        assert!(!state.is_admin(UserId(2)));
    }
}
