//! Earning Club Bot - referral and partner directory bot for Telegram
//!
//! Users join the required channels, get verified, invite friends through
//! referral links and unlock tiers of a partner bot directory.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `database` - SQLite storage and repositories
//! - `membership` - Channel membership checks with caching
//! - `referral` - Referral codes and crediting
//! - `catalog` - Partner bot directory
//! - `admin` - Broadcast, moderation, export and backups
//! - `bot` - Dispatcher, admission gate, runtime and keep-alive server
//! - `plugins` - Command and callback handlers
//! - `utils` - Utility functions

mod admin;
mod bot;
mod catalog;
mod config;
mod database;
mod error;
mod membership;
mod notify;
mod plugins;
mod referral;
#[cfg(test)]
mod testing;
mod utils;

use std::sync::Arc;

use teloxide::adaptors::throttle::Limits;
use teloxide::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bot::AppState;
use config::Config;
use database::Database;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    // RUST_LOG wins; otherwise DEV_MODE picks the default level.
    let default_filter = if config.dev_mode {
        "earning_club_bot=debug,teloxide=info"
    } else {
        "earning_club_bot=info,teloxide=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Earning Club bot...");
    info!("Bot mode: {:?}", config.bot_mode);
    if config.dev_mode {
        info!("Development mode: live membership re-checks are skipped");
    }
    if config.maintenance_mode {
        warn!("Maintenance mode is on: only the admin will be served");
    }
    info!("Admin: {}", config.admin_id);
    info!("Required channels: {}", config.required_channels.len());

    info!("Opening database...");
    let db = Database::connect(&config.database_url).await?;
    info!("Database ready");

    let bot = Bot::new(&config.bot_token).throttle(Limits::default());
    info!("Bot initialized with rate limiting (Throttle)");

    let me = bot.get_me().await?;
    let bot_username = config
        .bot_username
        .clone()
        .unwrap_or_else(|| me.username().to_string());
    info!("Using bot username: @{}", bot_username);

    if let Err(e) = bot.set_my_commands(plugins::help::menu_commands()).await {
        warn!("Failed to set bot commands: {}", e);
    }

    let config = Arc::new(config);
    let state = AppState::new(&bot, Arc::clone(&config), &db, bot_username);

    bot::maintenance::spawn(state.admin.clone(), bot.clone());
    info!("Daily maintenance scheduled");

    let dispatcher = bot::build_dispatcher(bot.clone(), state);
    bot::run(&config, bot, dispatcher).await?;

    db.close().await;
    info!("Bot stopped");
    Ok(())
}
