//! Bot runtime - Polling and Webhook runners.

use std::net::SocketAddr;

use anyhow::Context;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks::{self, Options};
use tracing::{error, info};

use super::dispatcher::{BotDispatcher, ThrottledBot};
use super::keepalive;
use crate::config::{BotMode, Config};

/// Run the bot with the configured mode until shutdown.
pub async fn run(config: &Config, bot: ThrottledBot, dispatcher: BotDispatcher) -> anyhow::Result<()> {
    match config.bot_mode {
        BotMode::Polling => {
            info!("Starting bot in polling mode...");
            run_polling(config.port, dispatcher).await;
            Ok(())
        }
        BotMode::Webhook => {
            info!("Starting bot in webhook mode...");
            run_webhook(config, bot, dispatcher).await
        }
    }
}

/// Long polling, with the keep-alive server on its own task.
async fn run_polling(port: u16, mut dispatcher: BotDispatcher) {
    tokio::spawn(async move {
        if let Err(e) = keepalive::serve(port).await {
            error!("Keep-alive server stopped: {}", e);
        }
    });

    dispatcher.dispatch().await;
}

/// Webhook mode. Telegram updates and the keep-alive routes share one port.
///
/// `setWebhook` is called on start and `deleteWebhook` on shutdown.
async fn run_webhook(config: &Config, bot: ThrottledBot, mut dispatcher: BotDispatcher) -> anyhow::Result<()> {
    let url = config
        .webhook_url
        .clone()
        .context("WEBHOOK_URL must be set when using webhook mode")?;

    let address = SocketAddr::from(([0, 0, 0, 0], config.port));
    let mut options = Options::new(address, url.clone());

    if let Some(secret) = &config.webhook_secret {
        options = options.secret_token(secret.clone());
        info!("Webhook secret token configured");
    }

    info!("🔗 Setting webhook URL: {}", url);

    let (listener, stop_flag, webhook_router) = webhooks::axum_to_router(bot.inner().clone(), options)
        .await
        .context("failed to set up webhook")?;

    let app = webhook_router.merge(keepalive::router());
    let tcp = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!("📡 Listening on: {}", address);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(tcp, app).with_graceful_shutdown(stop_flag).await {
            error!("Webhook server error: {}", e);
        }
    });

    info!("✅ Webhook setup complete, waiting for updates...");

    dispatcher
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("Error from update listener"),
        )
        .await;

    Ok(())
}
