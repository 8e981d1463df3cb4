//! Error types shared by the storage, membership and admin layers.
//!
//! Handlers work with `anyhow::Result`; everything below them returns
//! [`BotError`] so callers can tell a denied admin command from a failed
//! Telegram request.

use teloxide::RequestError;
use teloxide::types::UserId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotError {
    /// A Telegram Bot API call failed.
    #[error("telegram request failed: {0}")]
    ExternalApi(#[from] RequestError),

    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("migration failure: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("stored data is malformed: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("user {0} is not allowed to run admin commands")]
    PermissionDenied(UserId),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl BotError {
    /// Text shown to the user when this error ends a command.
    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied(_) => "❌ Unauthorized".to_string(),
            Self::InvalidInput(reason) => format!("❌ {reason}"),
            Self::UnknownCommand(command) => format!("❓ Unknown command: {command}"),
            Self::ExternalApi(_) | Self::Storage(_) | Self::Migration(_) | Self::Corrupt(_) | Self::Io(_) => {
                "❌ Something went wrong. Please try again later.".to_string()
            }
        }
    }
}

pub type BotResult<T> = Result<T, BotError>;
