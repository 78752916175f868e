//! Unified error type for the bot.

use crate::core::room::RoomId;
use thiserror::Error;

/// Every failure the bot can report, from start-up through voice teardown.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration, or rejected settings input
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// `SeaORM` failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed environment variable
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Discord client failure
    #[error("Serenity/Poise framework error: {0}")]
    #[allow(clippy::enum_variant_names)]
    FrameworkError(Box<poise::serenity_prelude::Error>),

    /// Songbird call failure while joining, leaving or controlling playback
    #[error("Voice error in room {room}: {message}")]
    Voice { room: RoomId, message: String },

    /// One or more steps of an idle-room teardown failed
    #[error("Teardown of room {room} failed: {message}")]
    Teardown { room: RoomId, message: String },
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::FrameworkError(Box::new(value))
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
