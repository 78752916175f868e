//! Collaborators the reaper drives but does not own.
//!
//! The Discord layer implements these on top of serenity and songbird; tests use
//! in-memory fakes. All of them are object-safe so the reaper can hold `Arc<dyn _>`.

use crate::core::room::RoomId;
use crate::errors::Result;
use async_trait::async_trait;
use chrono::TimeDelta;
use std::sync::Arc;

/// The bot's live voice connection and playback state in one room.
#[async_trait]
pub trait VoiceSession: Send + Sync {
    /// Stops whatever is playing and releases the audio scheduler.
    async fn stop_and_release(&self) -> Result<()>;

    /// Posts a notice to the room's text output.
    async fn send_message(&self, content: &str) -> Result<()>;
}

/// Cache of active sessions, keyed by room.
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// The session the bot holds in `room`, if any.
    async fn active_session(&self, room: RoomId) -> Option<Arc<dyn VoiceSession>>;

    /// Drops the cached session. Removing an absent session is not an error.
    async fn remove_session(&self, room: RoomId) -> Result<()>;
}

/// Tells whether a room still exists at all.
#[async_trait]
pub trait RoomResolver: Send + Sync {
    /// False once the guild is gone (bot kicked, guild deleted, ...).
    async fn room_exists(&self, room: RoomId) -> bool;
}

/// Voice connection control.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Whether the bot is currently connected to a voice channel in `room`.
    async fn is_connected(&self, room: RoomId) -> bool;

    /// Leaves the voice channel in `room`.
    async fn disconnect(&self, room: RoomId) -> Result<()>;
}

/// Per-room grace period lookup.
#[async_trait]
pub trait GraceSettings: Send + Sync {
    /// How long `room` may stay without listeners before the bot leaves.
    async fn grace_period(&self, room: RoomId) -> TimeDelta;
}

/// Everything the reaper needs from the outside world.
#[derive(Clone)]
pub struct ReaperBackends {
    /// Session cache
    pub sessions: Arc<dyn SessionRegistry>,
    /// Guild lookup
    pub rooms: Arc<dyn RoomResolver>,
    /// Voice connection control
    pub voice: Arc<dyn VoiceTransport>,
    /// Grace period lookup
    pub settings: Arc<dyn GraceSettings>,
}
