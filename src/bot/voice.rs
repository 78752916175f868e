//! Songbird-backed voice layer.
//!
//! Implements the reaper's collaborator traits on top of the songbird call manager and
//! the serenity cache. A guild's songbird `Call` is the bot's session in that room.

use crate::{
    core::{
        guild_settings::GuildSettingsStore,
        room::RoomId,
        session::{RoomResolver, SessionRegistry, VoiceSession, VoiceTransport},
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use songbird::{Call, Songbird, error::JoinError};
use std::num::NonZeroU64;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

fn guild_id(room: RoomId) -> Option<serenity::GuildId> {
    NonZeroU64::new(room.get()).map(serenity::GuildId::from)
}

fn voice_error(room: RoomId, error: &JoinError) -> Error {
    Error::Voice {
        room,
        message: error.to_string(),
    }
}

/// Session registry, room resolver and voice transport for a running bot.
pub struct SongbirdVoice {
    manager: Arc<Songbird>,
    http: Arc<serenity::Http>,
    cache: Arc<serenity::Cache>,
    settings: Arc<GuildSettingsStore>,
}

impl SongbirdVoice {
    /// Wraps the songbird manager registered with the client.
    #[must_use]
    pub const fn new(
        manager: Arc<Songbird>,
        http: Arc<serenity::Http>,
        cache: Arc<serenity::Cache>,
        settings: Arc<GuildSettingsStore>,
    ) -> Self {
        Self {
            manager,
            http,
            cache,
            settings,
        }
    }

    fn call(&self, room: RoomId) -> Option<Arc<Mutex<Call>>> {
        self.manager.get(guild_id(room)?)
    }
}

#[async_trait]
impl RoomResolver for SongbirdVoice {
    async fn room_exists(&self, room: RoomId) -> bool {
        guild_id(room).is_some_and(|id| self.cache.guild(id).is_some())
    }
}

#[async_trait]
impl SessionRegistry for SongbirdVoice {
    async fn active_session(&self, room: RoomId) -> Option<Arc<dyn VoiceSession>> {
        let call = self.call(room)?;
        let voice_channel = call.lock().await.current_channel().map(|c| c.0.get());
        Some(Arc::new(SongbirdSession {
            room,
            call,
            http: Arc::clone(&self.http),
            settings: Arc::clone(&self.settings),
            voice_channel,
        }))
    }

    async fn remove_session(&self, room: RoomId) -> Result<()> {
        let Some(id) = guild_id(room) else {
            return Ok(());
        };
        match self.manager.remove(id).await {
            Ok(()) | Err(JoinError::NoCall) => Ok(()),
            Err(e) => Err(voice_error(room, &e)),
        }
    }
}

#[async_trait]
impl VoiceTransport for SongbirdVoice {
    async fn is_connected(&self, room: RoomId) -> bool {
        match self.call(room) {
            Some(call) => call.lock().await.current_channel().is_some(),
            None => false,
        }
    }

    async fn disconnect(&self, room: RoomId) -> Result<()> {
        let Some(call) = self.call(room) else {
            return Ok(());
        };
        let mut call = call.lock().await;
        call.leave().await.map_err(|e| voice_error(room, &e))
    }
}

/// Where the leave notice of `room` goes: the guild's announce channel, or else the
/// voice channel the bot was in.
async fn notice_channel(
    settings: &GuildSettingsStore,
    room: RoomId,
    voice_channel: Option<u64>,
) -> Option<serenity::ChannelId> {
    settings
        .announce_channel(room)
        .await
        .or(voice_channel)
        .and_then(NonZeroU64::new)
        .map(serenity::ChannelId::from)
}

/// The bot's call in one guild plus what it needs to post notices about it.
pub struct SongbirdSession {
    room: RoomId,
    call: Arc<Mutex<Call>>,
    http: Arc<serenity::Http>,
    settings: Arc<GuildSettingsStore>,
    /// Captured when the session is resolved, before the bot leaves
    voice_channel: Option<u64>,
}

#[async_trait]
impl VoiceSession for SongbirdSession {
    async fn stop_and_release(&self) -> Result<()> {
        let mut call = self.call.lock().await;
        call.stop();
        call.remove_all_global_events();
        Ok(())
    }

    async fn send_message(&self, content: &str) -> Result<()> {
        let Some(channel) = notice_channel(&self.settings, self.room, self.voice_channel).await
        else {
            debug!("No channel to notify in room {}, notice dropped.", self.room);
            return Ok(());
        };
        let embed = serenity::CreateEmbed::new()
            .description(content)
            .colour(serenity::Colour::BLURPLE);
        channel
            .send_message(
                self.http.as_ref(),
                serenity::CreateMessage::new().embed(embed),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::guild_settings::upsert_guild_settings;
    use crate::test_utils::setup_test_db;

    const ROOM: RoomId = RoomId(42);

    async fn offline_voice() -> Result<SongbirdVoice> {
        let db = setup_test_db().await?;
        Ok(SongbirdVoice::new(
            Songbird::serenity(),
            Arc::new(serenity::Http::new("")),
            Arc::new(serenity::Cache::new()),
            Arc::new(GuildSettingsStore::new(db, 120)),
        ))
    }

    #[test]
    fn test_room_zero_is_no_guild() {
        assert_eq!(guild_id(RoomId(0)), None);
        assert_eq!(guild_id(ROOM), Some(serenity::GuildId::new(42)));
    }

    #[tokio::test]
    async fn test_absent_call() -> Result<()> {
        let voice = offline_voice().await?;
        for room in [ROOM, RoomId(0)] {
            assert!(!voice.room_exists(room).await);
            assert!(!voice.is_connected(room).await);
            assert!(voice.active_session(room).await.is_none());
            voice.disconnect(room).await?;
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_removing_missing_session_succeeds() -> Result<()> {
        let voice = offline_voice().await?;
        voice.remove_session(ROOM).await?;
        // Twice in a row, as after a sweep that found the bot already gone
        voice.remove_session(ROOM).await?;
        voice.remove_session(RoomId(0)).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_notice_channel_prefers_announce_override() -> Result<()> {
        let db = setup_test_db().await?;
        upsert_guild_settings(&db, "42", None, Some("99".to_string())).await?;
        let settings = GuildSettingsStore::new(db, 120);

        assert_eq!(
            notice_channel(&settings, ROOM, Some(7)).await,
            Some(serenity::ChannelId::new(99))
        );
        assert_eq!(
            notice_channel(&settings, RoomId(43), Some(7)).await,
            Some(serenity::ChannelId::new(7))
        );
        assert_eq!(notice_channel(&settings, RoomId(43), None).await, None);
        assert_eq!(notice_channel(&settings, RoomId(43), Some(0)).await, None);
        Ok(())
    }
}
