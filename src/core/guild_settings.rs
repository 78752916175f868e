//! Guild settings business logic - per-guild grace period and notice channel.
//!
//! Settings live in the `guild_settings` table. Guilds without a row, or with an unset
//! column, use the configured defaults. [`GuildSettingsStore`] is the reaper's view of
//! this table.

use crate::{
    config::GuildOverride,
    core::{room::RoomId, session::GraceSettings},
    entities::{GuildSettings, guild_settings},
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use sea_orm::{Set, prelude::*};
use tracing::{info, warn};

/// Finds the settings row of a guild.
pub async fn get_guild_settings(
    db: &DatabaseConnection,
    guild_id: &str,
) -> Result<Option<guild_settings::Model>> {
    GuildSettings::find_by_id(guild_id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates or replaces the settings of a guild.
///
/// Rejects empty guild IDs and negative grace periods.
pub async fn upsert_guild_settings(
    db: &DatabaseConnection,
    guild_id: &str,
    leave_empty_channel_sec: Option<i64>,
    announce_channel_id: Option<String>,
) -> Result<guild_settings::Model> {
    let guild_id = guild_id.trim();
    if guild_id.is_empty() {
        return Err(Error::Config {
            message: "Guild ID cannot be empty".to_string(),
        });
    }
    if let Some(secs) = leave_empty_channel_sec.filter(|secs| *secs < 0) {
        return Err(Error::Config {
            message: format!("leave_empty_channel_sec cannot be negative, got {secs}"),
        });
    }

    let now = Utc::now().naive_utc();
    match get_guild_settings(db, guild_id).await? {
        Some(existing) => {
            let mut settings: guild_settings::ActiveModel = existing.into();
            settings.leave_empty_channel_sec = Set(leave_empty_channel_sec);
            settings.announce_channel_id = Set(announce_channel_id);
            settings.updated_at = Set(now);
            settings.update(db).await.map_err(Into::into)
        }
        None => {
            let settings = guild_settings::ActiveModel {
                guild_id: Set(guild_id.to_string()),
                leave_empty_channel_sec: Set(leave_empty_channel_sec),
                announce_channel_id: Set(announce_channel_id),
                updated_at: Set(now),
            };
            settings.insert(db).await.map_err(Into::into)
        }
    }
}

/// Writes the `[[guilds]]` overrides from config.toml to the database.
pub async fn seed_guild_overrides(
    db: &DatabaseConnection,
    overrides: &[GuildOverride],
) -> Result<()> {
    for entry in overrides {
        let leave_sec = entry
            .leave_empty_channel_sec
            .map(i64::try_from)
            .transpose()
            .map_err(|e| Error::Config {
                message: format!(
                    "leave_empty_channel_sec out of range for guild {}: {e}",
                    entry.guild_id
                ),
            })?;
        upsert_guild_settings(
            db,
            &entry.guild_id,
            leave_sec,
            entry.announce_channel_id.clone(),
        )
        .await?;
    }
    if !overrides.is_empty() {
        info!("Applied {} guild override(s) from configuration.", overrides.len());
    }
    Ok(())
}

/// Database-backed per-guild settings with a configured default grace period.
#[derive(Debug, Clone)]
pub struct GuildSettingsStore {
    db: DatabaseConnection,
    default_grace: TimeDelta,
}

impl GuildSettingsStore {
    /// Creates a store falling back to `default_grace_secs` for guilds without an override.
    #[must_use]
    pub fn new(db: DatabaseConnection, default_grace_secs: u64) -> Self {
        let secs = i64::try_from(default_grace_secs).unwrap_or(i64::MAX);
        Self {
            db,
            default_grace: TimeDelta::try_seconds(secs).unwrap_or(TimeDelta::MAX),
        }
    }

    async fn lookup(&self, room: RoomId) -> Option<guild_settings::Model> {
        match get_guild_settings(&self.db, &room.to_string()).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to load settings of guild {room}, using defaults: {e}");
                None
            }
        }
    }

    /// The channel that should receive the leave notice of `room`, if overridden.
    pub async fn announce_channel(&self, room: RoomId) -> Option<u64> {
        let raw = self.lookup(room).await?.announce_channel_id?;
        match raw.parse() {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Ignoring malformed announce channel `{raw}` of guild {room}: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl GraceSettings for GuildSettingsStore {
    async fn grace_period(&self, room: RoomId) -> TimeDelta {
        self.lookup(room)
            .await
            .and_then(|settings| settings.leave_empty_channel_sec)
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(self.default_grace)
    }
}
