//! Guild settings entity - per-guild overrides for voice behaviour.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Guild settings database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "guild_settings")]
pub struct Model {
    /// Discord guild ID
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_id: String,
    /// Seconds a voice channel may stay without listeners; `None` uses the configured default
    pub leave_empty_channel_sec: Option<i64>,
    /// Channel receiving the leave notice; `None` posts into the voice channel's chat
    pub announce_channel_id: Option<String>,
    /// When these settings were last modified
    pub updated_at: DateTime,
}

/// `GuildSettings` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
