/// Database configuration and connection management
pub mod database;

/// Reaper and guild override loading from config.toml
pub mod reaper;

pub use reaper::{AppConfig, GuildOverride, ReaperConfig, load_app_configuration};
