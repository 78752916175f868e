//! Application configuration loading from config.toml
//!
//! Holds the idle reaper settings and the per-guild overrides that are written to the
//! database on start-up. Every key is optional and falls back to a built-in default.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_TICK_INTERVAL_SECS: u64 = 5;
const DEFAULT_LEAVE_EMPTY_CHANNEL_SEC: u64 = 120;
const DEFAULT_LEAVE_MESSAGE: &str = "I left the voice channel because nobody was listening.";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Idle reaper settings
    #[serde(default)]
    pub reaper: ReaperConfig,
    /// Per-guild overrides
    #[serde(default)]
    pub guilds: Vec<GuildOverride>,
}

/// Idle reaper settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReaperConfig {
    /// Seconds between two idle sweeps
    pub tick_interval_secs: u64,
    /// Grace period for guilds without an override
    pub leave_empty_channel_sec: u64,
    /// Notice posted when the bot leaves an idle channel
    pub leave_message: String,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: DEFAULT_TICK_INTERVAL_SECS,
            leave_empty_channel_sec: DEFAULT_LEAVE_EMPTY_CHANNEL_SEC,
            leave_message: DEFAULT_LEAVE_MESSAGE.to_string(),
        }
    }
}

impl ReaperConfig {
    /// Sweep interval as a `Duration`.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

/// Settings for a single guild
#[derive(Debug, Deserialize, Clone)]
pub struct GuildOverride {
    /// Discord guild ID
    pub guild_id: String,
    /// Grace period override in seconds
    #[serde(default)]
    pub leave_empty_channel_sec: Option<u64>,
    /// Channel receiving the leave notice
    #[serde(default)]
    pub announce_channel_id: Option<String>,
}

/// Parses and validates configuration from TOML text.
///
/// # Errors
/// Returns an error if the TOML syntax is invalid, the sweep interval is zero, or a
/// guild override has an empty ID.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &AppConfig) -> Result<()> {
    if config.reaper.tick_interval_secs == 0 {
        return Err(Error::Config {
            message: "reaper.tick_interval_secs must be greater than zero".to_string(),
        });
    }
    if let Some(bad) = config.guilds.iter().find(|g| g.guild_id.trim().is_empty()) {
        return Err(Error::Config {
            message: format!("Guild override with empty guild_id: {bad:?}"),
        });
    }
    Ok(())
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or [`parse_config`] rejects it.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path);
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;
    parse_config(&contents)
}

/// Loads configuration from `VOICE_WARDEN_CONFIG`, or `./config.toml` when unset.
///
/// A missing default file yields the built-in defaults; a missing explicitly
/// configured file is an error.
pub fn load_app_configuration() -> Result<AppConfig> {
    if let Ok(path) = std::env::var("VOICE_WARDEN_CONFIG") {
        return load_config(path);
    }
    let default_path = Path::new("config.toml");
    if default_path.exists() {
        load_config(default_path)
    } else {
        tracing::warn!("No config.toml found, using built-in defaults.");
        Ok(AppConfig::default())
    }
}
