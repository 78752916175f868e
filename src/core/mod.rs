//! Core logic - framework-agnostic idle tracking, sweeping and guild settings.
//!
//! Nothing in here talks to Discord directly; the bot layer plugs serenity and songbird
//! in through the traits in [`session`].

/// Injected time source
pub mod clock;
/// Per-guild settings persistence and lookup
pub mod guild_settings;
/// Idle reaper: membership observer and periodic sweep
pub mod reaper;
/// Room identifiers and participants
pub mod room;
/// Collaborator traits implemented by the voice layer
pub mod session;
/// Fixed-interval background tasks
pub mod ticker;
/// Shared "alone since" map
pub mod tracker;
