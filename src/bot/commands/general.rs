//! General Discord commands.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::Context,
        core::room::RoomId,
        errors::Result,
    };
    use tracing::info;

    /// Responds with "Pong!" and how many voice channels are currently idle.
    ///
    /// Health check that touches nothing but in-memory state.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: Context<'_>) -> Result<()> {
        info!("Ping command received from user: {}", ctx.author().name);
        let tracker = ctx.data().reaper.tracker();
        let here = ctx
            .guild_id()
            .and_then(|id| tracker.alone_since(RoomId(id.get())))
            .map_or_else(String::new, |since| {
                format!(" Nobody has been listening here since <t:{}:R>.", since.timestamp())
            });
        ctx.say(format!(
            "Pong! Idle voice channels: {}.{here}",
            tracker.len()
        ))
        .await?;
        Ok(())
    }
}

pub use inner::*;
