//! Gateway event subscription.
//!
//! Voice-state updates are turned into a list of everyone sharing the bot's voice
//! channel and handed to the reaper. The cache is read only after the connection check,
//! right before the reaper records the change, and no cache guard is held across `.await`.

use crate::{
    bot::BotData,
    core::room::{Participant, RoomId},
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;

/// Entry point registered in `FrameworkOptions::event_handler`.
pub async fn handle_event(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, BotData, Error>,
    data: &BotData,
) -> Result<()> {
    let serenity::FullEvent::VoiceStateUpdate { new, .. } = event else {
        return Ok(());
    };
    let Some(guild_id) = new.guild_id else {
        return Ok(());
    };
    let cache = &ctx.cache;
    data.reaper
        .on_voice_update(RoomId(guild_id.get()), || {
            bot_channel_occupants(cache, guild_id)
        })
        .await;
    Ok(())
}

/// Everyone in the bot's voice channel of `guild_id`, or `None` if the bot is not in one.
fn bot_channel_occupants(
    cache: &serenity::Cache,
    guild_id: serenity::GuildId,
) -> Option<Vec<Participant>> {
    let bot_id = cache.current_user().id;
    let guild = cache.guild(guild_id)?;
    let slots: Vec<VoiceSlot> = guild.voice_states.values().map(VoiceSlot::from).collect();
    channel_occupants(bot_id, &slots, |user_id| {
        guild.members.get(&user_id).map(|member| member.user.bot)
    })
}

/// The parts of a cached voice state that decide whether it keeps a room alive.
#[derive(Debug, Clone, Copy)]
struct VoiceSlot {
    user_id: serenity::UserId,
    channel_id: Option<serenity::ChannelId>,
    deaf: bool,
    self_deaf: bool,
    /// Bot flag of the member sent along with the voice state, if any
    member_is_bot: Option<bool>,
}

impl From<&serenity::VoiceState> for VoiceSlot {
    fn from(state: &serenity::VoiceState) -> Self {
        Self {
            user_id: state.user_id,
            channel_id: state.channel_id,
            deaf: state.deaf,
            self_deaf: state.self_deaf,
            member_is_bot: state.member.as_ref().map(|member| member.user.bot),
        }
    }
}

/// Occupants of the channel `bot_id` sits in.
///
/// Members missing from the voice state are looked up through `member_is_bot`. Anyone
/// still unresolved counts as a human, except the bot itself.
fn channel_occupants(
    bot_id: serenity::UserId,
    slots: &[VoiceSlot],
    member_is_bot: impl Fn(serenity::UserId) -> Option<bool>,
) -> Option<Vec<Participant>> {
    let channel = slots.iter().find(|slot| slot.user_id == bot_id)?.channel_id?;
    Some(
        slots
            .iter()
            .filter(|slot| slot.channel_id == Some(channel))
            .map(|slot| Participant {
                is_bot: slot.user_id == bot_id
                    || slot
                        .member_is_bot
                        .or_else(|| member_is_bot(slot.user_id))
                        .unwrap_or(false),
                is_deafened: slot.deaf || slot.self_deaf,
            })
            .collect(),
    )
}
