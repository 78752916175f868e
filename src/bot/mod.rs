//! Bot layer - Discord-specific wiring for the idle reaper.
//!
//! Builds the poise framework, registers songbird, subscribes to gateway events and
//! starts the periodic idle sweep once the bot is logged in.

/// Discord command implementations
pub mod commands;
/// Gateway event subscription
pub mod events;
/// Songbird-backed sessions and voice control
pub mod voice;

use crate::{
    config::{AppConfig, ReaperConfig},
    core::{
        clock::SystemClock,
        guild_settings::GuildSettingsStore,
        reaper::IdleReaper,
        session::{GraceSettings, ReaperBackends, RoomResolver, SessionRegistry, VoiceTransport},
        ticker::spawn_periodic,
    },
    errors::{Error, Result},
};
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use voice::SongbirdVoice;

/// Shared data available to all bot commands and event handlers.
pub struct BotData {
    /// Database connection for guild settings
    pub database: DatabaseConnection,
    /// The idle reaper fed by voice-state events
    pub reaper: Arc<IdleReaper>,
}

/// Poise context used by commands
pub type Context<'a> = poise::Context<'a, BotData, Error>;

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!("Failed to start bot: {:?}", error);
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {:?}", ctx.command().name, error);
            if let Err(e) = ctx.say(format!("An error occurred: {error}")).await {
                error!("Failed to send error message: {}", e);
            }
        }
        poise::FrameworkError::EventHandler { error, .. } => {
            error!("Error in event handler: {}", error);
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}

/// Builds the reaper on top of the running client and starts its periodic sweep.
fn start_reaper(
    ctx: &serenity::Context,
    manager: Arc<Songbird>,
    config: &ReaperConfig,
    database: DatabaseConnection,
) -> Arc<IdleReaper> {
    let settings = Arc::new(GuildSettingsStore::new(
        database,
        config.leave_empty_channel_sec,
    ));
    let voice = Arc::new(SongbirdVoice::new(
        manager,
        Arc::clone(&ctx.http),
        Arc::clone(&ctx.cache),
        Arc::clone(&settings),
    ));
    let backends = ReaperBackends {
        sessions: Arc::clone(&voice) as Arc<dyn SessionRegistry>,
        rooms: Arc::clone(&voice) as Arc<dyn RoomResolver>,
        voice: voice as Arc<dyn VoiceTransport>,
        settings: settings as Arc<dyn GraceSettings>,
    };
    let reaper = Arc::new(IdleReaper::new(
        backends,
        Arc::new(SystemClock),
        config.leave_message.clone(),
    ));

    let sweeper = Arc::clone(&reaper);
    spawn_periodic("idle-sweep", config.tick_interval(), move || {
        let reaper = Arc::clone(&sweeper);
        async move {
            let report = reaper.sweep().await;
            if !report.is_quiet() {
                debug!("Idle sweep finished: {report:?}");
            }
        }
    });
    info!(
        "Start listening users voice channels with interval: {}s.",
        config.tick_interval_secs
    );
    reaper
}

/// Connects to Discord and runs until the client stops.
#[instrument(skip_all)]
pub async fn run_bot(
    token: String,
    app_config: Arc<AppConfig>,
    database: DatabaseConnection,
) -> Result<()> {
    let songbird = Songbird::serenity();
    let voice_manager = Arc::clone(&songbird);

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![commands::ping()],
            event_handler: |ctx, event, framework, data| {
                Box::pin(events::handle_event(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                let reaper = start_reaper(ctx, voice_manager, &app_config.reaper, database.clone());
                Ok(BotData { database, reaper })
            })
        })
        .build();

    // Guild and voice-state events are all the reaper needs
    let intents = serenity::GatewayIntents::non_privileged();

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .register_songbird_with(songbird)
        .await
        .inspect_err(|e| error!("Error creating client: {:?}", e))?;

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| error!("Client error: {:?}", e))?;
    Ok(())
}
