//! Shared test utilities for `voice-warden`.
//!
//! Provides a hand-driven clock, an in-memory database with all tables created, and
//! `FakeVoice`, a recording stand-in for the songbird-backed voice layer with
//! injectable failures.

#![allow(clippy::unwrap_used)]

use crate::{
    core::{
        clock::Clock,
        room::RoomId,
        session::{
            GraceSettings, ReaperBackends, RoomResolver, SessionRegistry, VoiceSession,
            VoiceTransport,
        },
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use sea_orm::DatabaseConnection;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Routes tracing output through the test harness.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Clock that only moves when told to. Times are seconds after the Unix epoch.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// The instant `secs` seconds after the epoch.
    pub fn instant(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(secs)
    }

    pub fn at(secs: i64) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Self::instant(secs)),
        })
    }

    pub fn set(&self, secs: i64) {
        *self.now.lock().unwrap() = Self::instant(secs);
    }

    pub fn advance(&self, secs: i64) {
        *self.now.lock().unwrap() += TimeDelta::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// A successful side effect performed through `FakeVoice`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceCall {
    StopAndRelease(RoomId),
    Disconnect(RoomId),
    SendMessage(RoomId, String),
    RemoveSession(RoomId),
}

impl VoiceCall {
    const fn room(&self) -> RoomId {
        match self {
            Self::StopAndRelease(room)
            | Self::Disconnect(room)
            | Self::SendMessage(room, _)
            | Self::RemoveSession(room) => *room,
        }
    }
}

#[derive(Default)]
struct FakeState {
    rooms: HashSet<RoomId>,
    sessions: HashSet<RoomId>,
    connected: HashSet<RoomId>,
    grace: HashMap<RoomId, i64>,
    failing_stop: HashSet<RoomId>,
    failing_disconnect: HashSet<RoomId>,
    calls: Vec<VoiceCall>,
}

type Hook = Box<dyn Fn() + Send + Sync>;

/// In-memory voice layer. Failing steps are not recorded in `calls`.
pub struct FakeVoice {
    state: Mutex<FakeState>,
    default_grace: i64,
    grace_hook: Mutex<Option<Hook>>,
    connection_hook: Mutex<Option<Hook>>,
}

impl FakeVoice {
    pub fn new(default_grace_secs: i64) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState::default()),
            default_grace: default_grace_secs,
            grace_hook: Mutex::new(None),
            connection_hook: Mutex::new(None),
        })
    }

    pub fn backends(self: &Arc<Self>) -> ReaperBackends {
        ReaperBackends {
            sessions: Arc::new(Arc::clone(self)) as Arc<dyn SessionRegistry>,
            rooms: Arc::clone(self) as Arc<dyn RoomResolver>,
            voice: Arc::clone(self) as Arc<dyn VoiceTransport>,
            settings: Arc::clone(self) as Arc<dyn GraceSettings>,
        }
    }

    /// The room exists, the bot holds a session there and is connected.
    pub fn connect(&self, room: RoomId) {
        let mut state = self.state.lock().unwrap();
        state.rooms.insert(room);
        state.sessions.insert(room);
        state.connected.insert(room);
    }

    /// The bot left on its own; its session is still cached.
    pub fn drop_connection(&self, room: RoomId) {
        self.state.lock().unwrap().connected.remove(&room);
    }

    /// The guild itself is gone.
    pub fn forget_room(&self, room: RoomId) {
        self.state.lock().unwrap().rooms.remove(&room);
    }

    pub fn forget_session(&self, room: RoomId) {
        self.state.lock().unwrap().sessions.remove(&room);
    }

    pub fn set_grace(&self, room: RoomId, secs: i64) {
        self.state.lock().unwrap().grace.insert(room, secs);
    }

    pub fn fail_stop(&self, room: RoomId) {
        self.state.lock().unwrap().failing_stop.insert(room);
    }

    pub fn fail_disconnect(&self, room: RoomId) {
        self.state.lock().unwrap().failing_disconnect.insert(room);
    }

    /// Runs `hook` every time a grace period is looked up.
    pub fn on_grace_lookup(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.grace_hook.lock().unwrap() = Some(Box::new(hook));
    }

    /// Runs `hook` every time the connection state is queried.
    pub fn on_connection_check(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.connection_hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn is_session_cached(&self, room: RoomId) -> bool {
        self.state.lock().unwrap().sessions.contains(&room)
    }

    pub fn calls(&self) -> Vec<VoiceCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_for(&self, room: RoomId) -> Vec<VoiceCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.room() == room)
            .collect()
    }

    fn record(&self, call: VoiceCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

struct FakeSession {
    room: RoomId,
    voice: Arc<FakeVoice>,
}

#[async_trait]
impl VoiceSession for FakeSession {
    async fn stop_and_release(&self) -> Result<()> {
        if self.voice.state.lock().unwrap().failing_stop.contains(&self.room) {
            return Err(Error::Voice {
                room: self.room,
                message: "scheduler already destroyed".to_string(),
            });
        }
        self.voice.record(VoiceCall::StopAndRelease(self.room));
        Ok(())
    }

    async fn send_message(&self, content: &str) -> Result<()> {
        self.voice
            .record(VoiceCall::SendMessage(self.room, content.to_string()));
        Ok(())
    }
}

#[async_trait]
impl SessionRegistry for Arc<FakeVoice> {
    async fn active_session(&self, room: RoomId) -> Option<Arc<dyn VoiceSession>> {
        let cached = self.state.lock().unwrap().sessions.contains(&room);
        cached.then(|| {
            Arc::new(FakeSession {
                room,
                voice: Arc::clone(self),
            }) as Arc<dyn VoiceSession>
        })
    }

    async fn remove_session(&self, room: RoomId) -> Result<()> {
        self.state.lock().unwrap().sessions.remove(&room);
        self.record(VoiceCall::RemoveSession(room));
        Ok(())
    }
}

#[async_trait]
impl RoomResolver for FakeVoice {
    async fn room_exists(&self, room: RoomId) -> bool {
        self.state.lock().unwrap().rooms.contains(&room)
    }
}

#[async_trait]
impl VoiceTransport for FakeVoice {
    async fn is_connected(&self, room: RoomId) -> bool {
        if let Some(hook) = self.connection_hook.lock().unwrap().as_ref() {
            hook();
        }
        self.state.lock().unwrap().connected.contains(&room)
    }

    async fn disconnect(&self, room: RoomId) -> Result<()> {
        {
            let mut state = self.state.lock().unwrap();
            if state.failing_disconnect.contains(&room) {
                return Err(Error::Voice {
                    room,
                    message: "gateway refused to leave".to_string(),
                });
            }
            state.connected.remove(&room);
        }
        self.record(VoiceCall::Disconnect(room));
        Ok(())
    }
}

#[async_trait]
impl GraceSettings for FakeVoice {
    async fn grace_period(&self, room: RoomId) -> TimeDelta {
        if let Some(hook) = self.grace_hook.lock().unwrap().as_ref() {
            hook();
        }
        let secs = self
            .state
            .lock()
            .unwrap()
            .grace
            .get(&room)
            .copied()
            .unwrap_or(self.default_grace);
        TimeDelta::seconds(secs)
    }
}
