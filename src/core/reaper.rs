//! Idle voice session reaper.
//!
//! Voice-state callbacks feed [`IdleReaper::on_membership_changed`], which arms a room
//! when its last listener leaves and disarms it when one comes back. The periodic
//! [`IdleReaper::sweep`] tears down every room that stayed idle past its grace period:
//! playback is stopped, the bot leaves, a notice is posted and the cached session is
//! dropped. A swept room is never evaluated again until a fresh idle cycle re-arms it.

use crate::core::clock::Clock;
use crate::core::room::{Participant, RoomId, is_alone};
use crate::core::session::{ReaperBackends, VoiceSession};
use crate::core::tracker::{IdleTracker, Transition};
use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, trace, warn};

/// What one sweep did with one tracked room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomOutcome {
    /// Still inside the grace period
    Pending,
    /// Guild or session vanished, entry cleared without teardown
    Stale,
    /// Disarmed or re-armed while the sweep was looking at it
    Superseded,
    /// Bot was connected and has left
    TornDown,
    /// Bot had already left, only the cached session was dropped
    Released,
    /// At least one teardown step failed; entry cleared anyway
    Failed,
}

/// Summary of one sweep over all tracked rooms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Rooms the bot left
    pub torn_down: Vec<RoomId>,
    /// Rooms whose session was dropped after the bot had already left
    pub released: Vec<RoomId>,
    /// Rooms that no longer exist or have no session
    pub stale: Vec<RoomId>,
    /// Rooms whose entry changed under the sweep
    pub superseded: Vec<RoomId>,
    /// Rooms whose teardown reported an error
    pub failed: Vec<RoomId>,
    /// Rooms still within their grace period
    pub pending: usize,
}

impl SweepReport {
    fn record(&mut self, room: RoomId, outcome: RoomOutcome) {
        match outcome {
            RoomOutcome::Pending => self.pending += 1,
            RoomOutcome::Stale => self.stale.push(room),
            RoomOutcome::Superseded => self.superseded.push(room),
            RoomOutcome::TornDown => self.torn_down.push(room),
            RoomOutcome::Released => self.released.push(room),
            RoomOutcome::Failed => self.failed.push(room),
        }
    }

    /// Number of rooms removed from tracking by this sweep.
    #[must_use]
    pub fn evicted(&self) -> usize {
        self.torn_down.len() + self.released.len() + self.stale.len() + self.failed.len()
    }

    /// True when the sweep neither evicted nor skipped anything.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.evicted() == 0 && self.superseded.is_empty()
    }
}

/// Tracks idle rooms and evicts the bot from them once their grace period runs out.
pub struct IdleReaper {
    tracker: IdleTracker,
    clock: Arc<dyn Clock>,
    backends: ReaperBackends,
    leave_message: String,
}

impl IdleReaper {
    /// Creates a reaper with an empty tracker.
    ///
    /// `leave_message` is posted to a room's text output when the bot leaves it.
    pub fn new(
        backends: ReaperBackends,
        clock: Arc<dyn Clock>,
        leave_message: impl Into<String>,
    ) -> Self {
        Self {
            tracker: IdleTracker::new(),
            clock,
            backends,
            leave_message: leave_message.into(),
        }
    }

    /// Read access to the idle bookkeeping.
    #[must_use]
    pub const fn tracker(&self) -> &IdleTracker {
        &self.tracker
    }

    /// Handles a voice-state change in `room`, given everyone now in the bot's channel.
    ///
    /// Does nothing when the bot is not connected in that room.
    pub async fn on_membership_changed(
        &self,
        room: RoomId,
        occupants: &[Participant],
    ) -> Transition {
        self.on_voice_update(room, || Some(occupants.to_vec())).await
    }

    /// Handles a voice-state change in `room`, reading the occupants of the bot's channel
    /// only once the connection check is done.
    ///
    /// `read_occupants` runs right before the tracker is updated with nothing awaited in
    /// between, so updates handled concurrently always record the latest membership.
    /// It returns `None` when the bot sits in no channel, which ignores the update.
    pub async fn on_voice_update<F>(&self, room: RoomId, read_occupants: F) -> Transition
    where
        F: FnOnce() -> Option<Vec<Participant>> + Send,
    {
        if !self.backends.voice.is_connected(room).await {
            trace!("Ignoring voice update in room {room}: bot is not connected.");
            return Transition::Ignored;
        }
        let Some(occupants) = read_occupants() else {
            trace!("Ignoring voice update in room {room}: bot is in no channel.");
            return Transition::Ignored;
        };
        let transition = self
            .tracker
            .observe(room, is_alone(&occupants), self.clock.now());
        match transition {
            Transition::Armed => debug!("Room {room} has no active listener, idle timer started."),
            Transition::Disarmed => debug!("Room {room} has an active listener again."),
            Transition::Unchanged | Transition::Ignored => {}
        }
        transition
    }

    /// Evaluates every tracked room once.
    ///
    /// A failure in one room never stops the others from being processed.
    #[instrument(skip(self))]
    pub async fn sweep(&self) -> SweepReport {
        let now = self.clock.now();
        let mut report = SweepReport::default();
        for (room, since) in self.tracker.snapshot() {
            let outcome = self.sweep_room(room, since, now).await;
            trace!("Sweep outcome for room {room}: {outcome:?}");
            report.record(room, outcome);
        }
        report
    }

    async fn sweep_room(
        &self,
        room: RoomId,
        since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> RoomOutcome {
        if !self.backends.rooms.room_exists(room).await {
            self.tracker.release_if_unchanged(room, since);
            debug!("Room {room} no longer exists, dropped from idle tracking.");
            return RoomOutcome::Stale;
        }
        let Some(session) = self.backends.sessions.active_session(room).await else {
            self.tracker.release_if_unchanged(room, since);
            debug!("Room {room} has no session anymore, dropped from idle tracking.");
            return RoomOutcome::Stale;
        };

        let grace = self.backends.settings.grace_period(room).await;
        if now - since < grace {
            return RoomOutcome::Pending;
        }

        // Claim the entry before any teardown call so the bookkeeping never waits on Discord.
        if !self.tracker.release_if_unchanged(room, since) {
            debug!("Room {room} changed during the sweep, skipping teardown.");
            return RoomOutcome::Superseded;
        }

        match self.teardown(room, session.as_ref()).await {
            Ok(true) => RoomOutcome::TornDown,
            Ok(false) => RoomOutcome::Released,
            Err(e) => {
                error!("{e}");
                RoomOutcome::Failed
            }
        }
    }

    /// Runs every teardown step even if an earlier one fails.
    ///
    /// Returns whether the bot was still connected, or the collected step errors.
    async fn teardown(&self, room: RoomId, session: &dyn VoiceSession) -> Result<bool> {
        let mut failures = Vec::new();

        let connected = self.backends.voice.is_connected(room).await;
        if connected {
            if let Err(e) = session.stop_and_release().await {
                warn!("Failed to stop playback in room {room}: {e}");
                failures.push(format!("stop playback: {e}"));
            }
            if let Err(e) = self.backends.voice.disconnect(room).await {
                warn!("Failed to leave voice channel in room {room}: {e}");
                failures.push(format!("disconnect: {e}"));
            }
            info!("Leave voice channel in room {room}. Cause: no active listener found.");
            if let Err(e) = session.send_message(&self.leave_message).await {
                warn!("Failed to send leave notice in room {room}: {e}");
                failures.push(format!("notify: {e}"));
            }
        }

        // Dropped even when the bot had already left, so no stale session lingers.
        if let Err(e) = self.backends.sessions.remove_session(room).await {
            warn!("Failed to remove cached session of room {room}: {e}");
            failures.push(format!("remove session: {e}"));
        }

        if failures.is_empty() {
            Ok(connected)
        } else {
            Err(Error::Teardown {
                room,
                message: failures.join("; "),
            })
        }
    }
}
