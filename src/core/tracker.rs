//! Per-room "alone since" bookkeeping.
//!
//! The tracker is the only shared mutable state of the reaper. It is written from two
//! places at once: voice-state callbacks arm and disarm rooms, while the periodic sweep
//! evicts rooms whose grace period ran out. Every read-then-write happens inside one
//! lock section, and eviction is compare-and-remove, so neither side can lose the
//! other's update.

use crate::core::room::RoomId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// What a membership observation did to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The room just became idle and is now tracked
    Armed,
    /// A listener is back, the room is no longer tracked
    Disarmed,
    /// Nothing changed (still idle, or still occupied)
    Unchanged,
    /// The bot has no voice connection in the room, observation skipped
    Ignored,
}

/// Map of room to the instant it was first seen without listeners.
#[derive(Debug, Default)]
pub struct IdleTracker {
    alone_since: Mutex<HashMap<RoomId, DateTime<Utc>>>,
}

impl IdleTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // The map holds plain values, so a panic elsewhere cannot leave it half-written.
    fn lock(&self) -> MutexGuard<'_, HashMap<RoomId, DateTime<Utc>>> {
        self.alone_since
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Records one membership observation.
    ///
    /// An idle room keeps its original timestamp on repeated observations, which is
    /// what lets the grace period elapse.
    pub fn observe(&self, room: RoomId, is_alone: bool, now: DateTime<Utc>) -> Transition {
        let mut map = self.lock();
        match (is_alone, map.contains_key(&room)) {
            (true, false) => {
                map.insert(room, now);
                Transition::Armed
            }
            (false, true) => {
                map.remove(&room);
                Transition::Disarmed
            }
            _ => Transition::Unchanged,
        }
    }

    /// Copies the current entries so the sweep can evaluate them without holding the lock.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(RoomId, DateTime<Utc>)> {
        self.lock().iter().map(|(room, since)| (*room, *since)).collect()
    }

    /// Removes `room` only if it is still tracked with the `since` the caller evaluated.
    ///
    /// Returns `false` when the entry was disarmed or re-armed in the meantime.
    pub fn release_if_unchanged(&self, room: RoomId, since: DateTime<Utc>) -> bool {
        let mut map = self.lock();
        if map.get(&room) == Some(&since) {
            map.remove(&room);
            true
        } else {
            false
        }
    }

    /// When `room` was first seen idle, if it is tracked.
    #[must_use]
    pub fn alone_since(&self, room: RoomId) -> Option<DateTime<Utc>> {
        self.lock().get(&room).copied()
    }

    /// Number of rooms currently considered idle.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when no room is idle.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
