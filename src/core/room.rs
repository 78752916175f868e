//! Rooms and the people in them.
//!
//! A room is the voice channel the bot occupies inside one guild. Since the bot holds
//! at most one voice connection per guild, a room is keyed by the guild snowflake.

use std::fmt;

/// Identifies the room (guild) a voice session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(pub u64);

impl RoomId {
    /// Returns the raw Discord snowflake.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RoomId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// The part of a member's voice state the reaper cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Participant {
    /// Bot accounts never keep a room alive, the bot itself included
    pub is_bot: bool,
    /// Self-deafened or server-deafened
    pub is_deafened: bool,
}

impl Participant {
    /// Whether this participant counts as someone actually listening.
    #[must_use]
    pub const fn is_qualifying(&self) -> bool {
        !self.is_bot && !self.is_deafened
    }
}

#[cfg(test)]
impl Participant {
    /// A regular member who can hear the room.
    #[must_use]
    pub const fn listener() -> Self {
        Self {
            is_bot: false,
            is_deafened: false,
        }
    }

    /// A bot account.
    #[must_use]
    pub const fn bot() -> Self {
        Self {
            is_bot: true,
            is_deafened: false,
        }
    }

    /// A human member who deafened themselves or was deafened by a moderator.
    #[must_use]
    pub const fn deafened() -> Self {
        Self {
            is_bot: false,
            is_deafened: true,
        }
    }
}

/// True when no occupant of the room is a qualifying listener.
#[must_use]
pub fn is_alone(occupants: &[Participant]) -> bool {
    !occupants.iter().any(Participant::is_qualifying)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_awake_humans_qualify() {
        assert!(Participant::listener().is_qualifying());
        assert!(!Participant::bot().is_qualifying());
        assert!(!Participant::deafened().is_qualifying());
        assert!(
            !Participant {
                is_bot: true,
                is_deafened: true
            }
            .is_qualifying()
        );
    }

    #[test]
    fn test_is_alone() {
        assert!(is_alone(&[]));
        assert!(is_alone(&[Participant::bot()]));
        assert!(is_alone(&[
            Participant::bot(),
            Participant::deafened(),
            Participant::bot()
        ]));
        assert!(!is_alone(&[
            Participant::bot(),
            Participant::deafened(),
            Participant::listener()
        ]));
    }

    #[test]
    fn test_room_id_display() {
        assert_eq!(RoomId(42).to_string(), "42");
        assert_eq!(RoomId::from(7).get(), 7);
    }
}
