//! Room configuration.

use serde::{Deserialize, Serialize};

/// Settings shared by every room a [`RoomStore`](crate::RoomStore) creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Maximum guests per room, host not counted. `None` means unlimited:
    /// any number of guests race to crack the same secret and the first
    /// full match wins the round.
    pub max_guests: Option<usize>,

    /// Capacity of each room actor's command channel. When it fills up,
    /// callers wait (backpressure) rather than drop requests.
    pub command_buffer: usize,
}

impl RoomConfig {
    /// A classic one-on-one duel: exactly one guest per room.
    pub fn duel() -> Self {
        Self {
            max_guests: Some(1),
            ..Self::default()
        }
    }

    /// Returns `true` if a room with `guests` guests can take another.
    pub fn has_guest_slot(&self, guests: usize) -> bool {
        self.max_guests.is_none_or(|max| guests < max)
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_guests: None,
            command_buffer: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default_is_unlimited() {
        let config = RoomConfig::default();
        assert_eq!(config.max_guests, None);
        assert_eq!(config.command_buffer, 64);
        assert!(config.has_guest_slot(1_000));
    }

    #[test]
    fn test_room_config_duel_caps_at_one_guest() {
        let config = RoomConfig::duel();
        assert!(config.has_guest_slot(0));
        assert!(!config.has_guest_slot(1));
    }

    #[test]
    fn test_room_config_zero_guests_means_no_slots() {
        let config = RoomConfig {
            max_guests: Some(0),
            ..RoomConfig::default()
        };
        assert!(!config.has_guest_slot(0));
    }
}
