use serde::{Deserialize, Serialize};

use crate::GameError;

/// Construction-time settings for a game session.
///
/// Missing fields fall back to the defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Map width in tiles.
    pub width: usize,
    /// Map height in tiles.
    pub height: usize,
    /// Smallest room side, walls included.
    pub room_min_size: usize,
    /// Largest room side, walls included.
    pub room_max_size: usize,
    /// Number of room placement attempts.
    pub max_rooms: usize,
    /// Upper bound on monsters drawn per room.
    pub max_room_monsters: usize,
    pub fov_radius: usize,
    /// Whether sight-blocking tiles on the edge of vision are themselves visible.
    pub fov_light_walls: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            width: 80,
            height: 45,
            room_min_size: 6,
            room_max_size: 10,
            max_rooms: 30,
            max_room_monsters: 3,
            fov_radius: 3,
            fov_light_walls: true,
        }
    }
}

impl GameConfig {
    /// Checks the configuration before any generation is attempted.
    pub fn validate(&self) -> Result<(), GameError> {
        let invalid = |reason: String| Err(GameError::InvalidConfiguration(reason));

        if self.width == 0 || self.height == 0 {
            return invalid(format!(
                "map size {}x{} must be non-zero",
                self.width, self.height
            ));
        }
        if self.room_min_size < 2 {
            return invalid(format!(
                "room_min_size {} leaves no room interior (minimum 2)",
                self.room_min_size
            ));
        }
        if self.room_min_size > self.room_max_size {
            return invalid(format!(
                "room_min_size {} exceeds room_max_size {}",
                self.room_min_size, self.room_max_size
            ));
        }
        // A room of side `s` needs `s + 1` columns: its origin plus `s` more cells.
        if self.width < self.room_max_size + 1 || self.height < self.room_max_size + 1 {
            return invalid(format!(
                "map size {}x{} cannot fit a room of size {}",
                self.width, self.height, self.room_max_size
            ));
        }
        if self.max_rooms == 0 {
            return invalid("max_rooms must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = GameConfig::default();
        assert_eq!(config.width, 80);
        assert_eq!(config.height, 45);
        assert_eq!((config.room_min_size, config.room_max_size), (6, 10));
        assert_eq!(config.max_rooms, 30);
        assert_eq!(config.max_room_monsters, 3);
        assert_eq!(config.fov_radius, 3);
        assert!(config.fov_light_walls);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn rejects_inverted_room_sizes() {
        let config = GameConfig {
            room_min_size: 9,
            room_max_size: 5,
            ..GameConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GameError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn rejects_grid_too_small_for_rooms() {
        let config = GameConfig {
            width: 10,
            height: 45,
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());

        let fits = GameConfig {
            width: 11,
            height: 11,
            ..GameConfig::default()
        };
        assert_eq!(fits.validate(), Ok(()));
    }

    #[test]
    fn rejects_degenerate_values() {
        for config in [
            GameConfig {
                width: 0,
                ..GameConfig::default()
            },
            GameConfig {
                room_min_size: 1,
                ..GameConfig::default()
            },
            GameConfig {
                max_rooms: 0,
                ..GameConfig::default()
            },
        ] {
            assert!(config.validate().is_err(), "{config:?} should be rejected");
        }
    }
}
