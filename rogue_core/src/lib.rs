use serde::{Deserialize, Serialize};

pub mod agent;
pub mod combat;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod fov;
pub mod map;
pub mod mapgen;
pub mod message;

pub use config::GameConfig;
pub use engine::{Frontend, Game, GameState, GameView, Intent, TurnOutcome};
pub use error::GameError;

/// Unique identifier for entities (player, monsters, remains).
///
/// Ids are indices into the entity registry and stay stable for the whole session.
pub type EntityId = usize;

/// Represents a 2D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    /// Returns the position shifted by `(dx, dy)`, or `None` if either
    /// coordinate would go below zero.
    pub fn offset(self, dx: isize, dy: isize) -> Option<Position> {
        Some(Position {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }

    /// Signed vector from `self` to `other`.
    pub fn delta_to(self, other: Position) -> (isize, isize) {
        (
            other.x as isize - self.x as isize,
            other.y as isize - self.y as isize,
        )
    }

    /// Euclidean distance between two positions.
    pub fn distance_to(self, other: Position) -> f64 {
        let (dx, dy) = self.delta_to(other);
        ((dx * dx + dy * dy) as f64).sqrt()
    }
}

/// An RGB color, kept independent of any terminal or graphics library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const DARK_RED: Rgb = Rgb(127, 0, 0);
    pub const DESATURATED_GREEN: Rgb = Rgb(63, 127, 63);
    pub const DARKER_GREEN: Rgb = Rgb(0, 127, 0);
}
