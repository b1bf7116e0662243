use serde::{Deserialize, Serialize};

use crate::{EntityId, Position};

/// Represents actions a monster can decide to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Wait,
    Move { dx: isize, dy: isize },
    Attack { target: EntityId },
}

/// What a monster is currently doing relative to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonsterMode {
    /// Not in the player's field of view.
    Idle,
    /// Visible, but two or more tiles away.
    Hunting,
    /// Visible and adjacent (distance below 2).
    Attacking,
}

/// Provides a read-only view of the world relevant to one monster's turn.
#[derive(Debug, Clone, Copy)]
pub struct MonsterView {
    pub position: Position,
    /// Whether the monster stands in the player's field of view.
    pub visible_to_player: bool,
    pub player_id: EntityId,
    pub player_position: Position,
    pub player_hp: i32,
}

impl MonsterView {
    pub fn mode(&self) -> MonsterMode {
        if !self.visible_to_player {
            MonsterMode::Idle
        } else if self.position.distance_to(self.player_position) >= 2.0 {
            MonsterMode::Hunting
        } else {
            MonsterMode::Attacking
        }
    }
}

/// Monster behaviour. New variants only need a new arm in [`AiAgent::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiAgent {
    /// Chases the player in a straight line while seen, attacks when adjacent.
    BasicMonster,
}

impl AiAgent {
    /// Determines the action the monster wants to perform this turn.
    pub fn decide(&self, view: &MonsterView) -> Action {
        match self {
            AiAgent::BasicMonster => match view.mode() {
                MonsterMode::Idle => Action::Wait,
                MonsterMode::Hunting => {
                    let (dx, dy) = step_towards(view.position, view.player_position);
                    Action::Move { dx, dy }
                }
                MonsterMode::Attacking if view.player_hp > 0 => Action::Attack {
                    target: view.player_id,
                },
                MonsterMode::Attacking => Action::Wait,
            },
        }
    }
}

/// Unit step from `from` towards `to`: the direction vector is normalized to
/// length one and each component rounded to -1, 0 or 1.
pub fn step_towards(from: Position, to: Position) -> (isize, isize) {
    let (dx, dy) = from.delta_to(to);
    let distance = from.distance_to(to);
    if distance == 0.0 {
        return (0, 0);
    }
    (
        (dx as f64 / distance).round() as isize,
        (dy as f64 / distance).round() as isize,
    )
}
