use std::{collections::VecDeque, fmt};

use serde::{Deserialize, Serialize};

use crate::EntityId;

/// Something noteworthy that happened during a turn, reported to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    Hit {
        attacker: EntityId,
        attacker_name: String,
        defender: EntityId,
        defender_name: String,
        damage: i32,
    },
    /// The defender's defense absorbed the whole attack.
    NoEffect {
        attacker: EntityId,
        attacker_name: String,
        defender: EntityId,
        defender_name: String,
    },
    MonsterDied { id: EntityId, name: String },
    PlayerDied { id: EntityId },
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEvent::Hit {
                attacker_name,
                defender_name,
                damage,
                ..
            } => write!(
                f,
                "{} attacks {} for {} hit points.",
                capitalize(attacker_name),
                defender_name,
                damage
            ),
            GameEvent::NoEffect {
                attacker_name,
                defender_name,
                ..
            } => write!(
                f,
                "{} attacks {} but it has no effect!",
                capitalize(attacker_name),
                defender_name
            ),
            GameEvent::MonsterDied { name, .. } => write!(f, "{} is dead!", capitalize(name)),
            GameEvent::PlayerDied { .. } => write!(f, "You died!"),
        }
    }
}

/// Bounded history of [`GameEvent`]s; the oldest entries fall off first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageLog {
    capacity: usize,
    events: VecDeque<GameEvent>,
}

impl Default for MessageLog {
    fn default() -> Self {
        MessageLog::with_capacity(64)
    }
}

impl MessageLog {
    pub fn with_capacity(capacity: usize) -> Self {
        MessageLog {
            capacity,
            events: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, event: GameEvent) {
        if self.capacity == 0 {
            return;
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = GameEvent>) {
        for event in events {
            self.push(event);
        }
    }

    /// Events from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &GameEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
