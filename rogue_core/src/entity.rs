use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    EntityId, Position, Rgb,
    agent::AiAgent,
    map::{GridError, TileGrid},
};

/// Which death handler runs when a fighter's hp drops to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeathKind {
    Player,
    Monster,
}

/// Combat capability of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fighter {
    pub max_hp: i32,
    pub hp: i32,
    pub defense: i32,
    pub power: i32,
    pub on_death: DeathKind,
}

impl Fighter {
    pub fn new(hp: i32, defense: i32, power: i32, on_death: DeathKind) -> Self {
        Fighter {
            max_hp: hp,
            hp,
            defense,
            power,
            on_death,
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }
}

/// Anything that lives on the map: the player, monsters and their remains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    pub name: String,
    pub position: Position,
    pub glyph: char,
    pub color: Rgb,
    pub blocks_movement: bool,
    pub fighter: Option<Fighter>,
    pub ai: Option<AiAgent>,
}

impl Entity {
    /// Creates an entity without combat or AI. The id is assigned on spawn.
    pub fn new(
        name: impl Into<String>,
        position: Position,
        glyph: char,
        color: Rgb,
        blocks_movement: bool,
    ) -> Self {
        Entity {
            id: 0,
            name: name.into(),
            position,
            glyph,
            color,
            blocks_movement,
            fighter: None,
            ai: None,
        }
    }

    pub fn with_fighter(mut self, fighter: Fighter) -> Self {
        self.fighter = Some(fighter);
        self
    }

    pub fn with_ai(mut self, ai: AiAgent) -> Self {
        self.ai = Some(ai);
        self
    }

    /// The player character at `position`.
    pub fn player(position: Position) -> Self {
        Entity::new("player", position, '@', Rgb::WHITE, true)
            .with_fighter(Fighter::new(30, 2, 5, DeathKind::Player))
    }

    #[inline]
    pub fn id(&self) -> EntityId {
        self.id
    }
}

/// Fixed monster stat templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MonsterKind {
    /// The common, weak variant.
    Orc,
    /// The rare, strong variant.
    Troll,
}

impl MonsterKind {
    /// 80% orcs, 20% trolls.
    pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.random_range(0..100) < 80 {
            MonsterKind::Orc
        } else {
            MonsterKind::Troll
        }
    }

    pub fn spawn_at(self, position: Position) -> Entity {
        let (name, glyph, color, fighter) = match self {
            MonsterKind::Orc => (
                "orc",
                'o',
                Rgb::DESATURATED_GREEN,
                Fighter::new(10, 0, 3, DeathKind::Monster),
            ),
            MonsterKind::Troll => (
                "troll",
                'T',
                Rgb::DARKER_GREEN,
                Fighter::new(16, 1, 4, DeathKind::Monster),
            ),
        };
        Entity::new(name, position, glyph, color, true)
            .with_fighter(fighter)
            .with_ai(AiAgent::BasicMonster)
    }
}

/// Owns every entity of a session.
///
/// Entities are never removed, so ids double as stable indices and
/// iteration order never changes. The player id is assigned by [`EntityRegistry::new`]
/// and always indexes an entity.
#[derive(Debug, Clone, Serialize)]
pub struct EntityRegistry {
    entities: Vec<Entity>,
    player: EntityId,
}

impl EntityRegistry {
    /// Creates a registry holding only the player.
    pub fn new(player: Entity) -> Self {
        let mut registry = EntityRegistry {
            entities: Vec::new(),
            player: 0,
        };
        registry.player = registry.spawn(player);
        registry
    }

    /// Adds an entity and returns its newly assigned id.
    pub fn spawn(&mut self, mut entity: Entity) -> EntityId {
        let id = self.entities.len();
        entity.id = id;
        self.entities.push(entity);
        id
    }

    #[inline]
    pub fn player_id(&self) -> EntityId {
        self.player
    }

    #[inline]
    pub fn is_player(&self, id: EntityId) -> bool {
        id == self.player
    }

    pub fn player(&self) -> &Entity {
        &self.entities[self.player]
    }

    pub fn player_mut(&mut self) -> &mut Entity {
        &mut self.entities[self.player]
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in registry (spawn) order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Entities in drawing order: everyone else first, the player last.
    pub fn iter_draw_order(&self) -> impl Iterator<Item = &Entity> {
        let player = self.player;
        self.entities
            .iter()
            .filter(move |entity| entity.id != player)
            .chain(self.entities.get(player))
    }

    /// Ids of entities that currently have an AI, in registry order.
    pub fn ai_ids(&self) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|entity| entity.ai.is_some())
            .map(Entity::id)
            .collect()
    }

    /// The first movement-blocking entity at `pos`.
    pub fn entity_blocking_at(&self, pos: Position) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|entity| entity.blocks_movement && entity.position == pos)
    }

    /// The first entity with a fighter at `pos`; used for attack targeting.
    pub fn fighter_at(&self, pos: Position) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|entity| entity.fighter.is_some() && entity.position == pos)
    }

    /// Whether `pos` is impassable, either by terrain or by a blocking entity.
    ///
    /// This is the single passability rule shared by generation, player
    /// movement and monster movement.
    pub fn is_occupied_or_blocked(
        &self,
        pos: Position,
        tiles: &TileGrid,
    ) -> Result<bool, GridError> {
        Ok(tiles.is_blocked(pos)? || self.entity_blocking_at(pos).is_some())
    }

    /// Moves an entity by one step unless the destination is impassable.
    ///
    /// Returns whether the entity moved.
    pub fn try_move(
        &mut self,
        id: EntityId,
        dx: isize,
        dy: isize,
        tiles: &TileGrid,
    ) -> Result<bool, GridError> {
        let Some(entity) = self.entities.get(id) else {
            return Ok(false);
        };
        let target = tiles.step(entity.position, dx, dy)?;
        if self.is_occupied_or_blocked(target, tiles)? {
            return Ok(false);
        }
        self.entities[id].position = target;
        Ok(true)
    }
}
