use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    GameConfig, GameError, Position,
    entity::{Entity, EntityRegistry, MonsterKind},
    map::{GridError, TileGrid},
};

/// An axis-aligned room rectangle. `x2`/`y2` are the far walls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub x1: usize,
    pub y1: usize,
    pub x2: usize,
    pub y2: usize,
}

impl Room {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Room {
            x1: x,
            y1: y,
            x2: x + width,
            y2: y + height,
        }
    }

    /// Integer midpoint; rooms are connected through their centers.
    pub fn center(&self) -> Position {
        Position::new((self.x1 + self.x2) / 2, (self.y1 + self.y2) / 2)
    }

    /// Overlap test with inclusive bounds, so rooms sharing a wall also intersect.
    pub fn intersects(&self, other: &Room) -> bool {
        self.x1 <= other.x2 && self.x2 >= other.x1 && self.y1 <= other.y2 && self.y2 >= other.y1
    }

    /// The floor cells strictly inside the walls.
    pub fn interior(&self) -> impl Iterator<Item = Position> + use<> {
        let (x1, x2) = (self.x1, self.x2);
        (self.y1 + 1..self.y2).flat_map(move |y| (x1 + 1..x2).map(move |x| Position::new(x, y)))
    }
}

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct GeneratedMap {
    pub tiles: TileGrid,
    /// The player (placed in the first room) and every spawned monster.
    pub entities: EntityRegistry,
    /// Accepted rooms in acceptance order; tunnels join consecutive rooms.
    pub rooms: Vec<Room>,
}

/// Carves rooms and tunnels into solid rock and populates the rooms.
#[derive(Debug, Clone)]
pub struct MapGenerator {
    config: GameConfig,
}

impl MapGenerator {
    /// Validates `config`; an invalid configuration never reaches generation.
    pub fn new(config: GameConfig) -> Result<Self, GameError> {
        config.validate()?;
        Ok(MapGenerator { config })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Runs one generation pass.
    ///
    /// Each of the `max_rooms` attempts draws a random room and silently drops
    /// it if it touches an earlier one, so fewer rooms than attempts is normal.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<GeneratedMap, GameError> {
        let config = &self.config;
        let mut tiles = TileGrid::new(config.width, config.height);
        let mut entities = EntityRegistry::new(Entity::player(Position::default()));
        let mut rooms: Vec<Room> = Vec::new();

        for attempt in 0..config.max_rooms {
            let width = rng.random_range(config.room_min_size..=config.room_max_size);
            let height = rng.random_range(config.room_min_size..=config.room_max_size);
            let x = rng.random_range(0..=config.width - width - 1);
            let y = rng.random_range(0..=config.height - height - 1);
            let room = Room::new(x, y, width, height);

            if rooms.iter().any(|other| room.intersects(other)) {
                debug!(attempt, ?room, "room rejected: overlap");
                continue;
            }

            carve_room(&mut tiles, &room)?;
            let center = room.center();
            if rooms.is_empty() {
                entities.player_mut().position = center;
            }
            self.place_monsters(&room, &tiles, &mut entities, rng)?;

            if let Some(previous) = rooms.last() {
                let from = previous.center();
                if rng.random_bool(0.5) {
                    carve_h_tunnel(&mut tiles, from.x, center.x, from.y)?;
                    carve_v_tunnel(&mut tiles, from.y, center.y, center.x)?;
                } else {
                    carve_v_tunnel(&mut tiles, from.y, center.y, from.x)?;
                    carve_h_tunnel(&mut tiles, from.x, center.x, center.y)?;
                }
            }

            debug!(attempt, ?room, "room accepted");
            rooms.push(room);
        }

        if rooms.is_empty() {
            return Err(GameError::GenerationFailed {
                attempts: config.max_rooms,
            });
        }
        debug!(
            rooms = rooms.len(),
            entities = entities.len(),
            "map generated"
        );

        Ok(GeneratedMap {
            tiles,
            entities,
            rooms,
        })
    }

    /// Spawns up to `max_room_monsters` monsters in `room`.
    ///
    /// Positions are drawn over the whole rectangle, walls included; a draw
    /// that lands on a blocked or occupied cell is skipped without retrying.
    fn place_monsters<R: Rng + ?Sized>(
        &self,
        room: &Room,
        tiles: &TileGrid,
        entities: &mut EntityRegistry,
        rng: &mut R,
    ) -> Result<(), GridError> {
        let count = rng.random_range(0..=self.config.max_room_monsters);
        for _ in 0..count {
            let pos = Position::new(
                rng.random_range(room.x1..=room.x2),
                rng.random_range(room.y1..=room.y2),
            );
            if entities.is_occupied_or_blocked(pos, tiles)? {
                debug!(x = pos.x, y = pos.y, "monster placement skipped");
                continue;
            }
            let kind = MonsterKind::roll(rng);
            let id = entities.spawn(kind.spawn_at(pos));
            debug!(id, ?kind, x = pos.x, y = pos.y, "monster spawned");
        }
        Ok(())
    }
}

fn carve_room(tiles: &mut TileGrid, room: &Room) -> Result<(), GridError> {
    for pos in room.interior() {
        tiles.carve(pos)?;
    }
    Ok(())
}

fn carve_h_tunnel(tiles: &mut TileGrid, x1: usize, x2: usize, y: usize) -> Result<(), GridError> {
    for x in x1.min(x2)..=x1.max(x2) {
        tiles.carve(Position::new(x, y))?;
    }
    Ok(())
}

fn carve_v_tunnel(tiles: &mut TileGrid, y1: usize, y2: usize, x: usize) -> Result<(), GridError> {
    for y in y1.min(y2)..=y1.max(y2) {
        tiles.carve(Position::new(x, y))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn room_geometry() {
        let room = Room::new(2, 3, 6, 4);
        assert_eq!((room.x2, room.y2), (8, 7));
        assert_eq!(room.center(), Position::new(5, 5));
        assert_eq!(room.interior().count(), 5 * 3);
        assert!(room.interior().all(|pos| pos.x > 2 && pos.x < 8 && pos.y > 3 && pos.y < 7));
    }

    #[test]
    fn shared_walls_count_as_overlap() {
        let a = Room::new(0, 0, 5, 5);
        let touching = Room::new(5, 0, 5, 5);
        let apart = Room::new(6, 0, 5, 5);
        assert!(a.intersects(&touching));
        assert!(touching.intersects(&a));
        assert!(!a.intersects(&apart));
    }

    #[test]
    fn tunnels_carve_inclusive_ranges() {
        let mut tiles = TileGrid::new(10, 10);
        carve_h_tunnel(&mut tiles, 7, 2, 4).unwrap();
        carve_v_tunnel(&mut tiles, 1, 3, 2).unwrap();
        for x in 2..=7 {
            assert!(!tiles.is_blocked(Position::new(x, 4)).unwrap());
        }
        for y in 1..=3 {
            assert!(!tiles.blocks_sight(Position::new(2, y)).unwrap());
        }
        assert!(tiles.is_blocked(Position::new(1, 4)).unwrap());
        assert!(tiles.is_blocked(Position::new(8, 4)).unwrap());
    }

    #[test]
    fn single_attempt_yields_one_room_without_tunnels() {
        let config = GameConfig {
            max_rooms: 1,
            ..GameConfig::default()
        };
        let generator = MapGenerator::new(config).unwrap();
        let map = generator.generate(&mut StdRng::seed_from_u64(3)).unwrap();

        assert_eq!(map.rooms.len(), 1);
        let room = map.rooms[0];
        assert_eq!(map.entities.player().position, room.center());

        let carved = map.tiles.enumerate().filter(|(_, tile)| !tile.blocked).count();
        assert_eq!(carved, room.interior().count());
    }

    #[test]
    fn monsters_start_on_free_floor() {
        let generator = MapGenerator::new(GameConfig::default()).unwrap();
        let map = generator.generate(&mut StdRng::seed_from_u64(11)).unwrap();

        let player = map.entities.player().position;
        for monster in map.entities.iter().filter(|entity| entity.ai.is_some()) {
            assert!(!map.tiles.is_blocked(monster.position).unwrap());
            assert_ne!(monster.position, player);
            let stacked = map
                .entities
                .iter()
                .filter(|other| other.position == monster.position)
                .count();
            assert_eq!(stacked, 1, "two entities share {:?}", monster.position);
        }
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = GameConfig {
            room_min_size: 12,
            room_max_size: 8,
            ..GameConfig::default()
        };
        assert!(matches!(
            MapGenerator::new(config),
            Err(GameError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn same_seed_same_dungeon() {
        let generator = MapGenerator::new(GameConfig::default()).unwrap();
        let a = generator.generate(&mut StdRng::seed_from_u64(99)).unwrap();
        let b = generator.generate(&mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(a.rooms, b.rooms);
        assert_eq!(a.tiles, b.tiles);
        assert_eq!(a.entities.len(), b.entities.len());
    }
}
