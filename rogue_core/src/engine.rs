use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{info, trace};

use crate::{
    EntityId, GameConfig, GameError,
    agent::{Action, MonsterView},
    combat,
    entity::{Entity, EntityRegistry},
    fov::VisibilityField,
    map::TileGrid,
    mapgen::MapGenerator,
    message::{GameEvent, MessageLog},
};

/// Session state. `Playing -> Dead` is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    Playing,
    Dead,
}

/// One player input, already decoded by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    ToggleDisplayMode,
    Exit,
    NoAction,
}

impl Intent {
    /// Step vector for movement intents.
    pub fn direction(self) -> Option<(isize, isize)> {
        match self {
            Intent::MoveUp => Some((0, -1)),
            Intent::MoveDown => Some((0, 1)),
            Intent::MoveLeft => Some((-1, 0)),
            Intent::MoveRight => Some((1, 0)),
            Intent::ToggleDisplayMode | Intent::Exit | Intent::NoAction => None,
        }
    }
}

/// Represents the outcome of processing one intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnOutcome {
    /// The player moved or attacked (or bumped a wall) and monsters acted.
    TookTurn,
    /// Nothing happened: no action, or the player is dead.
    NoTurn,
    /// The front-end should switch display mode. Not a turn.
    ToggleDisplayMode,
    /// The session is over. Not a turn.
    Exit,
}

/// The display and input collaborator driven by [`Game::run`].
pub trait Frontend {
    type Error: From<GameError>;

    /// Blocks until the player produces an intent.
    fn wait_for_intent(&mut self) -> Result<Intent, Self::Error>;

    fn toggle_display_mode(&mut self) -> Result<(), Self::Error>;

    /// Draws one frame. Visibility is always up to date when this is called.
    fn render(&mut self, view: &GameView<'_>) -> Result<(), Self::Error>;
}

/// Read-only snapshot of a session handed to the front-end for drawing.
#[derive(Debug, Clone, Copy)]
pub struct GameView<'a> {
    game: &'a Game,
}

impl<'a> GameView<'a> {
    pub fn tiles(&self) -> &'a TileGrid {
        &self.game.tiles
    }

    pub fn fov(&self) -> &'a VisibilityField {
        &self.game.fov
    }

    /// Every entity, the player last so it is drawn on top.
    pub fn entities_in_draw_order(&self) -> impl Iterator<Item = &'a Entity> + use<'a> {
        self.game.entities.iter_draw_order()
    }

    pub fn is_player(&self, id: EntityId) -> bool {
        self.game.entities.is_player(id)
    }

    /// `(hp, max_hp)` of the player.
    pub fn player_hp(&self) -> (i32, i32) {
        self.game
            .entities
            .player()
            .fighter
            .map_or((0, 0), |fighter| (fighter.hp, fighter.max_hp))
    }

    pub fn state(&self) -> GameState {
        self.game.state
    }

    pub fn messages(&self) -> &'a MessageLog {
        &self.game.messages
    }
}

/// Owns the whole session and resolves one turn per player intent.
#[derive(Debug, Clone)]
pub struct Game {
    config: GameConfig,
    tiles: TileGrid,
    entities: EntityRegistry,
    fov: VisibilityField,
    /// Set when the player moves; cleared once visibility is recomputed.
    fov_dirty: bool,
    state: GameState,
    messages: MessageLog,
}

impl Game {
    /// Generates a fresh dungeon.
    pub fn new<R: Rng + ?Sized>(config: GameConfig, rng: &mut R) -> Result<Self, GameError> {
        let generator = MapGenerator::new(config)?;
        let map = generator.generate(rng)?;
        info!(
            rooms = map.rooms.len(),
            monsters = map.entities.len() - 1,
            "dungeon generated"
        );
        Ok(Game::from_parts(
            generator.config().clone(),
            map.tiles,
            map.entities,
        ))
    }

    /// Generates a dungeon reproducibly from `seed`.
    pub fn from_seed(config: GameConfig, seed: u64) -> Result<Self, GameError> {
        Game::new(config, &mut StdRng::seed_from_u64(seed))
    }

    /// Builds a session around an existing map, e.g. a hand-made one.
    pub fn from_parts(config: GameConfig, tiles: TileGrid, entities: EntityRegistry) -> Self {
        let fov = VisibilityField::new(tiles.width(), tiles.height());
        Game {
            config,
            tiles,
            entities,
            fov,
            fov_dirty: true,
            state: GameState::Playing,
            messages: MessageLog::default(),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn tiles(&self) -> &TileGrid {
        &self.tiles
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    pub fn fov(&self) -> &VisibilityField {
        &self.fov
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn messages(&self) -> &MessageLog {
        &self.messages
    }

    pub fn is_fov_dirty(&self) -> bool {
        self.fov_dirty
    }

    pub fn view(&self) -> GameView<'_> {
        GameView { game: self }
    }

    /// Recomputes visibility if the player moved since the last computation.
    ///
    /// Returns whether a recomputation happened.
    pub fn refresh_visibility(&mut self) -> Result<bool, GameError> {
        if !self.fov_dirty {
            return Ok(false);
        }
        let origin = self.entities.player().position;
        self.fov.compute(
            &mut self.tiles,
            origin,
            self.config.fov_radius,
            self.config.fov_light_walls,
        )?;
        self.fov_dirty = false;
        Ok(true)
    }

    /// Resolves one player intent and, if it used a turn, every monster's turn.
    pub fn process_intent(&mut self, intent: Intent) -> Result<TurnOutcome, GameError> {
        trace!(?intent, state = ?self.state, "processing intent");
        let Some((dx, dy)) = intent.direction() else {
            return Ok(match intent {
                Intent::Exit => TurnOutcome::Exit,
                Intent::ToggleDisplayMode => TurnOutcome::ToggleDisplayMode,
                _ => TurnOutcome::NoTurn,
            });
        };
        if self.state != GameState::Playing {
            return Ok(TurnOutcome::NoTurn);
        }

        let mut events = Vec::new();
        let result = self
            .player_move_or_attack(dx, dy, &mut events)
            .and_then(|()| self.take_monster_turns(&mut events));
        self.messages.extend(events);
        result?;
        Ok(TurnOutcome::TookTurn)
    }

    /// Attacks whatever fighter stands on the target cell, otherwise tries to step there.
    fn player_move_or_attack(
        &mut self,
        dx: isize,
        dy: isize,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        let player = self.entities.player_id();
        let target = self.tiles.step(self.entities.player().position, dx, dy)?;

        if let Some(defender) = self.entities.fighter_at(target).map(Entity::id) {
            combat::attack(&mut self.entities, &mut self.state, player, defender, events)?;
        } else if self.entities.try_move(player, dx, dy, &self.tiles)? {
            self.fov_dirty = true;
        }
        Ok(())
    }

    /// Lets every monster with an AI act, in registry order.
    ///
    /// Monsters decide from the field of view of the last render, which does
    /// not yet include a step the player took this turn.
    fn take_monster_turns(&mut self, events: &mut Vec<GameEvent>) -> Result<(), GameError> {
        let player = self.entities.player_id();

        for id in self.entities.ai_ids() {
            if self.state != GameState::Playing {
                break;
            }
            let Some(monster) = self.entities.get(id) else {
                continue;
            };
            let Some(ai) = monster.ai else {
                continue;
            };
            let player_entity = self.entities.player();
            let view = MonsterView {
                position: monster.position,
                visible_to_player: self.fov.is_visible(monster.position)?,
                player_id: player,
                player_position: player_entity.position,
                player_hp: player_entity.fighter.map_or(0, |fighter| fighter.hp),
            };

            let action = ai.decide(&view);
            trace!(id, mode = ?view.mode(), ?action, "monster turn");
            match action {
                Action::Wait => {}
                Action::Move { dx, dy } => {
                    self.entities.try_move(id, dx, dy, &self.tiles)?;
                }
                Action::Attack { target } => {
                    combat::attack(&mut self.entities, &mut self.state, id, target, events)?;
                }
            }
        }
        Ok(())
    }

    /// Runs the render / wait / resolve loop until the player exits.
    ///
    /// Returns the state the session ended in.
    pub fn run<F: Frontend>(&mut self, frontend: &mut F) -> Result<GameState, F::Error> {
        loop {
            self.refresh_visibility()?;
            frontend.render(&self.view())?;

            let intent = frontend.wait_for_intent()?;
            match self.process_intent(intent)? {
                TurnOutcome::Exit => {
                    info!(state = ?self.state, "session ended");
                    return Ok(self.state);
                }
                TurnOutcome::ToggleDisplayMode => frontend.toggle_display_mode()?,
                TurnOutcome::TookTurn | TurnOutcome::NoTurn => {}
            }
        }
    }
}
