use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    EntityId, GameError, Rgb,
    engine::GameState,
    entity::{DeathKind, EntityRegistry},
    message::GameEvent,
};

/// Glyph left behind by anything that dies.
pub const CORPSE_GLYPH: char = '%';

/// Represents the outcome of a single attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackOutcome {
    /// Damage was dealt; `killed` names the death handler that ran, if any.
    Hit {
        damage: i32,
        killed: Option<DeathKind>,
    },
    /// Defense absorbed the whole attack.
    NoEffect,
    /// One side has no fighter (already dead or never could fight).
    Ignored,
}

/// Resolves `attacker` hitting `defender` for `power - defense` damage.
///
/// Non-positive damage is reported as [`AttackOutcome::NoEffect`] and never heals.
pub fn attack(
    entities: &mut EntityRegistry,
    state: &mut GameState,
    attacker: EntityId,
    defender: EntityId,
    events: &mut Vec<GameEvent>,
) -> Result<AttackOutcome, GameError> {
    let attacking = entities
        .get(attacker)
        .ok_or(GameError::UnknownEntity(attacker))?;
    let defending = entities
        .get(defender)
        .ok_or(GameError::UnknownEntity(defender))?;
    let (Some(attacker_fighter), Some(defender_fighter)) = (attacking.fighter, defending.fighter)
    else {
        return Ok(AttackOutcome::Ignored);
    };

    let attacker_name = attacking.name.clone();
    let defender_name = defending.name.clone();
    let damage = attacker_fighter.power - defender_fighter.defense;
    debug!(attacker, defender, damage, "attack");

    if damage <= 0 {
        events.push(GameEvent::NoEffect {
            attacker,
            attacker_name,
            defender,
            defender_name,
        });
        return Ok(AttackOutcome::NoEffect);
    }

    events.push(GameEvent::Hit {
        attacker,
        attacker_name,
        defender,
        defender_name,
        damage,
    });
    let killed = take_damage(entities, state, defender, damage, events)?;
    Ok(AttackOutcome::Hit { damage, killed })
}

/// Subtracts `amount` hp and runs the death handler when hp reaches zero.
///
/// Entities without a fighter, or whose fighter is already at zero hp, are
/// left untouched, so a death handler fires at most once.
pub fn take_damage(
    entities: &mut EntityRegistry,
    state: &mut GameState,
    id: EntityId,
    amount: i32,
    events: &mut Vec<GameEvent>,
) -> Result<Option<DeathKind>, GameError> {
    let entity = entities.get_mut(id).ok_or(GameError::UnknownEntity(id))?;
    let Some(fighter) = entity.fighter.as_mut() else {
        return Ok(None);
    };
    if !fighter.is_alive() {
        return Ok(None);
    }
    if amount > 0 {
        fighter.hp -= amount;
    }
    if fighter.is_alive() {
        return Ok(None);
    }

    let kind = fighter.on_death;
    die(entities, state, id, kind, events)?;
    Ok(Some(kind))
}

fn die(
    entities: &mut EntityRegistry,
    state: &mut GameState,
    id: EntityId,
    kind: DeathKind,
    events: &mut Vec<GameEvent>,
) -> Result<(), GameError> {
    let entity = entities.get_mut(id).ok_or(GameError::UnknownEntity(id))?;
    entity.glyph = CORPSE_GLYPH;
    entity.color = Rgb::DARK_RED;

    match kind {
        DeathKind::Player => {
            if let Some(fighter) = entity.fighter.as_mut() {
                fighter.hp = 0;
            }
            *state = GameState::Dead;
            info!(id, "player died");
            events.push(GameEvent::PlayerDied { id });
        }
        DeathKind::Monster => {
            let name = std::mem::take(&mut entity.name);
            entity.name = format!("remains of {name}");
            entity.blocks_movement = false;
            entity.fighter = None;
            entity.ai = None;
            info!(id, %name, "monster died");
            events.push(GameEvent::MonsterDied { id, name });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{
        Position,
        entity::{Entity, Fighter, MonsterKind},
    };

    fn arena(defender: Fighter) -> (EntityRegistry, EntityId) {
        let mut entities = EntityRegistry::new(
            Entity::player(Position::new(1, 1))
                .with_fighter(Fighter::new(30, 1, 5, DeathKind::Player)),
        );
        let monster = entities.spawn(MonsterKind::Orc.spawn_at(Position::new(2, 1)));
        entities.get_mut(monster).unwrap().fighter = Some(defender);
        (entities, monster)
    }

    #[test]
    fn damage_is_power_minus_defense() {
        let (mut entities, orc) = arena(Fighter::new(10, 0, 3, DeathKind::Monster));
        let mut state = GameState::Playing;
        let mut events = Vec::new();
        let player = entities.player_id();

        let outcome = attack(&mut entities, &mut state, player, orc, &mut events).unwrap();
        assert_eq!(
            outcome,
            AttackOutcome::Hit {
                damage: 5,
                killed: None
            }
        );
        assert_eq!(entities.get(orc).unwrap().fighter.unwrap().hp, 5);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn full_defense_is_no_effect_not_healing() {
        let (mut entities, orc) = arena(Fighter::new(10, 9, 3, DeathKind::Monster));
        let mut state = GameState::Playing;
        let mut events = Vec::new();
        let player = entities.player_id();

        let outcome = attack(&mut entities, &mut state, player, orc, &mut events).unwrap();
        assert_eq!(outcome, AttackOutcome::NoEffect);
        assert_eq!(entities.get(orc).unwrap().fighter.unwrap().hp, 10);
        assert!(matches!(events[0], GameEvent::NoEffect { .. }));
    }

    #[test]
    fn power_equal_to_defense_is_no_effect() {
        let (mut entities, orc) = arena(Fighter::new(10, 5, 3, DeathKind::Monster));
        let mut state = GameState::Playing;
        let mut events = Vec::new();
        let player = entities.player_id();

        let outcome = attack(&mut entities, &mut state, player, orc, &mut events).unwrap();
        assert_eq!(outcome, AttackOutcome::NoEffect);
        assert_eq!(entities.get(orc).unwrap().fighter.unwrap().hp, 10);
        assert_eq!(
            events[0].to_string(),
            "Player attacks orc but it has no effect!"
        );
    }

    proptest! {
        #[test]
        fn attack_deals_power_minus_defense_or_nothing(
            power in 0i32..20,
            defense in 0i32..20,
            hp in 1i32..40,
        ) {
            let (mut entities, orc) = arena(Fighter::new(hp, defense, 0, DeathKind::Monster));
            entities.player_mut().fighter = Some(Fighter::new(30, 0, power, DeathKind::Player));
            let mut state = GameState::Playing;
            let mut events = Vec::new();
            let player = entities.player_id();

            let outcome = attack(&mut entities, &mut state, player, orc, &mut events).unwrap();
            let remaining = entities.get(orc).unwrap().fighter.map(|fighter| fighter.hp);
            let damage = power - defense;

            if damage <= 0 {
                prop_assert_eq!(outcome, AttackOutcome::NoEffect);
                prop_assert_eq!(remaining, Some(hp));
            } else if damage < hp {
                prop_assert_eq!(outcome, AttackOutcome::Hit { damage, killed: None });
                prop_assert_eq!(remaining, Some(hp - damage));
            } else {
                prop_assert_eq!(
                    outcome,
                    AttackOutcome::Hit { damage, killed: Some(DeathKind::Monster) }
                );
                prop_assert_eq!(remaining, None);
            }
            prop_assert_eq!(state, GameState::Playing);
        }
    }

    #[test]
    fn monster_death_leaves_inert_remains() {
        let (mut entities, orc) = arena(Fighter::new(4, 0, 3, DeathKind::Monster));
        let mut state = GameState::Playing;
        let mut events = Vec::new();

        let killed = take_damage(&mut entities, &mut state, orc, 4, &mut events).unwrap();
        assert_eq!(killed, Some(DeathKind::Monster));

        let remains = entities.get(orc).unwrap();
        assert_eq!(remains.name, "remains of orc");
        assert_eq!(remains.glyph, CORPSE_GLYPH);
        assert!(!remains.blocks_movement);
        assert!(remains.fighter.is_none());
        assert!(remains.ai.is_none());
        assert_eq!(state, GameState::Playing);

        // The fighter is gone, so further damage cannot re-run the handler.
        let again = take_damage(&mut entities, &mut state, orc, 4, &mut events).unwrap();
        assert_eq!(again, None);
        assert_eq!(
            events
                .iter()
                .filter(|event| matches!(event, GameEvent::MonsterDied { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn player_death_ends_the_game_once() {
        let mut entities = EntityRegistry::new(Entity::player(Position::new(1, 1)));
        let mut state = GameState::Playing;
        let mut events = Vec::new();
        let player = entities.player_id();

        let killed = take_damage(&mut entities, &mut state, player, 45, &mut events).unwrap();
        assert_eq!(killed, Some(DeathKind::Player));
        assert_eq!(state, GameState::Dead);

        let corpse = entities.player();
        assert_eq!(corpse.glyph, CORPSE_GLYPH);
        assert_eq!(corpse.color, Rgb::DARK_RED);
        assert_eq!(corpse.fighter.unwrap().hp, 0);

        assert_eq!(
            take_damage(&mut entities, &mut state, player, 3, &mut events).unwrap(),
            None
        );
        assert_eq!(events, vec![GameEvent::PlayerDied { id: player }]);
    }

    #[test]
    fn unknown_entities_are_reported() {
        let mut entities = EntityRegistry::new(Entity::player(Position::new(1, 1)));
        let mut state = GameState::Playing;
        let mut events = Vec::new();
        assert_eq!(
            attack(&mut entities, &mut state, 0, 42, &mut events),
            Err(GameError::UnknownEntity(42))
        );
    }
}
