use crate::{EntityId, map::GridError};

/// Errors surfaced by the simulation core.
///
/// Rejected room or monster placements and zero-damage attacks are not errors;
/// they are ordinary branches of generation and combat.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Map generation accepted no rooms after {attempts} attempts")]
    GenerationFailed { attempts: usize },
    #[error("Entity {0} does not exist")]
    UnknownEntity(EntityId),
}
