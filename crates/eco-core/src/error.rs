//! Error types for the simulation.

use crate::types::{EntityId, Vector2D};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

pub type ActionResult<T> = std::result::Result<T, ActionError>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Construction error: {0}")]
    Construction(String),

    #[error("Placement error: {0}")]
    Placement(String),

    #[error("Action error: {0}")]
    Action(#[from] ActionError),
}

impl Error {
    pub fn out_of_bounds(position: Vector2D, columns: i32, rows: i32) -> Self {
        Error::Placement(format!(
            "position {} is outside the {}x{} board",
            position, columns, rows
        ))
    }

    pub fn unknown_entity(id: EntityId) -> Self {
        Error::Placement(format!("entity {} is not on the board", id))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// A per-entity action that was refused.
///
/// These never abort a tick; the game loop logs them and skips the action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("{predator} cannot eat {food}: wrong food type")]
    CannotEatThisFoodType { predator: String, food: String },

    #[error("{prey} (energy {prey_energy}) is too strong for {predator} (energy {predator_energy})")]
    PreyTooStrong {
        predator: String,
        predator_energy: i32,
        prey: String,
        prey_energy: i32,
    },

    #[error("{0} has no partner to reproduce with")]
    MissingPartner(String),

    #[error("partner {0} is not female")]
    PartnerNotFemale(String),

    #[error("{name} is not fertile yet ({fertility}/{threshold})")]
    NotFertile {
        name: String,
        fertility: u32,
        threshold: u32,
    },

    #[error("{0} cannot reproduce")]
    CannotReproduce(String),

    #[error("{0} cannot move")]
    CannotMove(String),

    #[error("{0} is dead")]
    Dead(String),

    #[error("population limit of {0} reached")]
    PopulationLimit(usize),
}
