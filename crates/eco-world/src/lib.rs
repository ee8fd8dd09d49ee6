//! World simulation engine.
//!
//! This module implements the bounded 2D board where plants, herbivores and
//! carnivores move, eat, get poisoned, reproduce and die.

pub mod board;
pub mod game;
pub mod lifeform;
pub mod roster;
pub mod species;

pub use board::Board;
pub use game::{Game, RunSummary, StopReason, TickSummary};
pub use lifeform::LifeForm;
pub use roster::Roster;
pub use species::{policy, Diet, Species, SpeciesPolicy};
