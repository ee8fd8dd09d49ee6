//! Core types and utilities for the eco-grid predator/prey simulation.

pub mod types;
pub mod config;
pub mod error;
pub mod stats;

pub use error::{ActionError, ActionResult, Error, Result};
pub use types::*;
pub use config::*;
pub use stats::*;
