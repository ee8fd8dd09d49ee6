//! Core type definitions for the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a board-resident entity, issued by the board that owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Integer 2D coordinate, used both as a cell position and as a displacement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vector2D {
    pub x: i32,
    pub y: i32,
}

impl Vector2D {
    pub const ZERO: Vector2D = Vector2D { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn add(&self, other: &Vector2D) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    pub fn subtract(&self, other: &Vector2D) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    pub fn multiply_along_x(&self, scalar: i32) -> Self {
        Self::new(self.x * scalar, self.y)
    }

    pub fn multiply_along_y(&self, scalar: i32) -> Self {
        Self::new(self.x, self.y * scalar)
    }

    pub fn multiply(&self, scalar: i32) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }

    /// Sum of componentwise products.
    ///
    /// The movement code uses this as a cheap ordering key between positions;
    /// it is not a distance.
    pub fn dot(&self, other: &Vector2D) -> i32 {
        self.x * other.x + self.y * other.y
    }

    /// Both components are `>= 0`
    pub fn is_positive(&self) -> bool {
        self.x >= 0 && self.y >= 0
    }

    /// Both components are `< 0`
    pub fn is_negative(&self) -> bool {
        self.x < 0 && self.y < 0
    }

    /// Chebyshev (king-move) distance to another position
    pub fn chebyshev_distance(&self, other: &Vector2D) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Single king-move step from `self` toward `target`.
    pub fn step_toward(&self, target: &Vector2D) -> Self {
        let delta = target.subtract(self);
        self.add(&Vector2D::new(delta.x.signum(), delta.y.signum()))
    }

    /// Whether the position lies in `[0, columns) x [0, rows)`
    pub fn within(&self, columns: i32, rows: i32) -> bool {
        self.is_positive() && self.x < columns && self.y < rows
    }

    /// The eight king-move offsets around a cell
    pub fn neighbor_offsets() -> [Vector2D; 8] {
        [
            Vector2D::new(-1, -1),
            Vector2D::new(0, -1),
            Vector2D::new(1, -1),
            Vector2D::new(-1, 0),
            Vector2D::new(1, 0),
            Vector2D::new(-1, 1),
            Vector2D::new(0, 1),
            Vector2D::new(1, 1),
        ]
    }
}

impl fmt::Display for Vector2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Gender of a life form. Plants are always `Neutral`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Neutral,
}

/// Species family of a life form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeciesKind {
    Plant,
    Herbivore,
    Carnivore,
}

impl SpeciesKind {
    pub fn is_animal(&self) -> bool {
        !matches!(self, SpeciesKind::Plant)
    }
}

impl fmt::Display for SpeciesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpeciesKind::Plant => "plant",
            SpeciesKind::Herbivore => "herbivore",
            SpeciesKind::Carnivore => "carnivore",
        };
        f.write_str(name)
    }
}

/// What a renderer needs to draw one live entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityView {
    pub id: EntityId,
    pub position: Vector2D,
    pub color: String,
    pub size: u32,
}
