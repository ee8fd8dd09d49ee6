//! Configuration types for the simulation.

use crate::error::{Error, Result};
use crate::types::SpeciesKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Smallest accepted board edge
pub const MIN_BOARD_SIZE: i32 = 3;

/// Board dimensions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Number of rows (y axis)
    pub rows: i32,
    /// Number of columns (x axis)
    pub columns: i32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            rows: 20,
            columns: 20,
        }
    }
}

/// Behavioral rules shared by every species
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Probability that a new life form is poisonous (0.0 to 1.0)
    pub poisonous_probability: f64,
    /// Fertility a herbivore needs before it may reproduce
    pub herbivore_min_fertility: u32,
    /// How far herbivores look for plants
    pub herbivore_scan_radius: i32,
    /// How far carnivores look for prey
    pub carnivore_scan_radius: i32,
    /// Births are refused once the board holds this many entities
    pub max_population: usize,
    /// Spawn new plants every this many ticks (0 disables)
    pub plant_spawn_interval: u64,
    /// Plants spawned per plant species at each spawn
    pub plant_spawn_count: usize,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            poisonous_probability: 0.1,
            herbivore_min_fertility: 5,
            herbivore_scan_radius: 2,
            carnivore_scan_radius: 3,
            max_population: 1000,
            plant_spawn_interval: 10,
            plant_spawn_count: 3,
        }
    }
}

impl RuleConfig {
    /// Scan radius for a species family; plants never scan
    pub fn scan_radius(&self, kind: SpeciesKind) -> i32 {
        match kind {
            SpeciesKind::Plant => 0,
            SpeciesKind::Herbivore => self.herbivore_scan_radius,
            SpeciesKind::Carnivore => self.carnivore_scan_radius,
        }
    }
}

fn default_size() -> u32 {
    1
}

/// One species entry; `count` individuals are placed at start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesConfig {
    pub kind: SpeciesKind,
    pub name: String,
    /// Starting (and offspring) energy
    pub energy: i32,
    /// Opaque to the core, handed to the renderer
    pub color: String,
    /// Fixed display scale
    #[serde(default = "default_size")]
    pub size: u32,
    #[serde(default)]
    pub count: usize,
}

impl SpeciesConfig {
    pub fn new(kind: SpeciesKind, name: &str, energy: i32, color: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            energy,
            color: color.to_string(),
            size: default_size(),
            count: 0,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }
}

/// Full simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Number of ticks to run (0 runs until another stop condition fires)
    pub max_ticks: u64,
    /// Stop as soon as only one species family is left on the board
    pub stop_when_single_kind: bool,
    /// Emit a population log event every this many ticks
    pub log_interval: u64,
    pub board: BoardConfig,
    pub rules: RuleConfig,
    pub species: Vec<SpeciesConfig>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_ticks: 1_000,
            stop_when_single_kind: true,
            log_interval: 100,
            board: BoardConfig::default(),
            rules: RuleConfig::default(),
            species: vec![
                SpeciesConfig::new(SpeciesKind::Plant, "grass", 10, "#3cb043").with_count(60),
                SpeciesConfig::new(SpeciesKind::Herbivore, "rabbit", 20, "#c2b280").with_count(20),
                SpeciesConfig::new(SpeciesKind::Carnivore, "fox", 30, "#d2691e").with_count(6),
            ],
        }
    }
}

impl SimConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = ticks;
        self
    }

    pub fn with_board(mut self, rows: i32, columns: i32) -> Self {
        self.board = BoardConfig { rows, columns };
        self
    }

    pub fn with_species(mut self, species: Vec<SpeciesConfig>) -> Self {
        self.species = species;
        self
    }

    /// Parse and validate a JSON configuration document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading simulation config");
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.board.rows < MIN_BOARD_SIZE || self.board.columns < MIN_BOARD_SIZE {
            return Err(Error::Config(format!(
                "board must be at least {0}x{0}, got {1}x{2}",
                MIN_BOARD_SIZE, self.board.columns, self.board.rows
            )));
        }

        if !(0.0..=1.0).contains(&self.rules.poisonous_probability) {
            return Err(Error::Config(format!(
                "poisonous_probability must be within [0, 1], got {}",
                self.rules.poisonous_probability
            )));
        }

        if self.rules.herbivore_scan_radius < 1 || self.rules.carnivore_scan_radius < 1 {
            return Err(Error::Config("scan radii must be at least 1".to_string()));
        }

        let mut names = HashSet::new();
        for species in &self.species {
            if species.name.trim().is_empty() {
                return Err(Error::Config("species name must not be empty".to_string()));
            }
            if !names.insert(species.name.as_str()) {
                return Err(Error::Config(format!(
                    "species '{}' is declared twice",
                    species.name
                )));
            }
            if species.energy < 0 {
                return Err(Error::Config(format!(
                    "species '{}' has negative energy {}",
                    species.name, species.energy
                )));
            }
        }

        Ok(())
    }
}
