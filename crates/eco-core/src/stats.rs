//! Population statistics tracked per species.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifetime counters for one species
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesStats {
    /// Individuals placed before the first tick
    pub initial: u64,
    /// Individuals alive when the run ended
    pub survivors: u64,
    /// Offspring produced by reproduction
    pub born: u64,
    /// Individuals removed by cleanup
    pub died: u64,
    /// Individuals added by spawn actions after the start
    pub spawned: u64,
}

impl SpeciesStats {
    /// Everyone that ever existed minus everyone that died
    pub fn expected_alive(&self) -> i64 {
        (self.initial + self.born + self.spawned) as i64 - self.died as i64
    }
}

/// Per-species counters keyed by species name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PopulationStats {
    pub species: BTreeMap<String, SpeciesStats>,
}

impl PopulationStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, name: &str) -> &mut SpeciesStats {
        self.species.entry(name.to_string()).or_default()
    }

    /// Make sure a species shows up even if it never had a member
    pub fn register(&mut self, name: &str) {
        self.entry(name);
    }

    pub fn record_initial(&mut self, name: &str) {
        self.entry(name).initial += 1;
    }

    pub fn record_birth(&mut self, name: &str) {
        self.entry(name).born += 1;
    }

    pub fn record_death(&mut self, name: &str) {
        self.entry(name).died += 1;
    }

    pub fn record_spawn(&mut self, name: &str) {
        self.entry(name).spawned += 1;
    }

    pub fn set_survivors(&mut self, name: &str, survivors: u64) {
        self.entry(name).survivors = survivors;
    }

    pub fn get(&self, name: &str) -> Option<&SpeciesStats> {
        self.species.get(name)
    }

    pub fn total_born(&self) -> u64 {
        self.species.values().map(|s| s.born).sum()
    }

    pub fn total_died(&self) -> u64 {
        self.species.values().map(|s| s.died).sum()
    }
}
