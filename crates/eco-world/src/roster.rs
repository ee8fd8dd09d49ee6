//! Species roster built from configuration.

use crate::board::Board;
use crate::lifeform::LifeForm;
use crate::species::Species;
use eco_core::{EntityId, Error, Result, RuleConfig, SpeciesConfig, SpeciesKind, Vector2D};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The configured species, looked up by name
#[derive(Debug, Clone, Default)]
pub struct Roster {
    species: BTreeMap<String, Arc<Species>>,
    /// Declaration order, used for initial placement
    order: Vec<String>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(configs: &[SpeciesConfig]) -> Result<Self> {
        let mut roster = Self::new();
        for config in configs {
            roster.register(Species::from(config))?;
        }
        Ok(roster)
    }

    pub fn register(&mut self, species: Species) -> Result<()> {
        if self.species.contains_key(&species.name) {
            return Err(Error::Config(format!(
                "species '{}' is declared twice",
                species.name
            )));
        }
        self.order.push(species.name.clone());
        self.species.insert(species.name.clone(), Arc::new(species));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Species>> {
        self.species.get(name)
    }

    /// Species in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Species>> + '_ {
        self.order.iter().filter_map(|name| self.species.get(name))
    }

    pub fn of_kind(&self, kind: SpeciesKind) -> impl Iterator<Item = &Arc<Species>> + '_ {
        self.iter().filter(move |species| species.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// Build a new member of the named species
    pub fn create(
        &self,
        name: &str,
        id: EntityId,
        position: Vector2D,
        rules: &RuleConfig,
        rng: &mut ChaCha8Rng,
    ) -> Result<LifeForm> {
        let species = self
            .get(name)
            .ok_or_else(|| Error::Config(format!("unknown species '{}'", name)))?;
        Ok(LifeForm::spawn(id, species.clone(), position, rules, rng))
    }

    /// Create a member of the named species on a random cell, preferring free ones
    pub fn spawn_on(
        &self,
        board: &mut Board,
        name: &str,
        rules: &RuleConfig,
        rng: &mut ChaCha8Rng,
    ) -> Result<EntityId> {
        let position = board
            .random_free_cell(rng)
            .unwrap_or_else(|| board.random_cell(rng));
        let id = board.issue_id();
        let entity = self.create(name, id, position, rules, rng)?;
        board.add_entity(entity, position)
    }
}
