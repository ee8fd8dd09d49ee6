//! Bounded 2D board holding every life form.

use crate::lifeform::LifeForm;
use eco_core::{
    ActionError, BoardConfig, EntityId, EntityView, Error, Result, RuleConfig, SpeciesKind,
    Vector2D, MIN_BOARD_SIZE,
};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, trace};

/// Spatial index over the live entity set.
///
/// Entities are keyed by id; the occupancy map records which ids sit on each
/// occupied cell. Several entities may share a cell.
#[derive(Debug, Clone)]
pub struct Board {
    rows: i32,
    columns: i32,
    entities: BTreeMap<EntityId, LifeForm>,
    occupancy: HashMap<Vector2D, BTreeSet<EntityId>>,
    next_id: u64,
}

impl Board {
    pub fn new(rows: i32, columns: i32) -> Result<Self> {
        if rows < MIN_BOARD_SIZE || columns < MIN_BOARD_SIZE {
            return Err(Error::Construction(format!(
                "board must be at least {0}x{0}, got {1} columns x {2} rows",
                MIN_BOARD_SIZE, columns, rows
            )));
        }

        Ok(Self {
            rows,
            columns,
            entities: BTreeMap::new(),
            occupancy: HashMap::new(),
            next_id: 1,
        })
    }

    pub fn from_config(config: &BoardConfig) -> Result<Self> {
        Self::new(config.rows, config.columns)
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn columns(&self) -> i32 {
        self.columns
    }

    pub fn contains_position(&self, position: Vector2D) -> bool {
        position.within(self.columns, self.rows)
    }

    /// Hand out a fresh entity id
    pub fn issue_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Place an entity at `position`.
    ///
    /// Adding an id that is already on the board changes nothing.
    pub fn add_entity(&mut self, mut entity: LifeForm, position: Vector2D) -> Result<EntityId> {
        if !self.contains_position(position) {
            return Err(Error::out_of_bounds(position, self.columns, self.rows));
        }

        let id = entity.id();
        if self.entities.contains_key(&id) {
            trace!(entity_id = %id, "Entity already on board");
            return Ok(id);
        }

        entity.set_position(position);
        self.occupancy.entry(position).or_default().insert(id);
        self.entities.insert(id, entity);
        self.next_id = self.next_id.max(id.0 + 1);
        Ok(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&LifeForm> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut LifeForm> {
        self.entities.get_mut(&id)
    }

    /// Every entity on the board, dead ones included until cleanup
    pub fn entities(&self) -> impl Iterator<Item = &LifeForm> + '_ {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn occupied_positions(&self) -> impl Iterator<Item = Vector2D> + '_ {
        self.occupancy.keys().copied()
    }

    pub fn is_occupied(&self, position: Vector2D) -> bool {
        self.occupancy.contains_key(&position)
    }

    /// Ids of live animals, in id order
    pub fn animal_ids(&self) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| !e.is_dead() && e.kind().is_animal())
            .map(|e| e.id())
            .collect()
    }

    /// Live entities other than `entity` within Chebyshev `radius` of it.
    ///
    /// Cells are scanned row by row, ids within a cell in ascending order.
    pub fn neighbor_entities(&self, entity: &LifeForm, radius: i32) -> Vec<&LifeForm> {
        let center = entity.position();
        let mut found = Vec::new();

        let (top, bottom) = (
            center.y.saturating_sub(radius).max(0),
            center.y.saturating_add(radius).min(self.rows - 1),
        );
        let (left, right) = (
            center.x.saturating_sub(radius).max(0),
            center.x.saturating_add(radius).min(self.columns - 1),
        );

        for y in top..=bottom {
            for x in left..=right {
                let Some(ids) = self.occupancy.get(&Vector2D::new(x, y)) else {
                    continue;
                };
                found.extend(
                    ids.iter()
                        .filter(|id| **id != entity.id())
                        .filter_map(|id| self.entities.get(id))
                        .filter(|e| !e.is_dead()),
                );
            }
        }

        found
    }

    /// In-bounds king-move neighbors of a cell
    pub fn adjacent_cells(&self, position: Vector2D) -> Vec<Vector2D> {
        Vector2D::neighbor_offsets()
            .iter()
            .map(|offset| position.add(offset))
            .filter(|cell| self.contains_position(*cell))
            .collect()
    }

    /// Uniformly random in-bounds neighbor; the cell itself if it has none
    pub fn random_adjacent_cell(&self, position: Vector2D, rng: &mut ChaCha8Rng) -> Vector2D {
        self.adjacent_cells(position)
            .choose(rng)
            .copied()
            .unwrap_or(position)
    }

    pub fn random_cell(&self, rng: &mut ChaCha8Rng) -> Vector2D {
        Vector2D::new(rng.gen_range(0..self.columns), rng.gen_range(0..self.rows))
    }

    /// Random unoccupied cell; `None` once the board is full.
    ///
    /// After a bounded number of random draws the board is scanned row by row.
    pub fn random_free_cell(&self, rng: &mut ChaCha8Rng) -> Option<Vector2D> {
        if let Some(cell) = (0..100)
            .map(|_| self.random_cell(rng))
            .find(|cell| !self.is_occupied(*cell))
        {
            return Some(cell);
        }

        (0..self.rows)
            .flat_map(|y| (0..self.columns).map(move |x| Vector2D::new(x, y)))
            .find(|cell| !self.is_occupied(*cell))
    }

    /// Move an entity and charge it; returns the energy spent
    pub fn move_entity(&mut self, id: EntityId, destination: Vector2D) -> Result<i32> {
        if !self.contains_position(destination) {
            return Err(Error::out_of_bounds(destination, self.columns, self.rows));
        }

        let entity = self
            .entities
            .get_mut(&id)
            .ok_or_else(|| Error::unknown_entity(id))?;
        let origin = entity.position();
        let cost = entity.move_to(destination)?;

        if origin != destination {
            if let Some(ids) = self.occupancy.get_mut(&origin) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.occupancy.remove(&origin);
                }
            }
            self.occupancy.entry(destination).or_default().insert(id);
        }

        Ok(cost)
    }

    /// `predator` eats `prey`; returns the energy gained.
    ///
    /// The prey is only marked dead. It stays on the board until cleanup.
    pub fn feed(&mut self, predator_id: EntityId, prey_id: EntityId) -> Result<i32> {
        if predator_id == prey_id {
            let label = self
                .get(prey_id)
                .map(|e| e.label())
                .ok_or_else(|| Error::unknown_entity(prey_id))?;
            return Err(ActionError::CannotEatThisFoodType {
                predator: label.clone(),
                food: label,
            }
            .into());
        }

        let mut prey = self
            .entities
            .remove(&prey_id)
            .ok_or_else(|| Error::unknown_entity(prey_id))?;
        let result = match self.entities.get_mut(&predator_id) {
            Some(predator) => predator.eat(&mut prey).map_err(Error::from),
            None => Err(Error::unknown_entity(predator_id)),
        };
        self.entities.insert(prey_id, prey);

        result
    }

    /// Breed `parent` with `partner` and place the offspring next to the parent.
    pub fn reproduce(
        &mut self,
        parent_id: EntityId,
        partner_id: Option<EntityId>,
        rules: &RuleConfig,
        rng: &mut ChaCha8Rng,
    ) -> Result<EntityId> {
        // Dead entities leave at cleanup and do not count toward the cap
        let alive = self.entities.values().filter(|e| !e.is_dead()).count();
        if alive >= rules.max_population {
            return Err(ActionError::PopulationLimit(rules.max_population).into());
        }

        let partner = match partner_id {
            Some(pid) => Some(
                self.entities
                    .get(&pid)
                    .cloned()
                    .ok_or_else(|| Error::unknown_entity(pid))?,
            ),
            None => None,
        };

        let parent = self
            .entities
            .get_mut(&parent_id)
            .ok_or_else(|| Error::unknown_entity(parent_id))?;
        parent.mate(partner.as_ref(), rules)?;
        let species = parent.species().clone();
        let origin = parent.position();

        let cell = self.random_adjacent_cell(origin, rng);
        let id = self.issue_id();
        let offspring = LifeForm::spawn(id, species, cell, rules, rng);
        self.add_entity(offspring, cell)
    }

    /// Mark every entity whose energy ran out as dead; returns how many
    pub fn mark_starved(&mut self) -> usize {
        self.entities
            .values_mut()
            .map(|e| e.starve_if_exhausted())
            .filter(|starved| *starved)
            .count()
    }

    /// Remove dead entities from both views and hand them back
    pub fn cleanup(&mut self) -> Vec<LifeForm> {
        let dead: Vec<EntityId> = self
            .entities
            .values()
            .filter(|e| e.is_dead())
            .map(|e| e.id())
            .collect();

        let mut removed = Vec::with_capacity(dead.len());
        for id in dead {
            if let Some(entity) = self.entities.remove(&id) {
                let position = entity.position();
                if let Some(ids) = self.occupancy.get_mut(&position) {
                    ids.remove(&id);
                    if ids.is_empty() {
                        self.occupancy.remove(&position);
                    }
                }
                removed.push(entity);
            }
        }

        if !removed.is_empty() {
            debug!(removed = removed.len(), remaining = self.entities.len(), "Board cleanup");
        }
        removed
    }

    /// Whether any live entity belongs to a kind other than `kind`.
    ///
    /// `None` never matches.
    pub fn contains_species_other_than(&self, kind: Option<SpeciesKind>) -> bool {
        let Some(kind) = kind else {
            return false;
        };
        self.entities
            .values()
            .any(|e| !e.is_dead() && e.kind() != kind)
    }

    pub fn is_species_extinct(&self, name: &str) -> bool {
        !self
            .entities
            .values()
            .any(|e| !e.is_dead() && e.name() == name)
    }

    pub fn count_kind(&self, kind: SpeciesKind) -> usize {
        self.entities
            .values()
            .filter(|e| !e.is_dead() && e.kind() == kind)
            .count()
    }

    /// Live population per species name
    pub fn population_by_species(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for entity in self.entities.values().filter(|e| !e.is_dead()) {
            *counts.entry(entity.name().to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Render data for every live entity
    pub fn frame(&self) -> Vec<EntityView> {
        self.entities
            .values()
            .filter(|e| !e.is_dead())
            .map(LifeForm::view)
            .collect()
    }
}
