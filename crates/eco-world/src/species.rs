//! Species templates and per-kind behavior policies.
//!
//! Every life form is the same [`LifeForm`] struct tagged with a
//! [`SpeciesKind`]. What differs between kinds (diet, what they chase, whether
//! they may eat a given target, whether they may reproduce) lives behind the
//! [`SpeciesPolicy`] trait, resolved statically by [`policy`].

use crate::lifeform::LifeForm;
use eco_core::{ActionError, ActionResult, Gender, RuleConfig, SpeciesConfig, SpeciesKind};
use serde::{Deserialize, Serialize};

/// Shared template for every member of a species
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Species {
    pub kind: SpeciesKind,
    pub name: String,
    pub color: String,
    pub size: u32,
    /// Energy given to new members, including offspring
    pub energy: i32,
}

impl Species {
    pub fn new(kind: SpeciesKind, name: &str, energy: i32, color: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            color: color.to_string(),
            size: 1,
            energy,
        }
    }
}

impl From<&SpeciesConfig> for Species {
    fn from(config: &SpeciesConfig) -> Self {
        Self {
            kind: config.kind,
            name: config.name.clone(),
            color: config.color.clone(),
            size: config.size,
            energy: config.energy,
        }
    }
}

/// What a species is able to digest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diet {
    pub eats_plants: bool,
    pub eats_meat: bool,
}

impl Diet {
    pub fn accepts(&self, food: SpeciesKind) -> bool {
        match food {
            SpeciesKind::Plant => self.eats_plants,
            SpeciesKind::Herbivore | SpeciesKind::Carnivore => self.eats_meat,
        }
    }
}

pub trait SpeciesPolicy: Sync {
    fn diet(&self) -> Diet;

    fn can_move(&self) -> bool {
        true
    }

    /// Whether `candidate` is worth chasing
    fn wants(&self, candidate: &LifeForm) -> bool;

    /// Legality of `predator` eating `prey`
    fn check_can_eat(&self, predator: &LifeForm, prey: &LifeForm) -> ActionResult<()> {
        check_food_type(self.diet(), predator, prey)
    }

    fn check_can_reproduce(
        &self,
        parent: &LifeForm,
        _partner: Option<&LifeForm>,
        _rules: &RuleConfig,
    ) -> ActionResult<()> {
        Err(ActionError::CannotReproduce(parent.label()))
    }

    /// Pick the candidate with the smallest `dot(own position, candidate position)`.
    ///
    /// Ties go to the earliest candidate in the slice.
    fn choose_target<'a>(&self, me: &LifeForm, candidates: &[&'a LifeForm]) -> Option<&'a LifeForm> {
        candidates
            .iter()
            .copied()
            .filter(|candidate| candidate.id() != me.id() && !candidate.is_dead())
            .filter(|candidate| self.wants(candidate))
            .min_by_key(|candidate| me.position().dot(&candidate.position()))
    }
}

fn check_food_type(diet: Diet, predator: &LifeForm, prey: &LifeForm) -> ActionResult<()> {
    if diet.accepts(prey.kind()) {
        Ok(())
    } else {
        Err(ActionError::CannotEatThisFoodType {
            predator: predator.label(),
            food: prey.label(),
        })
    }
}

pub struct PlantPolicy;

impl SpeciesPolicy for PlantPolicy {
    fn diet(&self) -> Diet {
        Diet {
            eats_plants: false,
            eats_meat: false,
        }
    }

    fn can_move(&self) -> bool {
        false
    }

    fn wants(&self, _candidate: &LifeForm) -> bool {
        false
    }
}

pub struct HerbivorePolicy;

impl SpeciesPolicy for HerbivorePolicy {
    fn diet(&self) -> Diet {
        Diet {
            eats_plants: true,
            eats_meat: false,
        }
    }

    fn wants(&self, candidate: &LifeForm) -> bool {
        candidate.kind() == SpeciesKind::Plant
    }

    fn check_can_reproduce(
        &self,
        parent: &LifeForm,
        partner: Option<&LifeForm>,
        rules: &RuleConfig,
    ) -> ActionResult<()> {
        let partner = partner.ok_or_else(|| ActionError::MissingPartner(parent.label()))?;
        if partner.is_dead() {
            return Err(ActionError::Dead(partner.label()));
        }
        if partner.gender() != Gender::Female {
            return Err(ActionError::PartnerNotFemale(partner.label()));
        }
        if parent.fertility() < rules.herbivore_min_fertility {
            return Err(ActionError::NotFertile {
                name: parent.label(),
                fertility: parent.fertility(),
                threshold: rules.herbivore_min_fertility,
            });
        }
        Ok(())
    }
}

pub struct CarnivorePolicy;

impl SpeciesPolicy for CarnivorePolicy {
    fn diet(&self) -> Diet {
        Diet {
            eats_plants: false,
            eats_meat: true,
        }
    }

    fn wants(&self, candidate: &LifeForm) -> bool {
        candidate.kind().is_animal()
    }

    fn check_can_eat(&self, predator: &LifeForm, prey: &LifeForm) -> ActionResult<()> {
        check_food_type(self.diet(), predator, prey)?;
        if prey.kind() == SpeciesKind::Carnivore && prey.energy() > predator.energy() {
            return Err(ActionError::PreyTooStrong {
                predator: predator.label(),
                predator_energy: predator.energy(),
                prey: prey.label(),
                prey_energy: prey.energy(),
            });
        }
        Ok(())
    }
}

/// Behavior policy for a species family
pub fn policy(kind: SpeciesKind) -> &'static dyn SpeciesPolicy {
    match kind {
        SpeciesKind::Plant => &PlantPolicy,
        SpeciesKind::Herbivore => &HerbivorePolicy,
        SpeciesKind::Carnivore => &CarnivorePolicy,
    }
}
