//! Life form state and management.

use crate::species::{policy, Diet, Species};
use eco_core::{
    ActionError, ActionResult, EntityId, EntityView, Gender, RuleConfig, SpeciesKind, Vector2D,
};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

/// Energy charged for stepping onto a different cell
pub const MOVE_COST: i32 = 1;

/// Share of the current energy (in percent) drained over a poisoning
pub const POISON_DRAIN_PERCENT: i32 = 30;

/// Builds a fresh member of a species at a position
pub type Constructor = fn(EntityId, Arc<Species>, Vector2D, &RuleConfig, &mut ChaCha8Rng) -> LifeForm;

/// A plant or animal on the board
#[derive(Debug, Clone)]
pub struct LifeForm {
    id: EntityId,
    species: Arc<Species>,
    position: Vector2D,
    energy: i32,
    gender: Gender,
    dead: bool,
    poisonous: bool,
    poisoned: bool,
    poison_drain: i32,
    fertility: u32,
}

impl PartialEq for LifeForm {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for LifeForm {}

impl LifeForm {
    pub fn new(
        id: EntityId,
        species: Arc<Species>,
        position: Vector2D,
        gender: Gender,
        poisonous: bool,
    ) -> Self {
        let energy = species.energy;
        Self {
            id,
            species,
            position,
            energy,
            gender,
            dead: false,
            poisonous,
            poisoned: false,
            poison_drain: 0,
            fertility: 0,
        }
    }

    /// Plants are always neutral
    pub fn new_plant(
        id: EntityId,
        species: Arc<Species>,
        position: Vector2D,
        rules: &RuleConfig,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let poisonous = rng.gen_bool(rules.poisonous_probability);
        Self::new(id, species, position, Gender::Neutral, poisonous)
    }

    /// Animals are male or female with equal odds
    pub fn new_animal(
        id: EntityId,
        species: Arc<Species>,
        position: Vector2D,
        rules: &RuleConfig,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let gender = if rng.gen_bool(0.5) {
            Gender::Male
        } else {
            Gender::Female
        };
        let poisonous = rng.gen_bool(rules.poisonous_probability);
        Self::new(id, species, position, gender, poisonous)
    }

    /// Constructor for a species family
    pub fn constructor(kind: SpeciesKind) -> Constructor {
        match kind {
            SpeciesKind::Plant => Self::new_plant,
            SpeciesKind::Herbivore | SpeciesKind::Carnivore => Self::new_animal,
        }
    }

    /// Create a member of `species` with randomly rolled gender and poison
    pub fn spawn(
        id: EntityId,
        species: Arc<Species>,
        position: Vector2D,
        rules: &RuleConfig,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let construct = Self::constructor(species.kind);
        construct(id, species, position, rules, rng)
    }

    pub fn with_energy(mut self, energy: i32) -> Self {
        self.energy = energy;
        self
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    pub fn with_poisonous(mut self, poisonous: bool) -> Self {
        self.poisonous = poisonous;
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn species(&self) -> &Arc<Species> {
        &self.species
    }

    pub fn kind(&self) -> SpeciesKind {
        self.species.kind
    }

    pub fn name(&self) -> &str {
        &self.species.name
    }

    pub fn color(&self) -> &str {
        &self.species.color
    }

    pub fn size(&self) -> u32 {
        self.species.size
    }

    pub fn diet(&self) -> Diet {
        policy(self.kind()).diet()
    }

    /// Species name and id, for log and error messages
    pub fn label(&self) -> String {
        format!("{} {}", self.species.name, self.id)
    }

    pub fn position(&self) -> Vector2D {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: Vector2D) {
        self.position = position;
    }

    pub fn energy(&self) -> i32 {
        self.energy
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn fertility(&self) -> u32 {
        self.fertility
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn is_poisonous(&self) -> bool {
        self.poisonous
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn die(&mut self) {
        self.dead = true;
    }

    pub fn add_energy(&mut self, amount: i32) {
        if !self.dead {
            self.energy = self.energy.saturating_add(amount);
        }
    }

    /// Start (or restart) a poisoning sized from the current energy
    pub fn become_poisoned(&mut self) {
        if self.dead {
            return;
        }
        self.poisoned = true;
        // 30% of any i32 fits back into an i32
        let drain = (i64::from(self.energy) * i64::from(POISON_DRAIN_PERCENT)).div_euclid(100);
        self.poison_drain = i32::try_from(drain.max(0)).unwrap_or(i32::MAX);
    }

    /// Drain owed this tick.
    ///
    /// Counts down one per call. The call that returns 0 also ends the
    /// poisoning, so a drain of `n` takes `n + 1` calls to wear off.
    pub fn poisoned_energy_consumption(&mut self) -> i32 {
        if !self.poisoned {
            return 0;
        }
        let drain = self.poison_drain.max(0);
        self.poison_drain -= 1;
        if self.poison_drain < 0 {
            self.poisoned = false;
            self.poison_drain = 0;
        }
        drain
    }

    /// Step to `destination` and pay for it; returns the energy spent.
    ///
    /// Bounds are the board's concern; the board keeps its occupancy map in
    /// step with this.
    pub(crate) fn move_to(&mut self, destination: Vector2D) -> ActionResult<i32> {
        if self.dead {
            return Err(ActionError::Dead(self.label()));
        }
        if !policy(self.kind()).can_move() {
            return Err(ActionError::CannotMove(self.label()));
        }

        let mut cost = 0;
        if destination != self.position {
            cost += MOVE_COST;
            self.position = destination;
        }
        if self.poisoned {
            cost += self.poisoned_energy_consumption();
        }

        self.energy = self.energy.saturating_sub(cost);
        self.fertility = self.fertility.saturating_add(1);
        Ok(cost)
    }

    /// Eat `prey` if this species may; returns the energy gained
    pub fn eat(&mut self, prey: &mut LifeForm) -> ActionResult<i32> {
        if self.dead {
            return Err(ActionError::Dead(self.label()));
        }
        if prey.dead {
            return Err(ActionError::Dead(prey.label()));
        }
        policy(self.kind()).check_can_eat(self, prey)?;

        let gained = prey.energy;
        self.energy = self.energy.saturating_add(gained);
        if prey.poisonous {
            self.become_poisoned();
        }
        prey.die();
        Ok(gained)
    }

    /// Validate a mating and spend the fertility it costs
    pub(crate) fn mate(&mut self, partner: Option<&LifeForm>, rules: &RuleConfig) -> ActionResult<()> {
        if self.dead {
            return Err(ActionError::Dead(self.label()));
        }
        policy(self.kind()).check_can_reproduce(self, partner, rules)?;
        self.fertility = 0;
        Ok(())
    }

    /// Mark as dead when energy ran out; returns whether it happened now
    pub fn starve_if_exhausted(&mut self) -> bool {
        if !self.dead && self.energy <= 0 {
            self.dead = true;
            return true;
        }
        false
    }

    pub fn view(&self) -> EntityView {
        EntityView {
            id: self.id,
            position: self.position,
            color: self.species.color.clone(),
            size: self.species.size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn species(kind: SpeciesKind, energy: i32) -> Arc<Species> {
        Arc::new(Species::new(kind, &kind.to_string(), energy, "#000000"))
    }

    fn animal(id: u64, kind: SpeciesKind, energy: i32) -> LifeForm {
        LifeForm::new(
            EntityId(id),
            species(kind, energy),
            Vector2D::new(1, 1),
            Gender::Male,
            false,
        )
    }

    fn plant(id: u64, energy: i32) -> LifeForm {
        LifeForm::new(
            EntityId(id),
            species(SpeciesKind::Plant, energy),
            Vector2D::new(1, 1),
            Gender::Neutral,
            false,
        )
    }

    #[test]
    fn test_creation_uses_species_energy() {
        let rabbit = animal(1, SpeciesKind::Herbivore, 20);
        assert_eq!(rabbit.energy(), 20);
        assert_eq!(rabbit.fertility(), 0);
        assert!(!rabbit.is_dead());
        assert!(!rabbit.is_poisoned());
        assert_eq!(rabbit.label(), "herbivore #1");
    }

    #[test]
    fn test_die_is_idempotent() {
        let mut rabbit = animal(1, SpeciesKind::Herbivore, 20);
        rabbit.die();
        rabbit.die();
        assert!(rabbit.is_dead());
    }

    #[test]
    fn test_poison_drain_sequence() {
        let mut rabbit = animal(1, SpeciesKind::Herbivore, 30);
        rabbit.become_poisoned();
        assert!(rabbit.is_poisoned());

        let mut drained = Vec::new();
        for _ in 0..10 {
            assert!(rabbit.is_poisoned());
            drained.push(rabbit.poisoned_energy_consumption());
        }

        assert_eq!(drained, vec![9, 8, 7, 6, 5, 4, 3, 2, 1, 0]);
        assert!(!rabbit.is_poisoned());
        assert_eq!(rabbit.poisoned_energy_consumption(), 0);
    }

    #[test]
    fn test_repoisoning_resets_drain() {
        let mut fox = animal(1, SpeciesKind::Carnivore, 30);
        fox.become_poisoned();
        fox.poisoned_energy_consumption();
        fox.poisoned_energy_consumption();

        fox.add_energy(70);
        fox.become_poisoned();
        assert_eq!(fox.poisoned_energy_consumption(), 30);
    }

    #[test]
    fn test_poison_drain_for_large_energy() {
        let mut rabbit = animal(1, SpeciesKind::Herbivore, 100_000_000);
        let mut nightshade = plant(2, 10).with_poisonous(true);
        assert_eq!(rabbit.eat(&mut nightshade), Ok(10));
        assert!(rabbit.is_poisoned());
        assert_eq!(rabbit.poisoned_energy_consumption(), 30_000_003);

        let mut hare = animal(3, SpeciesKind::Herbivore, i32::MAX);
        hare.become_poisoned();
        assert_eq!(hare.poisoned_energy_consumption(), 644_245_094);
    }

    #[test]
    fn test_energy_saturates_at_max() {
        let mut fox = animal(1, SpeciesKind::Carnivore, i32::MAX);
        let mut rabbit = animal(2, SpeciesKind::Herbivore, 10);
        assert_eq!(fox.eat(&mut rabbit), Ok(10));
        assert_eq!(fox.energy(), i32::MAX);

        fox.add_energy(i32::MAX);
        assert_eq!(fox.energy(), i32::MAX);
    }

    #[test]
    fn test_poison_never_negative() {
        let mut rabbit = animal(1, SpeciesKind::Herbivore, -10);
        rabbit.become_poisoned();
        assert_eq!(rabbit.poisoned_energy_consumption(), 0);
        assert!(!rabbit.is_poisoned());
    }

    #[test]
    fn test_move_costs() {
        let mut rabbit = animal(1, SpeciesKind::Herbivore, 20);

        assert_eq!(rabbit.move_to(Vector2D::new(1, 1)), Ok(0));
        assert_eq!(rabbit.energy(), 20);
        assert_eq!(rabbit.fertility(), 1);

        assert_eq!(rabbit.move_to(Vector2D::new(2, 1)), Ok(1));
        assert_eq!(rabbit.energy(), 19);
        assert_eq!(rabbit.position(), Vector2D::new(2, 1));
        assert_eq!(rabbit.fertility(), 2);
    }

    #[test]
    fn test_poisoned_move_adds_drain() {
        let mut rabbit = animal(1, SpeciesKind::Herbivore, 30);
        rabbit.become_poisoned();

        // Standing still still pays the drain
        assert_eq!(rabbit.move_to(Vector2D::new(1, 1)), Ok(9));
        assert_eq!(rabbit.move_to(Vector2D::new(2, 2)), Ok(1 + 8));
        assert_eq!(rabbit.energy(), 30 - 9 - 9);
    }

    #[test]
    fn test_plants_cannot_move() {
        let mut grass = plant(1, 10);
        assert!(matches!(
            grass.move_to(Vector2D::new(0, 0)),
            Err(ActionError::CannotMove(_))
        ));
        assert_eq!(grass.position(), Vector2D::new(1, 1));
    }

    #[test]
    fn test_carnivore_prey_too_strong() {
        let mut weak = animal(1, SpeciesKind::Carnivore, 30).with_energy(0);
        let mut strong = animal(2, SpeciesKind::Carnivore, 20);

        let result = weak.eat(&mut strong);
        assert!(matches!(result, Err(ActionError::PreyTooStrong { .. })));
        assert!(!strong.is_dead());
        assert_eq!(weak.energy(), 0);
    }

    #[test]
    fn test_carnivore_eats_equal_or_weaker() {
        let mut hunter = animal(1, SpeciesKind::Carnivore, 20);
        let mut equal = animal(2, SpeciesKind::Carnivore, 20);
        assert_eq!(hunter.eat(&mut equal), Ok(20));
        assert!(equal.is_dead());
        assert_eq!(hunter.energy(), 40);

        let mut weaker = animal(3, SpeciesKind::Carnivore, 5);
        assert_eq!(hunter.eat(&mut weaker), Ok(5));
    }

    #[test]
    fn test_carnivore_eats_stronger_herbivore() {
        let mut fox = animal(1, SpeciesKind::Carnivore, 5);
        let mut rabbit = animal(2, SpeciesKind::Herbivore, 50);
        assert_eq!(fox.eat(&mut rabbit), Ok(50));
    }

    #[test]
    fn test_carnivore_rejects_plants() {
        let mut fox = animal(1, SpeciesKind::Carnivore, 30);
        let mut grass = plant(2, 10);
        assert!(matches!(
            fox.eat(&mut grass),
            Err(ActionError::CannotEatThisFoodType { .. })
        ));
        assert!(!grass.is_dead());
    }

    #[test]
    fn test_herbivore_rejects_meat() {
        for energy in [0, 10, 1000] {
            let mut rabbit = animal(1, SpeciesKind::Herbivore, 500);
            let mut fox = animal(2, SpeciesKind::Carnivore, energy);
            let mut other = animal(3, SpeciesKind::Herbivore, energy);
            assert!(matches!(
                rabbit.eat(&mut fox),
                Err(ActionError::CannotEatThisFoodType { .. })
            ));
            assert!(matches!(
                rabbit.eat(&mut other),
                Err(ActionError::CannotEatThisFoodType { .. })
            ));
        }
    }

    #[test]
    fn test_eating_poisonous_food_poisons() {
        let mut rabbit = animal(1, SpeciesKind::Herbivore, 20);
        let mut grass = plant(2, 10).with_poisonous(true);

        assert_eq!(rabbit.eat(&mut grass), Ok(10));
        assert!(grass.is_dead());
        assert!(rabbit.is_poisoned());
        // Drain is sized after the meal: floor(30 * 0.3)
        assert_eq!(rabbit.poisoned_energy_consumption(), 9);
    }

    #[test]
    fn test_dead_prey_cannot_be_eaten() {
        let mut rabbit = animal(1, SpeciesKind::Herbivore, 20);
        let mut grass = plant(2, 10);
        grass.die();
        assert!(matches!(rabbit.eat(&mut grass), Err(ActionError::Dead(_))));
        assert_eq!(rabbit.energy(), 20);
    }

    #[test]
    fn test_starvation() {
        let mut rabbit = animal(1, SpeciesKind::Herbivore, 1);
        assert!(!rabbit.starve_if_exhausted());
        rabbit.move_to(Vector2D::new(0, 0)).unwrap();
        assert!(rabbit.starve_if_exhausted());
        assert!(rabbit.is_dead());
        assert!(!rabbit.starve_if_exhausted());
    }

    #[test]
    fn test_spawn_rolls_gender_by_kind() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let rules = RuleConfig {
            poisonous_probability: 1.0,
            ..Default::default()
        };

        let grass = LifeForm::spawn(
            EntityId(1),
            species(SpeciesKind::Plant, 10),
            Vector2D::new(0, 0),
            &rules,
            &mut rng,
        );
        assert_eq!(grass.gender(), Gender::Neutral);
        assert!(grass.is_poisonous());

        for id in 2..20 {
            let rabbit = LifeForm::spawn(
                EntityId(id),
                species(SpeciesKind::Herbivore, 10),
                Vector2D::new(0, 0),
                &rules,
                &mut rng,
            );
            assert_ne!(rabbit.gender(), Gender::Neutral);
        }
    }

    #[test]
    fn test_view_exposes_render_data() {
        let rabbit = animal(4, SpeciesKind::Herbivore, 20);
        let view = rabbit.view();
        assert_eq!(view.id, EntityId(4));
        assert_eq!(view.position, Vector2D::new(1, 1));
        assert_eq!(view.color, "#000000");
        assert_eq!(view.size, 1);
    }
}
