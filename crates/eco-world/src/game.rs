//! Turn loop driving the board.

use crate::board::Board;
use crate::roster::Roster;
use crate::species::policy;
use eco_core::{
    EntityId, EntityView, Error, Gender, PopulationStats, Result, SimConfig, SpeciesKind,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, event, info, instrument, trace, Level};

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "kind", rename_all = "snake_case")]
pub enum StopReason {
    TickLimit,
    /// Nothing left on the board
    Extinction,
    /// Only plants left
    NoAnimals,
    /// One species family has the board to itself
    SingleKind(SpeciesKind),
    /// External stop signal
    Interrupted,
}

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSummary {
    pub tick: u64,
    /// Entities on the board after cleanup
    pub population: usize,
    pub births: u64,
    pub meals: u64,
    pub deaths: u64,
    pub starved: u64,
    pub spawned: u64,
    /// Refused actions that were logged and skipped
    pub skipped_actions: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub stop_reason: StopReason,
    pub stats: PopulationStats,
}

pub struct Game {
    board: Board,
    roster: Roster,
    config: SimConfig,
    rng: ChaCha8Rng,
    tick: u64,
    stats: PopulationStats,
}

impl Game {
    /// Build the board and place the configured initial population
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut board = Board::from_config(&config.board)?;
        let roster = Roster::from_config(&config.species)?;
        let mut stats = PopulationStats::new();

        for species in &config.species {
            stats.register(&species.name);
            for _ in 0..species.count {
                roster.spawn_on(&mut board, &species.name, &config.rules, &mut rng)?;
                stats.record_initial(&species.name);
            }
        }

        info!(
            event = "population_placed",
            seed = config.seed,
            rows = config.board.rows,
            columns = config.board.columns,
            population = board.len(),
            "Initial population placed"
        );

        Ok(Self {
            board,
            roster,
            config,
            rng,
            tick: 0,
            stats,
        })
    }

    /// Run on a board that was populated by hand
    pub fn with_board(config: SimConfig, board: Board) -> Result<Self> {
        config.validate()?;

        let roster = Roster::from_config(&config.species)?;
        let mut stats = PopulationStats::new();
        for species in roster.iter() {
            stats.register(&species.name);
        }
        for entity in board.entities().filter(|e| !e.is_dead()) {
            stats.record_initial(entity.name());
        }

        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            board,
            roster,
            config,
            tick: 0,
            stats,
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn stats(&self) -> &PopulationStats {
        &self.stats
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn frame(&self) -> Vec<EntityView> {
        self.board.frame()
    }

    pub fn is_species_extinct(&self, name: &str) -> bool {
        self.board.is_species_extinct(name)
    }

    /// Run until a stop condition holds
    pub fn run(&mut self) -> Result<RunSummary> {
        self.run_until(|| false)
    }

    /// Run until a stop condition holds or `should_stop` returns true.
    ///
    /// `should_stop` is polled between ticks only.
    #[instrument(skip_all, fields(seed = self.config.seed, max_ticks = self.config.max_ticks))]
    pub fn run_until(&mut self, mut should_stop: impl FnMut() -> bool) -> Result<RunSummary> {
        info!("Starting simulation");

        let stop_reason = loop {
            if let Some(reason) = self.stop_reason() {
                break reason;
            }
            if should_stop() {
                break StopReason::Interrupted;
            }
            self.step()?;
        };

        let summary = self.finish(stop_reason);
        self.emit_run_summary(&summary);
        Ok(summary)
    }

    /// Stop condition for the current state, if any
    pub fn stop_reason(&self) -> Option<StopReason> {
        let Some(first) = self.board.entities().find(|e| !e.is_dead()) else {
            return Some(StopReason::Extinction);
        };

        if self.board.animal_ids().is_empty() {
            return Some(StopReason::NoAnimals);
        }

        if self.config.stop_when_single_kind
            && !self.board.contains_species_other_than(Some(first.kind()))
        {
            return Some(StopReason::SingleKind(first.kind()));
        }

        if self.config.max_ticks > 0 && self.tick >= self.config.max_ticks {
            return Some(StopReason::TickLimit);
        }

        None
    }

    /// Advance one tick.
    ///
    /// Animals act in id order from a snapshot taken before anyone moves, so
    /// offspring born this tick wait for the next one.
    pub fn step(&mut self) -> Result<TickSummary> {
        self.tick += 1;
        let mut summary = TickSummary {
            tick: self.tick,
            ..Default::default()
        };

        for id in self.board.animal_ids() {
            self.act(id, &mut summary)?;
        }

        summary.spawned = self.spawn_plants()?;
        summary.starved = self.board.mark_starved() as u64;

        for entity in self.board.cleanup() {
            trace!(
                event = "death",
                entity_id = %entity.id(),
                species = entity.name(),
                energy = entity.energy(),
                tick = self.tick,
                "Entity removed"
            );
            self.stats.record_death(entity.name());
            summary.deaths += 1;
        }
        summary.population = self.board.len();

        if self.config.log_interval > 0 && self.tick % self.config.log_interval == 0 {
            self.emit_population_metrics(&summary);
        }

        Ok(summary)
    }

    fn act(&mut self, id: EntityId, summary: &mut TickSummary) -> Result<()> {
        // Eaten earlier this tick
        let Some(animal) = self.board.get(id).filter(|a| !a.is_dead()) else {
            return Ok(());
        };

        let kind = animal.kind();
        let origin = animal.position();
        let radius = self.config.rules.scan_radius(kind);
        let target = {
            let candidates = self.board.neighbor_entities(animal, radius);
            policy(kind)
                .choose_target(animal, &candidates)
                .map(|t| (t.id(), t.position()))
        };

        let destination = match target {
            Some((_, position)) => origin.step_toward(&position),
            None => self.board.random_adjacent_cell(origin, &mut self.rng),
        };

        let moved = self.board.move_entity(id, destination);
        if absorb(self.tick, id, "move", moved, summary)?.is_none() {
            return Ok(());
        }

        if let Some((prey_id, prey_position)) = target {
            if prey_position == destination {
                let fed = self.board.feed(id, prey_id);
                if let Some(gained) = absorb(self.tick, id, "eat", fed, summary)? {
                    trace!(
                        event = "meal",
                        entity_id = %id,
                        prey_id = %prey_id,
                        gained = gained,
                        tick = self.tick,
                        "Entity ate"
                    );
                    summary.meals += 1;
                }
            }
        }

        if kind == SpeciesKind::Herbivore {
            self.try_reproduce(id, summary)?;
        }

        Ok(())
    }

    /// Males breed with an adjacent female of their own species
    fn try_reproduce(&mut self, id: EntityId, summary: &mut TickSummary) -> Result<()> {
        let Some(parent) = self.board.get(id) else {
            return Ok(());
        };
        if parent.is_dead() || parent.gender() != Gender::Male {
            return Ok(());
        }

        let partner = self
            .board
            .neighbor_entities(parent, 1)
            .into_iter()
            .find(|c| c.name() == parent.name() && c.gender() == Gender::Female)
            .map(|c| c.id());
        let Some(partner) = partner else {
            return Ok(());
        };

        let bred = self
            .board
            .reproduce(id, Some(partner), &self.config.rules, &mut self.rng);
        if let Some(offspring) = absorb(self.tick, id, "reproduce", bred, summary)? {
            if let Some(child) = self.board.get(offspring) {
                debug!(
                    event = "birth",
                    parent_id = %id,
                    partner_id = %partner,
                    offspring_id = %offspring,
                    species = child.name(),
                    position_x = child.position().x,
                    position_y = child.position().y,
                    tick = self.tick,
                    "Offspring born"
                );
                self.stats.record_birth(child.name());
            }
            summary.births += 1;
        }

        Ok(())
    }

    /// Periodic plant spawn; returns how many were added
    fn spawn_plants(&mut self) -> Result<u64> {
        let rules = &self.config.rules;
        if rules.plant_spawn_interval == 0 || self.tick % rules.plant_spawn_interval != 0 {
            return Ok(0);
        }

        let mut spawned = 0;
        for species in self.roster.of_kind(SpeciesKind::Plant) {
            for _ in 0..rules.plant_spawn_count {
                if self.board.len() >= rules.max_population {
                    break;
                }
                self.roster
                    .spawn_on(&mut self.board, &species.name, rules, &mut self.rng)?;
                self.stats.record_spawn(&species.name);
                spawned += 1;
            }
        }

        Ok(spawned)
    }

    fn finish(&mut self, stop_reason: StopReason) -> RunSummary {
        let population = self.board.population_by_species();
        let names: Vec<String> = self
            .stats
            .species
            .keys()
            .chain(population.keys())
            .cloned()
            .collect();
        for name in names {
            let alive = population.get(&name).copied().unwrap_or(0);
            self.stats.set_survivors(&name, alive as u64);
        }

        RunSummary {
            ticks: self.tick,
            stop_reason,
            stats: self.stats.clone(),
        }
    }

    fn emit_population_metrics(&self, summary: &TickSummary) {
        let population = self.board.len() as i64;
        let total_energy: i64 = self.board.entities().map(|e| i64::from(e.energy())).sum();
        let avg_energy = if population == 0 {
            0
        } else {
            total_energy / population
        };
        let poisoned = self.board.entities().filter(|e| e.is_poisoned()).count();
        let by_species: BTreeMap<String, usize> = self.board.population_by_species();

        info!(
            event = "population_metrics",
            tick = self.tick,
            total_population = summary.population,
            births = summary.births,
            deaths = summary.deaths,
            spawned = summary.spawned,
            avg_energy = avg_energy,
            poisoned = poisoned,
            species = ?by_species,
            "Population metrics snapshot"
        );

        event!(
            Level::DEBUG,
            gauge_name = "population_total",
            gauge_value = summary.population,
            tick = self.tick,
            "Population gauge"
        );
    }

    fn emit_run_summary(&self, summary: &RunSummary) {
        info!(
            event = "run_complete",
            ticks = summary.ticks,
            stop_reason = ?summary.stop_reason,
            total_born = summary.stats.total_born(),
            total_died = summary.stats.total_died(),
            "Simulation complete"
        );

        for (name, stats) in &summary.stats.species {
            info!(
                event = "species_summary",
                species = %name,
                initial = stats.initial,
                survivors = stats.survivors,
                born = stats.born,
                died = stats.died,
                spawned = stats.spawned,
                "Species statistics"
            );
        }
    }
}

/// Turn a refused action into a logged skip; other errors pass through
fn absorb<T>(
    tick: u64,
    id: EntityId,
    action: &'static str,
    result: Result<T>,
    summary: &mut TickSummary,
) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(Error::Action(reason)) => {
            debug!(
                event = "action_skipped",
                entity_id = %id,
                action = action,
                tick = tick,
                reason = %reason,
                "Action skipped"
            );
            summary.skipped_actions += 1;
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifeform::LifeForm;
    use crate::species::Species;
    use eco_core::{RuleConfig, SpeciesConfig, Vector2D};
    use proptest::prelude::*;
    use std::sync::Arc;

    fn quiet_rules() -> RuleConfig {
        RuleConfig {
            poisonous_probability: 0.0,
            herbivore_min_fertility: 1,
            plant_spawn_interval: 0,
            ..Default::default()
        }
    }

    fn species_configs() -> Vec<SpeciesConfig> {
        vec![
            SpeciesConfig::new(SpeciesKind::Plant, "grass", 10, "green"),
            SpeciesConfig::new(SpeciesKind::Herbivore, "rabbit", 20, "tan"),
            SpeciesConfig::new(SpeciesKind::Carnivore, "fox", 30, "orange"),
        ]
    }

    fn hand_config() -> SimConfig {
        SimConfig {
            rules: quiet_rules(),
            ..SimConfig::default()
        }
        .with_board(3, 3)
        .with_species(species_configs())
    }

    fn put(board: &mut Board, name: &str, kind: SpeciesKind, energy: i32, pos: (i32, i32), gender: Gender) -> EntityId {
        let id = board.issue_id();
        let species = Arc::new(Species::new(kind, name, energy, "grey"));
        let entity = LifeForm::new(id, species, Vector2D::ZERO, gender, false);
        board.add_entity(entity, Vector2D::new(pos.0, pos.1)).unwrap()
    }

    #[test]
    fn test_game_creation_places_population() {
        let game = Game::new(SimConfig::default().with_seed(42)).unwrap();
        assert_eq!(game.board().len(), 86);
        assert_eq!(game.board().occupied_positions().count(), 86);
        assert_eq!(game.stats().get("rabbit").unwrap().initial, 20);
        assert_eq!(game.stats().get("fox").unwrap().initial, 6);
        assert_eq!(game.tick(), 0);
    }

    #[test]
    fn test_game_rejects_invalid_config() {
        let config = SimConfig::default().with_board(2, 2);
        assert!(Game::new(config).is_err());
    }

    #[test]
    fn test_herbivore_eats_and_breeds() {
        let mut board = Board::new(3, 3).unwrap();
        let father = put(&mut board, "rabbit", SpeciesKind::Herbivore, 20, (1, 1), Gender::Male);
        let _mother = put(&mut board, "rabbit", SpeciesKind::Herbivore, 20, (1, 2), Gender::Female);
        let grass = put(&mut board, "grass", SpeciesKind::Plant, 10, (1, 1), Gender::Neutral);

        let mut game = Game::with_board(hand_config(), board).unwrap();
        let summary = game.step().unwrap();

        assert_eq!(summary.meals, 1);
        assert_eq!(summary.births, 1);
        assert_eq!(summary.deaths, 1);
        assert!(game.board().get(grass).is_none());
        assert_eq!(game.board().get(father).unwrap().energy(), 30);
        assert_eq!(game.board().get(father).unwrap().fertility(), 0);

        // The newborn has not acted yet
        let child = game.board().entities().max_by_key(|e| e.id()).unwrap();
        assert_eq!(child.fertility(), 0);
        assert_eq!(child.energy(), 20);
        assert_eq!(child.position().chebyshev_distance(&Vector2D::new(1, 1)), 1);

        assert_eq!(game.stats().get("rabbit").unwrap().born, 1);
        assert_eq!(game.stats().get("grass").unwrap().died, 1);
    }

    #[test]
    fn test_carnivore_hunts_and_wins() {
        let mut board = Board::new(3, 3).unwrap();
        let fox = put(&mut board, "fox", SpeciesKind::Carnivore, 30, (0, 0), Gender::Male);
        let rabbit = put(&mut board, "rabbit", SpeciesKind::Herbivore, 20, (1, 1), Gender::Female);

        let mut game = Game::with_board(hand_config(), board).unwrap();
        let summary = game.step().unwrap();

        assert_eq!(summary.meals, 1);
        assert!(game.board().get(rabbit).is_none());
        let fox = game.board().get(fox).unwrap();
        assert_eq!(fox.position(), Vector2D::new(1, 1));
        assert_eq!(fox.energy(), 30 - 1 + 20);
        assert_eq!(
            game.stop_reason(),
            Some(StopReason::SingleKind(SpeciesKind::Carnivore))
        );
    }

    #[test]
    fn test_prey_too_strong_is_skipped() {
        let mut board = Board::new(3, 3).unwrap();
        let weak = put(&mut board, "fox", SpeciesKind::Carnivore, 5, (0, 0), Gender::Male);
        let strong = put(&mut board, "fox", SpeciesKind::Carnivore, 50, (1, 1), Gender::Male);

        let mut game = Game::with_board(hand_config(), board).unwrap();
        let summary = game.step().unwrap();

        // The weak fox bounces off, then the strong one eats it
        assert!(summary.skipped_actions >= 1);
        assert!(game.board().get(weak).is_none());
        assert_eq!(game.board().get(strong).unwrap().energy(), 50 + 4);
    }

    #[test]
    fn test_plants_spawn_on_interval() {
        let mut config = hand_config().with_board(5, 5);
        config.rules.plant_spawn_interval = 2;
        config.rules.plant_spawn_count = 3;
        let mut game = Game::with_board(config, Board::new(5, 5).unwrap()).unwrap();

        assert_eq!(game.step().unwrap().spawned, 0);
        let summary = game.step().unwrap();
        assert_eq!(summary.spawned, 3);
        assert_eq!(game.board().count_kind(SpeciesKind::Plant), 3);
        assert_eq!(game.stats().get("grass").unwrap().spawned, 3);
    }

    #[test]
    fn test_stop_reasons() {
        let empty = Game::with_board(hand_config(), Board::new(3, 3).unwrap()).unwrap();
        assert_eq!(empty.stop_reason(), Some(StopReason::Extinction));

        let mut board = Board::new(3, 3).unwrap();
        put(&mut board, "grass", SpeciesKind::Plant, 10, (0, 0), Gender::Neutral);
        let plants = Game::with_board(hand_config(), board).unwrap();
        assert_eq!(plants.stop_reason(), Some(StopReason::NoAnimals));
    }

    #[test]
    fn test_run_stops_at_tick_limit() {
        let mut config = SimConfig::default().with_seed(11).with_max_ticks(5);
        config.stop_when_single_kind = false;
        let mut game = Game::new(config).unwrap();

        let summary = game.run().unwrap();
        assert_eq!(summary.stop_reason, StopReason::TickLimit);
        assert_eq!(summary.ticks, 5);
    }

    #[test]
    fn test_run_until_interrupted() {
        let config = SimConfig::default().with_seed(3).with_max_ticks(0);
        let mut game = Game::new(config).unwrap();

        let mut polls = 0;
        let summary = game
            .run_until(|| {
                polls += 1;
                polls > 3
            })
            .unwrap();
        assert_eq!(summary.stop_reason, StopReason::Interrupted);
        assert_eq!(game.tick(), 3);
    }

    #[test]
    fn test_stats_balance_after_run() {
        let config = SimConfig::default().with_seed(8).with_max_ticks(60);
        let mut game = Game::new(config).unwrap();
        let summary = game.run().unwrap();

        for (name, stats) in &summary.stats.species {
            assert_eq!(
                stats.expected_alive(),
                stats.survivors as i64,
                "species {} does not balance",
                name
            );
        }
        let report = serde_json::to_string(&summary).unwrap();
        assert!(report.contains("stop_reason"));
    }

    #[test]
    fn test_same_seed_same_world() {
        let config = SimConfig::default().with_seed(99).with_max_ticks(10);
        let mut a = Game::new(config.clone()).unwrap();
        let mut b = Game::new(config).unwrap();
        for _ in 0..10 {
            assert_eq!(a.step().unwrap(), b.step().unwrap());
        }
        assert_eq!(a.frame(), b.frame());
    }

    #[test]
    fn test_high_energy_species_run() {
        let mut config = SimConfig::default()
            .with_seed(5)
            .with_max_ticks(30)
            .with_species(vec![
                SpeciesConfig::new(SpeciesKind::Plant, "grass", 200_000_000, "green").with_count(20),
                SpeciesConfig::new(SpeciesKind::Herbivore, "rabbit", 100_000_000, "tan").with_count(6),
                SpeciesConfig::new(SpeciesKind::Carnivore, "fox", i32::MAX, "orange").with_count(3),
            ]);
        config.log_interval = 1;
        config.stop_when_single_kind = false;
        config.rules.poisonous_probability = 0.5;
        let mut game = Game::new(config).unwrap();

        let summary = game.run().unwrap();
        assert!(summary.ticks > 0);
        assert!(game.board().entities().all(|e| e.energy() >= 0));
    }

    #[test]
    fn test_unbounded_scan_radius() {
        let mut config = SimConfig::default().with_seed(4).with_max_ticks(3);
        config.rules.carnivore_scan_radius = i32::MAX;
        config.rules.herbivore_scan_radius = i32::MAX;
        let mut game = Game::new(config).unwrap();

        let summary = game.step().unwrap();
        assert_eq!(summary.tick, 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_entities_stay_on_board(
            seed in any::<u64>(),
            rows in 3i32..8,
            columns in 3i32..8,
        ) {
            let config = SimConfig::default()
                .with_seed(seed)
                .with_board(rows, columns)
                .with_species(vec![
                    SpeciesConfig::new(SpeciesKind::Plant, "grass", 10, "green").with_count(4),
                    SpeciesConfig::new(SpeciesKind::Herbivore, "rabbit", 20, "tan").with_count(3),
                    SpeciesConfig::new(SpeciesKind::Carnivore, "fox", 30, "orange").with_count(2),
                ]);
            let mut game = Game::new(config).unwrap();

            for _ in 0..25 {
                game.step().unwrap();
                for view in game.frame() {
                    prop_assert!(view.position.within(columns, rows));
                }
                prop_assert!(game.board().entities().all(|e| !e.is_dead()));
            }
        }
    }
}
