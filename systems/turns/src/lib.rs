#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Round scheduler that drives combat and movement for every unit.

use std::{collections::BTreeSet, ops::ControlFlow};

use bandits_core::{BattleState, CellCoord, Command, Event, Faction, RejectionReason};
use bandits_system_combat::Combat;
use bandits_system_movement::Movement;
use bandits_world::{self as world, query, World};
use thiserror::Error;

/// Failures that stop the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum TurnError {
    /// The world refused a command the scheduler produced.
    #[error("world rejected {command:?}: {reason:?}")]
    CommandRejected {
        /// Command that was refused.
        command: Command,
        /// Reason reported by the world.
        reason: RejectionReason,
    },
    /// The battle was still running after the configured number of rounds.
    #[error("battle still running after {limit} rounds")]
    RoundLimitExceeded {
        /// Round cap that was exceeded.
        limit: u32,
    },
}

/// Result of a single tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Every unit acted and the round was counted.
    RoundCompleted {
        /// Number of full rounds fought so far.
        completed_rounds: u32,
    },
    /// An observer stopped the round part-way; it was not counted.
    Interrupted {
        /// Number of full rounds fought before the interrupted one.
        completed_rounds: u32,
    },
    /// Combat is over.
    Finished {
        /// Surviving faction, if any.
        winner: Option<Faction>,
        /// Number of full rounds fought.
        completed_rounds: u32,
    },
}

/// Summary of a finished battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BattleOutcome {
    /// Surviving faction, if any.
    pub winner: Option<Faction>,
    /// Number of full rounds fought.
    pub completed_rounds: u32,
    /// Sum of the hit points of every surviving unit.
    pub remaining_health: u32,
}

impl BattleOutcome {
    /// Captures the outcome of the battle held by `world`.
    #[must_use]
    pub fn from_world(world: &World) -> Self {
        let winner = match query::battle_state(world) {
            BattleState::Finished { winner } => winner,
            BattleState::Running => None,
        };
        Self {
            winner,
            completed_rounds: query::completed_rounds(world),
            remaining_health: query::total_health(world),
        }
    }
}

/// Hooks invoked while a battle is played.
///
/// Every method has an empty default, so observers only implement what they
/// need.
pub trait BattleObserver {
    /// Called right before the unit on `actor` takes its turn.
    fn before_turn(&mut self, _world: &World, _actor: CellCoord) {}

    /// Called with the events of a single turn once it is over. Returning
    /// [`ControlFlow::Break`] abandons the rest of the round.
    fn after_turn(&mut self, _world: &World, _events: &[Event]) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called with every event of a tick once it is over.
    fn after_tick(&mut self, _world: &World, _events: &[Event]) {}
}

struct Silent;

impl BattleObserver for Silent {}

struct TickFn<F>(F);

impl<F> BattleObserver for TickFn<F>
where
    F: FnMut(&World, &[Event]),
{
    fn after_tick(&mut self, world: &World, events: &[Event]) {
        (self.0)(world, events);
    }
}

/// Scheduler that advances a battle one round at a time.
#[derive(Debug, Default)]
pub struct Turns {
    combat: Combat,
    movement: Movement,
    commands: Vec<Command>,
    order: Vec<CellCoord>,
    acted: BTreeSet<CellCoord>,
}

impl Turns {
    /// Creates a scheduler with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plays one round.
    ///
    /// Units act in the reading order they had when the round began. The
    /// battle ends the moment a unit starts its turn with no enemy left; that
    /// round is not counted.
    pub fn tick(&mut self, world: &mut World, events: &mut Vec<Event>) -> Result<TickOutcome, TurnError> {
        self.tick_observed(world, events, &mut Silent)
    }

    /// Plays one round like [`Turns::tick`], reporting every turn to
    /// `observer`.
    ///
    /// When [`BattleObserver::after_turn`] breaks, the remaining units do not
    /// act and [`TickOutcome::Interrupted`] is returned.
    pub fn tick_observed<O>(
        &mut self,
        world: &mut World,
        events: &mut Vec<Event>,
        observer: &mut O,
    ) -> Result<TickOutcome, TurnError>
    where
        O: BattleObserver + ?Sized,
    {
        if let BattleState::Finished { winner } = query::battle_state(world) {
            return Ok(TickOutcome::Finished {
                winner,
                completed_rounds: query::completed_rounds(world),
            });
        }

        let elves = query::count(world, Faction::Elf);
        let goblins = query::count(world, Faction::Goblin);
        if elves == 0 || goblins == 0 {
            let winner = if elves > 0 {
                Some(Faction::Elf)
            } else if goblins > 0 {
                Some(Faction::Goblin)
            } else {
                None
            };
            return conclude(world, winner, events);
        }

        apply_checked(world, Command::BeginRound, events)?;
        self.order.clear();
        self.order
            .extend(query::tile_view(world).units().map(|(cell, _)| cell));
        self.acted.clear();

        for index in 0..self.order.len() {
            let cell = self.order[index];
            if self.acted.contains(&cell) {
                continue;
            }
            let Some(unit) = query::tile_view(world).unit(cell) else {
                continue;
            };

            if query::count(world, unit.faction().opponent()) == 0 {
                return conclude(world, Some(unit.faction()), events);
            }

            tracing::debug!("{:?} at {:?} takes its turn", unit.faction(), cell);
            observer.before_turn(world, cell);
            let start = events.len();
            let resting = self.take_turn(world, cell, events)?;
            let _ = self.acted.insert(resting);
            if observer.after_turn(world, &events[start..]).is_break() {
                tracing::debug!("round interrupted after {:?} acted", cell);
                return Ok(TickOutcome::Interrupted {
                    completed_rounds: query::completed_rounds(world),
                });
            }
        }

        apply_checked(world, Command::CompleteRound, events)?;
        let completed_rounds = query::completed_rounds(world);
        tracing::debug!("round {} completed", completed_rounds);
        Ok(TickOutcome::RoundCompleted { completed_rounds })
    }

    /// Ticks until the battle ends.
    ///
    /// `observer` sees the world and the events after every tick. With a
    /// `limit`, a battle that completes more rounds than allowed fails with
    /// [`TurnError::RoundLimitExceeded`].
    pub fn run<F>(
        &mut self,
        world: &mut World,
        limit: Option<u32>,
        observer: F,
    ) -> Result<BattleOutcome, TurnError>
    where
        F: FnMut(&World, &[Event]),
    {
        self.run_observed(world, limit, &mut TickFn(observer))
    }

    /// Ticks until the battle ends or `observer` interrupts a round.
    ///
    /// The round limit applies as in [`Turns::run`]. An interrupted battle is
    /// left mid-round and its outcome describes that state.
    pub fn run_observed<O>(
        &mut self,
        world: &mut World,
        limit: Option<u32>,
        observer: &mut O,
    ) -> Result<BattleOutcome, TurnError>
    where
        O: BattleObserver + ?Sized,
    {
        let mut events = Vec::new();
        loop {
            events.clear();
            let outcome = self.tick_observed(world, &mut events, observer)?;
            observer.after_tick(world, &events);

            match outcome {
                TickOutcome::Finished { .. } | TickOutcome::Interrupted { .. } => {
                    return Ok(BattleOutcome::from_world(world))
                }
                TickOutcome::RoundCompleted { completed_rounds } => {
                    if let Some(limit) = limit {
                        if completed_rounds > limit {
                            return Err(TurnError::RoundLimitExceeded { limit });
                        }
                    }
                }
            }
        }
    }

    /// Lets the unit on `actor` attack an adjacent enemy, if any.
    ///
    /// Returns whether an attack happened.
    pub fn resolve_combat(
        &mut self,
        world: &mut World,
        actor: CellCoord,
        events: &mut Vec<Event>,
    ) -> Result<bool, TurnError> {
        self.commands.clear();
        if !self
            .combat
            .handle(query::tile_view(world), actor, &mut self.commands)
        {
            return Ok(false);
        }
        for index in 0..self.commands.len() {
            apply_checked(world, self.commands[index], events)?;
        }
        Ok(true)
    }

    /// Attack, otherwise move and attack from the new cell. Returns the cell
    /// the unit ends its turn on.
    fn take_turn(
        &mut self,
        world: &mut World,
        actor: CellCoord,
        events: &mut Vec<Event>,
    ) -> Result<CellCoord, TurnError> {
        if self.resolve_combat(world, actor, events)? {
            return Ok(actor);
        }

        self.commands.clear();
        if !self
            .movement
            .handle(query::tile_view(world), actor, &mut self.commands)
        {
            return Ok(actor);
        }

        let (columns, rows) = query::grid(world).bounds();
        let mut resting = actor;
        for index in 0..self.commands.len() {
            let command = self.commands[index];
            apply_checked(world, command, events)?;
            if let Command::StepUnit { from, direction } = command {
                resting = from.step(direction, columns, rows).unwrap_or(from);
            }
        }

        let _ = self.resolve_combat(world, resting, events)?;
        Ok(resting)
    }
}

fn conclude(
    world: &mut World,
    winner: Option<Faction>,
    events: &mut Vec<Event>,
) -> Result<TickOutcome, TurnError> {
    apply_checked(world, Command::ConcludeBattle { winner }, events)?;
    let completed_rounds = query::completed_rounds(world);
    tracing::info!(
        "combat ends after {} full rounds, winner {:?}",
        completed_rounds,
        winner
    );
    Ok(TickOutcome::Finished {
        winner,
        completed_rounds,
    })
}

fn apply_checked(world: &mut World, command: Command, events: &mut Vec<Event>) -> Result<(), TurnError> {
    let start = events.len();
    world::apply(world, command, events);
    for event in &events[start..] {
        if let Event::CommandRejected { command, reason } = event {
            return Err(TurnError::CommandRejected {
                command: *command,
                reason: *reason,
            });
        }
        tracing::trace!("{:?}", event);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandits_core::BattleConfig;

    fn world(text: &str) -> World {
        World::from_text(text, BattleConfig::default()).expect("map parses")
    }

    #[test]
    fn battle_without_enemies_ends_before_any_round() {
        let mut world = world("#####\n#E.E#\n#####\n");
        let mut turns = Turns::new();
        let mut events = Vec::new();

        let outcome = turns.tick(&mut world, &mut events).expect("tick");

        assert_eq!(
            outcome,
            TickOutcome::Finished {
                winner: Some(Faction::Elf),
                completed_rounds: 0,
            }
        );
        assert_eq!(
            events,
            vec![Event::BattleFinished {
                winner: Some(Faction::Elf),
                completed_rounds: 0,
            }]
        );
    }

    #[test]
    fn empty_map_has_no_winner() {
        let mut world = world("#...#\n");
        let outcome = Turns::new()
            .run(&mut world, None, |_, _| {})
            .expect("battle ends");

        assert_eq!(
            outcome,
            BattleOutcome {
                winner: None,
                completed_rounds: 0,
                remaining_health: 0,
            }
        );
    }

    #[test]
    fn ticking_a_finished_battle_changes_nothing() {
        let mut world = world("#######\n#E...G#\n#######\n");
        let mut turns = Turns::new();
        let outcome = turns.run(&mut world, None, |_, _| {}).expect("battle ends");
        let before = world.clone();

        let mut events = Vec::new();
        let again = turns.tick(&mut world, &mut events).expect("tick");

        assert!(events.is_empty());
        assert_eq!(world, before);
        assert_eq!(
            again,
            TickOutcome::Finished {
                winner: outcome.winner,
                completed_rounds: outcome.completed_rounds,
            }
        );
    }

    #[test]
    fn unit_attacks_instead_of_moving_when_enemy_is_adjacent() {
        let mut world = world("######\n#.EG.#\n######\n");
        let mut turns = Turns::new();
        let mut events = Vec::new();

        let outcome = turns.tick(&mut world, &mut events).expect("tick");

        assert_eq!(outcome, TickOutcome::RoundCompleted { completed_rounds: 1 });
        assert!(events
            .iter()
            .all(|event| !matches!(event, Event::UnitMoved { .. })));
        let attacks = events
            .iter()
            .filter(|event| matches!(event, Event::UnitAttacked { .. }))
            .count();
        assert_eq!(attacks, 2);
    }

    #[test]
    fn unit_that_steps_into_range_attacks_in_the_same_turn() {
        let mut world = world("######\n#E.G.#\n######\n");
        let mut turns = Turns::new();
        let mut events = Vec::new();

        let _ = turns.tick(&mut world, &mut events).expect("tick");

        assert_eq!(
            &events[1..3],
            &[
                Event::UnitMoved {
                    faction: Faction::Elf,
                    from: CellCoord::new(1, 1),
                    to: CellCoord::new(2, 1),
                },
                Event::UnitAttacked {
                    attacker: CellCoord::new(2, 1),
                    faction: Faction::Elf,
                    target: CellCoord::new(3, 1),
                    damage: 3,
                    remaining: bandits_core::Health::new(197),
                },
            ]
        );
    }

    #[test]
    fn unit_moving_later_in_reading_order_acts_once() {
        // The Goblin kills the Elf below it, the other Elf steps into the
        // vacated cell and strikes. Its new cell comes up later in the
        // round and must be skipped.
        let config = BattleConfig {
            goblin_power: 200,
            ..BattleConfig::default()
        };
        let mut world = World::from_text("#####\n###G#\n#.EE#\n#####\n", config).expect("map");
        let mut turns = Turns::new();
        let mut events = Vec::new();

        let _ = turns.tick(&mut world, &mut events).expect("tick");

        let moves = events
            .iter()
            .filter(|event| matches!(event, Event::UnitMoved { .. }))
            .count();
        let elf_attacks = events
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    Event::UnitAttacked {
                        faction: Faction::Elf,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(moves, 1);
        assert_eq!(elf_attacks, 1);
    }

    #[derive(Default)]
    struct Recorder {
        actors: Vec<CellCoord>,
        turns: usize,
        ticks: usize,
        stop_on_death: bool,
    }

    impl BattleObserver for Recorder {
        fn before_turn(&mut self, _world: &World, actor: CellCoord) {
            self.actors.push(actor);
        }

        fn after_turn(&mut self, _world: &World, events: &[Event]) -> ControlFlow<()> {
            self.turns += 1;
            let died = events
                .iter()
                .any(|event| matches!(event, Event::UnitDied { .. }));
            if self.stop_on_death && died {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        }

        fn after_tick(&mut self, _world: &World, _events: &[Event]) {
            self.ticks += 1;
        }
    }

    #[test]
    fn observer_sees_each_turn_in_reading_order() {
        let mut world = world("#######\n#.G...#\n#...EG#\n#.#.#G#\n#..G#E#\n#.....#\n#######\n");
        let mut recorder = Recorder::default();
        let mut events = Vec::new();

        let outcome = Turns::new()
            .tick_observed(&mut world, &mut events, &mut recorder)
            .expect("tick");

        assert_eq!(outcome, TickOutcome::RoundCompleted { completed_rounds: 1 });
        assert_eq!(
            recorder.actors,
            vec![
                CellCoord::new(2, 1),
                CellCoord::new(4, 2),
                CellCoord::new(5, 2),
                CellCoord::new(5, 3),
                CellCoord::new(3, 4),
                CellCoord::new(5, 4),
            ]
        );
        assert_eq!(recorder.turns, 6);
        assert_eq!(recorder.ticks, 0);
    }

    #[test]
    fn observer_can_interrupt_a_round_after_a_death() {
        // The first Elf kills the Goblin outright; the second Elf must not act.
        let config = BattleConfig {
            elf_power: 200,
            ..BattleConfig::default()
        };
        let mut world = World::from_text("######\n#EG.E#\n######\n", config).expect("map");
        let mut recorder = Recorder {
            stop_on_death: true,
            ..Recorder::default()
        };
        let mut events = Vec::new();

        let outcome = Turns::new()
            .tick_observed(&mut world, &mut events, &mut recorder)
            .expect("tick");

        assert_eq!(outcome, TickOutcome::Interrupted { completed_rounds: 0 });
        assert_eq!(recorder.actors, vec![CellCoord::new(1, 1)]);
        assert!(events
            .iter()
            .all(|event| !matches!(event, Event::UnitMoved { .. } | Event::RoundCompleted { .. })));
        assert_eq!(query::completed_rounds(&world), 0);
    }

    #[test]
    fn run_observed_stops_at_an_interruption() {
        let config = BattleConfig {
            goblin_power: 200,
            ..BattleConfig::default()
        };
        let mut world = World::from_text("#######\n#E...G#\n#######\n", config).expect("map");
        let mut recorder = Recorder {
            stop_on_death: true,
            ..Recorder::default()
        };

        let outcome = Turns::new()
            .run_observed(&mut world, None, &mut recorder)
            .expect("interrupted");

        assert_eq!(outcome.winner, None);
        assert_eq!(query::count(&world, Faction::Elf), 0);
        assert_eq!(query::battle_state(&world), BattleState::Running);
        assert_eq!(recorder.ticks, 2);
    }

    #[test]
    fn round_limit_is_enforced() {
        let mut world = world("#########\n#E.....G#\n#########\n");
        let error = Turns::new()
            .run(&mut world, Some(1), |_, _| {})
            .expect_err("battle needs more rounds");

        assert_eq!(error, TurnError::RoundLimitExceeded { limit: 1 });
    }

    #[test]
    fn resolve_combat_reports_whether_an_attack_happened() {
        let mut world = world("#######\n#EG..E#\n#######\n");
        let mut turns = Turns::new();
        let mut events = Vec::new();

        assert!(turns
            .resolve_combat(&mut world, CellCoord::new(1, 1), &mut events)
            .expect("combat"));
        assert!(!turns
            .resolve_combat(&mut world, CellCoord::new(5, 1), &mut events)
            .expect("combat"));
        assert_eq!(events.len(), 1);
    }
}
