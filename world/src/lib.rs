#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative battle state management for Beverage Bandits.

mod grid;
mod snapshot;

use bandits_core::{
    BattleConfig, BattleState, CellCoord, Command, Direction, Event, RejectionReason, Tile,
};

pub use grid::{row_annotation, ParseError, TileGrid, WorldError};
pub use snapshot::WorldSnapshot;

/// Represents the authoritative battle state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct World {
    grid: TileGrid,
    config: BattleConfig,
    completed_rounds: u32,
    state: BattleState,
}

impl World {
    /// Creates a world from an already parsed grid.
    #[must_use]
    pub fn from_grid(grid: TileGrid, config: BattleConfig) -> Self {
        Self {
            grid,
            config,
            completed_rounds: 0,
            state: BattleState::Running,
        }
    }

    /// Parses map text and creates a fresh world.
    pub fn from_text(text: &str, config: BattleConfig) -> Result<Self, ParseError> {
        Ok(Self::from_grid(TileGrid::parse(text, &config)?, config))
    }

    /// Restores a world captured with [`query::snapshot`].
    pub fn from_snapshot(snapshot: &WorldSnapshot) -> Result<Self, ParseError> {
        let grid = TileGrid::parse(&snapshot.map, &snapshot.config)?;
        Ok(Self {
            grid,
            config: snapshot.config,
            completed_rounds: snapshot.completed_rounds,
            state: snapshot.state,
        })
    }

    fn step_unit(&mut self, from: CellCoord, direction: Direction) -> Result<Event, RejectionReason> {
        let unit = self
            .grid
            .get(from)
            .map_err(|_| RejectionReason::OutOfBounds)?
            .unit()
            .ok_or(RejectionReason::MissingUnit)?;
        let (columns, rows) = self.grid.bounds();
        let to = from
            .step(direction, columns, rows)
            .ok_or(RejectionReason::OutOfBounds)?;
        let destination = self.grid.get(to).map_err(|_| RejectionReason::OutOfBounds)?;
        if !destination.is_open() {
            return Err(RejectionReason::Blocked);
        }

        self.grid
            .set(from, Tile::Open)
            .map_err(|_| RejectionReason::OutOfBounds)?;
        self.grid
            .set(to, Tile::Unit(unit))
            .map_err(|_| RejectionReason::OutOfBounds)?;

        Ok(Event::UnitMoved {
            faction: unit.faction(),
            from,
            to,
        })
    }

    fn attack(
        &mut self,
        attacker: CellCoord,
        target: CellCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), RejectionReason> {
        let striker = self.unit_at(attacker)?;
        let victim = self.unit_at(target)?;
        if Direction::between(attacker, target).is_none() {
            return Err(RejectionReason::NotAdjacent);
        }
        if !striker.is_hostile_to(&victim) {
            return Err(RejectionReason::NotHostile);
        }

        let remaining = victim.health().after_damage(striker.power());
        let replacement = if remaining.is_depleted() {
            Tile::Open
        } else {
            Tile::Unit(victim.with_health(remaining))
        };
        self.grid
            .set(target, replacement)
            .map_err(|_| RejectionReason::OutOfBounds)?;

        out_events.push(Event::UnitAttacked {
            attacker,
            faction: striker.faction(),
            target,
            damage: victim.health().get() - remaining.get(),
            remaining,
        });
        if remaining.is_depleted() {
            out_events.push(Event::UnitDied {
                faction: victim.faction(),
                cell: target,
            });
        }

        Ok(())
    }

    fn unit_at(&self, cell: CellCoord) -> Result<bandits_core::Unit, RejectionReason> {
        self.grid
            .get(cell)
            .map_err(|_| RejectionReason::OutOfBounds)?
            .unit()
            .ok_or(RejectionReason::MissingUnit)
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    if world.state.is_finished() {
        out_events.push(Event::CommandRejected {
            command,
            reason: RejectionReason::BattleFinished,
        });
        return;
    }

    let outcome = match command {
        Command::BeginRound => {
            out_events.push(Event::RoundStarted {
                round: world.completed_rounds.saturating_add(1),
            });
            Ok(())
        }
        Command::StepUnit { from, direction } => world
            .step_unit(from, direction)
            .map(|event| out_events.push(event)),
        Command::Attack { attacker, target } => world.attack(attacker, target, out_events),
        Command::CompleteRound => {
            world.completed_rounds = world.completed_rounds.saturating_add(1);
            out_events.push(Event::RoundCompleted {
                completed_rounds: world.completed_rounds,
            });
            Ok(())
        }
        Command::ConcludeBattle { winner } => {
            world.state = BattleState::Finished { winner };
            out_events.push(Event::BattleFinished {
                winner,
                completed_rounds: world.completed_rounds,
            });
            Ok(())
        }
    };

    if let Err(reason) = outcome {
        out_events.push(Event::CommandRejected { command, reason });
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use bandits_core::{
        BattleConfig, BattleState, Faction, TileView, UnitSnapshot, UnitView,
    };

    use super::{TileGrid, World, WorldSnapshot};

    /// Provides read-only access to the world's tile grid.
    #[must_use]
    pub fn grid(world: &World) -> &TileGrid {
        &world.grid
    }

    /// Exposes a read-only view of the dense tile grid.
    #[must_use]
    pub fn tile_view(world: &World) -> TileView<'_> {
        world.grid.view()
    }

    /// Captures every living unit in reading order.
    #[must_use]
    pub fn unit_view(world: &World) -> UnitView {
        let snapshots = world
            .grid
            .view()
            .units()
            .map(|(cell, unit)| UnitSnapshot { cell, unit })
            .collect();
        UnitView::from_snapshots(snapshots)
    }

    /// Number of living units fighting for `faction`.
    #[must_use]
    pub fn count(world: &World, faction: Faction) -> usize {
        world.grid.view().count(faction)
    }

    /// Sum of the hit points of every living unit.
    #[must_use]
    pub fn total_health(world: &World) -> u32 {
        world
            .grid
            .view()
            .units()
            .map(|(_, unit)| unit.health().get())
            .sum()
    }

    /// Number of rounds in which every unit acted.
    #[must_use]
    pub fn completed_rounds(world: &World) -> u32 {
        world.completed_rounds
    }

    /// Current battle progress.
    #[must_use]
    pub fn battle_state(world: &World) -> BattleState {
        world.state
    }

    /// Configuration the world was built with.
    #[must_use]
    pub fn config(world: &World) -> &BattleConfig {
        &world.config
    }

    /// Serialisable copy of the complete world state.
    #[must_use]
    pub fn snapshot(world: &World) -> WorldSnapshot {
        WorldSnapshot {
            config: world.config,
            completed_rounds: world.completed_rounds,
            state: world.state,
            map: world.grid.to_text(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandits_core::{Faction, Health};

    fn world(text: &str) -> World {
        World::from_text(text, BattleConfig::default()).expect("map parses")
    }

    #[test]
    fn step_moves_unit_and_vacates_origin() {
        let mut world = world("#####\n#E..#\n#####\n");
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::StepUnit {
                from: CellCoord::new(1, 1),
                direction: Direction::East,
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![Event::UnitMoved {
                faction: Faction::Elf,
                from: CellCoord::new(1, 1),
                to: CellCoord::new(2, 1),
            }]
        );
        let view = query::tile_view(&world);
        assert!(view.is_open(CellCoord::new(1, 1)));
        assert_eq!(
            view.unit(CellCoord::new(2, 1)).map(|unit| unit.faction()),
            Some(Faction::Elf)
        );
    }

    #[test]
    fn step_into_occupied_cell_is_rejected() {
        let mut world = world("#####\n#EG.#\n#####\n");
        let mut events = Vec::new();
        let command = Command::StepUnit {
            from: CellCoord::new(1, 1),
            direction: Direction::East,
        };

        apply(&mut world, command, &mut events);

        assert_eq!(
            events,
            vec![Event::CommandRejected {
                command,
                reason: RejectionReason::Blocked,
            }]
        );
    }

    #[test]
    fn attack_reduces_health_and_removes_the_dead() {
        let mut world = world("#####\n#EG.#\n#####\n");
        let elf = CellCoord::new(1, 1);
        let goblin = CellCoord::new(2, 1);
        let mut grid = query::grid(&world).clone();
        let wounded = grid.view().unit(goblin).expect("goblin");
        grid.set(goblin, Tile::Unit(wounded.with_health(Health::new(4))))
            .expect("in range");
        world = World::from_grid(grid, BattleConfig::default());

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::Attack {
                attacker: elf,
                target: goblin,
            },
            &mut events,
        );
        assert_eq!(
            query::tile_view(&world).unit(goblin).map(|unit| unit.health()),
            Some(Health::new(1))
        );

        events.clear();
        apply(
            &mut world,
            Command::Attack {
                attacker: elf,
                target: goblin,
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![
                Event::UnitAttacked {
                    attacker: elf,
                    faction: Faction::Elf,
                    target: goblin,
                    damage: 1,
                    remaining: Health::new(0),
                },
                Event::UnitDied {
                    faction: Faction::Goblin,
                    cell: goblin,
                },
            ]
        );
        assert!(query::tile_view(&world).is_open(goblin));
        assert_eq!(query::count(&world, Faction::Goblin), 0);
    }

    #[test]
    fn attack_on_ally_or_distant_unit_is_rejected() {
        let mut world = world("#######\n#EE.G.#\n#######\n");
        let mut events = Vec::new();

        let friendly = Command::Attack {
            attacker: CellCoord::new(1, 1),
            target: CellCoord::new(2, 1),
        };
        apply(&mut world, friendly, &mut events);

        let distant = Command::Attack {
            attacker: CellCoord::new(2, 1),
            target: CellCoord::new(4, 1),
        };
        apply(&mut world, distant, &mut events);

        assert_eq!(
            events,
            vec![
                Event::CommandRejected {
                    command: friendly,
                    reason: RejectionReason::NotHostile,
                },
                Event::CommandRejected {
                    command: distant,
                    reason: RejectionReason::NotAdjacent,
                },
            ]
        );
    }

    #[test]
    fn rounds_are_counted_only_when_completed() {
        let mut world = world("#EG#\n");
        let mut events = Vec::new();

        apply(&mut world, Command::BeginRound, &mut events);
        apply(&mut world, Command::CompleteRound, &mut events);
        apply(&mut world, Command::BeginRound, &mut events);
        apply(
            &mut world,
            Command::ConcludeBattle {
                winner: Some(Faction::Elf),
            },
            &mut events,
        );

        assert_eq!(query::completed_rounds(&world), 1);
        assert_eq!(
            events,
            vec![
                Event::RoundStarted { round: 1 },
                Event::RoundCompleted {
                    completed_rounds: 1
                },
                Event::RoundStarted { round: 2 },
                Event::BattleFinished {
                    winner: Some(Faction::Elf),
                    completed_rounds: 1,
                },
            ]
        );
    }

    #[test]
    fn finished_world_rejects_further_commands() {
        let mut world = world("#E.#\n");
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::ConcludeBattle {
                winner: Some(Faction::Elf),
            },
            &mut events,
        );
        events.clear();

        apply(&mut world, Command::BeginRound, &mut events);

        assert_eq!(
            events,
            vec![Event::CommandRejected {
                command: Command::BeginRound,
                reason: RejectionReason::BattleFinished,
            }]
        );
    }

    #[test]
    fn snapshot_restores_identical_world() {
        let mut world = world("#######\n#.G.E.#\n#######\n");
        let mut events = Vec::new();
        apply(&mut world, Command::BeginRound, &mut events);
        apply(
            &mut world,
            Command::StepUnit {
                from: CellCoord::new(2, 1),
                direction: Direction::East,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::Attack {
                attacker: CellCoord::new(3, 1),
                target: CellCoord::new(4, 1),
            },
            &mut events,
        );
        apply(&mut world, Command::CompleteRound, &mut events);

        let restored = World::from_snapshot(&query::snapshot(&world)).expect("snapshot parses");
        assert_eq!(restored, world);
    }
}
