#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic movement system that picks destinations and proposes unit steps.

use bandits_core::{CellCoord, Command, Direction, TileView};
use bandits_system_pathfinding::Pathfinder;

/// Chosen destination and the step that starts the route toward it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct MovePlan {
    /// Length of the shortest route to the destination.
    pub distance: u32,
    /// Open cell adjacent to an enemy that the unit heads for.
    pub destination: CellCoord,
    /// Cell the unit enters this turn.
    pub first_step: CellCoord,
}

/// Pure system that moves a unit one step toward the nearest reachable enemy.
#[derive(Debug, Default)]
pub struct Movement {
    pathfinder: Pathfinder,
    destinations: Vec<CellCoord>,
}

impl Movement {
    /// Creates a new movement system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits a `Command::StepUnit` for the unit on `actor`, if it can approach an enemy.
    ///
    /// Returns whether a command was emitted. A unit with no reachable
    /// in-range cell forfeits its move.
    pub fn handle(&mut self, view: TileView<'_>, actor: CellCoord, out: &mut Vec<Command>) -> bool {
        let Some(plan) = self.plan(view, actor) else {
            return false;
        };
        let Some(direction) = Direction::between(actor, plan.first_step) else {
            return false;
        };

        out.push(Command::StepUnit {
            from: actor,
            direction,
        });
        true
    }

    /// Chooses where the unit on `actor` should head.
    ///
    /// Candidates are the open cells orthogonally adjacent to any enemy. The
    /// winner has the shortest route, then the reading-order-first
    /// destination, then the reading-order-first first step.
    pub fn plan(&mut self, view: TileView<'_>, actor: CellCoord) -> Option<MovePlan> {
        let unit = view.unit(actor)?;
        let enemy = unit.faction().opponent();

        self.destinations.clear();
        for (cell, other) in view.units() {
            if other.faction() != enemy {
                continue;
            }
            self.destinations
                .extend(view.neighbors(cell).iter().filter(|&n| view.is_open(n)));
        }
        if self.destinations.is_empty() {
            return None;
        }
        self.destinations.sort_unstable();
        self.destinations.dedup();

        let reach = self.pathfinder.explore(view, actor);
        let mut best: Option<MovePlan> = None;
        for &destination in &self.destinations {
            let (Some(distance), Some(first_step)) =
                (reach.distance(destination), reach.first_step(destination))
            else {
                continue;
            };

            let candidate = MovePlan {
                distance,
                destination,
                first_step,
            };
            best = Some(match best {
                Some(existing) if existing <= candidate => existing,
                _ => candidate,
            });
        }

        best
    }
}
