#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that picks attack targets for a unit about to strike.

use bandits_core::{CellCoord, Command, Health, TileView};

/// Combat system that emits an attack against the weakest adjacent enemy.
#[derive(Debug, Default)]
pub struct Combat {
    candidates: Vec<Candidate>,
}

impl Combat {
    /// Creates a new combat system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `Command::Attack` for the unit on `actor` when an enemy is adjacent.
    ///
    /// The target is the adjacent enemy with the fewest hit points; equal
    /// health resolves to the enemy first in reading order. Returns whether a
    /// command was emitted.
    pub fn handle(&mut self, view: TileView<'_>, actor: CellCoord, out: &mut Vec<Command>) -> bool {
        let Some(attacker) = view.unit(actor) else {
            return false;
        };

        self.candidates.clear();
        for cell in view.neighbors(actor).iter() {
            if let Some(unit) = view.unit(cell) {
                if attacker.is_hostile_to(&unit) {
                    self.candidates.push(Candidate {
                        health: unit.health(),
                        cell,
                    });
                }
            }
        }

        let Some(best) = self.candidates.iter().min() else {
            return false;
        };

        out.push(Command::Attack {
            attacker: actor,
            target: best.cell,
        });
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Candidate {
    health: Health,
    cell: CellCoord,
}
