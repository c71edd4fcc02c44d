#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Event-driven battle statistics and the final outcome score.

use bandits_core::{BattleState, Event, Faction};
use bandits_world::{query, World};

/// Running totals for one faction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FactionTally {
    /// Units of this faction that died.
    pub casualties: u32,
    /// Hit points removed from enemies by this faction.
    pub damage_dealt: u32,
    /// Steps taken by units of this faction.
    pub steps: u32,
    /// Attacks made by units of this faction.
    pub attacks: u32,
}

/// Summary of a battle as seen through its events and final world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BattleReport {
    /// Number of full rounds fought.
    pub completed_rounds: u32,
    /// Surviving faction once combat is over.
    pub winner: Option<Faction>,
    /// Sum of the hit points of every surviving unit.
    pub remaining_health: u32,
    /// Number of surviving units.
    pub survivors: usize,
    /// Deaths per faction, Elves first.
    pub casualties: [u32; 2],
    /// Completed rounds multiplied by the remaining health.
    pub outcome: u64,
}

/// Pure analytics system that folds world events into per-faction tallies.
#[derive(Debug, Default)]
pub struct Analytics {
    tallies: [FactionTally; 2],
    last_report: Option<BattleReport>,
}

impl Analytics {
    /// Creates a new analytics system with zeroed tallies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes world events emitted during a tick.
    pub fn handle(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::UnitMoved { faction, .. } => {
                    self.tallies[slot(*faction)].steps += 1;
                }
                Event::UnitAttacked {
                    faction, damage, ..
                } => {
                    let tally = &mut self.tallies[slot(*faction)];
                    tally.attacks += 1;
                    tally.damage_dealt = tally.damage_dealt.saturating_add(*damage);
                }
                Event::UnitDied { faction, .. } => {
                    self.tallies[slot(*faction)].casualties += 1;
                }
                _ => {}
            }
        }
    }

    /// Totals gathered so far for `faction`.
    #[must_use]
    pub fn tally(&self, faction: Faction) -> FactionTally {
        self.tallies[slot(faction)]
    }

    /// Returns the last report produced by [`Analytics::report`], if any.
    #[must_use]
    pub fn last_report(&self) -> Option<&BattleReport> {
        self.last_report.as_ref()
    }

    /// Builds a report from the tallies and the current world.
    pub fn report(&mut self, world: &World) -> BattleReport {
        let units = query::unit_view(world);
        let completed_rounds = query::completed_rounds(world);
        let remaining_health = units.total_health();
        let winner = match query::battle_state(world) {
            BattleState::Finished { winner } => winner,
            BattleState::Running => None,
        };

        let report = BattleReport {
            completed_rounds,
            winner,
            remaining_health,
            survivors: units.len(),
            casualties: [
                self.tally(Faction::Elf).casualties,
                self.tally(Faction::Goblin).casualties,
            ],
            outcome: u64::from(completed_rounds) * u64::from(remaining_health),
        };
        self.last_report = Some(report.clone());
        report
    }
}

fn slot(faction: Faction) -> usize {
    match faction {
        Faction::Elf => 0,
        Faction::Goblin => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandits_core::{CellCoord, Health};

    #[test]
    fn events_accumulate_per_faction() {
        let mut analytics = Analytics::new();
        analytics.handle(&[
            Event::RoundStarted { round: 1 },
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
                remaining: Health::new(0),
            },
            Event::UnitDied {
                faction: Faction::Goblin,
                cell: CellCoord::new(3, 1),
            },
        ]);

        assert_eq!(
            analytics.tally(Faction::Elf),
            FactionTally {
                casualties: 0,
                damage_dealt: 3,
                steps: 1,
                attacks: 1,
            }
        );
        assert_eq!(
            analytics.tally(Faction::Goblin),
            FactionTally {
                casualties: 1,
                ..FactionTally::default()
            }
        );
    }

    #[test]
    fn no_report_until_requested() {
        let analytics = Analytics::new();
        assert!(analytics.last_report().is_none());
    }
}
