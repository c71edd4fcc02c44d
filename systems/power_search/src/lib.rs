#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Search for the weakest Elf attack power that wins without losing an Elf.

use std::ops::ControlFlow;

use bandits_core::{BattleConfig, Event, Faction};
use bandits_system_analytics::{Analytics, BattleReport};
use bandits_system_turns::{BattleObserver, TickOutcome, TurnError, Turns};
use bandits_world::{ParseError, World};
use thiserror::Error;

/// Highest Elf attack power tried unless configured otherwise.
pub const DEFAULT_MAX_POWER: u32 = 200;

/// Failures that end a power search.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SearchError {
    /// The map text could not be parsed.
    #[error("invalid map: {0}")]
    Parse(#[from] ParseError),
    /// A battle failed while being simulated.
    #[error("battle failed: {0}")]
    Turn(#[from] TurnError),
    /// No power up to the limit produced a flawless Elf victory.
    #[error("no elf power up to {max_power} wins without casualties")]
    Exhausted {
        /// Highest power that was tried.
        max_power: u32,
    },
}

/// Weakest winning power and the battle it produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PowerSearchResult {
    /// Smallest Elf attack power giving a flawless victory.
    pub elf_power: u32,
    /// Report of the battle fought with that power.
    pub report: BattleReport,
}

/// Linear search over Elf attack powers.
#[derive(Debug)]
pub struct PowerSearch {
    max_power: u32,
    round_limit: Option<u32>,
    turns: Turns,
    events: Vec<Event>,
}

impl Default for PowerSearch {
    fn default() -> Self {
        Self {
            max_power: DEFAULT_MAX_POWER,
            round_limit: None,
            turns: Turns::new(),
            events: Vec::new(),
        }
    }
}

impl PowerSearch {
    /// Creates a search trying powers up to [`DEFAULT_MAX_POWER`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the highest power tried.
    #[must_use]
    pub fn with_max_power(mut self, max_power: u32) -> Self {
        self.max_power = max_power;
        self
    }

    /// Caps the number of rounds each attempt may take.
    #[must_use]
    pub fn with_round_limit(mut self, round_limit: Option<u32>) -> Self {
        self.round_limit = round_limit;
        self
    }

    /// Tries every power above `config.elf_power` in turn.
    ///
    /// Outcomes are not monotonic in power, so every candidate is fought
    /// in order. An attempt is abandoned on the turn an Elf dies; no other
    /// unit acts after that.
    pub fn run(&mut self, text: &str, config: BattleConfig) -> Result<PowerSearchResult, SearchError> {
        let first = config.elf_power.saturating_add(1);
        for elf_power in first..=self.max_power {
            let mut world = World::from_text(text, config.with_elf_power(elf_power))?;
            match self.attempt(&mut world)? {
                Some(report) => {
                    tracing::info!(
                        "elf power {} wins flawlessly after {} rounds",
                        elf_power,
                        report.completed_rounds
                    );
                    return Ok(PowerSearchResult { elf_power, report });
                }
                None => tracing::info!("elf power {} is not enough", elf_power),
            }
        }

        Err(SearchError::Exhausted {
            max_power: self.max_power,
        })
    }

    /// Fights one battle, returning its report when the Elves win without
    /// a single casualty.
    fn attempt(&mut self, world: &mut World) -> Result<Option<BattleReport>, SearchError> {
        let mut analytics = Analytics::new();
        loop {
            self.events.clear();
            let outcome = self
                .turns
                .tick_observed(world, &mut self.events, &mut ElfDeathWatch)?;
            analytics.handle(&self.events);

            match outcome {
                TickOutcome::Interrupted { .. } => return Ok(None),
                TickOutcome::Finished { winner, .. } => {
                    if winner != Some(Faction::Elf) {
                        return Ok(None);
                    }
                    return Ok(Some(analytics.report(world)));
                }
                TickOutcome::RoundCompleted { completed_rounds } => {
                    if let Some(limit) = self.round_limit {
                        if completed_rounds > limit {
                            return Err(TurnError::RoundLimitExceeded { limit }.into());
                        }
                    }
                }
            }
        }
    }
}

/// Breaks the round on the turn that kills an Elf.
struct ElfDeathWatch;

impl BattleObserver for ElfDeathWatch {
    fn after_turn(&mut self, _world: &World, events: &[Event]) -> ControlFlow<()> {
        let elf_died = events.iter().any(|event| {
            matches!(
                event,
                Event::UnitDied {
                    faction: Faction::Elf,
                    ..
                }
            )
        });
        if elf_died {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}
