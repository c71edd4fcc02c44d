//! Serialisable capture of a battle in progress.

use bandits_core::{BattleConfig, BattleState};
use serde::{Deserialize, Serialize};

/// Complete world state in a form suitable for storage or transfer.
///
/// The map is kept in the annotated text format so it stays readable and
/// reuses the same parser as fresh input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Configuration the battle was started with.
    pub config: BattleConfig,
    /// Number of rounds in which every unit acted.
    pub completed_rounds: u32,
    /// Battle progress at capture time.
    pub state: BattleState,
    /// Annotated map text.
    pub map: String,
}
