#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Beverage Bandits battle simulator.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Systems inspect a read-only
//! [`TileView`] and respond with [`Command`] values describing desired
//! mutations, the world executes those commands via its `apply` entry point,
//! and then broadcasts [`Event`] values so the scheduler and analytics can
//! react deterministically.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Hit points every unit starts with unless configured otherwise.
pub const DEFAULT_STARTING_HEALTH: Health = Health::new(200);

/// Attack power every unit starts with unless configured otherwise.
pub const DEFAULT_ATTACK_POWER: AttackPower = AttackPower::new(3);

/// Location of a single grid cell expressed as column and row coordinates.
///
/// The [`Ord`] implementation is the canonical *reading order* used for every
/// tie-break in the simulation: ascending row, then ascending column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Returns the adjacent cell in `direction` if it lies inside a
    /// `columns × rows` rectangle.
    #[must_use]
    pub fn step(self, direction: Direction, columns: u32, rows: u32) -> Option<CellCoord> {
        let (column, row) = match direction {
            Direction::North => (self.column, self.row.checked_sub(1)?),
            Direction::West => (self.column.checked_sub(1)?, self.row),
            Direction::East => (self.column.checked_add(1)?, self.row),
            Direction::South => (self.column, self.row.checked_add(1)?),
        };

        if column < columns && row < rows {
            Some(CellCoord::new(column, row))
        } else {
            None
        }
    }

    fn reading_key(self) -> (u32, u32) {
        (self.row, self.column)
    }
}

impl PartialOrd for CellCoord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellCoord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.reading_key().cmp(&other.reading_key())
    }
}

/// Cardinal directions a unit may step in.
///
/// Declaration order matches the order in which adjacency is scanned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward decreasing column indices.
    West,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
}

impl Direction {
    /// Direction of a single orthogonal step from `from` to `to`, if the cells
    /// are adjacent.
    #[must_use]
    pub fn between(from: CellCoord, to: CellCoord) -> Option<Direction> {
        let column_diff = from.column().abs_diff(to.column());
        let row_diff = from.row().abs_diff(to.row());
        if column_diff + row_diff != 1 {
            return None;
        }

        if column_diff == 1 {
            if to.column() > from.column() {
                Some(Direction::East)
            } else {
                Some(Direction::West)
            }
        } else if to.row() > from.row() {
            Some(Direction::South)
        } else {
            Some(Direction::North)
        }
    }
}

/// Side a unit fights for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Faction {
    /// Elves, drawn as `E`.
    Elf,
    /// Goblins, drawn as `G`.
    Goblin,
}

impl Faction {
    /// Both factions in a stable order.
    pub const ALL: [Faction; 2] = [Faction::Elf, Faction::Goblin];

    /// The faction this one fights against.
    #[must_use]
    pub const fn opponent(self) -> Faction {
        match self {
            Faction::Elf => Faction::Goblin,
            Faction::Goblin => Faction::Elf,
        }
    }

    /// Map glyph used for units of this faction.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Faction::Elf => 'E',
            Faction::Goblin => 'G',
        }
    }

    /// Parses a unit glyph.
    #[must_use]
    pub const fn from_glyph(glyph: char) -> Option<Faction> {
        match glyph {
            'E' => Some(Faction::Elf),
            'G' => Some(Faction::Goblin),
            _ => None,
        }
    }

    /// Human readable plural name.
    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Faction::Elf => "Elves",
            Faction::Goblin => "Goblins",
        }
    }
}

/// Remaining hit points of a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Health(u32);

impl Health {
    /// Creates a new health value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric hit points.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Reports whether no hit points remain.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.0 == 0
    }

    /// Health left after absorbing an attack; never drops below zero.
    #[must_use]
    pub const fn after_damage(self, power: AttackPower) -> Health {
        Health(self.0.saturating_sub(power.get()))
    }
}

/// Damage a unit deals with a single attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttackPower(u32);

impl AttackPower {
    /// Creates a new attack power value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric damage.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// A combatant occupying a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    faction: Faction,
    health: Health,
    power: AttackPower,
}

impl Unit {
    /// Creates a unit with explicit health and power.
    #[must_use]
    pub const fn new(faction: Faction, health: Health, power: AttackPower) -> Self {
        Self {
            faction,
            health,
            power,
        }
    }

    /// Faction the unit fights for.
    #[must_use]
    pub const fn faction(&self) -> Faction {
        self.faction
    }

    /// Remaining hit points.
    #[must_use]
    pub const fn health(&self) -> Health {
        self.health
    }

    /// Damage dealt per attack.
    #[must_use]
    pub const fn power(&self) -> AttackPower {
        self.power
    }

    /// Copy of the unit carrying different hit points.
    #[must_use]
    pub const fn with_health(self, health: Health) -> Self {
        Self { health, ..self }
    }

    /// Reports whether `other` belongs to the opposing faction.
    #[must_use]
    pub fn is_hostile_to(&self, other: &Unit) -> bool {
        self.faction.opponent() == other.faction
    }
}

/// Contents of a single map cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tile {
    /// Impassable terrain.
    Wall,
    /// Passable, unoccupied floor.
    Open,
    /// Floor occupied by a unit.
    Unit(Unit),
}

impl Tile {
    /// Map glyph for the tile.
    #[must_use]
    pub const fn glyph(&self) -> char {
        match self {
            Tile::Wall => '#',
            Tile::Open => '.',
            Tile::Unit(unit) => unit.faction.glyph(),
        }
    }

    /// Reports whether the tile is unoccupied floor.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Tile::Open)
    }

    /// The occupying unit, if any.
    #[must_use]
    pub const fn unit(&self) -> Option<Unit> {
        match self {
            Tile::Unit(unit) => Some(*unit),
            Tile::Wall | Tile::Open => None,
        }
    }
}

/// Orthogonal neighbours of a cell, absent at the map edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Neighbors {
    /// Cell above.
    pub north: Option<CellCoord>,
    /// Cell to the left.
    pub west: Option<CellCoord>,
    /// Cell to the right.
    pub east: Option<CellCoord>,
    /// Cell below.
    pub south: Option<CellCoord>,
}

impl Neighbors {
    /// Computes the neighbours of `cell` inside a `columns × rows` rectangle.
    #[must_use]
    pub fn of(cell: CellCoord, columns: u32, rows: u32) -> Self {
        Self {
            north: cell.step(Direction::North, columns, rows),
            west: cell.step(Direction::West, columns, rows),
            east: cell.step(Direction::East, columns, rows),
            south: cell.step(Direction::South, columns, rows),
        }
    }

    /// Present neighbours in the fixed order north, west, east, south.
    pub fn iter(&self) -> impl Iterator<Item = CellCoord> {
        [self.north, self.west, self.east, self.south]
            .into_iter()
            .flatten()
    }
}

/// Read-only view into the dense tile grid.
#[derive(Clone, Copy, Debug)]
pub struct TileView<'a> {
    tiles: &'a [Tile],
    columns: u32,
    rows: u32,
}

impl<'a> TileView<'a> {
    /// Captures a new tile view backed by the provided row-major slice.
    #[must_use]
    pub fn new(tiles: &'a [Tile], columns: u32, rows: u32) -> Self {
        Self {
            tiles,
            columns,
            rows,
        }
    }

    /// Returns the tile stored at `cell`, or `None` outside the grid.
    #[must_use]
    pub fn tile(&self, cell: CellCoord) -> Option<Tile> {
        self.index(cell)
            .and_then(|index| self.tiles.get(index).copied())
    }

    /// Reports whether `cell` is inside the grid and unoccupied floor.
    #[must_use]
    pub fn is_open(&self, cell: CellCoord) -> bool {
        self.tile(cell).is_some_and(|tile| tile.is_open())
    }

    /// Returns the unit standing on `cell`, if any.
    #[must_use]
    pub fn unit(&self, cell: CellCoord) -> Option<Unit> {
        self.tile(cell).and_then(|tile| tile.unit())
    }

    /// Orthogonal neighbours of `cell` that lie inside the grid.
    #[must_use]
    pub fn neighbors(&self, cell: CellCoord) -> Neighbors {
        Neighbors::of(cell, self.columns, self.rows)
    }

    /// Provides the dimensions of the underlying grid as `(columns, rows)`.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Iterates every unit with its cell in reading order.
    pub fn units(&self) -> impl Iterator<Item = (CellCoord, Unit)> + 'a {
        let columns = self.columns.max(1);
        self.tiles
            .iter()
            .enumerate()
            .filter_map(move |(index, tile)| {
                let unit = tile.unit()?;
                let index = u32::try_from(index).ok()?;
                Some((CellCoord::new(index % columns, index / columns), unit))
            })
    }

    /// Number of living units fighting for `faction`.
    #[must_use]
    pub fn count(&self, faction: Faction) -> usize {
        self.units()
            .filter(|(_, unit)| unit.faction() == faction)
            .count()
    }

    /// Number of cells in the grid.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Reports whether the grid holds no cells at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Row-major index of `cell`, or `None` outside the grid.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

/// Immutable representation of a single unit's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UnitSnapshot {
    /// Grid cell currently occupied by the unit.
    pub cell: CellCoord,
    /// The unit itself.
    pub unit: Unit,
}

/// Read-only snapshot describing all units, in reading order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnitView {
    snapshots: Vec<UnitSnapshot>,
}

impl UnitView {
    /// Creates a new unit view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<UnitSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.cell);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in reading order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitSnapshot> {
        self.snapshots.iter()
    }

    /// Number of captured units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether no units were captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Total hit points of the captured units.
    #[must_use]
    pub fn total_health(&self) -> u32 {
        self.snapshots
            .iter()
            .map(|snapshot| snapshot.unit.health().get())
            .sum()
    }
}

/// Progress of a battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleState {
    /// Units are still fighting.
    Running,
    /// Combat has ended.
    Finished {
        /// Surviving faction; `None` only when the map held no units at all.
        winner: Option<Faction>,
    },
}

impl BattleState {
    /// Reports whether combat has ended.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self, BattleState::Finished { .. })
    }
}

/// Tunable battle parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Damage dealt by each Elf attack.
    pub elf_power: u32,
    /// Damage dealt by each Goblin attack.
    pub goblin_power: u32,
    /// Hit points every unit starts with.
    pub starting_health: u32,
}

impl BattleConfig {
    /// Attack power assigned to units of `faction`.
    #[must_use]
    pub const fn power_for(&self, faction: Faction) -> AttackPower {
        match faction {
            Faction::Elf => AttackPower::new(self.elf_power),
            Faction::Goblin => AttackPower::new(self.goblin_power),
        }
    }

    /// Freshly spawned unit of `faction`.
    #[must_use]
    pub const fn spawn(&self, faction: Faction) -> Unit {
        Unit::new(
            faction,
            Health::new(self.starting_health),
            self.power_for(faction),
        )
    }

    /// Copy of the configuration with a different Elf attack power.
    #[must_use]
    pub const fn with_elf_power(self, elf_power: u32) -> Self {
        Self { elf_power, ..self }
    }
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            elf_power: DEFAULT_ATTACK_POWER.get(),
            goblin_power: DEFAULT_ATTACK_POWER.get(),
            starting_health: DEFAULT_STARTING_HEALTH.get(),
        }
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    /// Marks the beginning of a new round.
    BeginRound,
    /// Moves the unit standing on `from` one step in `direction`.
    StepUnit {
        /// Cell currently occupied by the moving unit.
        from: CellCoord,
        /// Direction of travel for the step.
        direction: Direction,
    },
    /// Makes the unit on `attacker` strike the unit on `target`.
    Attack {
        /// Cell of the attacking unit.
        attacker: CellCoord,
        /// Cell of the unit being struck.
        target: CellCoord,
    },
    /// Records that every unit acted during the current round.
    CompleteRound,
    /// Ends the battle with the provided winner.
    ConcludeBattle {
        /// Surviving faction, if any unit survived.
        winner: Option<Faction>,
    },
}

/// Reasons the world may refuse a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionReason {
    /// A referenced cell lies outside the grid.
    OutOfBounds,
    /// No unit stands on the referenced cell.
    MissingUnit,
    /// The step destination is not open floor.
    Blocked,
    /// Attacker and target are not orthogonally adjacent.
    NotAdjacent,
    /// Attacker and target fight for the same faction.
    NotHostile,
    /// The battle already ended.
    BattleFinished,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// A new round began.
    RoundStarted {
        /// One-based index of the round that started.
        round: u32,
    },
    /// A unit stepped to an adjacent cell.
    UnitMoved {
        /// Faction of the moving unit.
        faction: Faction,
        /// Cell the unit occupied before moving.
        from: CellCoord,
        /// Cell the unit occupies after moving.
        to: CellCoord,
    },
    /// A unit struck an enemy.
    UnitAttacked {
        /// Cell of the attacking unit.
        attacker: CellCoord,
        /// Faction of the attacking unit.
        faction: Faction,
        /// Cell of the unit that was struck.
        target: CellCoord,
        /// Hit points actually removed.
        damage: u32,
        /// Hit points the target has left.
        remaining: Health,
    },
    /// A unit ran out of hit points and was removed from the map.
    UnitDied {
        /// Faction of the fallen unit.
        faction: Faction,
        /// Cell the unit occupied.
        cell: CellCoord,
    },
    /// Every unit acted during the round.
    RoundCompleted {
        /// Number of full rounds fought so far.
        completed_rounds: u32,
    },
    /// Combat ended.
    BattleFinished {
        /// Surviving faction, if any unit survived.
        winner: Option<Faction>,
        /// Number of full rounds fought.
        completed_rounds: u32,
    },
    /// The world refused a command.
    CommandRejected {
        /// Command that was refused.
        command: Command,
        /// Specific reason the command failed.
        reason: RejectionReason,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn reading_order_compares_rows_before_columns() {
        let mut cells = vec![
            CellCoord::new(0, 2),
            CellCoord::new(5, 0),
            CellCoord::new(1, 1),
            CellCoord::new(0, 1),
        ];
        cells.sort();
        assert_eq!(
            cells,
            vec![
                CellCoord::new(5, 0),
                CellCoord::new(0, 1),
                CellCoord::new(1, 1),
                CellCoord::new(0, 2),
            ]
        );
    }

    #[test]
    fn neighbors_are_absent_at_edges() {
        let corner = Neighbors::of(CellCoord::new(0, 0), 3, 3);
        assert_eq!(corner.north, None);
        assert_eq!(corner.west, None);
        assert_eq!(corner.east, Some(CellCoord::new(1, 0)));
        assert_eq!(corner.south, Some(CellCoord::new(0, 1)));

        let far = Neighbors::of(CellCoord::new(2, 2), 3, 3);
        assert_eq!(far.east, None);
        assert_eq!(far.south, None);
    }

    #[test]
    fn neighbors_iterate_north_west_east_south() {
        let neighbors = Neighbors::of(CellCoord::new(1, 1), 3, 3);
        let cells: Vec<_> = neighbors.iter().collect();
        assert_eq!(
            cells,
            vec![
                CellCoord::new(1, 0),
                CellCoord::new(0, 1),
                CellCoord::new(2, 1),
                CellCoord::new(1, 2),
            ]
        );
    }

    #[test]
    fn direction_between_neighbors() {
        let origin = CellCoord::new(3, 3);
        assert_eq!(
            Direction::between(origin, CellCoord::new(3, 2)),
            Some(Direction::North)
        );
        assert_eq!(
            Direction::between(origin, CellCoord::new(4, 3)),
            Some(Direction::East)
        );
        assert_eq!(
            Direction::between(origin, CellCoord::new(3, 4)),
            Some(Direction::South)
        );
        assert_eq!(
            Direction::between(origin, CellCoord::new(2, 3)),
            Some(Direction::West)
        );
        assert_eq!(Direction::between(origin, origin), None);
        assert_eq!(Direction::between(origin, CellCoord::new(4, 4)), None);
    }

    #[test]
    fn damage_saturates_at_zero() {
        let health = Health::new(2);
        assert_eq!(health.after_damage(AttackPower::new(3)), Health::new(0));
        assert!(health.after_damage(AttackPower::new(3)).is_depleted());
        assert_eq!(
            Health::new(200).after_damage(AttackPower::new(3)),
            Health::new(197)
        );
    }

    #[test]
    fn tile_view_lists_units_in_reading_order() {
        let config = BattleConfig::default();
        let tiles = vec![
            Tile::Wall,
            Tile::Unit(config.spawn(Faction::Goblin)),
            Tile::Open,
            Tile::Unit(config.spawn(Faction::Elf)),
            Tile::Open,
            Tile::Unit(config.spawn(Faction::Goblin)),
        ];
        let view = TileView::new(&tiles, 3, 2);

        let cells: Vec<_> = view.units().map(|(cell, _)| cell).collect();
        assert_eq!(
            cells,
            vec![
                CellCoord::new(1, 0),
                CellCoord::new(0, 1),
                CellCoord::new(2, 1),
            ]
        );
        assert_eq!(view.count(Faction::Goblin), 2);
        assert_eq!(view.count(Faction::Elf), 1);
        assert_eq!(view.tile(CellCoord::new(3, 0)), None);
    }

    #[test]
    fn battle_config_fills_missing_fields_with_defaults() {
        let config: BattleConfig = toml::from_str("elf_power = 15").expect("config parses");
        assert_eq!(config.elf_power, 15);
        assert_eq!(config.goblin_power, 3);
        assert_eq!(config.starting_health, 200);
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn unit_tile_round_trips_through_bincode() {
        let unit = Unit::new(Faction::Elf, Health::new(131), AttackPower::new(15));
        assert_round_trip(&Tile::Unit(unit));
    }

    #[test]
    fn battle_state_round_trips_through_bincode() {
        assert_round_trip(&BattleState::Finished {
            winner: Some(Faction::Goblin),
        });
    }
}
