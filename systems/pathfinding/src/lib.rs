#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Uniform-cost best-first search with reading-order tie-breaks.
//!
//! The frontier is ordered by `(distance, first step, cell)`, comparing cells
//! in reading order. Every frontier entry at distance `d` is queued before any
//! cell at distance `d` is settled, so the first time a cell leaves the
//! frontier it carries both its shortest distance and the reading-order-first
//! first step among all shortest paths that reach it.

use std::{cmp::Reverse, collections::BinaryHeap};

use bandits_core::{CellCoord, Tile, TileView};
use thiserror::Error;

/// Raised when no route connects two cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error(
    "no path from ({}, {}) to ({}, {})",
    from.column(),
    from.row(),
    to.column(),
    to.row()
)]
pub struct NoPath {
    /// Start of the failed search.
    pub from: CellCoord,
    /// Requested destination.
    pub to: CellCoord,
}

/// Sequence of orthogonally adjacent cells from a start to a destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    cells: Vec<CellCoord>,
}

impl Path {
    /// Every cell on the path, start and destination included.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// Number of steps needed to walk the path.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.cells.len().saturating_sub(1)
    }

    /// Cell the path ends on.
    #[must_use]
    pub fn destination(&self) -> CellCoord {
        self.cells[self.cells.len() - 1]
    }

    /// Cell entered by the first step, or `None` for the trivial path.
    #[must_use]
    pub fn first_step(&self) -> Option<CellCoord> {
        self.cells.get(1).copied()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Visit {
    distance: u32,
    predecessor: Option<CellCoord>,
    first_step: Option<CellCoord>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Entry {
    distance: u32,
    first_step: Option<CellCoord>,
    cell: CellCoord,
    predecessor: Option<CellCoord>,
}

/// Search results for every cell reachable from a single start.
#[derive(Clone, Debug)]
pub struct Reachability<'a> {
    start: CellCoord,
    view: TileView<'a>,
    visits: &'a [Option<Visit>],
}

impl<'a> Reachability<'a> {
    /// Shortest distance to `cell`, if it is reachable.
    #[must_use]
    pub fn distance(&self, cell: CellCoord) -> Option<u32> {
        self.visit(cell).map(|visit| visit.distance)
    }

    /// First step of the preferred shortest path to `cell`.
    #[must_use]
    pub fn first_step(&self, cell: CellCoord) -> Option<CellCoord> {
        self.visit(cell).and_then(|visit| visit.first_step)
    }

    /// Rebuilds the preferred shortest path to `to`.
    pub fn path_to(&self, to: CellCoord) -> Result<Path, NoPath> {
        let no_path = NoPath {
            from: self.start,
            to,
        };
        let mut visit = self.visit(to).ok_or(no_path)?;
        let mut cells = vec![to];
        while let Some(previous) = visit.predecessor {
            cells.push(previous);
            visit = self.visit(previous).ok_or(no_path)?;
        }
        cells.reverse();
        Ok(Path { cells })
    }

    fn visit(&self, cell: CellCoord) -> Option<Visit> {
        self.view
            .index(cell)
            .and_then(|index| self.visits.get(index).copied().flatten())
    }
}

/// Pathfinding system that reuses scratch buffers between searches.
#[derive(Debug, Default)]
pub struct Pathfinder {
    visits: Vec<Option<Visit>>,
    frontier: BinaryHeap<Reverse<Entry>>,
}

impl Pathfinder {
    /// Creates a new pathfinder with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds the preferred shortest path from `from` to `to` over open tiles.
    ///
    /// The destination itself is enterable even when occupied; walls never
    /// are. `from == to` yields the single-cell path.
    pub fn shortest_path(
        &mut self,
        view: TileView<'_>,
        from: CellCoord,
        to: CellCoord,
    ) -> Result<Path, NoPath> {
        let no_path = NoPath { from, to };
        if view.tile(from).is_none() || view.tile(to).is_none() {
            return Err(no_path);
        }
        if from == to {
            return Ok(Path { cells: vec![from] });
        }

        self.search(view, from, Some(to));
        Reachability {
            start: from,
            view,
            visits: &self.visits,
        }
        .path_to(to)
    }

    /// Settles every open cell reachable from `from`.
    pub fn explore<'a>(&'a mut self, view: TileView<'a>, from: CellCoord) -> Reachability<'a> {
        self.search(view, from, None);
        Reachability {
            start: from,
            view,
            visits: &self.visits,
        }
    }

    fn search(&mut self, view: TileView<'_>, from: CellCoord, target: Option<CellCoord>) {
        self.visits.clear();
        self.visits.resize(view.len(), None);
        self.frontier.clear();

        if view.index(from).is_none() {
            return;
        }

        self.frontier.push(Reverse(Entry {
            distance: 0,
            first_step: None,
            cell: from,
            predecessor: None,
        }));

        while let Some(Reverse(entry)) = self.frontier.pop() {
            let Some(index) = view.index(entry.cell) else {
                continue;
            };
            if self.visits[index].is_some() {
                continue;
            }
            self.visits[index] = Some(Visit {
                distance: entry.distance,
                predecessor: entry.predecessor,
                first_step: entry.first_step,
            });

            if target == Some(entry.cell) {
                return;
            }

            for neighbor in view.neighbors(entry.cell).iter() {
                if !enterable(view, neighbor, target) {
                    continue;
                }
                let Some(neighbor_index) = view.index(neighbor) else {
                    continue;
                };
                if self.visits[neighbor_index].is_some() {
                    continue;
                }

                self.frontier.push(Reverse(Entry {
                    distance: entry.distance + 1,
                    first_step: entry.first_step.or(Some(neighbor)),
                    cell: neighbor,
                    predecessor: Some(entry.cell),
                }));
            }
        }
    }
}

fn enterable(view: TileView<'_>, cell: CellCoord, target: Option<CellCoord>) -> bool {
    match view.tile(cell) {
        Some(Tile::Open) => true,
        Some(Tile::Unit(_)) => target == Some(cell),
        Some(Tile::Wall) | None => false,
    }
}
